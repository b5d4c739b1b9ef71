use std::{fmt, process::ExitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Quit the whole application as soon as the backend is gone.
    Terminate,
    /// Relaunch with the same credential and port, up to `max_restarts` times.
    Restart { max_restarts: u32 },
}

/// How the backend process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl BackendExit {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// Exit code the host should report when it quits because of this exit.
    pub fn host_exit_code(&self) -> i32 {
        self.code.unwrap_or(1)
    }
}

impl fmt::Display for BackendExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "none".to_string());
        let signal = self
            .signal
            .map(|signal| signal.to_string())
            .unwrap_or_else(|| "none".to_string());
        write!(f, "code {code} signal {signal}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendLifecycle {
    #[default]
    NotStarted,
    Starting,
    Running,
    Exited(Option<BackendExit>),
}

impl BackendLifecycle {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn can_transition_to(&self, next: &BackendLifecycle) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Starting)
                | (Self::Starting, Self::Running)
                | (Self::Starting, Self::Exited(_))
                | (Self::Running, Self::Exited(_))
                // only reachable through an explicit restart decision
                | (Self::Exited(_), Self::Starting)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    QuitApp { exit_code: i32 },
    Restart { attempt: u32 },
    /// Exit was caused by the shell itself stopping the backend.
    Ignore,
}

pub fn decide_on_backend_exit(
    policy: ExitPolicy,
    exit: BackendExit,
    restarts_so_far: u32,
    shutting_down: bool,
) -> ExitDecision {
    if shutting_down {
        return ExitDecision::Ignore;
    }

    match policy {
        ExitPolicy::Restart { max_restarts } if restarts_so_far < max_restarts => {
            ExitDecision::Restart {
                attempt: restarts_so_far + 1,
            }
        }
        _ => ExitDecision::QuitApp {
            exit_code: exit.host_exit_code(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN: BackendExit = BackendExit {
        code: Some(0),
        signal: None,
    };
    const CRASHED: BackendExit = BackendExit {
        code: Some(3),
        signal: None,
    };
    const KILLED: BackendExit = BackendExit {
        code: None,
        signal: Some(9),
    };

    #[test]
    fn terminate_policy_quits_for_every_kind_of_exit() {
        for exit in [CLEAN, CRASHED, KILLED] {
            assert!(matches!(
                decide_on_backend_exit(ExitPolicy::Terminate, exit, 0, false),
                ExitDecision::QuitApp { .. }
            ));
        }
    }

    #[test]
    fn quit_exit_code_follows_backend_exit() {
        assert_eq!(
            decide_on_backend_exit(ExitPolicy::Terminate, CLEAN, 0, false),
            ExitDecision::QuitApp { exit_code: 0 }
        );
        assert_eq!(
            decide_on_backend_exit(ExitPolicy::Terminate, CRASHED, 0, false),
            ExitDecision::QuitApp { exit_code: 3 }
        );
        assert_eq!(
            decide_on_backend_exit(ExitPolicy::Terminate, KILLED, 0, false),
            ExitDecision::QuitApp { exit_code: 1 }
        );
    }

    #[test]
    fn restart_policy_restarts_until_limit_then_quits() {
        let policy = ExitPolicy::Restart { max_restarts: 2 };
        assert_eq!(
            decide_on_backend_exit(policy, CRASHED, 0, false),
            ExitDecision::Restart { attempt: 1 }
        );
        assert_eq!(
            decide_on_backend_exit(policy, CRASHED, 1, false),
            ExitDecision::Restart { attempt: 2 }
        );
        assert_eq!(
            decide_on_backend_exit(policy, CRASHED, 2, false),
            ExitDecision::QuitApp { exit_code: 3 }
        );
    }

    #[test]
    fn exits_during_shutdown_are_ignored() {
        assert_eq!(
            decide_on_backend_exit(ExitPolicy::Terminate, KILLED, 0, true),
            ExitDecision::Ignore
        );
    }

    #[test]
    fn lifecycle_only_moves_forward() {
        use BackendLifecycle::*;

        assert!(NotStarted.can_transition_to(&Starting));
        assert!(Starting.can_transition_to(&Running));
        assert!(Starting.can_transition_to(&Exited(None)));
        assert!(Running.can_transition_to(&Exited(Some(CLEAN))));
        assert!(Exited(Some(CRASHED)).can_transition_to(&Starting));

        assert!(!NotStarted.can_transition_to(&Running));
        assert!(!Running.can_transition_to(&Starting));
        assert!(!Exited(Some(CLEAN)).can_transition_to(&Running));
    }

    #[test]
    fn display_reports_code_and_signal() {
        assert_eq!(CRASHED.to_string(), "code 3 signal none");
        assert_eq!(KILLED.to_string(), "code none signal 9");
    }
}
