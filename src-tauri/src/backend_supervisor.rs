use std::{
    fmt,
    process::Child,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use crate::{
    append_shutdown_log,
    backend_control::ControlChannel,
    backend_launch::{self, BackendEnv, BackendProcess},
    backend_lifecycle::{decide_on_backend_exit, BackendExit, BackendLifecycle, ExitDecision, ExitPolicy},
    backend_output::OutputSink,
    launch_plan::build_debug_command,
    process_control::{self, StopOutcome},
    LaunchError, LaunchPlan, EXIT_WATCH_INTERVAL_MS,
};

/// Called once when the backend is gone for good and the app should quit.
pub type QuitHook = Arc<dyn Fn(i32) + Send + Sync>;

#[derive(Clone)]
pub struct SupervisorHooks {
    pub output: OutputSink,
    pub on_quit: QuitHook,
}

struct LaunchSpec {
    plan: LaunchPlan,
    env: BackendEnv,
    hooks: SupervisorHooks,
}

struct SupervisorInner {
    child: Mutex<Option<Child>>,
    control: Mutex<Option<ControlChannel>>,
    lifecycle: Mutex<BackendLifecycle>,
    restarts: AtomicU32,
    shutting_down: AtomicBool,
    policy: ExitPolicy,
    shutdown_grace: Duration,
}

/// Owns the backend process for the lifetime of the app.
#[derive(Clone)]
pub struct BackendSupervisor {
    inner: Arc<SupervisorInner>,
}

impl fmt::Debug for BackendSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSupervisor")
            .field("lifecycle", &self.lifecycle())
            .field("policy", &self.inner.policy)
            .field("restarts", &self.restart_count())
            .finish()
    }
}

impl BackendSupervisor {
    pub fn new(policy: ExitPolicy, shutdown_grace: Duration) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                child: Mutex::new(None),
                control: Mutex::new(None),
                lifecycle: Mutex::new(BackendLifecycle::NotStarted),
                restarts: AtomicU32::new(0),
                shutting_down: AtomicBool::new(false),
                policy,
                shutdown_grace,
            }),
        }
    }

    pub fn lifecycle(&self) -> BackendLifecycle {
        self.inner
            .lifecycle
            .lock()
            .map(|guard| *guard)
            .unwrap_or(BackendLifecycle::Exited(None))
    }

    pub fn restart_count(&self) -> u32 {
        self.inner.restarts.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        let lifecycle = self.lifecycle();
        lifecycle.is_running() || lifecycle == BackendLifecycle::Starting
    }

    /// Whether the current run said it is ready over the control channel.
    pub fn announced_ready(&self) -> bool {
        self.inner
            .control
            .lock()
            .map(|guard| guard.as_ref().is_some_and(ControlChannel::announced_ready))
            .unwrap_or(false)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    fn transition(&self, next: BackendLifecycle) {
        let Ok(mut guard) = self.inner.lifecycle.lock() else {
            return;
        };
        if !guard.can_transition_to(&next) {
            tracing::debug!("ignoring backend transition {:?} -> {:?}", *guard, next);
            return;
        }
        tracing::debug!("backend lifecycle {:?} -> {:?}", *guard, next);
        *guard = next;
    }

    /// Starts the backend described by `plan` and watches it until it exits.
    pub(crate) fn launch(
        &self,
        plan: LaunchPlan,
        env: BackendEnv,
        hooks: SupervisorHooks,
    ) -> Result<(), LaunchError> {
        if self.inner.child.lock().map_err(|_| LaunchError::LockPoisoned)?.is_some() {
            return Ok(());
        }

        let spec = Arc::new(LaunchSpec { plan, env, hooks });
        self.spawn_and_watch(&spec)
    }

    fn spawn_and_watch(&self, spec: &Arc<LaunchSpec>) -> Result<(), LaunchError> {
        // Held across the spawn so `stop` either finds this child or we see its flag.
        let mut slot = self.inner.child.lock().map_err(|_| LaunchError::LockPoisoned)?;
        if self.is_shutting_down() {
            append_shutdown_log("app is shutting down; backend not relaunched");
            return Ok(());
        }

        self.transition(BackendLifecycle::Starting);
        tracing::info!(
            "starting {} backend: {:?} (cwd {})",
            if spec.plan.packaged_mode { "packaged" } else { "development" },
            build_debug_command(&spec.plan),
            spec.plan.cwd.display()
        );

        let BackendProcess { child, control } =
            match backend_launch::spawn_backend(&spec.plan, &spec.env, &spec.hooks.output) {
                Ok(process) => process,
                Err(error) => {
                    self.transition(BackendLifecycle::Exited(None));
                    return Err(error);
                }
            };
        let pid = child.id();
        *slot = Some(child);
        drop(slot);
        if let Ok(mut current) = self.inner.control.lock() {
            *current = control;
        }
        self.transition(BackendLifecycle::Running);
        tracing::info!("backend process started with pid {pid}");

        let supervisor = self.clone();
        let spec = Arc::clone(spec);
        let watcher = thread::Builder::new()
            .name("backend-exit-watch".to_string())
            .spawn(move || supervisor.watch_until_exit(&spec));
        if let Err(error) = watcher {
            tracing::error!("failed to start backend exit watcher: {error}");
        }
        Ok(())
    }

    fn poll_exit(&self) -> Option<Option<BackendExit>> {
        let mut guard = self.inner.child.lock().ok()?;
        let child = guard.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                *guard = None;
                Some(Some(BackendExit::from_status(status)))
            }
            Ok(None) => Some(None),
            Err(error) => {
                tracing::error!("failed to poll backend process status: {error}");
                *guard = None;
                Some(Some(BackendExit {
                    code: None,
                    signal: None,
                }))
            }
        }
    }

    fn watch_until_exit(&self, spec: &Arc<LaunchSpec>) {
        let exit = loop {
            match self.poll_exit() {
                // Child was taken by `stop`, which reports the exit itself.
                None => return,
                Some(Some(exit)) => break exit,
                Some(None) => thread::sleep(Duration::from_millis(EXIT_WATCH_INTERVAL_MS)),
            }
        };
        self.handle_exit(spec, exit);
    }

    fn handle_exit(&self, spec: &Arc<LaunchSpec>, exit: BackendExit) {
        tracing::info!("Backend exited with {exit}");
        self.transition(BackendLifecycle::Exited(Some(exit)));

        let decision = decide_on_backend_exit(
            self.inner.policy,
            exit,
            self.restart_count(),
            self.is_shutting_down(),
        );
        match decision {
            ExitDecision::Ignore => {}
            ExitDecision::Restart { attempt } => {
                self.inner.restarts.store(attempt, Ordering::Release);
                tracing::warn!("restarting backend (attempt {attempt})");
                if let Err(error) = self.spawn_and_watch(spec) {
                    tracing::error!("Backend failed to restart: {error}");
                    (spec.hooks.on_quit)(exit.host_exit_code());
                }
            }
            ExitDecision::QuitApp { exit_code } => {
                append_shutdown_log(&format!(
                    "backend is gone; quitting with exit code {exit_code}"
                ));
                (spec.hooks.on_quit)(exit_code);
            }
        }
    }

    /// Stops the backend for app shutdown. Safe to call more than once.
    pub fn stop(&self) -> Option<StopOutcome> {
        self.inner.shutting_down.store(true, Ordering::Release);
        let mut child = match self.inner.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        }?;
        if let Ok(mut control) = self.inner.control.lock() {
            control.take();
        }

        let (outcome, status) =
            process_control::stop_child_process(&mut child, self.inner.shutdown_grace, append_shutdown_log);
        let exit = status.map(BackendExit::from_status);
        self.transition(BackendLifecycle::Exited(exit));
        append_shutdown_log(&format!(
            "backend stopped ({outcome:?}){}",
            exit.map(|exit| format!(": {exit}")).unwrap_or_default()
        ));
        Some(outcome)
    }
}
