use std::{
    fs,
    process::{Child, Command, Stdio},
    sync::Arc,
};

use crate::{
    backend_control::ControlChannel,
    backend_output::{self, BackendStream, OutputSink},
    launch_plan::build_debug_command,
    run_credential::RunCredential,
    LaunchError, LaunchPlan, BACKEND_CREDENTIAL_ENV, BACKEND_HEADLESS_ENV, BACKEND_PORT_ENV,
    BACKEND_RUN_AS_SCRIPT_ENV,
};

/// Variables layered over the inherited environment of the backend.
#[derive(Debug, Clone)]
pub struct BackendEnv {
    port: u16,
    credential: RunCredential,
}

impl BackendEnv {
    pub fn new(port: u16, credential: RunCredential) -> Self {
        Self { port, credential }
    }

    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        vec![
            (BACKEND_PORT_ENV, self.port.to_string()),
            (BACKEND_CREDENTIAL_ENV, self.credential.expose().to_string()),
            (BACKEND_HEADLESS_ENV, "true".to_string()),
            (BACKEND_RUN_AS_SCRIPT_ENV, "1".to_string()),
        ]
    }
}

pub(crate) fn build_backend_command(plan: &LaunchPlan, env: &BackendEnv) -> Command {
    let mut command = Command::new(&plan.cmd);
    command
        .args(&plan.args)
        .current_dir(&plan.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env.overrides() {
        command.env(key, value);
    }
    command
}

pub(crate) struct BackendProcess {
    pub child: Child,
    pub control: Option<ControlChannel>,
}

/// Spawns the backend and starts relaying its output into `sink`.
pub(crate) fn spawn_backend(
    plan: &LaunchPlan,
    env: &BackendEnv,
    sink: &OutputSink,
) -> Result<BackendProcess, LaunchError> {
    if !plan.cwd.as_os_str().is_empty() && !plan.cwd.exists() {
        fs::create_dir_all(&plan.cwd).map_err(|source| LaunchError::WorkingDirectory {
            path: plan.cwd.clone(),
            source,
        })?;
    }

    let mut command = build_backend_command(plan, env);
    #[cfg(unix)]
    let pending = match crate::backend_control::PendingControl::attach(&mut command) {
        Ok(pending) => Some(pending),
        Err(error) => {
            tracing::warn!("backend control channel unavailable: {error}");
            None
        }
    };

    let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
        command: build_debug_command(plan),
        source,
    })?;

    #[cfg(unix)]
    let control = pending.and_then(|pending| match pending.open() {
        Ok(channel) => Some(channel),
        Err(error) => {
            tracing::warn!("failed to open backend control channel: {error}");
            None
        }
    });
    #[cfg(not(unix))]
    let control = None;

    if let Some(stdout) = child.stdout.take() {
        if let Err(error) =
            backend_output::spawn_line_relay(stdout, BackendStream::Stdout, Arc::clone(sink))
        {
            tracing::warn!("failed to start backend stdout relay: {error}");
        }
    }
    if let Some(stderr) = child.stderr.take() {
        if let Err(error) =
            backend_output::spawn_line_relay(stderr, BackendStream::Stderr, Arc::clone(sink))
        {
            tracing::warn!("failed to start backend stderr relay: {error}");
        }
    }

    Ok(BackendProcess { child, control })
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::OsStr,
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use super::*;

    fn test_env() -> BackendEnv {
        BackendEnv::new(
            4100,
            RunCredential::generate().expect("randomness should be available"),
        )
    }

    fn env_value<'a>(command: &'a Command, key: &str) -> Option<&'a OsStr> {
        command
            .get_envs()
            .find(|(name, _)| *name == OsStr::new(key))
            .and_then(|(_, value)| value)
    }

    #[test]
    fn command_carries_port_credential_and_mode_flags() {
        let env = test_env();
        let plan = LaunchPlan {
            cmd: "node".to_string(),
            args: vec!["openclaw.mjs".to_string()],
            cwd: PathBuf::from("/tmp"),
            packaged_mode: false,
        };
        let command = build_backend_command(&plan, &env);

        assert_eq!(env_value(&command, "PORT"), Some(OsStr::new("4100")));
        assert_eq!(
            env_value(&command, "ELECTRON_API_KEY"),
            Some(OsStr::new(env.credential.expose()))
        );
        assert_eq!(env_value(&command, "OPENCLAW_HEADLESS"), Some(OsStr::new("true")));
        assert_eq!(env_value(&command, "ELECTRON_RUN_AS_NODE"), Some(OsStr::new("1")));
        assert_eq!(command.get_program(), OsStr::new("node"));
        assert_eq!(
            command.get_args().collect::<Vec<_>>(),
            vec![OsStr::new("openclaw.mjs")]
        );
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let plan = LaunchPlan {
            cmd: "openclaw-backend-that-does-not-exist".to_string(),
            args: vec!["--serve".to_string()],
            cwd: std::env::temp_dir(),
            packaged_mode: false,
        };
        let sink: OutputSink = Arc::new(|_: BackendStream, _: &str| {});

        match spawn_backend(&plan, &test_env(), &sink) {
            Err(LaunchError::Spawn { command, .. }) => assert_eq!(
                command,
                vec!["openclaw-backend-that-does-not-exist", "--serve"]
            ),
            Err(other) => panic!("expected spawn error, got {other:?}"),
            Ok(backend) => panic!("spawned unexpectedly as pid {}", backend.child.id()),
        }
    }

    #[cfg(unix)]
    #[test]
    fn backend_sees_the_injected_credential_and_inherits_host_env() {
        let env = test_env();
        let plan = LaunchPlan {
            cmd: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf '%s\n' "$ELECTRON_API_KEY"; printf '%s\n' "${PATH:+inherited}" >&2"#
                    .to_string(),
            ],
            cwd: std::env::temp_dir(),
            packaged_mode: false,
        };
        let lines = Arc::new(Mutex::new(Vec::<(BackendStream, String)>::new()));
        let captured = Arc::clone(&lines);
        let sink: OutputSink = Arc::new(move |stream: BackendStream, line: &str| {
            captured
                .lock()
                .expect("sink lock")
                .push((stream, line.to_string()));
        });

        let mut backend = spawn_backend(&plan, &env, &sink).expect("sh should spawn");
        assert!(backend.control.is_some());
        backend.child.wait().expect("sh should exit");
        // Relay threads drain the pipes after exit.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while lines.lock().expect("lines").len() < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        let lines = lines.lock().expect("lines");
        assert!(lines.contains(&(BackendStream::Stdout, env.credential.expose().to_string())));
        assert!(lines.contains(&(BackendStream::Stderr, "inherited".to_string())));
    }
}
