use serde::Deserialize;
use std::{io, path::PathBuf};

use crate::{
    backend_config::{self, BackendConfig},
    backend_launch::BackendEnv,
    backend_supervisor::BackendSupervisor,
    run_credential::{CredentialError, RunCredential},
};

#[derive(Debug, Deserialize)]
pub(crate) struct RuntimeManifest {
    pub(crate) runtime: Option<String>,
    pub(crate) entrypoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchPlan {
    pub(crate) cmd: String,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
    pub(crate) packaged_mode: bool,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LaunchError {
    #[error("invalid custom backend command: {0}")]
    InvalidCommand(String),
    #[error("custom backend command is empty")]
    EmptyCommand,
    #[error("failed to read backend manifest {path}: {source}")]
    ManifestRead { path: PathBuf, source: io::Error },
    #[error("failed to parse backend manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("packaged backend runtime is missing: {0}")]
    MissingRuntime(PathBuf),
    #[error("packaged backend entrypoint is missing: {0}")]
    MissingEntrypoint(PathBuf),
    #[error("cannot locate the OpenClaw source directory; set OPENCLAW_SOURCE_DIR or OPENCLAW_BACKEND_CMD")]
    SourceNotFound,
    #[error("failed to prepare backend working directory {path}: {source}")]
    WorkingDirectory { path: PathBuf, source: io::Error },
    #[error("failed to spawn backend process {command:?}: {source}")]
    Spawn {
        command: Vec<String>,
        source: io::Error,
    },
    #[error("backend process lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("{0}")]
    Port(String),
}

/// Everything the shell knows about the current run.
///
/// Built once before the Tauri app starts and handed to it as managed state;
/// every component reaches the credential, port and backend process through
/// this value instead of globals.
#[derive(Debug)]
pub(crate) struct DesktopState {
    credential: RunCredential,
    pub(crate) port: u16,
    pub(crate) backend_url: String,
    pub(crate) config: BackendConfig,
    pub(crate) supervisor: BackendSupervisor,
}

impl DesktopState {
    pub(crate) fn bootstrap(config: BackendConfig) -> Result<Self, BootstrapError> {
        let credential = RunCredential::generate()?;
        let port = backend_config::resolve_port(config.port).map_err(BootstrapError::Port)?;
        Ok(Self::with_parts(credential, port, config))
    }

    pub(crate) fn with_parts(credential: RunCredential, port: u16, config: BackendConfig) -> Self {
        let supervisor = BackendSupervisor::new(config.exit_policy, config.shutdown_grace);
        Self {
            credential,
            port,
            backend_url: backend_config::backend_url_for_port(port),
            config,
            supervisor,
        }
    }

    /// Environment handed to the backend for this run.
    pub(crate) fn backend_env(&self) -> BackendEnv {
        BackendEnv::new(self.port, self.credential.clone())
    }

    /// Value answered to the dashboard through the desktop bridge.
    pub(crate) fn bridge_credential(&self) -> &str {
        self.credential.expose()
    }
}
