pub const MAIN_WINDOW_LABEL: &str = "main";
pub const MAIN_WINDOW_TITLE: &str = "OpenClaw";
pub const MAIN_WINDOW_WIDTH: f64 = 1200.0;
pub const MAIN_WINDOW_HEIGHT: f64 = 800.0;

pub const DEFAULT_BACKEND_PORT: u16 = 3000;
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 3_000;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 5_000;
pub const DEFAULT_RESTART_LIMIT: u32 = 3;

pub const READINESS_PROBE_TIMEOUT_MS: u64 = 800;
pub const READINESS_POLL_INTERVAL_MS: u64 = 600;
pub const EXIT_WATCH_INTERVAL_MS: u64 = 250;

pub const DESKTOP_LOG_FILE: &str = "desktop.log";
pub const BACKEND_LOG_TARGET: &str = "backend";

// Read by the backend; names are part of its contract.
pub const BACKEND_PORT_ENV: &str = "PORT";
pub const BACKEND_CREDENTIAL_ENV: &str = "ELECTRON_API_KEY";
pub const BACKEND_HEADLESS_ENV: &str = "OPENCLAW_HEADLESS";
pub const BACKEND_RUN_AS_SCRIPT_ENV: &str = "ELECTRON_RUN_AS_NODE";

// Node picks up its IPC channel from these when started as a child.
pub const CONTROL_CHANNEL_FD_ENV: &str = "NODE_CHANNEL_FD";
pub const CONTROL_CHANNEL_MODE_ENV: &str = "NODE_CHANNEL_SERIALIZATION_MODE";
pub const CONTROL_CHANNEL_FD: i32 = 3;

pub const BACKEND_PORT_CONFIG_ENV: &str = "OPENCLAW_BACKEND_PORT";
pub const BACKEND_CMD_ENV: &str = "OPENCLAW_BACKEND_CMD";
pub const BACKEND_CWD_ENV: &str = "OPENCLAW_BACKEND_CWD";
pub const SOURCE_DIR_ENV: &str = "OPENCLAW_SOURCE_DIR";
pub const STARTUP_MODE_ENV: &str = "OPENCLAW_STARTUP_MODE";
pub const READY_TIMEOUT_ENV: &str = "OPENCLAW_BACKEND_READY_TIMEOUT_MS";
pub const STARTUP_DELAY_ENV: &str = "OPENCLAW_STARTUP_DELAY_MS";
pub const SHUTDOWN_GRACE_ENV: &str = "OPENCLAW_BACKEND_SHUTDOWN_GRACE_MS";
pub const EXIT_POLICY_ENV: &str = "OPENCLAW_BACKEND_EXIT_POLICY";
pub const ROOT_DIR_ENV: &str = "OPENCLAW_ROOT";

pub const BACKEND_ENTRYPOINT: &str = "openclaw.mjs";
pub const RUNTIME_MANIFEST_RESOURCE: &str = "backend/runtime-manifest.json";
pub const DEV_RUNTIME_CMD: &str = "node";
