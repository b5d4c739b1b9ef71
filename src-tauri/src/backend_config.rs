use std::{
    env,
    net::{Ipv4Addr, TcpListener},
    time::Duration,
};

use crate::{
    append_startup_log, backend_lifecycle::ExitPolicy, DEFAULT_BACKEND_PORT,
    DEFAULT_READY_TIMEOUT_MS, DEFAULT_RESTART_LIMIT, DEFAULT_SHUTDOWN_GRACE_MS,
    DEFAULT_STARTUP_DELAY_MS, BACKEND_PORT_CONFIG_ENV, EXIT_POLICY_ENV, READY_TIMEOUT_ENV,
    SHUTDOWN_GRACE_ENV, STARTUP_DELAY_ENV, STARTUP_MODE_ENV,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupGate {
    Probe { timeout: Duration },
    FixedDelay(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSetting {
    Fixed(u16),
    Negotiate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub port: PortSetting,
    pub startup_gate: StartupGate,
    pub shutdown_grace: Duration,
    pub exit_policy: ExitPolicy,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match read(BACKEND_PORT_CONFIG_ENV) {
            None => PortSetting::Fixed(DEFAULT_BACKEND_PORT),
            Some(raw) => parse_port_setting(&raw).unwrap_or_else(|| {
                append_startup_log(&format!(
                    "invalid {BACKEND_PORT_CONFIG_ENV}={raw}; using {DEFAULT_BACKEND_PORT}"
                ));
                PortSetting::Fixed(DEFAULT_BACKEND_PORT)
            }),
        };

        let ready_timeout = read_millis(read(READY_TIMEOUT_ENV), READY_TIMEOUT_ENV)
            .unwrap_or(DEFAULT_READY_TIMEOUT_MS);
        let startup_delay = read_millis(read(STARTUP_DELAY_ENV), STARTUP_DELAY_ENV)
            .unwrap_or(DEFAULT_STARTUP_DELAY_MS);
        let startup_gate = match read(STARTUP_MODE_ENV).as_deref() {
            Some(mode) if mode.eq_ignore_ascii_case("delay") => {
                StartupGate::FixedDelay(Duration::from_millis(startup_delay))
            }
            Some(mode) if !mode.eq_ignore_ascii_case("probe") => {
                append_startup_log(&format!(
                    "unknown {STARTUP_MODE_ENV}={mode}; using readiness probe"
                ));
                StartupGate::Probe {
                    timeout: Duration::from_millis(ready_timeout),
                }
            }
            _ => StartupGate::Probe {
                timeout: Duration::from_millis(ready_timeout),
            },
        };

        let shutdown_grace = Duration::from_millis(
            read_millis(read(SHUTDOWN_GRACE_ENV), SHUTDOWN_GRACE_ENV)
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE_MS),
        );

        let exit_policy = match read(EXIT_POLICY_ENV) {
            None => ExitPolicy::Terminate,
            Some(raw) => parse_exit_policy(&raw).unwrap_or_else(|| {
                append_startup_log(&format!(
                    "invalid {EXIT_POLICY_ENV}={raw}; backend exit will quit the app"
                ));
                ExitPolicy::Terminate
            }),
        };

        Self {
            port,
            startup_gate,
            shutdown_grace,
            exit_policy,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn read_millis(raw: Option<String>, key: &str) -> Option<u64> {
    let raw = raw?;
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            append_startup_log(&format!("invalid {key}={raw}; using default"));
            None
        }
    }
}

pub fn parse_port_setting(raw: &str) -> Option<PortSetting> {
    match raw.trim().parse::<u16>().ok()? {
        0 => Some(PortSetting::Negotiate),
        port => Some(PortSetting::Fixed(port)),
    }
}

pub fn parse_exit_policy(raw: &str) -> Option<ExitPolicy> {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.split_once(':') {
        None if lowered == "terminate" => Some(ExitPolicy::Terminate),
        None if lowered == "restart" => Some(ExitPolicy::Restart {
            max_restarts: DEFAULT_RESTART_LIMIT,
        }),
        Some(("restart", limit)) => limit
            .trim()
            .parse::<u32>()
            .ok()
            .map(|max_restarts| ExitPolicy::Restart { max_restarts }),
        _ => None,
    }
}

/// Turns the configured port into the concrete one handed to the backend.
pub fn resolve_port(setting: PortSetting) -> Result<u16, String> {
    match setting {
        PortSetting::Fixed(port) => Ok(port),
        PortSetting::Negotiate => {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
                .map_err(|error| format!("Failed to reserve a loopback port: {error}"))?;
            listener
                .local_addr()
                .map(|address| address.port())
                .map_err(|error| format!("Failed to read reserved port: {error}"))
        }
    }
}

pub fn backend_url_for_port(port: u16) -> String {
    format!("http://localhost:{port}/")
}
