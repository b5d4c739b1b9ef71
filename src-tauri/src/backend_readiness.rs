use std::{
    net::{TcpStream, ToSocketAddrs},
    thread,
    time::{Duration, Instant},
};

use crate::{backend_config::StartupGate, READINESS_POLL_INTERVAL_MS, READINESS_PROBE_TIMEOUT_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Ready,
    Announced,
    DelayElapsed,
    TimedOut,
    BackendExited,
}

pub fn ping_backend(port: u16, timeout: Duration) -> bool {
    let timeout = timeout.max(Duration::from_millis(50));
    let addrs = match ("localhost", port).to_socket_addrs() {
        Ok(addrs) => addrs.collect::<Vec<_>>(),
        Err(_) => return false,
    };
    addrs
        .iter()
        .any(|address| TcpStream::connect_timeout(address, timeout).is_ok())
}

/// Blocks until the window may open according to `gate`.
///
/// `announced_ready` reports a ready message from the control channel, which
/// ends the wait before the port answers. `backend_alive` is consulted between
/// probes so a backend that dies while starting ends the wait early.
pub fn wait_for_backend<F, R>(
    port: u16,
    gate: StartupGate,
    backend_alive: F,
    announced_ready: R,
) -> ReadinessOutcome
where
    F: Fn() -> bool,
    R: Fn() -> bool,
{
    match gate {
        StartupGate::FixedDelay(delay) => {
            thread::sleep(delay);
            ReadinessOutcome::DelayElapsed
        }
        StartupGate::Probe { timeout } => {
            let start_time = Instant::now();
            loop {
                if announced_ready() {
                    return ReadinessOutcome::Announced;
                }
                if ping_backend(port, Duration::from_millis(READINESS_PROBE_TIMEOUT_MS)) {
                    return ReadinessOutcome::Ready;
                }
                if !backend_alive() {
                    return ReadinessOutcome::BackendExited;
                }
                if start_time.elapsed() >= timeout {
                    return ReadinessOutcome::TimedOut;
                }
                thread::sleep(Duration::from_millis(READINESS_POLL_INTERVAL_MS));
            }
        }
    }
}
