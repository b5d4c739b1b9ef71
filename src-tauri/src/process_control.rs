use std::{
    process::{Child, ExitStatus},
    thread,
    time::{Duration, Instant},
};

#[cfg(target_os = "windows")]
use std::process::{Command, Stdio};

const STOP_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    AlreadyExited,
    Graceful,
    Forced,
}

#[cfg(unix)]
fn request_graceful_stop(child: &mut Child) -> Result<(), String> {
    let pid = libc::pid_t::try_from(child.id())
        .map_err(|_| format!("pid {} out of range", child.id()))?;
    // SAFETY: kill(2) has no memory-safety preconditions; the pid belongs to a
    // child we have not reaped yet, so it cannot have been recycled.
    let result = unsafe { libc::kill(pid, libc::SIGTERM) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error().to_string())
    }
}

#[cfg(target_os = "windows")]
fn request_graceful_stop(child: &mut Child) -> Result<(), String> {
    Command::new("taskkill")
        .args(["/pid", &child.id().to_string(), "/t"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .status()
        .map(|_| ())
        .map_err(|error| format!("Failed to run 'taskkill': {error}"))
}

#[cfg(not(any(unix, target_os = "windows")))]
fn request_graceful_stop(_child: &mut Child) -> Result<(), String> {
    Err("graceful stop is not supported on this platform".to_string())
}

fn force_stop(child: &mut Child) {
    #[cfg(target_os = "windows")]
    {
        let _ = Command::new("taskkill")
            .args(["/pid", &child.id().to_string(), "/t", "/f"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .status();
    }

    let _ = child.kill();
}

fn wait_with_deadline(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(_) => return None,
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
    }
}

/// Asks the child to exit, then kills it once `grace` runs out.
///
/// Always reaps the child before returning.
pub fn stop_child_process<F>(child: &mut Child, grace: Duration, log: F) -> (StopOutcome, Option<ExitStatus>)
where
    F: Fn(&str),
{
    if let Ok(Some(status)) = child.try_wait() {
        return (StopOutcome::AlreadyExited, Some(status));
    }

    match request_graceful_stop(child) {
        Ok(()) => {
            if let Some(status) = wait_with_deadline(child, grace) {
                return (StopOutcome::Graceful, Some(status));
            }
            log(&format!(
                "backend pid {} still running after {}ms; forcing termination",
                child.id(),
                grace.as_millis()
            ));
        }
        Err(error) => log(&format!(
            "graceful stop of backend pid {} failed: {error}; forcing termination",
            child.id()
        )),
    }

    force_stop(child);
    (StopOutcome::Forced, child.wait().ok())
}
