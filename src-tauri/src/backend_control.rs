use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde_json::Value;

#[cfg(unix)]
use std::{
    io::{self, BufRead, BufReader},
    os::unix::{io::AsRawFd, net::UnixStream, process::CommandExt},
    process::Command,
    thread,
};

#[cfg(unix)]
use crate::{CONTROL_CHANNEL_FD, CONTROL_CHANNEL_FD_ENV, CONTROL_CHANNEL_MODE_ENV};

#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// The backend accepts connections.
    Ready,
    /// Bookkeeping traffic of the Node runtime itself (`NODE_*` commands).
    Internal,
    Other(Value),
}

/// Parses one newline-delimited JSON message sent with `process.send`.
pub fn parse_control_message(line: &str) -> Option<ControlMessage> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;
    let is_internal = value
        .get("cmd")
        .and_then(Value::as_str)
        .is_some_and(|cmd| cmd.starts_with("NODE_"));
    if is_internal {
        return Some(ControlMessage::Internal);
    }
    let is_ready = value.as_str() == Some("ready")
        || value.get("type").and_then(Value::as_str) == Some("ready");
    Some(if is_ready {
        ControlMessage::Ready
    } else {
        ControlMessage::Other(value)
    })
}

/// Host end of the structured channel to one backend run.
///
/// Dropping it closes the channel, which the backend sees as `disconnect`.
#[cfg_attr(not(unix), allow(dead_code))]
pub struct ControlChannel {
    ready: Arc<AtomicBool>,
    #[cfg(unix)]
    _host: UnixStream,
}

impl ControlChannel {
    pub fn announced_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// A socket pair whose child end is mapped onto the backend's channel fd.
#[cfg(unix)]
pub(crate) struct PendingControl {
    host: UnixStream,
    child_end: UnixStream,
}

#[cfg(unix)]
impl PendingControl {
    pub(crate) fn attach(command: &mut Command) -> io::Result<Self> {
        let (host, child_end) = UnixStream::pair()?;
        let child_fd = child_end.as_raw_fd();
        command
            .env(CONTROL_CHANNEL_FD_ENV, CONTROL_CHANNEL_FD.to_string())
            .env(CONTROL_CHANNEL_MODE_ENV, "json");

        // SAFETY: only dup2/fcntl run between fork and exec, both async-signal-safe.
        unsafe {
            command.pre_exec(move || {
                if child_fd == CONTROL_CHANNEL_FD {
                    if libc::fcntl(child_fd, libc::F_SETFD, 0) == -1 {
                        return Err(io::Error::last_os_error());
                    }
                } else if libc::dup2(child_fd, CONTROL_CHANNEL_FD) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
        Ok(Self { host, child_end })
    }

    /// Call once the backend is spawned; starts reading its messages.
    pub(crate) fn open(self) -> io::Result<ControlChannel> {
        drop(self.child_end);
        let reader = self.host.try_clone()?;
        let ready = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ready);
        thread::Builder::new()
            .name("backend-control".to_string())
            .spawn(move || read_control_messages(reader, &flag))?;
        Ok(ControlChannel {
            ready,
            _host: self.host,
        })
    }
}

#[cfg(unix)]
fn read_control_messages(stream: UnixStream, ready: &AtomicBool) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                tracing::debug!("backend control channel closed: {error}");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_control_message(&line) {
            Some(ControlMessage::Ready) => {
                if !ready.swap(true, Ordering::AcqRel) {
                    tracing::info!("backend announced readiness over the control channel");
                }
            }
            Some(ControlMessage::Internal) => {}
            Some(ControlMessage::Other(value)) => {
                tracing::debug!("backend control message: {value}");
            }
            None => tracing::warn!("ignoring malformed backend control message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_is_recognized_in_both_shapes() {
        assert_eq!(
            parse_control_message(r#"{"type":"ready","port":3000}"#),
            Some(ControlMessage::Ready)
        );
        assert_eq!(parse_control_message(r#""ready""#), Some(ControlMessage::Ready));
    }

    #[test]
    fn runtime_bookkeeping_and_unknown_messages_are_kept_apart() {
        assert_eq!(
            parse_control_message(r#"{"cmd":"NODE_HANDLE_ACK"}"#),
            Some(ControlMessage::Internal)
        );
        assert_eq!(
            parse_control_message(r#"{"type":"status","uptime":4}"#),
            Some(ControlMessage::Other(serde_json::json!({"type": "status", "uptime": 4})))
        );
        assert_eq!(parse_control_message("not json"), None);
    }

    #[cfg(unix)]
    #[test]
    fn backend_can_announce_readiness_on_the_channel_fd() {
        use std::{
            process::Stdio,
            time::{Duration, Instant},
        };

        let mut command = Command::new("sh");
        command
            .args([
                "-c",
                r#"[ "$NODE_CHANNEL_FD" = 3 ] && [ "$NODE_CHANNEL_SERIALIZATION_MODE" = json ] && printf '{"type":"ready"}\n' >&3"#,
            ])
            .stdin(Stdio::null());
        let pending = PendingControl::attach(&mut command).expect("socket pair");
        let mut child = command.spawn().expect("spawn sh");
        let channel = pending.open().expect("open control channel");

        let status = child.wait().expect("sh should exit");
        assert!(status.success());
        let deadline = Instant::now() + Duration::from_secs(5);
        while !channel.announced_ready() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(channel.announced_ready());
    }
}
