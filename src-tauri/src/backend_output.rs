use std::{
    io::{self, BufRead, BufReader, Read},
    sync::Arc,
    thread::{self, JoinHandle},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStream {
    Stdout,
    Stderr,
}

impl BackendStream {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Stdout => "[Backend]",
            Self::Stderr => "[Backend Err]",
        }
    }
}

/// Receives every backend output line together with the stream it came from.
pub type OutputSink = Arc<dyn Fn(BackendStream, &str) + Send + Sync>;

/// Strips the line terminator, leaving the rest of the line untouched.
fn trim_line_ending(buffer: &[u8]) -> &[u8] {
    let buffer = buffer.strip_suffix(b"\n").unwrap_or(buffer);
    buffer.strip_suffix(b"\r").unwrap_or(buffer)
}

pub(crate) fn relay_lines<R: Read>(reader: R, stream: BackendStream, sink: &OutputSink) {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(trim_line_ending(&buffer));
                sink(stream, &line);
            }
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                tracing::warn!("stopped reading backend {stream:?}: {error}");
                break;
            }
        }
    }
}

pub(crate) fn spawn_line_relay<R>(
    reader: R,
    stream: BackendStream,
    sink: OutputSink,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    let name = match stream {
        BackendStream::Stdout => "backend-stdout",
        BackendStream::Stderr => "backend-stderr",
    };
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || relay_lines(reader, stream, &sink))
}
