//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::command::ControlCommand;

/// A control command that replays canned replies and records its arguments.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scripted {
    replies: Arc<Mutex<VecDeque<Result<String, io::ErrorKind>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Scripted {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, stdout: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(stdout.to_owned()));
        self
    }

    pub(crate) fn fail(self, kind: io::ErrorKind) -> Self {
        self.replies.lock().unwrap().push_back(Err(kind));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ControlCommand for Scripted {
    fn run(&self, args: &[&str]) -> io::Result<String> {
        self.calls.lock().unwrap().push(args.join(" "));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(stdout)) => Ok(stdout),
            Some(Err(kind)) => Err(io::Error::from(kind)),
            None => Ok(String::new()),
        }
    }
}

#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a subscriber that records every event, returning its output.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf(Arc::new(Mutex::new(Vec::new())));
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buf.0.lock().unwrap()).into_owned();
    (value, logs)
}
