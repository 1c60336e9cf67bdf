//! ChatReader trait and its concrete read strategies.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::decode::decode_payload;
use crate::error::SourceError;

/// One way of reading the host's chat window. Enables mock injection for testing.
pub trait ChatReader: Send + Sync {
    /// Short label reported in status output.
    fn name(&self) -> &str;

    /// Read the currently visible line records, oldest first.
    fn read(&self) -> Result<Vec<Value>, SourceError>;
}

impl<T: ChatReader + ?Sized> ChatReader for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self) -> Result<Vec<Value>, SourceError> {
        (**self).read()
    }
}

// ─── CommandReader ──────────────────────────────────────────────────

/// Upper bound on one run of the host helper.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

const WAIT_POLL: Duration = Duration::from_millis(10);

/// Runs a host helper program and decodes its stdout. A helper that outlives
/// its timeout is killed and the read fails with [`SourceError::Timeout`].
pub struct CommandReader {
    program: String,
    args: Vec<String>,
    label: String,
    timeout: Duration,
}

impl CommandReader {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            label: format!("command `{program}`"),
            program,
            args: Vec::new(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ChatReader for CommandReader {
    fn name(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<Vec<Value>, SourceError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SourceError::Unavailable(format!("cannot run {}: {e}", self.program)))?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let Some(status) = wait_with_deadline(&mut child, self.timeout)? else {
            let _ = child.kill();
            let _ = child.wait();
            // Pipe readers are left detached: a grandchild may still hold the pipes.
            return Err(SourceError::Timeout(self.timeout));
        };

        let stdout = collect(stdout);
        if !status.success() {
            let stderr = collect(stderr);
            return Err(SourceError::CommandFailed(format!(
                "exit code {}: {}",
                status.code().unwrap_or(-1),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(decode_payload(&String::from_utf8_lossy(&stdout)))
    }
}

/// Poll the child until it exits or `timeout` elapses (`Ok(None)`).
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<ExitStatus>, SourceError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

// ─── FileReader ─────────────────────────────────────────────────────

/// Reads a chat dump file the host keeps up to date.
pub struct FileReader {
    path: PathBuf,
    label: String,
}

impl FileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: format!("file {}", path.display()),
            path,
        }
    }
}

impl ChatReader for FileReader {
    fn name(&self) -> &str {
        &self.label
    }

    fn read(&self) -> Result<Vec<Value>, SourceError> {
        let bytes = std::fs::read(&self.path)?;
        Ok(decode_payload(&String::from_utf8_lossy(&bytes)))
    }
}
