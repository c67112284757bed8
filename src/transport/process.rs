//! Child-process transport
//!
//! Each call writes the command (plus the `quit` terminator) to a temporary
//! buffer, starts the engine with that buffer as stdin and polls the child until
//! it exits or the timeout passes. Buffer and child are owned by one
//! [`Invocation`]; dropping it kills a child that is still running and deletes
//! the buffer, so every exit path cleans up.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use super::Transport;
use crate::error::{DriverError, Result};

/// Engine binary looked up on PATH when no explicit path is configured
pub const DEFAULT_BINARY: &str = "pardusdb";

/// Default per-call bound
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Line that ends the engine's REPL session
pub const TERMINATOR: &str = "quit";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Minimum wait for the reader threads once the child has exited
const DRAIN_GRACE: Duration = Duration::from_millis(50);

/// Runs the engine binary once per command
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    binary: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    scratch_dir: Option<PathBuf>,
}

impl ProcessTransport {
    /// Resolve the engine binary (explicit path, else PATH lookup)
    pub fn new(binary: Option<&Path>) -> Result<Self> {
        Ok(Self {
            binary: resolve_binary(binary)?,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            scratch_dir: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extra arguments passed to the engine on every invocation
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Directory for command buffers (system temp dir otherwise)
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command_buffer(&self, command: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pardus-cmd-").suffix(".sql");
        let mut buffer = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        writeln!(buffer, "{}", command)?;
        writeln!(buffer, "{}", TERMINATOR)?;
        buffer.flush()?;
        Ok(buffer)
    }

    fn spawn(&self, command: &str) -> Result<Invocation> {
        let buffer = self
            .command_buffer(command)
            .map_err(|e| DriverError::query(format!("failed to write command buffer: {}", e), command))?;
        let stdin = buffer
            .reopen()
            .map_err(|e| DriverError::query(format!("failed to reopen command buffer: {}", e), command))?;

        let child = Command::new(&self.binary)
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DriverError::ConnectionFailure(format!(
                    "failed to start {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        Ok(Invocation {
            child,
            _buffer: buffer,
            finished: false,
        })
    }
}

impl Transport for ProcessTransport {
    fn execute(&self, command: &str) -> Result<String> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        tracing::debug!(
            binary = %self.binary.display(),
            bytes = command.len(),
            "running engine command"
        );

        let mut invocation = self.spawn(command)?;
        let stdout = drain(invocation.child.stdout.take());
        let stderr = drain(invocation.child.stderr.take());

        let status = match invocation.wait(deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "engine timed out, killing child"
                );
                // Reader threads are abandoned; dropping the invocation kills and reaps
                return Err(DriverError::Timeout {
                    command: command.to_string(),
                    timeout: self.timeout,
                });
            }
            Err(e) => {
                return Err(DriverError::query(
                    format!("failed to wait for engine: {}", e),
                    command,
                ))
            }
        };

        // A grandchild can keep the pipes open after the engine exits
        let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
        let (Some(mut output), Some(diagnostics)) =
            (collect(stdout, drain_deadline), collect(stderr, drain_deadline))
        else {
            tracing::warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "engine exited but its output pipes stayed open"
            );
            return Err(DriverError::Timeout {
                command: command.to_string(),
                timeout: self.timeout,
            });
        };
        output.push_str(&diagnostics);
        tracing::debug!(
            status = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_bytes = output.len(),
            "engine finished"
        );
        Ok(output)
    }
}

/// Command buffer and engine child, released together
struct Invocation {
    child: Child,
    _buffer: NamedTempFile,
    finished: bool,
}

impl Invocation {
    /// `Ok(None)` when the deadline passed before the child exited
    fn wait(&mut self, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.finished = true;
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// `None` when the pipe is still open at the deadline; the reader is abandoned
fn collect(pipe: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(rx) = pipe else {
        return Some(String::new());
    };
    let bytes = match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => bytes,
        Err(RecvTimeoutError::Timeout) => return None,
        Err(RecvTimeoutError::Disconnected) => Vec::new(),
    };
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Locate the engine binary and check it can be executed
pub fn resolve_binary(explicit: Option<&Path>) -> Result<PathBuf> {
    let path = match explicit {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(name) => which::which(name).map_err(|_| {
            DriverError::ConnectionFailure(format!(
                "engine binary not found at: {}",
                name.display()
            ))
        })?,
        None => which::which(DEFAULT_BINARY).map_err(|_| {
            DriverError::ConnectionFailure(format!(
                "{} binary not found in PATH; install the engine or set PARDUS_BINARY",
                DEFAULT_BINARY
            ))
        })?,
    };

    if !is_executable(&path) {
        return Err(DriverError::ConnectionFailure(format!(
            "engine binary is not executable: {}",
            path.display()
        )));
    }
    Ok(path)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell(script: &str, scratch: &TempDir) -> ProcessTransport {
        ProcessTransport::new(Some(Path::new("/bin/sh")))
            .unwrap()
            .with_args(["-c", script])
            .with_scratch_dir(scratch.path())
    }

    fn scratch_is_empty(scratch: &TempDir) -> bool {
        std::fs::read_dir(scratch.path()).unwrap().next().is_none()
    }

    #[test]
    fn test_command_and_terminator_reach_stdin() {
        let scratch = TempDir::new().unwrap();
        let transport = shell("cat", &scratch);
        let output = transport.execute("SHOW TABLES").unwrap();
        assert_eq!(output, "SHOW TABLES\nquit\n");
        assert!(scratch_is_empty(&scratch));
    }

    #[test]
    fn test_stderr_follows_stdout_and_exit_code_is_ignored() {
        let scratch = TempDir::new().unwrap();
        let transport = shell("echo out; echo diag >&2; exit 3", &scratch);
        let output = transport.execute("SHOW TABLES").unwrap();
        assert_eq!(output, "out\ndiag\n");
    }

    #[test]
    fn test_timeout_kills_child_and_removes_buffer() {
        let scratch = TempDir::new().unwrap();
        let transport = shell("exec sleep 5", &scratch).with_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let err = transport.execute("SHOW TABLES").unwrap_err();
        assert!(matches!(err, DriverError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(scratch_is_empty(&scratch));
    }

    #[test]
    fn test_inherited_pipes_do_not_outlive_timeout() {
        let scratch = TempDir::new().unwrap();
        let transport =
            shell("sleep 5 & echo early", &scratch).with_timeout(Duration::from_millis(300));

        let started = Instant::now();
        let err = transport.execute("SHOW TABLES").unwrap_err();
        assert!(matches!(err, DriverError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(scratch_is_empty(&scratch));
    }

    #[test]
    fn test_missing_binary_is_connection_failure() {
        let err = ProcessTransport::new(Some(Path::new("/nonexistent/pardusdb"))).unwrap_err();
        assert!(matches!(err, DriverError::ConnectionFailure(_)));
    }

    #[test]
    fn test_non_executable_binary_is_connection_failure() {
        let file = NamedTempFile::new().unwrap();
        let err = resolve_binary(Some(file.path())).unwrap_err();
        assert!(matches!(err, DriverError::ConnectionFailure(_)));
    }
}
