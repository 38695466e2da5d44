//! A checker child process and the state needed to stream its output.
//!
//! [`ProcessHandle`] reads stdout and stderr as they become ready instead of
//! draining one before the other, so a child that fills one pipe while the
//! parent waits on the other cannot deadlock the pair. Once the child exits,
//! a single [`drain`](ProcessHandle::drain) collects whatever it wrote after
//! the last poll.

use std::io::Read;
use std::process::{Child, ChildStderr, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ProcessError;
use crate::lines::LineBuffer;
use crate::readiness::{self, Descriptor};

/// Tracing target for process operations.
const PROCESS_TARGET: &str = "checkmate_process::handle";

/// Size of a single non-blocking read after readiness.
const READ_CHUNK: usize = 4096;

/// Default bound on a single readiness wait.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Complete lines collected by one [`ProcessHandle::poll`] or
/// [`ProcessHandle::drain`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputBatch {
    /// Lines read from the child's stdout.
    pub stdout: Vec<String>,
    /// Lines read from the child's stderr.
    pub stderr: Vec<String>,
}

impl OutputBatch {
    /// Returns whether neither stream produced a line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// A running checker process with buffered, line-oriented output.
///
/// The child's stdin is connected to the null device. The handle is the
/// sole owner of both pipes; each is closed as soon as it reaches
/// end-of-file.
///
/// # Example
///
/// ```no_run
/// use std::process::Command;
/// use checkmate_process::ProcessHandle;
///
/// let mut command = Command::new("pyflakes");
/// command.arg("module.py");
/// let mut handle = ProcessHandle::spawn(command)?;
/// while let Some(batch) = handle.read_lines()? {
///     for line in &batch.stdout {
///         println!("{line}");
///     }
/// }
/// let status = handle.wait()?;
/// # let _ = status;
/// # Ok::<(), checkmate_process::ProcessError>(())
/// ```
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    stdout_lines: LineBuffer,
    stderr_lines: LineBuffer,
    status: Option<ExitStatus>,
    drained: bool,
    poll_interval: Duration,
}

impl ProcessHandle {
    /// Spawns `command` with stdout and stderr piped.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] if the program cannot be started, or
    /// [`ProcessError::MissingPipe`] if a pipe was not captured.
    pub fn spawn(mut command: Command) -> Result<Self, ProcessError> {
        let program = command.get_program().to_string_lossy().into_owned();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            target: PROCESS_TARGET,
            program = %program,
            args = ?command.get_args().collect::<Vec<_>>(),
            "spawning checker process"
        );

        let mut child = command.spawn().map_err(|err| ProcessError::Spawn {
            program: program.clone(),
            source: Arc::new(err),
        })?;

        let Some(stdout) = child.stdout.take() else {
            abandon(&mut child);
            return Err(ProcessError::MissingPipe {
                program,
                stream: "stdout",
            });
        };
        let Some(stderr) = child.stderr.take() else {
            abandon(&mut child);
            return Err(ProcessError::MissingPipe {
                program,
                stream: "stderr",
            });
        };

        debug!(
            target: PROCESS_TARGET,
            program = %program,
            pid = child.id(),
            "checker process spawned"
        );

        Ok(Self {
            program,
            child,
            stdout: Some(stdout),
            stderr: Some(stderr),
            stdout_lines: LineBuffer::new(),
            stderr_lines: LineBuffer::new(),
            status: None,
            drained: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Sets the bound used by [`read_lines`](Self::read_lines) for each
    /// readiness wait.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the program name the handle was spawned with.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns whether [`drain`](Self::drain) has completed.
    #[must_use]
    pub const fn is_drained(&self) -> bool {
        self.drained
    }

    /// Returns the child's exit status, or `None` while it is still running.
    ///
    /// Never blocks. Once observed, the status is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Status`] if the status query fails.
    pub fn status(&mut self) -> Result<Option<ExitStatus>, ProcessError> {
        if self.status.is_none() {
            self.status = self
                .child
                .try_wait()
                .map_err(|err| ProcessError::Status {
                    source: Arc::new(err),
                })?;
            if let Some(status) = self.status {
                debug!(
                    target: PROCESS_TARGET,
                    program = %self.program,
                    ?status,
                    "checker process exited"
                );
            }
        }
        Ok(self.status)
    }

    /// Waits up to `timeout` for output and returns the lines it completed.
    ///
    /// Each ready pipe is read once. Text after the last newline is kept and
    /// prefixed to the next read of that pipe.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Wait`] if the readiness wait fails or
    /// [`ProcessError::Read`] if a ready pipe cannot be read.
    pub fn poll(&mut self, timeout: Duration) -> Result<OutputBatch, ProcessError> {
        let descriptors: [Option<Descriptor>; 2] = [
            self.stdout.as_ref().map(readiness::descriptor),
            self.stderr.as_ref().map(readiness::descriptor),
        ];
        let [stdout_ready, stderr_ready] = readiness::wait_readable(descriptors, timeout)
            .map_err(|err| ProcessError::Wait {
                source: Arc::new(err),
            })?;

        let mut batch = OutputBatch::default();
        if stdout_ready {
            batch.stdout = read_available(&mut self.stdout, &mut self.stdout_lines, "stdout")?;
        }
        if stderr_ready {
            batch.stderr = read_available(&mut self.stderr, &mut self.stderr_lines, "stderr")?;
        }
        Ok(batch)
    }

    /// Reads both pipes to end-of-file and returns every remaining line,
    /// including unterminated fragments.
    ///
    /// Intended to run once, after [`status`](Self::status) reports that the
    /// child has exited.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::AlreadyDrained`] on a second call, or
    /// [`ProcessError::Read`] if a pipe cannot be read.
    pub fn drain(&mut self) -> Result<OutputBatch, ProcessError> {
        if self.drained {
            return Err(ProcessError::AlreadyDrained);
        }

        let stdout = drain_stream(&mut self.stdout, &mut self.stdout_lines, "stdout")?;
        let stderr = drain_stream(&mut self.stderr, &mut self.stderr_lines, "stderr")?;
        self.drained = true;

        debug!(
            target: PROCESS_TARGET,
            program = %self.program,
            stdout_lines = stdout.len(),
            stderr_lines = stderr.len(),
            "drained checker output"
        );

        Ok(OutputBatch { stdout, stderr })
    }

    /// Returns the next batch of output, or `None` once the output has been
    /// drained.
    ///
    /// Polls while the child runs and drains exactly once after it exits.
    /// Every call after the drain returns `None`.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`status`](Self::status),
    /// [`poll`](Self::poll) and [`drain`](Self::drain).
    pub fn read_lines(&mut self) -> Result<Option<OutputBatch>, ProcessError> {
        if self.drained {
            return Ok(None);
        }
        if self.status()?.is_none() {
            return self.poll(self.poll_interval).map(Some);
        }
        self.drain().map(Some)
    }

    /// Blocks until the child exits and returns its status.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Status`] if waiting fails.
    pub fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().map_err(|err| ProcessError::Status {
            source: Arc::new(err),
        })?;
        self.status = Some(status);
        Ok(status)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.status.is_none() {
            warn!(
                target: PROCESS_TARGET,
                program = %self.program,
                "dropping running checker process, killing it"
            );
            abandon(&mut self.child);
        }
    }
}

/// Formats an exit status for display: the exit code, or the terminating
/// signal on Unix.
#[must_use]
pub fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {signal}");
        }
    }
    String::from("unknown")
}

fn abandon(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}

fn read_available<R: Read>(
    stream: &mut Option<R>,
    lines: &mut LineBuffer,
    name: &'static str,
) -> Result<Vec<String>, ProcessError> {
    let Some(reader) = stream.as_mut() else {
        return Ok(Vec::new());
    };

    let mut chunk = [0_u8; READ_CHUNK];
    match reader.read(&mut chunk) {
        Ok(0) => {
            // End-of-file: close the pipe so it is not polled again.
            *stream = None;
            Ok(Vec::new())
        }
        Ok(read) => Ok(lines.push(chunk.get(..read).unwrap_or_default())),
        Err(err) if err.kind() == std::io::ErrorKind::Interrupted => Ok(Vec::new()),
        Err(err) => Err(ProcessError::read(name, err)),
    }
}

fn drain_stream<R: Read>(
    stream: &mut Option<R>,
    lines: &mut LineBuffer,
    name: &'static str,
) -> Result<Vec<String>, ProcessError> {
    let mut collected = Vec::new();
    if let Some(mut reader) = stream.take() {
        let mut remaining = Vec::new();
        reader
            .read_to_end(&mut remaining)
            .map_err(|err| ProcessError::read(name, err))?;
        collected = lines.push(&remaining);
    }
    collected.extend(lines.finish());
    Ok(collected)
}
