//! Process executor.
//!
//! Runs one external command, drains stdout and stderr concurrently into an
//! [`Emitter`], and reports how the process ended:
//! - each stream is read by its own task, so line order is kept per stream
//!   while the two streams interleave by arrival
//! - the terminal result is only reported after both readers have finished,
//!   so no trailing output is lost
//! - cancellation kills the child and reports [`ProcessResult::Cancelled`]
//!
//! Standard input is inherited so a child that prompts the user still works.

use crate::chunk::{Chunk, Emitter, StreamSource, clean_line};
use crate::error::{ExitDetail, StepError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long to wait for a stream reader after the process has ended.
///
/// A grandchild that inherited the pipe can keep it open after the child
/// exits; past this bound the reader is abandoned.
pub const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// A command line to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the caller's when `None`.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The command line as it would be typed, e.g. `pnpm add clsx`.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Starts processes. Implemented by [`SystemSpawner`]; tests substitute
/// their own to redirect programs.
pub trait ProcessSpawner: Send + Sync {
    /// Start the process with piped stdout/stderr and inherited stdin.
    fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Child>;
}

/// Spawns processes on the host with `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, spec: &CommandSpec) -> std::io::Result<Child> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = spec.cwd {
            cmd.current_dir(dir);
        }
        cmd.spawn()
    }
}

/// Terminal result of running one process.
#[derive(Debug)]
pub enum ProcessResult {
    Succeeded,
    /// Spawn failure, non-zero exit, or a failed wait.
    Failed(StepError),
    Cancelled,
}

impl ProcessResult {
    /// Collapse into the shape a step action returns.
    pub fn into_result(self) -> Result<(), StepError> {
        match self {
            ProcessResult::Succeeded => Ok(()),
            ProcessResult::Failed(err) => Err(err),
            ProcessResult::Cancelled => Err(StepError::Cancelled),
        }
    }
}

/// Runs commands through a [`ProcessSpawner`], streaming their output.
#[derive(Clone)]
pub struct ProcessExecutor {
    spawner: Arc<dyn ProcessSpawner>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new(Arc::new(SystemSpawner))
    }
}

impl ProcessExecutor {
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self { spawner }
    }

    /// Run `spec` to completion or cancellation.
    ///
    /// Echoes `$ <command line>` as a notice first. Every line the process
    /// writes reaches `emitter` before this returns.
    pub async fn run(
        &self,
        spec: &CommandSpec,
        cancel: &CancellationToken,
        emitter: &Emitter,
    ) -> ProcessResult {
        if cancel.is_cancelled() {
            return ProcessResult::Cancelled;
        }

        let command_line = spec.display();
        emitter.notice(format!("$ {}", command_line));

        let mut child = match self.spawner.spawn(spec) {
            Ok(child) => child,
            Err(source) => {
                info!(program = %spec.program, error = %source, "failed to spawn process");
                return ProcessResult::Failed(StepError::Spawn {
                    program: spec.program.clone(),
                    source,
                });
            }
        };

        debug!(
            program = %spec.program,
            pid = child.id().unwrap_or(0),
            cwd = ?spec.cwd,
            "process spawned"
        );

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(drain_stream(
                stdout,
                StreamSource::Stdout,
                emitter.clone(),
                cancel.clone(),
            ))
        });
        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(drain_stream(
                stderr,
                StreamSource::Stderr,
                emitter.clone(),
                cancel.clone(),
            ))
        });

        // Cancellation wins over an exit that races with it.
        let waited = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(program = %spec.program, "cancellation requested; killing process");
                if let Err(err) = child.kill().await {
                    debug!(
                        program = %spec.program,
                        error = %err,
                        "failed to kill cancelled process"
                    );
                }
                None
            }
            status = child.wait() => Some(status),
        };

        join_reader(stdout_task, StreamSource::Stdout, &command_line).await;
        join_reader(stderr_task, StreamSource::Stderr, &command_line).await;

        match waited {
            None => ProcessResult::Cancelled,
            Some(_) if cancel.is_cancelled() => {
                debug!(command = %command_line, "process exited after cancellation");
                ProcessResult::Cancelled
            }
            Some(Ok(status)) if status.success() => {
                debug!(command = %command_line, "process succeeded");
                ProcessResult::Succeeded
            }
            Some(Ok(status)) => {
                let detail = ExitDetail::from(status);
                info!(command = %command_line, exit_code = ?detail.code, "process failed");
                ProcessResult::Failed(StepError::ProcessExit {
                    command: command_line,
                    detail,
                })
            }
            Some(Err(err)) => ProcessResult::Failed(StepError::Io(err)),
        }
    }
}

/// Read `stream` line by line into `emitter` until end-of-stream or cancellation.
async fn drain_stream<R>(
    stream: R,
    source: StreamSource,
    emitter: Emitter,
    cancel: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut buf) => read,
            () = cancel.cancelled() => return Ok(()),
        };
        match read {
            Ok(0) => return Ok(()),
            Ok(_) => {
                let line = clean_line(&String::from_utf8_lossy(&buf));
                emitter.emit(Chunk::new(source, line));
            }
            Err(err) => {
                emitter.emit(Chunk::new(source, err.to_string()));
                return Err(err);
            }
        }
    }
}

async fn join_reader(
    task: Option<JoinHandle<std::io::Result<()>>>,
    source: StreamSource,
    command_line: &str,
) {
    let Some(mut task) = task else {
        return;
    };
    match timeout(READER_DRAIN_TIMEOUT, &mut task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => {
            warn!(command = %command_line, stream = ?source, error = %err, "stream read failed");
        }
        Ok(Err(err)) => {
            warn!(
                command = %command_line,
                stream = ?source,
                error = %err,
                "stream reader panicked"
            );
        }
        Err(_) => {
            warn!(
                command = %command_line,
                stream = ?source,
                "stream reader did not finish; abandoning"
            );
            task.abort();
        }
    }
}
