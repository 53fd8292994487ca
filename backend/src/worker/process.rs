//! Subprocess worker
//!
//! Each launch spawns a fresh `fieldsplit interpolate` process, streams
//! the encoded request to its stdin, collects the encoded fields from
//! its stdout and leaves stderr attached to ours so operators see the
//! worker's diagnostics.
//!
//! stdin and stdout are serviced on their own threads so neither pipe
//! can fill up and stall the child while we wait for it.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{WorkerError, WorkerFailure, WorkerLauncher};
use crate::models::{Fields, InterpolationRequest};
use crate::protocol;

/// Program name looked up on `PATH` when none is configured
pub const DEFAULT_WORKER_PROGRAM: &str = "fieldsplit";

/// Action argument understood by the worker binary
pub const INTERPOLATE_ACTION: &str = "interpolate";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How to start one worker process
///
/// # Example
/// ```
/// use fieldsplit_core_rs::worker::WorkerCommand;
///
/// let command = WorkerCommand::for_program("/opt/fieldsplit/bin/fieldsplit")
///     .env("FIELDSPLIT_BACKEND", "synthetic");
/// assert_eq!(command.args, vec!["interpolate".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Extra environment variables on top of the inherited environment
    pub envs: Vec<(String, String)>,
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self::for_program(DEFAULT_WORKER_PROGRAM)
    }
}

impl WorkerCommand {
    /// Run `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Run `program interpolate`, the worker contract of the CLI
    pub fn for_program(program: impl Into<PathBuf>) -> Self {
        Self::new(program).arg(INTERPOLATE_ACTION)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }
}

/// Launches every worker as an isolated child process
#[derive(Debug, Clone, Default)]
pub struct ProcessWorker {
    command: WorkerCommand,
}

impl ProcessWorker {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &WorkerCommand {
        &self.command
    }

    fn run(
        &self,
        ordinal: usize,
        request: &InterpolationRequest,
        deadline: Option<Instant>,
    ) -> Result<Fields, WorkerFailure> {
        let payload = protocol::encode_request(request)?;

        let mut child = self
            .command
            .to_command()
            .spawn()
            .map_err(|source| WorkerFailure::Spawn {
                program: self.command.program.display().to_string(),
                source,
            })?;
        debug!(ordinal, pid = child.id(), bytes = payload.len(), "worker spawned");

        let writer = spawn_stdin_writer(ordinal, &mut child, payload)
            .map_err(|err| abandon(&mut child, err.into()))?;
        let reader = spawn_stdout_reader(ordinal, &mut child)
            .map_err(|err| abandon(&mut child, err.into()))?;

        // On timeout the pipe threads are detached: a grandchild holding
        // the pipes open must not block us.
        let status = wait_for_exit(&mut child, deadline)?;
        let write_result = join_pipe(writer);
        let output = join_pipe(reader);

        if let Some(code) = status.code() {
            if code != 0 {
                return Err(WorkerFailure::ExitStatus { code });
            }
        } else {
            return Err(WorkerFailure::Signaled);
        }
        match write_result {
            // A worker may answer without draining its input; the output
            // is validated below either way.
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!(ordinal, "worker closed stdin early");
            }
            other => other?,
        }

        let fields = protocol::decode_fields(&output?)?;
        let expected = request.grid.len();
        if fields.n_points() != expected {
            return Err(WorkerFailure::LengthMismatch {
                expected,
                actual: fields.n_points(),
            });
        }
        Ok(fields)
    }
}

impl WorkerLauncher for ProcessWorker {
    fn launch(
        &self,
        ordinal: usize,
        request: &InterpolationRequest,
        deadline: Option<Instant>,
    ) -> Result<Fields, WorkerError> {
        self.run(ordinal, request, deadline)
            .map_err(|failure| WorkerError::new(ordinal, failure))
    }
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("worker {name} not captured"))
}

fn spawn_stdin_writer(
    ordinal: usize,
    child: &mut Child,
    payload: Vec<u8>,
) -> io::Result<JoinHandle<io::Result<()>>> {
    let mut stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
    thread::Builder::new()
        .name(format!("worker-{ordinal}-stdin"))
        .spawn(move || {
            stdin.write_all(&payload)?;
            stdin.flush()
            // Dropping stdin closes the pipe and signals EOF.
        })
}

fn spawn_stdout_reader(
    ordinal: usize,
    child: &mut Child,
) -> io::Result<JoinHandle<io::Result<Vec<u8>>>> {
    let mut stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    thread::Builder::new()
        .name(format!("worker-{ordinal}-stdout"))
        .spawn(move || {
            let mut output = Vec::new();
            stdout.read_to_end(&mut output)?;
            Ok(output)
        })
}

fn join_pipe<T>(handle: JoinHandle<io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "pipe thread panicked")))
}

fn wait_for_exit(child: &mut Child, deadline: Option<Instant>) -> Result<ExitStatus, WorkerFailure> {
    let Some(deadline) = deadline else {
        return child.wait().map_err(|err| abandon(child, err.into()));
    };
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(err) => return Err(abandon(child, err.into())),
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(abandon(child, WorkerFailure::TimedOut));
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Kill and reap a child we are giving up on, then hand back `failure`
fn abandon(child: &mut Child, failure: WorkerFailure) -> WorkerFailure {
    if let Err(err) = child.kill() {
        // Already exited: reaping below still applies.
        debug!(pid = child.id(), error = %err, "kill on abandoned worker failed");
    }
    if let Err(err) = child.wait() {
        warn!(pid = child.id(), error = %err, "failed to reap abandoned worker");
    }
    failure
}
