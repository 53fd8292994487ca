//! Subcommand handlers

use fieldsplit_core_rs::config::{parse_timeout, TIMEOUT_ENV};
use fieldsplit_core_rs::interpolation::{InterpolationError, Interpolator, SyntheticInterpolator};
use fieldsplit_core_rs::orchestrator::{OrchestrationError, Orchestrator, OrchestratorConfig};
use fieldsplit_core_rs::protocol::{self, ProtocolError};
use fieldsplit_core_rs::worker::{ProcessWorker, WorkerCommand};
use fieldsplit_core_rs::{BinaryType, ConfigError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::Backend;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("backend `native` is not available: rebuild with `--features native`")]
    NativeUnavailable,

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot locate own executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot write output: {0}")]
    Io(#[from] io::Error),
}

fn open_backend(backend: Backend) -> Result<Box<dyn Interpolator>, CliError> {
    match backend {
        Backend::Synthetic => Ok(Box::new(SyntheticInterpolator::new())),
        #[cfg(feature = "native")]
        Backend::Native => Ok(Box::new(
            fieldsplit_core_rs::interpolation::NativeInterpolator::new(),
        )),
        #[cfg(not(feature = "native"))]
        Backend::Native => Err(CliError::NativeUnavailable),
    }
}

/// Worker mode: stdin request frame in, stdout fields frame out
pub fn interpolate(backend: Backend) -> Result<(), CliError> {
    let interpolator = open_backend(backend)?;
    let request = protocol::read_request(io::stdin().lock())?;
    debug!(
        backend = interpolator.name(),
        points = request.grid.len(),
        kind = %request.binary_type,
        "request received"
    );

    let fields = interpolator.interpolate(&request)?;

    let mut stdout = io::stdout().lock();
    protocol::write_fields(&mut stdout, &fields)?;
    stdout.flush()?;
    Ok(())
}

pub fn info(backend: Backend, kind: BinaryType, file: &Path) -> Result<(), CliError> {
    let info = open_backend(backend)?.binary_info(file, kind)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

#[derive(Debug)]
pub struct RunArgs {
    pub workers: usize,
    pub request: PathBuf,
    pub output: PathBuf,
    pub worker_program: Option<PathBuf>,
    pub timeout_secs: Option<String>,
}

pub fn run(args: RunArgs) -> Result<(), CliError> {
    let program = match args.worker_program {
        Some(program) => program,
        None => std::env::current_exe().map_err(CliError::CurrentExe)?,
    };
    let mut config = OrchestratorConfig::new(args.workers);
    if let Some(secs) = &args.timeout_secs {
        config = config.with_timeout(parse_timeout(TIMEOUT_ENV, secs)?);
    }

    let reader = File::open(&args.request).map_err(|source| CliError::File {
        path: args.request.clone(),
        source,
    })?;
    let request = protocol::read_request(BufReader::new(reader))?;

    let orchestrator = Orchestrator::new(
        ProcessWorker::new(WorkerCommand::for_program(program)),
        config,
    );
    let fields = orchestrator.orchestrate(&request)?;

    let writer = File::create(&args.output).map_err(|source| CliError::File {
        path: args.output.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(writer);
    protocol::write_fields(&mut writer, &fields)?;
    writer.flush()?;

    info!(
        points = fields.n_points(),
        output = %args.output.display(),
        "merged fields written"
    );
    Ok(())
}
