//! fieldsplit - worker process and operator CLI
//!
//! `fieldsplit interpolate` is the worker contract: one encoded request on
//! stdin, one encoded field set on stdout, diagnostics on stderr, non-zero
//! exit on any failure. The other subcommands are operator conveniences.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use fieldsplit_core_rs::config::{TIMEOUT_ENV, WORKER_ENV};
use fieldsplit_core_rs::logging::init_tracing;
use fieldsplit_core_rs::BinaryType;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

pub const BACKEND_ENV: &str = "FIELDSPLIT_BACKEND";

#[derive(Parser, Debug)]
#[command(name = "fieldsplit", version, about = "Parallel interpolation of binary initial data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Worker mode: read a request frame on stdin, write fields on stdout.
    Interpolate {
        /// Interpolation backend.
        #[arg(long, value_enum, env = BACKEND_ENV, default_value_t = Backend::default())]
        backend: Backend,
    },
    /// Print the masses and positions recorded in an info file as JSON.
    Info {
        /// Kind of binary the info file describes.
        #[arg(long, value_parser = parse_binary_type)]
        kind: BinaryType,
        /// Info file to read.
        file: PathBuf,
        /// Interpolation backend.
        #[arg(long, value_enum, env = BACKEND_ENV, default_value_t = Backend::default())]
        backend: Backend,
    },
    /// Split a request across worker processes and write the merged fields.
    Run {
        /// Number of worker processes (one partition each).
        #[arg(long, short = 'w')]
        workers: usize,
        /// Request frame to read.
        #[arg(long)]
        request: PathBuf,
        /// Where to write the merged fields frame.
        #[arg(long)]
        output: PathBuf,
        /// Worker executable (defaults to this binary).
        #[arg(long, env = WORKER_ENV)]
        worker_program: Option<PathBuf>,
        /// Kill workers still running after this many seconds.
        #[arg(long, env = TIMEOUT_ENV)]
        timeout_secs: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// libfuka_exporter (requires the `native` build feature)
    Native,
    /// Closed-form stand-in for pipeline testing
    Synthetic,
}

/// Synthetic output is never produced unless asked for by name.
impl Default for Backend {
    fn default() -> Self {
        Backend::Native
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Native => write!(f, "native"),
            Backend::Synthetic => write!(f, "synthetic"),
        }
    }
}

fn parse_binary_type(value: &str) -> Result<BinaryType, String> {
    value.parse().map_err(|err| format!("{err}"))
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Interpolate { backend } => commands::interpolate(backend),
        Command::Info {
            kind,
            file,
            backend,
        } => commands::info(backend, kind, &file),
        Command::Run {
            workers,
            request,
            output,
            worker_program,
            timeout_secs,
        } => commands::run(commands::RunArgs {
            workers,
            request,
            output,
            worker_program,
            timeout_secs,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fieldsplit failed");
            ExitCode::FAILURE
        }
    }
}
