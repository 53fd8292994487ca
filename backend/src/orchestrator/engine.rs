//! Orchestrator Engine
//!
//! Splits a request's grid into partitions, runs one worker per
//! partition concurrently, and merges the partial fields back into a
//! single result in partition order.
//!
//! # Architecture
//!
//! ```text
//! orchestrate(request):
//! 1. Build the partition plan (worker_count chunks over the grid)
//! 2. Derive one request per partition (same parameters, sub-grid)
//! 3. Launch every worker on its own thread
//! 4. Each worker writes its outcome into its own result slot
//! 5. Join all workers (the only synchronization point)
//! 6. Surface the lowest-index failure, or
//! 7. Concatenate the slots in partition order
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use fieldsplit_core_rs::orchestrator::{Orchestrator, OrchestratorConfig};
//! use fieldsplit_core_rs::worker::{ProcessWorker, WorkerCommand};
//! use fieldsplit_core_rs::{BinaryType, Grid, InterpolationRequest};
//!
//! let coords: Vec<f64> = (0..1_000).map(|i| i as f64 * 0.01).collect();
//! let grid = Grid::new(coords.clone(), coords.clone(), coords).unwrap();
//! let request = InterpolationRequest::new(BinaryType::Bns, grid, "bns.info");
//!
//! let orchestrator = Orchestrator::new(
//!     ProcessWorker::new(WorkerCommand::default()),
//!     OrchestratorConfig::new(8),
//! );
//! let fields = orchestrator.orchestrate(&request).unwrap();
//! assert_eq!(fields.n_points(), 1_000);
//! ```

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::models::{Fields, FieldsError, InterpolationRequest, PartitionError, PartitionPlan};
use crate::worker::{WorkerError, WorkerFailure, WorkerLauncher};

// ============================================================================
// Configuration Types
// ============================================================================

/// Orchestration parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Number of partitions, and of concurrently running workers
    pub worker_count: usize,

    /// Wall-clock budget for the whole orchestration (None = unbounded)
    ///
    /// Workers still running when it expires are killed and the
    /// orchestration fails with a timeout.
    pub timeout: Option<Duration>,
}

impl OrchestratorConfig {
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why an orchestration produced no result
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("invalid partitioning: {0}")]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("worker thread for partition {partition} panicked")]
    WorkerPanicked { partition: usize },

    #[error("cannot merge partial results: {0}")]
    Merge(#[from] FieldsError),
}

impl OrchestrationError {
    /// Partition whose worker caused the failure, if any
    pub fn failed_partition(&self) -> Option<usize> {
        match self {
            OrchestrationError::Worker(err) => Some(err.ordinal),
            OrchestrationError::WorkerPanicked { partition } => Some(*partition),
            _ => None,
        }
    }
}

type Slot = Option<Result<Fields, WorkerError>>;

// ============================================================================
// Orchestrator
// ============================================================================

/// Fans a request out to `worker_count` workers and merges the results
pub struct Orchestrator<L: WorkerLauncher> {
    launcher: L,
    config: OrchestratorConfig,
}

impl<L: WorkerLauncher> Orchestrator<L> {
    pub fn new(launcher: L, config: OrchestratorConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Interpolate `request` across all workers
    ///
    /// # Errors
    ///
    /// - `Partition` if `worker_count` is zero or exceeds the grid size
    /// - `Worker` for the lowest-index worker that failed; no partial
    ///   result is ever returned
    /// - `WorkerPanicked` if a launcher panicked
    /// - `Worker` with `LengthMismatch` if a worker answered with a point
    ///   count other than its partition's
    pub fn orchestrate(&self, request: &InterpolationRequest) -> Result<Fields, OrchestrationError> {
        let plan = PartitionPlan::new(request.grid.len(), self.config.worker_count)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("orchestrate", %run_id, workers = plan.len(), points = plan.n_points());
        let _entered = span.enter();

        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);
        info!(kind = %request.binary_type, "dispatching partitions");

        // One slot per partition; each worker writes only its own index.
        let slots: Mutex<Vec<Slot>> = Mutex::new((0..plan.len()).map(|_| None).collect());

        thread::scope(|scope| {
            let handles: Vec<_> = plan
                .partitions()
                .iter()
                .map(|partition| {
                    let chunk = request.for_partition(partition);
                    let partition = *partition;
                    let (slots, launcher, span) = (&slots, &self.launcher, span.clone());
                    scope.spawn(move || {
                        let _entered = span.enter();
                        debug!(
                            partition = partition.index,
                            offset = partition.offset,
                            points = partition.len,
                            "worker launched"
                        );
                        let outcome = launcher.launch(partition.index, &chunk, deadline);
                        match &outcome {
                            Ok(_) => debug!(partition = partition.index, "worker finished"),
                            Err(err) => warn!(partition = partition.index, error = %err, "worker failed"),
                        }
                        slots.lock().unwrap_or_else(PoisonError::into_inner)[partition.index] =
                            Some(outcome);
                    })
                })
                .collect();

            // Joining explicitly keeps a panicking launcher from
            // propagating out of the scope; its slot stays empty.
            for handle in handles {
                let _ = handle.join();
            }
        });

        let slots = slots.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut parts = Vec::with_capacity(slots.len());
        for (partition, slot) in plan.partitions().iter().zip(slots) {
            match slot {
                Some(Ok(fields)) if fields.n_points() != partition.len => {
                    let failure = WorkerFailure::LengthMismatch {
                        expected: partition.len,
                        actual: fields.n_points(),
                    };
                    return Err(WorkerError::new(partition.index, failure).into());
                }
                Some(Ok(fields)) => parts.push(fields),
                Some(Err(err)) => return Err(err.into()),
                None => {
                    return Err(OrchestrationError::WorkerPanicked {
                        partition: partition.index,
                    })
                }
            }
        }

        let merged = Fields::concat(parts)?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "all partitions merged"
        );
        Ok(merged)
    }
}

/// One-shot convenience over [`Orchestrator::orchestrate`]
pub fn orchestrate<L: WorkerLauncher>(
    launcher: L,
    request: &InterpolationRequest,
    worker_count: usize,
) -> Result<Fields, OrchestrationError> {
    Orchestrator::new(launcher, OrchestratorConfig::new(worker_count)).orchestrate(request)
}
