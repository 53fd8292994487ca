//! Partition plan - contiguous index ranges over a grid
//!
//! A grid of `N` points is split into `k` chunks. Every chunk has
//! `N / k` points, except the last which also absorbs the remainder
//! `N % k`.
//!
//! # Critical Invariants
//!
//! 1. **Coverage**: the partitions cover `[0, N)` exactly once, in order
//! 2. **Non-empty**: every partition holds at least one point (`k <= N`)
//! 3. **Determinism**: the same `(N, k)` always yields the same plan

use std::ops::Range;
use thiserror::Error;

/// Errors raised when a grid cannot be partitioned as requested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitionError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("cannot split {points} point(s) across {workers} workers")]
    TooManyWorkers { workers: usize, points: usize },

    #[error("partition index {index} out of range for {chunks} chunk(s)")]
    IndexOutOfRange { index: usize, chunks: usize },
}

/// One contiguous slice of a grid assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    /// Partition ordinal (0-indexed); also the merge position
    pub index: usize,
    /// First point covered by this partition
    pub offset: usize,
    /// Number of points covered
    pub len: usize,
}

impl Partition {
    /// Index range of the full grid covered by this partition
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Ordered list of partitions covering a grid exactly once
///
/// # Example
/// ```
/// use fieldsplit_core_rs::PartitionPlan;
///
/// let plan = PartitionPlan::new(10, 3).unwrap();
/// let sizes: Vec<usize> = plan.partitions().iter().map(|p| p.len).collect();
/// let offsets: Vec<usize> = plan.partitions().iter().map(|p| p.offset).collect();
/// assert_eq!(sizes, vec![3, 3, 4]);
/// assert_eq!(offsets, vec![0, 3, 6]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    n_points: usize,
    partitions: Vec<Partition>,
}

impl PartitionPlan {
    /// Build the plan for `n_chunks` partitions over `n_points` points
    ///
    /// # Errors
    ///
    /// - `NoWorkers` if `n_chunks == 0`
    /// - `TooManyWorkers` if `n_chunks > n_points`
    pub fn new(n_points: usize, n_chunks: usize) -> Result<Self, PartitionError> {
        validate(n_points, n_chunks)?;
        let partitions = (0..n_chunks)
            .map(|index| chunk(n_points, index, n_chunks))
            .collect();
        Ok(Self {
            n_points,
            partitions,
        })
    }

    /// Compute a single partition without materializing the whole plan
    ///
    /// # Errors
    ///
    /// Same as [`PartitionPlan::new`], plus `IndexOutOfRange` if
    /// `index >= n_chunks`.
    pub fn partition(
        n_points: usize,
        index: usize,
        n_chunks: usize,
    ) -> Result<Partition, PartitionError> {
        validate(n_points, n_chunks)?;
        if index >= n_chunks {
            return Err(PartitionError::IndexOutOfRange {
                index,
                chunks: n_chunks,
            });
        }
        Ok(chunk(n_points, index, n_chunks))
    }

    /// Partitions in merge order
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Number of partitions (the worker count)
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    /// Always false: a valid plan has at least one partition
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Total number of points covered
    pub fn n_points(&self) -> usize {
        self.n_points
    }
}

fn validate(n_points: usize, n_chunks: usize) -> Result<(), PartitionError> {
    if n_chunks == 0 {
        return Err(PartitionError::NoWorkers);
    }
    if n_chunks > n_points {
        return Err(PartitionError::TooManyWorkers {
            workers: n_chunks,
            points: n_points,
        });
    }
    Ok(())
}

fn chunk(n_points: usize, index: usize, n_chunks: usize) -> Partition {
    let chunk_size = n_points / n_chunks;
    let offset = index * chunk_size;
    let len = if index == n_chunks - 1 {
        chunk_size + n_points % n_chunks
    } else {
        chunk_size
    };
    Partition { index, offset, len }
}
