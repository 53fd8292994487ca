//! Interpolation request - the value object shipped to every worker
//!
//! A request names the binary system, the grid to evaluate on, the
//! source data file and three tuning parameters of the interpolation.
//! Per-partition requests are identical to the parent request except for the
//! grid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use super::grid::Grid;
use super::partition::Partition;

/// Default extrapolation offset near the compact objects
pub const DEFAULT_INTERPOLATION_OFFSET: f64 = 0.0;

/// Default polynomial order of the near-horizon extrapolation
pub const DEFAULT_INTERPOLATION_ORDER: i32 = 8;

/// Default radial spacing, relative to the excision radius
pub const DEFAULT_RELATIVE_DR_SPACING: f64 = 0.3;

/// Kind of compact binary described by the source data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryType {
    /// Neutron-star binary
    Bns,
    /// Black-hole binary
    Bbh,
    /// Mixed black-hole / neutron-star binary
    Bhns,
}

impl BinaryType {
    pub const ALL: [BinaryType; 3] = [BinaryType::Bns, BinaryType::Bbh, BinaryType::Bhns];

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryType::Bns => "bns",
            BinaryType::Bbh => "bbh",
            BinaryType::Bhns => "bhns",
        }
    }

    /// Whether the system carries matter (at least one neutron star)
    pub fn has_matter(self) -> bool {
        !matches!(self, BinaryType::Bbh)
    }
}

impl fmt::Display for BinaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown binary type '{0}' (expected bns, bbh or bhns)")]
pub struct UnknownBinaryType(pub String);

impl FromStr for BinaryType {
    type Err = UnknownBinaryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bns" => Ok(BinaryType::Bns),
            "bbh" => Ok(BinaryType::Bbh),
            "bhns" => Ok(BinaryType::Bhns),
            _ => Err(UnknownBinaryType(s.to_string())),
        }
    }
}

/// Basic parameters of a binary, as read from its info file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryInfo {
    /// Mass of the first compact object
    pub mass1: f64,
    /// Mass of the second compact object
    pub mass2: f64,
    /// x position of the first object's center
    pub position_x1: f64,
    /// x position of the second object's center
    pub position_x2: f64,
}

/// One interpolation job
///
/// # Example
/// ```
/// use fieldsplit_core_rs::{BinaryType, Grid, InterpolationRequest};
///
/// let grid = Grid::new(vec![0.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0]).unwrap();
/// let request = InterpolationRequest::new(BinaryType::Bbh, grid, "bbh.info")
///     .with_interpolation_order(6);
///
/// assert_eq!(request.interpolation_order, 6);
/// assert_eq!(request.grid.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationRequest {
    pub binary_type: BinaryType,
    pub grid: Grid,
    /// Path to the binary's info file
    pub info_filename: PathBuf,
    pub interpolation_offset: f64,
    pub interpolation_order: i32,
    pub relative_dr_spacing: f64,
}

impl InterpolationRequest {
    /// Create a request with default tuning parameters
    pub fn new(binary_type: BinaryType, grid: Grid, info_filename: impl Into<PathBuf>) -> Self {
        Self {
            binary_type,
            grid,
            info_filename: info_filename.into(),
            interpolation_offset: DEFAULT_INTERPOLATION_OFFSET,
            interpolation_order: DEFAULT_INTERPOLATION_ORDER,
            relative_dr_spacing: DEFAULT_RELATIVE_DR_SPACING,
        }
    }

    pub fn with_interpolation_offset(mut self, offset: f64) -> Self {
        self.interpolation_offset = offset;
        self
    }

    pub fn with_interpolation_order(mut self, order: i32) -> Self {
        self.interpolation_order = order;
        self
    }

    pub fn with_relative_dr_spacing(mut self, spacing: f64) -> Self {
        self.relative_dr_spacing = spacing;
        self
    }

    /// Same request restricted to the points of `partition`
    pub(crate) fn for_partition(&self, partition: &Partition) -> Self {
        Self {
            binary_type: self.binary_type,
            grid: self.grid.slice(partition),
            info_filename: self.info_filename.clone(),
            interpolation_offset: self.interpolation_offset,
            interpolation_order: self.interpolation_order,
            relative_dr_spacing: self.relative_dr_spacing,
        }
    }
}
