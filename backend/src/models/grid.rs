//! Grid - immutable 3D point cloud
//!
//! Three equal-length coordinate sequences; index `i` across `x`, `y`
//! and `z` is one point. Grids never change after construction, and
//! splitting produces new grids over disjoint contiguous ranges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::partition::{Partition, PartitionError, PartitionPlan};

/// Errors raised when constructing a grid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("coordinate lengths differ: x={x}, y={y}, z={z}")]
    LengthMismatch { x: usize, y: usize, z: usize },

    #[error("grid must contain at least one point")]
    Empty,
}

/// Ordered set of points on which fields are computed
///
/// # Example
/// ```
/// use fieldsplit_core_rs::Grid;
///
/// let grid = Grid::new(
///     vec![0.0, 1.0, 2.0],
///     vec![0.0, 0.0, 0.0],
///     vec![5.0, 5.0, 5.0],
/// ).unwrap();
/// assert_eq!(grid.len(), 3);
/// assert_eq!(grid.point(1), Some([1.0, 0.0, 5.0]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridParts")]
pub struct Grid {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

/// Unvalidated wire form; must mirror `Grid`'s field layout
#[derive(Deserialize)]
struct GridParts {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl TryFrom<GridParts> for Grid {
    type Error = GridError;

    fn try_from(parts: GridParts) -> Result<Self, Self::Error> {
        Grid::new(parts.x, parts.y, parts.z)
    }
}

impl Grid {
    /// Create a grid from its coordinate sequences
    ///
    /// # Errors
    ///
    /// - `LengthMismatch` if the three sequences differ in length
    /// - `Empty` if they are empty
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self, GridError> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(GridError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                z: z.len(),
            });
        }
        if x.is_empty() {
            return Err(GridError::Empty);
        }
        Ok(Self { x, y, z })
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false: grids hold at least one point
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Coordinates of point `i`, if in range
    pub fn point(&self, i: usize) -> Option<[f64; 3]> {
        Some([*self.x.get(i)?, self.y[i], self.z[i]])
    }

    /// Iterate over points as `[x, y, z]`
    pub fn points(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| [x, y, z])
    }

    /// Chunk `index` of `total_chunks` equal splits
    ///
    /// Chunks have `len / total_chunks` points; the last one also takes
    /// the remainder.
    ///
    /// # Errors
    ///
    /// Returns `PartitionError` unless `index < total_chunks <= len`.
    ///
    /// # Example
    /// ```
    /// use fieldsplit_core_rs::Grid;
    ///
    /// let coords: Vec<f64> = (0..10).map(f64::from).collect();
    /// let grid = Grid::new(coords.clone(), coords.clone(), coords).unwrap();
    ///
    /// let last = grid.split(2, 3).unwrap();
    /// assert_eq!(last.x(), &[6.0, 7.0, 8.0, 9.0]);
    /// ```
    pub fn split(&self, index: usize, total_chunks: usize) -> Result<Grid, PartitionError> {
        let partition = PartitionPlan::partition(self.len(), index, total_chunks)?;
        Ok(self.slice(&partition))
    }

    /// Copy of the points covered by `partition`
    ///
    /// # Panics
    ///
    /// Panics if the partition is empty or extends past the grid; plans
    /// built from this grid's length never do.
    pub(crate) fn slice(&self, partition: &Partition) -> Grid {
        let range = partition.range();
        assert!(
            !range.is_empty() && range.end <= self.len(),
            "partition {:?} does not fit a grid of {} points",
            range,
            self.len()
        );
        Grid {
            x: self.x[range.clone()].to_vec(),
            y: self.y[range.clone()].to_vec(),
            z: self.z[range].to_vec(),
        }
    }
}
