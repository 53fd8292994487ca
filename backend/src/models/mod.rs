//! Domain models for field interpolation

pub mod fields;
pub mod grid;
pub mod partition;
pub mod request;

// Re-exports
pub use fields::{FieldName, Fields, FieldsError, FIELD_COUNT};
pub use grid::{Grid, GridError};
pub use partition::{Partition, PartitionError, PartitionPlan};
pub use request::{
    BinaryInfo, BinaryType, InterpolationRequest, DEFAULT_INTERPOLATION_OFFSET,
    DEFAULT_INTERPOLATION_ORDER, DEFAULT_RELATIVE_DR_SPACING,
};
