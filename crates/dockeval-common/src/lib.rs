//! Shared geometry types and errors used across the dockeval crates.

pub mod error;
pub mod entities;

// Re-export commonly used types
pub use entities::{
    BoundingBox, FailureReason, PointCloud, Point3, PoseEvaluation, SearchRegion,
    StructureFormat, FAILURE_SENTINEL,
};
pub use error::{DockEvalError, Result};
