#![deny(missing_docs)]
//! Volume types and traits for representing and manipulating dense 3D voxel data

/// dense 3D volume container.
pub mod volume;

/// Error types for the volume module.
pub mod error;

pub use crate::error::VolumeError;
pub use crate::volume::{LabelValue, Volume, VolumeSize, VoxelSpacing};
