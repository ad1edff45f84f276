#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// connected component labeling module.
pub mod connectivity;

/// exact Euclidean distance transform module.
pub mod distance_transform;

/// Error types used for morphological operations.
pub mod error;

/// hole filling for labeled volumes.
pub mod fill_holes;

/// single-step multi-label dilation and erosion.
pub mod label;

/// module containing parallelization utilities.
pub mod parallel;

/// Euclidean-ball dilation and erosion module.
pub mod spherical;

pub use error::MorphologyError;
