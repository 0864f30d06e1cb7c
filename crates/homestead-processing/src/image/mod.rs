//! Image processing module
//!
//! - EXIF orientation (orientation)
//! - Decode → orient → downscale → encode pipeline (transformer)

pub mod orientation;
pub mod transformer;

pub use orientation::{ImageOrientation, OrientationOp};
pub use transformer::{TransformEngine, MAX_DIMENSION, OUTPUT_QUALITY};
