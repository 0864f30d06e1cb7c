//! Homestead image processing
//!
//! Normalizes uploaded photos into a single delivery format: decode, apply EXIF
//! orientation, bound the dimensions, encode as WebP.

pub mod compression;
pub mod error;
pub mod image;

pub use error::TransformError;
pub use image::{ImageOrientation, TransformEngine};
