//! Transform engine - the fixed normalization pipeline for uploaded photos
//!
//! 1. Decode (format guessed from content)
//! 2. EXIF auto-orientation
//! 3. Downscale so neither side exceeds [`MAX_DIMENSION`] (never upscale)
//! 4. Encode as WebP at [`OUTPUT_QUALITY`]

use bytes::Bytes;
use homestead_core::models::TransformedImage;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

use crate::compression::WebpCompressor;
use crate::error::TransformError;
use crate::image::orientation::ImageOrientation;

pub const MAX_DIMENSION: u32 = 1920;
pub const OUTPUT_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct TransformEngine {
    max_dimension: u32,
    quality: u8,
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            quality: OUTPUT_QUALITY,
        }
    }
}

impl TransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Run the full pipeline on raw upload bytes.
    pub fn transform(&self, raw: &[u8]) -> Result<TransformedImage, TransformError> {
        let img = Self::decode(raw)?;
        let (src_width, src_height) = img.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(TransformError::EmptyImage);
        }

        let img = ImageOrientation::apply_exif_orientation(img, raw);
        let img = self.constrain(img);
        let (width, height) = img.dimensions();
        let bytes = WebpCompressor::compress(&img, self.quality)?;

        tracing::debug!(
            src_width = src_width,
            src_height = src_height,
            width = width,
            height = height,
            input_bytes = raw.len(),
            output_bytes = bytes.len(),
            "Image transformed"
        );

        Ok(TransformedImage {
            bytes,
            width,
            height,
            format: WebpCompressor::EXTENSION,
            quality: self.quality,
        })
    }

    /// Same as [`transform`](Self::transform) but off the async worker threads.
    /// Decoding and encoding are CPU-bound.
    pub async fn transform_blocking(&self, raw: Bytes) -> Result<TransformedImage, TransformError> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.transform(&raw))
            .await
            .map_err(|e| TransformError::Worker(e.to_string()))?
    }

    fn decode(raw: &[u8]) -> Result<DynamicImage, TransformError> {
        image::ImageReader::new(Cursor::new(raw))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| TransformError::Decode(e.to_string()))
    }

    /// Target size for a `width`x`height` image, or `None` when already in bounds.
    pub fn target_dimensions(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let longest = width.max(height);
        if longest <= self.max_dimension {
            return None;
        }

        let scale = f64::from(self.max_dimension) / f64::from(longest);
        let scaled = |side: u32| -> u32 {
            ((f64::from(side) * scale).round() as u32).clamp(1, self.max_dimension)
        };
        Some((scaled(width), scaled(height)))
    }

    fn constrain(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        match self.target_dimensions(width, height) {
            Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
            None => img,
        }
    }
}
