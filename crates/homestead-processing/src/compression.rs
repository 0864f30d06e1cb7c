use bytes::Bytes;
use image::{DynamicImage, GenericImageView};

use crate::error::TransformError;

/// Lossy WebP encoder used for every delivered image.
pub struct WebpCompressor;

impl WebpCompressor {
    pub const MIME_TYPE: &'static str = "image/webp";
    pub const EXTENSION: &'static str = "webp";

    /// Encode at `quality` (0–100). Alpha is preserved.
    pub fn compress(img: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(TransformError::EmptyImage);
        }

        let rgba_img = img.to_rgba8();
        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder.encode(f32::from(quality.min(100)));

        if webp_data.is_empty() {
            return Err(TransformError::Encode(
                "WebP encoder produced no output".to_string(),
            ));
        }

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}
