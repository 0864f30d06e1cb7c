use image::{imageops, DynamicImage};
use std::io::Cursor;

/// One geometric step needed to display an image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationOp {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
}

/// Image orientation operations (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the EXIF orientation tag (1–8). Returns 1 when absent or unreadable.
    pub fn read_exif_orientation(data: &[u8]) -> u32 {
        let mut cursor = Cursor::new(data);
        let exif = match exif::Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|v| (1..=8).contains(v))
            .unwrap_or(1)
    }

    /// Operations, in application order, that undo an EXIF orientation.
    ///
    /// Rotations are clockwise and applied before any flip.
    pub fn operations(orientation: u32) -> &'static [OrientationOp] {
        use OrientationOp::*;
        match orientation {
            2 => &[FlipHorizontal],
            3 => &[Rotate180],
            4 => &[FlipVertical],
            // transpose
            5 => &[Rotate90, FlipHorizontal],
            6 => &[Rotate90],
            // transverse
            7 => &[Rotate270, FlipHorizontal],
            8 => &[Rotate270],
            _ => &[],
        }
    }

    /// Apply EXIF orientation correction to an image
    pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> DynamicImage {
        let orientation = Self::read_exif_orientation(data);
        if orientation != 1 {
            tracing::debug!(orientation = orientation, "Applying EXIF orientation");
        }
        Self::apply(img, Self::operations(orientation))
    }

    pub fn apply(img: DynamicImage, ops: &[OrientationOp]) -> DynamicImage {
        ops.iter().fold(img, |img, op| match op {
            OrientationOp::Rotate90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
            OrientationOp::Rotate180 => {
                DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8()))
            }
            OrientationOp::Rotate270 => {
                DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8()))
            }
            OrientationOp::FlipHorizontal => {
                DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()))
            }
            OrientationOp::FlipVertical => {
                DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    /// 2x1 image: red at (0,0), blue at (1,0).
    fn two_pixel() -> DynamicImage {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn missing_exif_means_upright() {
        assert_eq!(ImageOrientation::read_exif_orientation(b""), 1);
        assert_eq!(ImageOrientation::read_exif_orientation(b"not an image"), 1);
        assert!(ImageOrientation::operations(1).is_empty());
        assert!(ImageOrientation::operations(0).is_empty());
        assert!(ImageOrientation::operations(9).is_empty());
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])));
        for orientation in [5, 6, 7, 8] {
            let out = ImageOrientation::apply(img.clone(), ImageOrientation::operations(orientation));
            assert_eq!(out.dimensions(), (2, 4), "orientation {}", orientation);
        }
        for orientation in [2, 3, 4] {
            let out = ImageOrientation::apply(img.clone(), ImageOrientation::operations(orientation));
            assert_eq!(out.dimensions(), (4, 2), "orientation {}", orientation);
        }
    }

    #[test]
    fn transpose_maps_first_row_to_first_column() {
        let out = ImageOrientation::apply(two_pixel(), ImageOrientation::operations(5));
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn transverse_maps_first_row_to_last_column_reversed() {
        let out = ImageOrientation::apply(two_pixel(), ImageOrientation::operations(7));
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(0, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn mirror_swaps_pixels() {
        let out = ImageOrientation::apply(two_pixel(), ImageOrientation::operations(2));
        assert_eq!(out.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }
}
