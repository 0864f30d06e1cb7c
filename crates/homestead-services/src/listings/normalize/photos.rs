use serde_json::Value;

use super::{as_text, first_text};

/// The upstream photo layouts we know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoShape {
    /// `originalPhotos: [{mixedSources: {jpeg: [{url, width}]}}]`
    OriginalPhotoVariants,
    /// `photos: [{mixedSources: {jpeg: [{url, width}]}}]`
    PhotoVariants,
    /// `responsivePhotos: [{url}]`
    ResponsivePhotoObjects,
    /// `photos: [{url}]`
    PhotoObjects,
    /// `photos: ["https://..."]`
    PhotoUrls,
    /// `images: ["https://..."]`
    ImageUrls,
    /// `hiResImageLink` or `imgSrc`
    SingleImage,
}

type Extractor = fn(&Value) -> Vec<String>;

/// Priority order. The first shape that yields any URL wins.
const PHOTO_EXTRACTORS: [(PhotoShape, Extractor); 7] = [
    (PhotoShape::OriginalPhotoVariants, |p| largest_variants(p, "originalPhotos")),
    (PhotoShape::PhotoVariants, |p| largest_variants(p, "photos")),
    (PhotoShape::ResponsivePhotoObjects, |p| object_urls(p, "responsivePhotos")),
    (PhotoShape::PhotoObjects, |p| object_urls(p, "photos")),
    (PhotoShape::PhotoUrls, |p| url_strings(p, "photos")),
    (PhotoShape::ImageUrls, |p| url_strings(p, "images")),
    (PhotoShape::SingleImage, |p| {
        first_text(p, &["hiResImageLink", "imgSrc"]).into_iter().collect()
    }),
];

/// Photo URLs from a listing payload, with the shape they were found in.
pub fn extract_photos_with_shape(payload: &Value) -> Option<(PhotoShape, Vec<String>)> {
    PHOTO_EXTRACTORS.iter().find_map(|(shape, extract)| {
        let urls = dedup(extract(payload));
        (!urls.is_empty()).then_some((*shape, urls))
    })
}

pub fn extract_photos(payload: &Value) -> Vec<String> {
    extract_photos_with_shape(payload)
        .map(|(_, urls)| urls)
        .unwrap_or_default()
}

fn array<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// For each photo, the URL of its widest size variant (JPEG preferred, then WebP).
fn largest_variants(payload: &Value, key: &str) -> Vec<String> {
    array(payload, key)
        .iter()
        .filter_map(|photo| {
            let sources = photo.get("mixedSources")?;
            ["jpeg", "webp"].iter().find_map(|format| {
                sources
                    .get(*format)?
                    .as_array()?
                    .iter()
                    .filter_map(|v| {
                        let url = v.get("url").and_then(as_text)?;
                        let width = v.get("width").and_then(Value::as_u64).unwrap_or(0);
                        Some((width, url))
                    })
                    .max_by_key(|(width, _)| *width)
                    .map(|(_, url)| url)
            })
        })
        .collect()
}

fn object_urls(payload: &Value, key: &str) -> Vec<String> {
    array(payload, key)
        .iter()
        .filter_map(|photo| photo.get("url").and_then(as_text))
        .collect()
}

fn url_strings(payload: &Value, key: &str) -> Vec<String> {
    array(payload, key)
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(String::from)
        .collect()
}

fn dedup(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn original_variants_pick_largest_width() {
        let payload = json!({
            "originalPhotos": [{
                "mixedSources": {
                    "jpeg": [
                        {"url": "https://p/a_192.jpg", "width": 192},
                        {"url": "https://p/a_1536.jpg", "width": 1536},
                        {"url": "https://p/a_768.jpg", "width": 768}
                    ]
                }
            }],
            "photos": ["https://p/ignored.jpg"]
        });
        let (shape, urls) = extract_photos_with_shape(&payload).unwrap();
        assert_eq!(shape, PhotoShape::OriginalPhotoVariants);
        assert_eq!(urls, vec!["https://p/a_1536.jpg"]);
    }

    #[test]
    fn webp_variants_used_when_no_jpeg() {
        let payload = json!({
            "photos": [{"mixedSources": {"webp": [
                {"url": "https://p/b_384.webp", "width": 384},
                {"url": "https://p/b_960.webp", "width": 960}
            ]}}]
        });
        let (shape, urls) = extract_photos_with_shape(&payload).unwrap();
        assert_eq!(shape, PhotoShape::PhotoVariants);
        assert_eq!(urls, vec!["https://p/b_960.webp"]);
    }

    #[test]
    fn responsive_objects_before_photo_objects() {
        let payload = json!({
            "responsivePhotos": [{"url": "https://p/r1.jpg"}, {"url": "https://p/r2.jpg"}],
            "photos": [{"url": "https://p/o1.jpg"}]
        });
        assert_eq!(
            extract_photos_with_shape(&payload).unwrap(),
            (
                PhotoShape::ResponsivePhotoObjects,
                vec!["https://p/r1.jpg".to_string(), "https://p/r2.jpg".to_string()]
            )
        );
    }

    #[test]
    fn empty_shapes_fall_through() {
        let payload = json!({
            "originalPhotos": [],
            "responsivePhotos": [{"caption": "no url"}],
            "photos": ["https://p/1.jpg", "https://p/1.jpg", "not-a-url"],
            "imgSrc": "https://p/thumb.jpg"
        });
        let (shape, urls) = extract_photos_with_shape(&payload).unwrap();
        assert_eq!(shape, PhotoShape::PhotoUrls);
        assert_eq!(urls, vec!["https://p/1.jpg"]);
    }

    #[test]
    fn image_strings_then_single_link() {
        let payload = json!({"images": ["https://p/i.jpg"], "hiResImageLink": "https://p/h.jpg"});
        assert_eq!(extract_photos(&payload), vec!["https://p/i.jpg"]);

        let payload = json!({"hiResImageLink": "", "imgSrc": "https://p/s.jpg"});
        assert_eq!(
            extract_photos_with_shape(&payload).unwrap().0,
            PhotoShape::SingleImage
        );
        assert_eq!(extract_photos(&payload), vec!["https://p/s.jpg"]);
    }

    #[test]
    fn nothing_known_is_empty() {
        assert!(extract_photos(&json!({"foo": 1})).is_empty());
        assert!(extract_photos_with_shape(&json!(null)).is_none());
    }
}
