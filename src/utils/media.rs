//! Media type helpers
//!
//! Small helpers for mapping content types, URLs and raw bytes to file
//! extensions. The broker only stores images and videos, so the tables
//! cover those families.

/// Extension for a response content-type header value
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    // Parameters like "; charset=binary" are irrelevant here
    let essence = content_type.split(';').next()?.trim().to_lowercase();
    let ext = match essence.as_str() {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "video/quicktime" => ".mov",
        "video/x-msvideo" => ".avi",
        "video/x-matroska" => ".mkv",
        _ => return None,
    };
    Some(ext)
}

/// Extensions recognized in a URL's trailing segment
const KNOWN_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "mp4", "webm", "mov", "avi", "mkv",
];

/// Extension guessed from the trailing segment of a URL.
///
/// Query parameters and fragments are stripped before matching; unknown
/// extensions yield `None` rather than garbage like ".com".
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    if KNOWN_EXTENSIONS.contains(&ext.as_str()) {
        Some(format!(".{ext}"))
    } else {
        None
    }
}

/// Extension guessed by inspecting bytes (magic numbers)
pub fn extension_for_bytes(bytes: &[u8]) -> Option<String> {
    infer::get(bytes).map(|k| format!(".{}", k.extension()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("image/png"), Some(".png"));
        assert_eq!(
            extension_for_content_type("image/jpeg; charset=binary"),
            Some(".jpg")
        );
        assert_eq!(extension_for_content_type("video/mp4"), Some(".mp4"));
        assert_eq!(extension_for_content_type("application/json"), None);
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/out/a.png?sig=abc"),
            Some(".png".to_string())
        );
        assert_eq!(
            extension_from_url("https://cdn.example.com/v/clip.MP4"),
            Some(".mp4".to_string())
        );
        // no extension, and a TLD is not an extension
        assert_eq!(extension_from_url("https://cdn.example.com/a"), None);
        assert_eq!(extension_from_url("https://cdn.example.com"), None);
    }

    #[test]
    fn test_extension_for_bytes() {
        let png = [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(extension_for_bytes(&png), Some(".png".to_string()));
        assert_eq!(extension_for_bytes(&[0u8; 4]), None);
    }
}
