const FALLBACK_MIME: &str = "application/octet-stream";

/// Sniff the media type of an upload payload from its magic bytes.
pub fn detect_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        [0x00, 0x00, 0x00, _, 0x66, 0x74, 0x79, 0x70, ..] => "video/mp4",
        _ => {
            tracing::debug!(
                "Upload payload of {} bytes has no known media signature; sending as {}",
                bytes.len(),
                FALLBACK_MIME
            );
            FALLBACK_MIME
        }
    }
}

/// `data:<mime>;base64,` prefix for a payload.
pub fn data_uri_header(bytes: &[u8]) -> String {
    format!("data:{};base64,", detect_mime(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_upload_is_image_png() {
        assert_eq!(
            detect_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            "image/png"
        );
    }

    #[test]
    fn test_camera_jpeg_upload() {
        assert_eq!(detect_mime(&[0xFF, 0xD8, 0xFF, 0xE1]), "image/jpeg");
    }

    #[test]
    fn test_animated_gif_upload() {
        assert_eq!(detect_mime(b"GIF89a"), "image/gif");
    }

    #[test]
    fn test_mp4_upload_goes_through_auto_endpoint_as_video() {
        assert_eq!(
            detect_mime(&[0x00, 0x00, 0x00, 0x20, 0x66, 0x74, 0x79, 0x70, 0x69, 0x73, 0x6F, 0x6D]),
            "video/mp4"
        );
    }

    #[test]
    fn test_unknown_payload_is_octet_stream() {
        assert_eq!(detect_mime(b"%PDF-1.7"), FALLBACK_MIME);
        assert_eq!(detect_mime(&[]), FALLBACK_MIME);
    }

    #[test]
    fn test_data_uri_header() {
        assert_eq!(data_uri_header(b"GIF87a"), "data:image/gif;base64,");
    }
}
