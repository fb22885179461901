//! Image decoding for placement and quality assessment.
//!
//! Only the image header is read to obtain natural dimensions; the bitmap
//! handle handed back to the editor is a base64 data URI of the original
//! bytes so the SVG renderer can embed it unchanged.

use std::io::Cursor;

use base64::Engine;
use design_core::{DecodedImage, ImageDecoder};
use thiserror::Error;

/// Errors produced while decoding image bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a recognised raster format.
    #[error("Unsupported image format")]
    UnsupportedFormat,

    /// The header could not be read.
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    /// The image crate rejected the data.
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// A data URI was malformed.
    #[error("Invalid data URI: {0}")]
    DataUri(String),
}

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF, first frame only.
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            "gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }

    /// MIME type for data URIs.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Detect a format from content, checking it against a file extension.
///
/// Content wins; a known extension that disagrees with it is logged.
#[must_use]
pub fn detect_format(bytes: &[u8], extension: Option<&str>) -> ImageFormat {
    let detected = ImageFormat::from_magic_bytes(bytes);
    if let Some(ext) = extension {
        let hinted = ImageFormat::from_extension(ext);
        if hinted != ImageFormat::Unknown && hinted != detected {
            tracing::warn!("File extension .{ext} suggests {hinted:?} but content is {detected:?}");
        }
    }
    detected
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    /// Create a decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ImageDecoder for RasterDecoder {
    type Error = DecodeError;

    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, Self::Error> {
        let format = ImageFormat::from_magic_bytes(bytes);
        if format == ImageFormat::Unknown {
            return Err(DecodeError::UnsupportedFormat);
        }

        let (natural_width, natural_height) = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()?;

        let handle = format!(
            "data:{};base64,{}",
            format.mime(),
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );
        Ok(DecodedImage {
            natural_width,
            natural_height,
            handle,
        })
    }
}

/// Extract the raw bytes from a base64 data URI.
///
/// # Errors
///
/// Returns [`DecodeError::DataUri`] if the URI is not a base64 data URI.
pub fn bytes_from_data_uri(uri: &str) -> Result<Vec<u8>, DecodeError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| DecodeError::DataUri("missing data: prefix".to_string()))?;
    let (metadata, encoded) = rest
        .split_once(',')
        .ok_or_else(|| DecodeError::DataUri("missing comma".to_string()))?;
    if !metadata.ends_with(";base64") {
        return Err(DecodeError::DataUri("only base64 payloads are supported".to_string()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| DecodeError::DataUri(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png)
            .expect("encode png");
        buf.into_inner()
    }

    #[test]
    fn test_format_detection_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(
            ImageFormat::from_magic_bytes(b"RIFF\x00\x00\x00\x00WEBP"),
            ImageFormat::WebP
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"<svg"), ImageFormat::Unknown);
    }

    #[test]
    fn test_format_detection_from_extension() {
        assert_eq!(ImageFormat::from_extension("JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("gif"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_extension("tiff"), ImageFormat::Unknown);
    }

    #[test]
    fn test_detect_format_prefers_content() {
        let png = png_bytes(2, 2);
        assert_eq!(detect_format(&png, Some("png")), ImageFormat::Png);
        assert_eq!(detect_format(&png, Some("jpg")), ImageFormat::Png);
        assert_eq!(detect_format(&png, None), ImageFormat::Png);
        assert_eq!(detect_format(b"plain text", Some("gif")), ImageFormat::Unknown);
    }

    #[test]
    fn test_decode_reads_natural_size() {
        let bytes = png_bytes(12, 7);
        let decoded = RasterDecoder::new().decode(&bytes).expect("decode");
        assert_eq!((decoded.natural_width, decoded.natural_height), (12, 7));
        assert!(decoded.handle.starts_with("data:image/png;base64,"));
        assert_eq!(bytes_from_data_uri(&decoded.handle).expect("bytes"), bytes);
    }

    #[test]
    fn test_decode_rejects_non_images() {
        let result = RasterDecoder::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(DecodeError::UnsupportedFormat)));
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(bytes_from_data_uri("not a data uri").is_err());
        assert!(bytes_from_data_uri("data:image/png").is_err());
        assert!(bytes_from_data_uri("data:text/plain,hello").is_err());
    }
}
