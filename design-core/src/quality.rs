//! Print-quality assessment for placed raster images.
//!
//! Workspace sizes are authored at a fixed reference resolution, so the
//! physical area an image covers is the workspace size divided by that
//! resolution. The effective DPI is the image's natural pixel count spread
//! over that area. Reports are advisory and never block placement or export.

use serde::{Deserialize, Serialize};

use crate::scene::Workspace;

/// Reference resolution baked into workspace pixel sizes.
pub const REFERENCE_DPI: f64 = 300.0;

/// Lower bound (inclusive) of the excellent band.
pub const EXCELLENT_DPI: f64 = 300.0;
/// Lower bound (inclusive) of the good band.
pub const GOOD_DPI: f64 = 200.0;
/// Lower bound (inclusive) of the fair band.
pub const FAIR_DPI: f64 = 150.0;

/// Quality band for an image's effective resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// At or above 300 DPI.
    Excellent,
    /// At or above 200 DPI.
    Good,
    /// At or above 150 DPI.
    Fair,
    /// Below 150 DPI.
    Poor,
    /// The image could not be measured.
    Unknown,
}

impl QualityLevel {
    /// Classify an effective DPI value. Band boundaries belong to the upper band.
    #[must_use]
    pub fn classify(effective_dpi: f64) -> Self {
        if effective_dpi >= EXCELLENT_DPI {
            Self::Excellent
        } else if effective_dpi >= GOOD_DPI {
            Self::Good
        } else if effective_dpi >= FAIR_DPI {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Advisory quality report attached to an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// Quality band.
    pub level: QualityLevel,
    /// Measured effective DPI, absent when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_dpi: Option<f64>,
    /// Human-readable summary.
    pub message: String,
}

impl QualityReport {
    /// Report for an image that could not be measured.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            level: QualityLevel::Unknown,
            effective_dpi: None,
            message: "Image quality could not be determined".to_string(),
        }
    }

    /// Build a report for a measured effective DPI.
    #[must_use]
    pub fn from_dpi(effective_dpi: f64) -> Self {
        if !effective_dpi.is_finite() {
            return Self::unknown();
        }
        let level = QualityLevel::classify(effective_dpi);
        let rounded = effective_dpi.round();
        let message = match level {
            QualityLevel::Excellent => {
                format!("Excellent quality ({rounded} DPI) - perfect for printing")
            }
            QualityLevel::Good => format!("Good quality ({rounded} DPI) - suitable for printing"),
            QualityLevel::Fair => {
                format!("Fair quality ({rounded} DPI) - may appear slightly soft when printed")
            }
            QualityLevel::Poor | QualityLevel::Unknown => format!(
                "Poor quality ({rounded} DPI) - consider a higher resolution image"
            ),
        };
        Self {
            level,
            effective_dpi: Some(effective_dpi),
            message,
        }
    }
}

/// Natural pixel dimensions reported by the image-decode collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Natural width in pixels.
    pub natural_width: u32,
    /// Natural height in pixels.
    pub natural_height: u32,
    /// Opaque handle to the decoded bitmap, usable as an image source.
    pub handle: String,
}

/// Image-decode collaborator.
pub trait ImageDecoder {
    /// Error produced when bytes cannot be decoded.
    type Error: std::fmt::Display;

    /// Decode raw bytes into natural dimensions and a bitmap handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a supported image.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, Self::Error>;
}

/// Effective DPI of an image of the given natural size on a workspace.
///
/// Returns `None` when the workspace has no physical area.
#[must_use]
pub fn effective_dpi(natural_width: u32, natural_height: u32, workspace: &Workspace) -> Option<f64> {
    let width_inches = workspace.width / REFERENCE_DPI;
    let height_inches = workspace.height / REFERENCE_DPI;
    if width_inches <= 0.0 || height_inches <= 0.0 {
        return None;
    }
    let horizontal = f64::from(natural_width) / width_inches;
    let vertical = f64::from(natural_height) / height_inches;
    Some((horizontal + vertical) / 2.0)
}

/// Assess an image of known natural size against a workspace.
#[must_use]
pub fn assess(natural_width: u32, natural_height: u32, workspace: &Workspace) -> QualityReport {
    effective_dpi(natural_width, natural_height, workspace)
        .map_or_else(QualityReport::unknown, QualityReport::from_dpi)
}

/// Decode and assess raw image bytes.
///
/// Decode failures degrade to an unknown report.
pub fn assess_bytes<D: ImageDecoder>(
    decoder: &D,
    bytes: &[u8],
    workspace: &Workspace,
) -> (Option<DecodedImage>, QualityReport) {
    match decoder.decode(bytes) {
        Ok(decoded) => {
            let report = assess(decoded.natural_width, decoded.natural_height, workspace);
            tracing::debug!(
                "Assessed {}x{} image: {:?}",
                decoded.natural_width,
                decoded.natural_height,
                report.level
            );
            (Some(decoded), report)
        }
        Err(e) => {
            tracing::warn!("Image could not be measured for quality: {e}");
            (None, QualityReport::unknown())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDecoder;

    impl ImageDecoder for FailingDecoder {
        type Error = String;

        fn decode(&self, _bytes: &[u8]) -> Result<DecodedImage, Self::Error> {
            Err("not an image".to_string())
        }
    }

    #[test]
    fn test_band_boundaries_are_inclusive() {
        assert_eq!(QualityLevel::classify(300.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::classify(299.9), QualityLevel::Good);
        assert_eq!(QualityLevel::classify(200.0), QualityLevel::Good);
        assert_eq!(QualityLevel::classify(199.99), QualityLevel::Fair);
        assert_eq!(QualityLevel::classify(150.0), QualityLevel::Fair);
        assert_eq!(QualityLevel::classify(149.0), QualityLevel::Poor);
    }

    #[test]
    fn test_effective_dpi_averages_axes() {
        // 2400x1200 workspace covers 8in x 4in.
        let workspace = Workspace::new(2400.0, 1200.0);
        let dpi = effective_dpi(2400, 800, &workspace).expect("area");
        // 300 horizontally, 200 vertically.
        assert!((dpi - 250.0).abs() < 1e-9);
        assert_eq!(assess(2400, 800, &workspace).level, QualityLevel::Good);
    }

    #[test]
    fn test_message_embeds_rounded_dpi() {
        let report = QualityReport::from_dpi(312.4);
        assert_eq!(report.level, QualityLevel::Excellent);
        assert!(report.message.contains("312 DPI"), "{}", report.message);
    }

    #[test]
    fn test_decode_failure_is_unknown() {
        let workspace = Workspace::new(2400.0, 1200.0);
        let (decoded, report) = assess_bytes(&FailingDecoder, b"junk", &workspace);
        assert!(decoded.is_none());
        assert_eq!(report.level, QualityLevel::Unknown);
        assert!(report.effective_dpi.is_none());
    }

    #[test]
    fn test_degenerate_workspace_is_unknown() {
        let workspace = Workspace::new(0.0, 1200.0);
        assert_eq!(assess(100, 100, &workspace).level, QualityLevel::Unknown);
    }
}
