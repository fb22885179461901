//! Physical print targets and page sizing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};

/// Default output resolution for print.
pub const DEFAULT_TARGET_DPI: f64 = 300.0;

/// Largest page edge a print document may have, in inches.
pub const MAX_PAGE_INCHES: f64 = 200.0;

/// Unit of a physical dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Feet.
    #[serde(rename = "ft")]
    Feet,
    /// Inches.
    #[serde(rename = "in")]
    Inches,
    /// Centimetres.
    #[serde(rename = "cm")]
    Centimeters,
    /// Millimetres.
    #[serde(rename = "mm")]
    Millimeters,
}

impl Unit {
    /// Convert a length in this unit to inches.
    #[must_use]
    pub fn to_inches(self, value: f64) -> f64 {
        match self {
            Self::Feet => value * 12.0,
            Self::Inches => value,
            Self::Centimeters => value / 2.54,
            Self::Millimeters => value / 25.4,
        }
    }

    /// Short unit label.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Feet => "ft",
            Self::Inches => "in",
            Self::Centimeters => "cm",
            Self::Millimeters => "mm",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ft" | "feet" | "foot" => Ok(Self::Feet),
            "in" | "inch" | "inches" => Ok(Self::Inches),
            "cm" => Ok(Self::Centimeters),
            "mm" => Ok(Self::Millimeters),
            other => Err(ExportError::InvalidUnit(other.to_string())),
        }
    }
}

/// Real-world print target chosen with the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalSpec {
    /// Width in `unit`.
    pub width: f64,
    /// Height in `unit`.
    pub height: f64,
    /// Unit of `width` and `height`.
    pub unit: Unit,
    /// Resolution the print should reach; the export default applies when unset.
    #[serde(default, rename = "targetDPI", skip_serializing_if = "Option::is_none")]
    pub target_dpi: Option<f64>,
}

impl PhysicalSpec {
    /// A spec with the default target resolution.
    #[must_use]
    pub fn new(width: f64, height: f64, unit: Unit) -> Self {
        Self {
            width,
            height,
            unit,
            target_dpi: None,
        }
    }

    /// Size of the design page, capped to `max_inches` on either axis.
    ///
    /// When either axis exceeds the cap both are scaled by the same factor so
    /// the larger lands exactly on it.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDimensions`] unless both dimensions are
    /// finite and positive.
    pub fn page_size(&self, max_inches: f64) -> ExportResult<PageSize> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.width) || !valid(self.height) {
            return Err(ExportError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let width = self.unit.to_inches(self.width);
        let height = self.unit.to_inches(self.height);
        let largest = width.max(height);
        if largest > max_inches {
            let factor = max_inches / largest;
            tracing::info!(
                "Capping {width:.2}x{height:.2}in page to {max_inches}in (factor {factor:.4})"
            );
            Ok(PageSize {
                width_in: width * factor,
                height_in: height * factor,
                capped: true,
            })
        } else {
            Ok(PageSize {
                width_in: width,
                height_in: height,
                capped: false,
            })
        }
    }
}

/// Physical page size in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    /// Width in inches.
    pub width_in: f64,
    /// Height in inches.
    pub height_in: f64,
    /// Whether the size was reduced to fit the cap.
    pub capped: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_feet_page_uncapped() {
        let page = PhysicalSpec::new(8.0, 4.0, Unit::Feet)
            .page_size(MAX_PAGE_INCHES)
            .expect("page");
        assert!((page.width_in - 96.0).abs() < EPS);
        assert!((page.height_in - 48.0).abs() < EPS);
        assert!(!page.capped);
    }

    #[test]
    fn test_cap_preserves_aspect() {
        let page = PhysicalSpec::new(20.0, 5.0, Unit::Feet)
            .page_size(MAX_PAGE_INCHES)
            .expect("page");
        assert!((page.width_in - 200.0).abs() < EPS);
        assert!((page.height_in - 50.0).abs() < EPS);
        assert!(page.capped);
    }

    #[test]
    fn test_metric_units() {
        assert!((Unit::Centimeters.to_inches(254.0) - 100.0).abs() < EPS);
        assert!((Unit::Millimeters.to_inches(25.4) - 1.0).abs() < EPS);
        assert_eq!("FT".parse::<Unit>().expect("unit"), Unit::Feet);
        assert!(matches!("yd".parse::<Unit>(), Err(ExportError::InvalidUnit(_))));
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        for (w, h) in [(0.0, 4.0), (8.0, -1.0), (f64::NAN, 4.0), (f64::INFINITY, 1.0)] {
            let result = PhysicalSpec::new(w, h, Unit::Inches).page_size(MAX_PAGE_INCHES);
            assert!(matches!(result, Err(ExportError::InvalidDimensions { .. })));
        }
    }

    #[test]
    fn test_spec_json_shape() {
        let spec: PhysicalSpec =
            serde_json::from_str(r#"{"width": 8, "height": 4, "unit": "ft", "targetDPI": 150}"#)
                .expect("spec");
        assert_eq!(spec.unit, Unit::Feet);
        assert_eq!(spec.target_dpi, Some(150.0));
    }
}
