//! Print export: rasterize a snapshot and assemble the print PDF.
//!
//! The design page is exactly the (capped) physical size with the raster
//! stretched edge to edge. A fixed-size specification page follows it.

use design_core::Snapshot;
use printpdf::{BuiltinFont, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::physical::{PageSize, PhysicalSpec, DEFAULT_TARGET_DPI, MAX_PAGE_INCHES};
use crate::raster::{RasterImage, Rasterizer, SvgRasterizer};

const MM_PER_INCH: f64 = 25.4;

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Oversampling factor applied to the workspace when rasterizing.
    pub pixel_ratio: f64,
    /// Largest page edge in inches.
    pub max_inches: f64,
    /// Target DPI when the physical spec does not set one.
    pub target_dpi: f64,
    /// Specification page size in inches (width, height).
    pub spec_page: (f64, f64),
    /// Load system fonts for text rasterization.
    pub load_system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 3.0,
            max_inches: MAX_PAGE_INCHES,
            target_dpi: DEFAULT_TARGET_DPI,
            spec_page: (8.5, 11.0),
            load_system_fonts: true,
        }
    }
}

/// Human-readable order details for the specification page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrintMetadata {
    /// Product name.
    pub product: String,
    /// Print material.
    pub material: String,
    /// Surface finish.
    pub finish: String,
    /// Number of copies.
    pub quantity: u32,
}

/// Finished print document.
#[derive(Debug, Clone)]
pub struct PrintArtifact {
    /// PDF bytes.
    pub pdf: Vec<u8>,
    /// Design page size.
    pub page: PageSize,
    /// Raster resolution over the design page.
    pub achieved_dpi: f64,
    /// Raster width in pixels.
    pub raster_width: u32,
    /// Raster height in pixels.
    pub raster_height: u32,
}

/// Export pipeline over a rasterization collaborator.
#[derive(Debug, Clone)]
pub struct PrintExporter<R> {
    rasterizer: R,
    config: ExportConfig,
}

impl<R: Rasterizer> PrintExporter<R> {
    /// Create an exporter.
    pub fn new(rasterizer: R, config: ExportConfig) -> Self {
        Self { rasterizer, config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export a snapshot to a print PDF.
    ///
    /// Dimensions are validated before any rendering happens. Any failure
    /// aborts the export; no partial document is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidDimensions`] for unusable physical
    /// dimensions, [`ExportError::Rasterize`] if the rasterizer fails or
    /// returns a malformed image, and [`ExportError::Pdf`] if the document
    /// cannot be written.
    pub async fn export(
        &self,
        snapshot: &Snapshot,
        spec: &PhysicalSpec,
        metadata: &PrintMetadata,
    ) -> ExportResult<PrintArtifact> {
        let page = spec.page_size(self.config.max_inches)?;
        let scene = snapshot.restore();

        tracing::info!(
            "Exporting {} elements at {}x{}px to {:.2}x{:.2}in",
            scene.element_count(),
            scene.workspace.width,
            scene.workspace.height,
            page.width_in,
            page.height_in
        );

        let raster = self
            .rasterizer
            .rasterize(&scene, self.config.pixel_ratio)
            .await?;
        if !raster.is_well_formed() {
            return Err(ExportError::Rasterize(format!(
                "Rasterizer returned {} bytes for {}x{} image",
                raster.rgba.len(),
                raster.width,
                raster.height
            )));
        }

        let achieved_dpi = achieved_dpi(&raster, &page);
        let target_dpi = spec.target_dpi.unwrap_or(self.config.target_dpi);
        if achieved_dpi < target_dpi {
            tracing::warn!(
                "Export resolution {achieved_dpi:.0} DPI is below the {target_dpi:.0} DPI target"
            );
        } else {
            tracing::debug!("Export resolution {achieved_dpi:.0} DPI");
        }

        let pdf = self.build_pdf(&raster, &page, spec, metadata, achieved_dpi)?;
        Ok(PrintArtifact {
            pdf,
            page,
            achieved_dpi,
            raster_width: raster.width,
            raster_height: raster.height,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn build_pdf(
        &self,
        raster: &RasterImage,
        page: &PageSize,
        spec: &PhysicalSpec,
        metadata: &PrintMetadata,
        achieved_dpi: f64,
    ) -> ExportResult<Vec<u8>> {
        let title = if metadata.product.is_empty() {
            "Print Design"
        } else {
            metadata.product.as_str()
        };
        let (doc, page1, layer1) = PdfDocument::new(
            title,
            Mm((page.width_in * MM_PER_INCH) as f32),
            Mm((page.height_in * MM_PER_INCH) as f32),
            "Design",
        );

        // Flatten onto white so transparent areas print as paper.
        let rgb = printpdf::image_crate::RgbImage::from_raw(
            raster.width,
            raster.height,
            raster.to_rgb_on_white(),
        )
        .ok_or_else(|| ExportError::Pdf("Raster buffer does not match its size".to_string()))?;
        let dynamic_image = printpdf::image_crate::DynamicImage::ImageRgb8(rgb);
        let pdf_image = printpdf::Image::from_dynamic_image(&dynamic_image);

        // At this DPI the image width equals the page width; the vertical
        // scale stretches it to the page height.
        let dpi = f64::from(raster.width) / page.width_in;
        let scale_y = page.height_in * dpi / f64::from(raster.height);
        let transform = ImageTransform {
            translate_x: Some(Mm(0.0)),
            translate_y: Some(Mm(0.0)),
            dpi: Some(dpi as f32),
            scale_x: Some(1.0),
            scale_y: Some(scale_y as f32),
            ..Default::default()
        };
        pdf_image.add_to_layer(doc.get_page(page1).get_layer(layer1), transform);

        let (spec_w, spec_h) = self.config.spec_page;
        let (page2, layer2) = doc.add_page(
            Mm((spec_w * MM_PER_INCH) as f32),
            Mm((spec_h * MM_PER_INCH) as f32),
            "Specification",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Pdf(format!("Font registration failed: {e}")))?;
        let layer = doc.get_page(page2).get_layer(layer2);
        write_spec_lines(
            &layer,
            &font,
            spec_h * MM_PER_INCH,
            &spec_lines(page, spec, metadata, achieved_dpi),
        );

        doc.save_to_bytes()
            .map_err(|e| ExportError::Pdf(format!("PDF save failed: {e}")))
    }
}

impl PrintExporter<SvgRasterizer> {
    /// Exporter using the built-in SVG rasterizer.
    #[must_use]
    pub fn with_svg(config: ExportConfig) -> Self {
        Self::new(SvgRasterizer::new(config.load_system_fonts), config)
    }
}

/// Resolution of the raster over the page, taken from the weaker axis.
#[must_use]
pub fn achieved_dpi(raster: &RasterImage, page: &PageSize) -> f64 {
    let horizontal = f64::from(raster.width) / page.width_in;
    let vertical = f64::from(raster.height) / page.height_in;
    horizontal.min(vertical)
}

/// Text of the specification page, one entry per line.
#[must_use]
pub fn spec_lines(
    page: &PageSize,
    spec: &PhysicalSpec,
    metadata: &PrintMetadata,
    achieved_dpi: f64,
) -> Vec<String> {
    let or_dash = |s: &str| {
        if s.is_empty() {
            "-".to_string()
        } else {
            s.to_string()
        }
    };
    let mut lines = vec![
        "Print Specification".to_string(),
        format!("Product: {}", or_dash(&metadata.product)),
        format!("Material: {}", or_dash(&metadata.material)),
        format!("Finish: {}", or_dash(&metadata.finish)),
        format!("Quantity: {}", metadata.quantity),
        format!("Dimensions: {} x {} {}", spec.width, spec.height, spec.unit),
        format!(
            "Print size: {:.2} x {:.2} in",
            page.width_in, page.height_in
        ),
    ];
    if page.capped {
        lines.push("Note: print size reduced to fit the maximum page size".to_string());
    }
    lines.push(format!("Resolution: {achieved_dpi:.0} DPI"));
    lines
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn write_spec_lines(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    page_height_mm: f64,
    lines: &[String],
) {
    let top = page_height_mm - 25.0;
    for (index, line) in lines.iter().enumerate() {
        let (size, offset) = if index == 0 {
            (20.0, 0.0)
        } else {
            (12.0, 6.0 + index as f64 * 9.0)
        };
        layer.use_text(line.as_str(), size, Mm(25.0), Mm((top - offset) as f32), font);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::Unit;

    #[test]
    fn test_achieved_dpi_uses_weaker_axis() {
        let raster = RasterImage {
            width: 7200,
            height: 3600,
            rgba: Vec::new(),
        };
        let page = PageSize {
            width_in: 96.0,
            height_in: 48.0,
            capped: false,
        };
        assert!((achieved_dpi(&raster, &page) - 75.0).abs() < 1e-9);

        let tall = RasterImage {
            width: 9600,
            height: 3600,
            rgba: Vec::new(),
        };
        assert!((achieved_dpi(&tall, &page) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_spec_lines_list_metadata() {
        let spec = PhysicalSpec::new(20.0, 5.0, Unit::Feet);
        let page = spec.page_size(MAX_PAGE_INCHES).expect("page");
        let metadata = PrintMetadata {
            product: "Vinyl Banner".to_string(),
            material: "13oz vinyl".to_string(),
            finish: String::new(),
            quantity: 3,
        };
        let lines = spec_lines(&page, &spec, &metadata, 36.0);
        assert!(lines.contains(&"Material: 13oz vinyl".to_string()));
        assert!(lines.contains(&"Finish: -".to_string()));
        assert!(lines.contains(&"Quantity: 3".to_string()));
        assert!(lines.contains(&"Dimensions: 20 x 5 ft".to_string()));
        assert!(lines.contains(&"Print size: 200.00 x 50.00 in".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Note:")));
        assert_eq!(lines.last().map(String::as_str), Some("Resolution: 36 DPI"));
    }

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert!((config.pixel_ratio - 3.0).abs() < f64::EPSILON);
        assert!((config.max_inches - 200.0).abs() < f64::EPSILON);
        assert_eq!(config.spec_page, (8.5, 11.0));
    }
}
