//! Rasterization collaborator and the built-in SVG-based implementation.
//!
//! [`SvgRasterizer`] renders a [`Scene`] to an SVG intermediate
//! representation and rasterizes it with resvg/tiny-skia. The SVG viewBox is
//! the workspace, so the output is exactly `workspace × pixel_ratio` pixels.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use design_core::element::{point_pairs, Element, ElementKind, TextAlign};
use design_core::Scene;

use crate::error::{ExportError, ExportResult};

/// Rasterized scene, straight (not premultiplied) RGBA8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data, 4 bytes per pixel.
    pub rgba: Vec<u8>,
}

impl RasterImage {
    /// Check that the buffer matches the stated dimensions.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && u64::try_from(self.rgba.len()).ok()
                == Some(u64::from(self.width) * u64::from(self.height) * 4)
    }

    /// Flatten onto an opaque white background as packed RGB8.
    #[must_use]
    pub fn to_rgb_on_white(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.rgba.len() / 4 * 3);
        for pixel in self.rgba.chunks_exact(4) {
            let alpha = u32::from(pixel[3]);
            for &channel in &pixel[..3] {
                let blended = (u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
                rgb.push(u8::try_from(blended).unwrap_or(u8::MAX));
            }
        }
        rgb
    }
}

/// Rasterization collaborator.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `scene` at `pixel_ratio` times its workspace size.
    async fn rasterize(&self, scene: &Scene, pixel_ratio: f64) -> ExportResult<RasterImage>;
}

/// Rasterizer backed by resvg.
#[derive(Clone)]
pub struct SvgRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for SvgRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgRasterizer")
            .field("font_faces", &self.fontdb.len())
            .finish()
    }
}

impl Default for SvgRasterizer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SvgRasterizer {
    /// Create a rasterizer, optionally loading system fonts for text.
    #[must_use]
    pub fn new(load_system_fonts: bool) -> Self {
        let mut db = usvg::fontdb::Database::new();
        if load_system_fonts {
            db.load_system_fonts();
            tracing::debug!("Loaded {} system font faces", db.len());
        }
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// Render SVG markup to a raster image of its declared size.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Rasterize`] if the SVG cannot be parsed or the
    /// pixmap cannot be allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize_svg(&self, svg: &str) -> ExportResult<RasterImage> {
        let mut opt = usvg::Options::default();
        opt.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| ExportError::Rasterize(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().round() as u32;
        let px_h = tree.size().height().round() as u32;
        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1)).ok_or_else(|| {
            ExportError::Rasterize(format!("Failed to allocate {px_w}x{px_h} pixmap"))
        })?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let mut rgba = Vec::with_capacity(pixmap.data().len());
        for pixel in pixmap.pixels() {
            let color = pixel.demultiply();
            rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(RasterImage {
            width: pixmap.width(),
            height: pixmap.height(),
            rgba,
        })
    }
}

#[async_trait]
impl Rasterizer for SvgRasterizer {
    async fn rasterize(&self, scene: &Scene, pixel_ratio: f64) -> ExportResult<RasterImage> {
        if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) {
            return Err(ExportError::Rasterize(format!(
                "Invalid pixel ratio {pixel_ratio}"
            )));
        }
        let svg = scene_to_svg(scene, pixel_ratio);
        self.rasterize_svg(&svg)
    }
}

/// Render a scene to SVG markup at `pixel_ratio` times the workspace size.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scene_to_svg(scene: &Scene, pixel_ratio: f64) -> String {
    let workspace = &scene.workspace;
    let out_w = (workspace.width * pixel_ratio).round().max(1.0) as u32;
    let out_h = (workspace.height * pixel_ratio).round().max(1.0) as u32;

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {} {}\" preserveAspectRatio=\"none\">",
        workspace.width, workspace.height,
    );
    let _ = write!(
        svg,
        "<rect width=\"{}\" height=\"{}\" fill=\"{}\"/>",
        workspace.width,
        workspace.height,
        escape_xml(&workspace.background_color),
    );

    for element in scene.elements() {
        if !is_renderable(element) {
            tracing::warn!("Skipping element {} with non-finite geometry", element.id);
            continue;
        }
        render_element_svg(&mut svg, element);
    }

    svg.push_str("</svg>");
    svg
}

fn is_renderable(element: &Element) -> bool {
    let bounds = element.bounds();
    [element.x, element.y, element.rotation, bounds.width, bounds.height]
        .iter()
        .all(|v| v.is_finite())
}

/// Render a single element to SVG, wrapped in its placement group.
fn render_element_svg(svg: &mut String, element: &Element) {
    let (cx, cy) = element.local_bounds().center();
    let (fx, fy) = element.flip_signs();
    let _ = write!(
        svg,
        "<g transform=\"translate({} {}) rotate({}) translate({cx} {cy}) scale({fx} {fy}) translate({} {})\" opacity=\"{}\">",
        element.x,
        element.y,
        element.rotation,
        -cx,
        -cy,
        element.opacity,
    );

    let paint = paint_attrs(element);
    match &element.kind {
        ElementKind::Text(text) => {
            let (anchor, x) = match text.align {
                TextAlign::Left => ("start", 0.0),
                TextAlign::Center => ("middle", text.box_width() / 2.0),
                TextAlign::Right => ("end", text.box_width()),
            };
            let _ = write!(
                svg,
                "<text font-family=\"{}\" font-size=\"{}\" text-anchor=\"{anchor}\" {paint}>",
                escape_xml(&text.font_family),
                text.font_size,
            );
            let advance = text.font_size * text.line_height;
            for (index, line) in text.lines().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let baseline = index as f64 * advance + text.font_size * 0.8;
                let _ = write!(
                    svg,
                    "<tspan x=\"{x}\" y=\"{baseline}\">{}</tspan>",
                    escape_xml(line)
                );
            }
            svg.push_str("</text>");
        }

        ElementKind::Rectangle {
            width,
            height,
            corner_radius,
        } => {
            let _ = write!(
                svg,
                "<rect width=\"{width}\" height=\"{height}\" rx=\"{corner_radius}\" {paint}/>"
            );
        }

        ElementKind::Circle { radius } => {
            let _ = write!(svg, "<circle r=\"{radius}\" {paint}/>");
        }

        ElementKind::Star {
            num_points,
            inner_radius,
            outer_radius,
        } => {
            let vertices = star_vertices(*num_points, *inner_radius, *outer_radius);
            let _ = write!(svg, "<polygon points=\"{}\" {paint}/>", format_points(&vertices));
        }

        ElementKind::Polygon { sides, radius } => {
            let vertices = polygon_vertices(*sides, *radius);
            let _ = write!(svg, "<polygon points=\"{}\" {paint}/>", format_points(&vertices));
        }

        ElementKind::Line { points, closed } => {
            let tag = if *closed { "polygon" } else { "polyline" };
            let _ = write!(
                svg,
                "<{tag} points=\"{}\" {paint}/>",
                format_points(&point_pairs(points))
            );
        }

        ElementKind::Arrow {
            points,
            closed,
            pointer_length,
            pointer_width,
        } => {
            let pairs = point_pairs(points);
            let tag = if *closed { "polygon" } else { "polyline" };
            let _ = write!(
                svg,
                "<{tag} points=\"{}\" fill=\"none\" {}/>",
                format_points(&pairs),
                stroke_attrs(element)
            );
            if let Some(head) = arrow_head(&pairs, *pointer_length, *pointer_width) {
                let head_fill = element
                    .paint
                    .fill
                    .as_deref()
                    .or(element.paint.stroke.as_deref())
                    .unwrap_or("none");
                let _ = write!(
                    svg,
                    "<polygon points=\"{}\" fill=\"{}\" {}/>",
                    format_points(&head),
                    escape_xml(head_fill),
                    stroke_attrs(element)
                );
            }
        }

        ElementKind::Image(image) => {
            let href = escape_xml(&image.source);
            let _ = write!(
                svg,
                "<image width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"{href}\" xlink:href=\"{href}\"/>",
                image.width, image.height,
            );
        }
    }

    svg.push_str("</g>");
}

fn stroke_attrs(element: &Element) -> String {
    match &element.paint.stroke {
        Some(stroke) if element.paint.stroke_width > 0.0 => format!(
            "stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\"",
            escape_xml(stroke),
            element.paint.stroke_width
        ),
        _ => "stroke=\"none\"".to_string(),
    }
}

fn paint_attrs(element: &Element) -> String {
    let fill = element.paint.fill.as_deref().unwrap_or("none");
    format!("fill=\"{}\" {}", escape_xml(fill), stroke_attrs(element))
}

/// Alternating outer/inner vertices, first point straight up.
fn star_vertices(num_points: u32, inner_radius: f64, outer_radius: f64) -> Vec<(f64, f64)> {
    let count = num_points.max(2) * 2;
    let step = std::f64::consts::PI / f64::from(num_points.max(2));
    (0..count)
        .map(|i| {
            let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
            let angle = -std::f64::consts::FRAC_PI_2 + f64::from(i) * step;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Regular polygon vertices, first point straight up.
fn polygon_vertices(sides: u32, radius: f64) -> Vec<(f64, f64)> {
    let sides = sides.max(3);
    let step = std::f64::consts::TAU / f64::from(sides);
    (0..sides)
        .map(|i| {
            let angle = -std::f64::consts::FRAC_PI_2 + f64::from(i) * step;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

/// Triangle at the last point, pointing along the final segment.
fn arrow_head(points: &[(f64, f64)], length: f64, width: f64) -> Option<[(f64, f64); 3]> {
    let [.., (px, py), (tx, ty)] = points else {
        return None;
    };
    let (dx, dy) = (tx - px, ty - py);
    let norm = dx.hypot(dy);
    if norm <= f64::EPSILON || length <= 0.0 {
        return None;
    }
    let (ux, uy) = (dx / norm, dy / norm);
    let (bx, by) = (tx - ux * length, ty - uy * length);
    let half = width / 2.0;
    Some([
        (*tx, *ty),
        (bx - uy * half, by + ux * half),
        (bx + uy * half, by - ux * half),
    ])
}

fn format_points(points: &[(f64, f64)]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{x},{y}");
    }
    out
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use design_core::element::{Paint, TextShape};
    use design_core::Workspace;

    fn pixel(image: &RasterImage, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * image.width + x) * 4) as usize;
        let mut out = [0; 4];
        out.copy_from_slice(&image.rgba[offset..offset + 4]);
        out
    }

    fn red_rect(x: f64, y: f64, width: f64, height: f64) -> Element {
        Element::new(ElementKind::Rectangle {
            width,
            height,
            corner_radius: 0.0,
        })
        .with_position(x, y)
        .with_paint(Paint {
            fill: Some("#ff0000".to_string()),
            stroke: None,
            stroke_width: 0.0,
        })
    }

    #[test]
    fn test_svg_has_workspace_viewbox() {
        let scene = Scene::new(Workspace::new(800.0, 400.0));
        let svg = scene_to_svg(&scene, 3.0);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"2400\""));
        assert!(svg.contains("height=\"1200\""));
        assert!(svg.contains("viewBox=\"0 0 800 400\""));
        assert!(svg.contains("fill=\"#ffffff\""));
    }

    #[test]
    fn test_text_lines_and_escaping() {
        let mut scene = Scene::new(Workspace::new(400.0, 200.0));
        scene.add_element(Element::new(ElementKind::Text(TextShape {
            content: "A < B\nC & D".to_string(),
            font_family: "Arial".to_string(),
            font_size: 20.0,
            align: TextAlign::Center,
            line_height: 1.5,
            width: Some(200.0),
        })));
        let svg = scene_to_svg(&scene, 1.0);
        assert!(svg.contains("A &lt; B"));
        assert!(svg.contains("C &amp; D"));
        assert!(svg.contains("text-anchor=\"middle\""));
        assert!(svg.contains("<tspan x=\"100\" y=\"46\">"));
    }

    #[test]
    fn test_flip_mirrors_about_centre() {
        let mut element = red_rect(10.0, 10.0, 40.0, 20.0);
        element.flip_x = true;
        let mut svg = String::new();
        render_element_svg(&mut svg, &element);
        assert!(svg.contains("translate(20 10) scale(-1 1) translate(-20 -10)"));
    }

    #[test]
    fn test_star_and_polygon_vertices() {
        let star = star_vertices(5, 10.0, 20.0);
        assert_eq!(star.len(), 10);
        assert!(star[0].0.abs() < 1e-9 && (star[0].1 + 20.0).abs() < 1e-9);
        let hexagon = polygon_vertices(6, 10.0);
        assert_eq!(hexagon.len(), 6);
        assert!((hexagon[3].1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_arrow_head_points_along_last_segment() {
        let head = arrow_head(&[(0.0, 0.0), (100.0, 0.0)], 10.0, 8.0).expect("head");
        assert_eq!(head[0], (100.0, 0.0));
        assert!((head[1].0 - 90.0).abs() < 1e-9 && (head[1].1 - 4.0).abs() < 1e-9);
        assert!(arrow_head(&[(5.0, 5.0)], 10.0, 8.0).is_none());
    }

    #[tokio::test]
    async fn test_rasterize_scales_by_pixel_ratio() {
        let mut scene = Scene::new(Workspace::new(40.0, 20.0));
        scene.add_element(red_rect(0.0, 0.0, 20.0, 20.0));
        let image = SvgRasterizer::default()
            .rasterize(&scene, 2.0)
            .await
            .expect("raster");
        assert_eq!((image.width, image.height), (80, 40));
        assert!(image.is_well_formed());
        assert_eq!(pixel(&image, 10, 10), [255, 0, 0, 255]);
        assert_eq!(pixel(&image, 70, 30), [255, 255, 255, 255]);
    }

    #[tokio::test]
    async fn test_invalid_pixel_ratio() {
        let scene = Scene::new(Workspace::new(40.0, 20.0));
        let result = SvgRasterizer::default().rasterize(&scene, 0.0).await;
        assert!(matches!(result, Err(ExportError::Rasterize(_))));
    }

    #[test]
    fn test_flatten_onto_white() {
        let image = RasterImage {
            width: 2,
            height: 1,
            rgba: vec![0, 0, 0, 0, 0, 0, 255, 255],
        };
        assert_eq!(image.to_rgb_on_white(), vec![255, 255, 255, 0, 0, 255]);
    }
}
