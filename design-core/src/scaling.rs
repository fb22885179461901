//! Coordinate scaling engine.
//!
//! Remaps element geometry from one workspace pixel size to another so the
//! design stays visually equivalent. Positions, box sizes and point lists
//! follow their own axis factor. Radii, font sizes, arrow heads and stroke
//! widths follow the smaller of the two factors so circles and glyphs are
//! never distorted when the aspect ratio changes.

use crate::element::{Element, ElementKind};
use crate::scene::{Orientation, Scene};
use crate::{CanvasError, CanvasResult};

/// Factors within this distance of 1.0 on both axes skip scaling entirely.
pub const IDENTITY_TOLERANCE: f64 = 0.01;

/// Scaled outlines never get thinner than this.
pub const MIN_STROKE_WIDTH: f64 = 1.0;

/// Per-axis scale factors between two workspace sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    /// Horizontal factor.
    pub sx: f64,
    /// Vertical factor.
    pub sy: f64,
}

impl ScaleFactors {
    /// Factors with the given values.
    #[must_use]
    pub const fn new(sx: f64, sy: f64) -> Self {
        Self { sx, sy }
    }

    /// Factors mapping a `from` size onto a `to` size.
    ///
    /// Returns `None` when either size is degenerate.
    #[must_use]
    pub fn between(from: (f64, f64), to: (f64, f64)) -> Option<Self> {
        let factors = Self::new(to.0 / from.0, to.1 / from.1);
        (factors.sx.is_finite() && factors.sy.is_finite() && factors.sx > 0.0 && factors.sy > 0.0)
            .then_some(factors)
    }

    /// Uniform factor for geometry that must keep its proportions.
    #[must_use]
    pub fn uniform(&self) -> f64 {
        self.sx.min(self.sy)
    }

    /// Check whether both factors are within `tolerance` of 1.0.
    #[must_use]
    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.sx - 1.0).abs() <= tolerance && (self.sy - 1.0).abs() <= tolerance
    }

    /// Factors that undo these.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self::new(1.0 / self.sx, 1.0 / self.sy)
    }
}

/// Scale a stroke width, keeping visible outlines at least one pixel wide.
fn scale_stroke(width: f64, factor: f64) -> f64 {
    if width > 0.0 {
        (width * factor).max(MIN_STROKE_WIDTH)
    } else {
        width
    }
}

/// Scale x components by `sx` and y components by `sy`.
pub(crate) fn scale_points(points: &mut [f64], sx: f64, sy: f64) {
    for pair in points.chunks_exact_mut(2) {
        pair[0] *= sx;
        pair[1] *= sy;
    }
}

/// Remap one element's geometry in place.
pub fn scale_element(element: &mut Element, factors: ScaleFactors) {
    let ScaleFactors { sx, sy } = factors;
    let uniform = factors.uniform();

    element.x *= sx;
    element.y *= sy;
    element.paint.stroke_width = scale_stroke(element.paint.stroke_width, uniform);

    match &mut element.kind {
        ElementKind::Text(text) => {
            text.font_size *= uniform;
            if let Some(width) = text.width.as_mut() {
                *width *= sx;
            }
        }
        ElementKind::Rectangle {
            width,
            height,
            corner_radius,
        } => {
            *width *= sx;
            *height *= sy;
            *corner_radius *= uniform;
        }
        ElementKind::Image(image) => {
            image.width *= sx;
            image.height *= sy;
        }
        ElementKind::Circle { radius } | ElementKind::Polygon { radius, .. } => *radius *= uniform,
        ElementKind::Star {
            inner_radius,
            outer_radius,
            ..
        } => {
            *inner_radius *= uniform;
            *outer_radius *= uniform;
        }
        ElementKind::Arrow {
            points,
            pointer_length,
            pointer_width,
            ..
        } => {
            scale_points(points, sx, sy);
            *pointer_length *= uniform;
            *pointer_width *= uniform;
        }
        ElementKind::Line { points, .. } => scale_points(points, sx, sy),
    }
}

/// Remap a set of elements, skipping the work when the factors are near 1.0.
///
/// Returns whether any geometry was touched.
pub fn scale_elements<'a>(
    elements: impl IntoIterator<Item = &'a mut Element>,
    factors: ScaleFactors,
    tolerance: f64,
) -> bool {
    if factors.is_identity(tolerance) {
        tracing::debug!(
            "Scale factors ({}, {}) within tolerance, keeping geometry",
            factors.sx,
            factors.sy
        );
        return false;
    }
    for element in elements {
        scale_element(element, factors);
    }
    true
}

/// Resize a scene's workspace and remap every element to match.
///
/// Orientation follows the new dimensions. Returns whether element geometry
/// was rescaled.
///
/// # Errors
///
/// Returns an error if the new size is not finite and positive.
pub fn rescale_scene(scene: &mut Scene, width: f64, height: f64, tolerance: f64) -> CanvasResult<bool> {
    let from = (scene.workspace.width, scene.workspace.height);
    let factors = ScaleFactors::between(from, (width, height))
        .filter(|_| crate::scene::Workspace::is_valid_size(width, height))
        .ok_or(CanvasError::InvalidWorkspace { width, height })?;

    let scaled = scale_elements(scene.elements_mut(), factors, tolerance);
    scene.workspace.width = width;
    scene.workspace.height = height;
    scene.workspace.orientation = Orientation::for_size(width, height);
    tracing::debug!(
        "Workspace resized {}x{} -> {width}x{height} (rescaled: {scaled})",
        from.0,
        from.1
    );
    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Paint, TextAlign, TextShape};
    use crate::scene::Workspace;

    const EPS: f64 = 1e-9;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> Element {
        Element::new(ElementKind::Rectangle {
            width,
            height,
            corner_radius: 0.0,
        })
        .with_position(x, y)
    }

    #[test]
    fn test_landscape_template_rect_to_smaller_workspace() {
        let mut element = rect(0.0, 0.0, 600.0, 1200.0);
        let factors = ScaleFactors::between((2400.0, 1200.0), (1600.0, 800.0)).expect("factors");
        scale_element(&mut element, factors);
        assert!(element.x.abs() < EPS && element.y.abs() < EPS);
        let ElementKind::Rectangle { width, height, .. } = element.kind else {
            panic!("expected rectangle");
        };
        assert!((width - 400.0).abs() < EPS);
        assert!((height - 800.0).abs() < EPS);
    }

    #[test]
    fn test_round_shapes_use_smaller_factor() {
        let mut circle = Element::new(ElementKind::Circle { radius: 100.0 }).with_position(100.0, 100.0);
        scale_element(&mut circle, ScaleFactors::new(2.0, 0.5));
        assert!((circle.x - 200.0).abs() < EPS);
        assert!((circle.y - 50.0).abs() < EPS);
        assert!(matches!(circle.kind, ElementKind::Circle { radius } if (radius - 50.0).abs() < EPS));

        let mut text = Element::new(ElementKind::Text(TextShape {
            content: "Sale".to_string(),
            font_family: "Arial".to_string(),
            font_size: 40.0,
            align: TextAlign::Left,
            line_height: 1.0,
            width: Some(300.0),
        }));
        scale_element(&mut text, ScaleFactors::new(2.0, 0.5));
        let ElementKind::Text(shape) = &text.kind else {
            panic!("expected text");
        };
        assert!((shape.font_size - 20.0).abs() < EPS);
        assert_eq!(shape.width, Some(600.0));
    }

    #[test]
    fn test_points_scale_per_axis() {
        let mut line = Element::new(ElementKind::Line {
            points: vec![10.0, 10.0, 20.0, 40.0],
            closed: false,
        });
        scale_element(&mut line, ScaleFactors::new(0.5, 2.0));
        assert!(matches!(&line.kind, ElementKind::Line { points, .. } if points == &vec![5.0, 20.0, 10.0, 80.0]));
    }

    #[test]
    fn test_stroke_floor() {
        let mut element = rect(0.0, 0.0, 10.0, 10.0).with_paint(Paint {
            fill: None,
            stroke: Some("#000".to_string()),
            stroke_width: 2.0,
        });
        scale_element(&mut element, ScaleFactors::new(0.25, 0.25));
        assert!((element.paint.stroke_width - 1.0).abs() < EPS);

        let mut unstroked = rect(0.0, 0.0, 10.0, 10.0);
        scale_element(&mut unstroked, ScaleFactors::new(0.25, 0.25));
        assert!(unstroked.paint.stroke_width.abs() < EPS);
    }

    #[test]
    fn test_identity_skip_leaves_bits_untouched() {
        let original = vec![rect(1.1, 2.2, 3.3, 4.4)];
        let mut elements = original.clone();
        let applied = scale_elements(elements.iter_mut(), ScaleFactors::new(1.009, 0.991), IDENTITY_TOLERANCE);
        assert!(!applied);
        assert_eq!(elements, original);
    }

    #[test]
    fn test_rescale_scene_updates_workspace() {
        let mut scene = Scene::new(Workspace::new(2400.0, 1200.0));
        scene.add_element(rect(1200.0, 600.0, 10.0, 10.0));
        assert!(rescale_scene(&mut scene, 1200.0, 2400.0, IDENTITY_TOLERANCE).expect("rescale"));
        assert_eq!(scene.workspace.orientation, Orientation::Portrait);
        let element = &scene.elements()[0];
        assert!((element.x - 600.0).abs() < EPS);
        assert!((element.y - 1200.0).abs() < EPS);
    }

    #[test]
    fn test_rescale_rejects_degenerate_size() {
        let mut scene = Scene::default();
        assert!(matches!(
            rescale_scene(&mut scene, 0.0, 100.0, IDENTITY_TOLERANCE),
            Err(CanvasError::InvalidWorkspace { .. })
        ));
    }
}
