//! Canvas elements - the objects placed on a print workspace.
//!
//! Every geometry attribute is expressed in the pixel space of the workspace
//! the element currently lives in. Rescaling rewrites these attributes in
//! place; there is no separate design space and no persistent scale
//! multiplier on a committed element.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quality::QualityReport;

/// Unique identifier for an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned rectangle in workspace pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing all the given points.
    ///
    /// Returns an empty rectangle at the origin when `points` is empty.
    #[must_use]
    pub fn enclosing(points: &[(f64, f64)]) -> Self {
        let Some(&(first_x, first_y)) = points.first() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first_x, first_y, first_x, first_y);
        for &(px, py) in &points[1..] {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// The four corners, clockwise from top-left.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x, self.y),
            (self.right(), self.y),
            (self.right(), self.bottom()),
            (self.x, self.bottom()),
        ]
    }

    /// Check whether a point lies inside (edges inclusive).
    #[must_use]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// Horizontal text alignment inside the wrapping box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    #[default]
    Left,
    /// Centred.
    Center,
    /// Flush right.
    Right,
}

/// Fill and outline shared by every kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    /// Fill colour (CSS colour string), `None` for no fill.
    pub fill: Option<String>,
    /// Outline colour, `None` for no outline.
    pub stroke: Option<String>,
    /// Outline width in pixels. Zero means no outline.
    pub stroke_width: f64,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: Some("#000000".to_string()),
            stroke: None,
            stroke_width: 0.0,
        }
    }
}

/// Text-specific attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TextShape {
    /// Text content; `\n` separates lines.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Horizontal alignment.
    pub align: TextAlign,
    /// Line height as a multiple of the font size.
    pub line_height: f64,
    /// Wrapping width in pixels; `None` lets the text size itself.
    pub width: Option<f64>,
}

impl TextShape {
    /// Average glyph advance used when no wrapping width is set.
    const AVERAGE_ADVANCE: f64 = 0.6;

    /// Lines of content, at least one.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// Width of the text box, estimated from the longest line when unset.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn box_width(&self) -> f64 {
        self.width.unwrap_or_else(|| {
            let longest = self.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            longest as f64 * self.font_size * Self::AVERAGE_ADVANCE
        })
    }

    /// Height of the text box.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn box_height(&self) -> f64 {
        self.lines().count() as f64 * self.font_size * self.line_height
    }
}

/// Image-specific attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageShape {
    /// Opaque handle to the decoded bitmap (typically a data URI or path).
    pub source: String,
    /// Displayed width in pixels.
    pub width: f64,
    /// Displayed height in pixels.
    pub height: f64,
    /// Natural bitmap width, when known.
    pub natural_width: Option<u32>,
    /// Natural bitmap height, when known.
    pub natural_height: Option<u32>,
    /// Advisory print-quality report.
    pub quality: Option<QualityReport>,
}

/// Kind-specific content and geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// A text block. Origin is the top-left of the text box.
    Text(TextShape),
    /// A rectangle. Origin is the top-left corner.
    Rectangle {
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
        /// Corner rounding radius in pixels.
        corner_radius: f64,
    },
    /// A circle. Origin is the centre.
    Circle {
        /// Radius in pixels.
        radius: f64,
    },
    /// A star. Origin is the centre.
    Star {
        /// Number of points.
        num_points: u32,
        /// Radius of the inner vertices.
        inner_radius: f64,
        /// Radius of the outer vertices.
        outer_radius: f64,
    },
    /// A regular polygon. Origin is the centre.
    Polygon {
        /// Number of sides.
        sides: u32,
        /// Circumscribed radius.
        radius: f64,
    },
    /// An arrow along a point list, head at the last point.
    Arrow {
        /// Flat `[x0, y0, x1, y1, ...]` coordinates relative to the origin.
        points: Vec<f64>,
        /// Whether the path closes back on itself.
        closed: bool,
        /// Arrow head length in pixels.
        pointer_length: f64,
        /// Arrow head width in pixels.
        pointer_width: f64,
    },
    /// A freeform line along a point list.
    Line {
        /// Flat `[x0, y0, x1, y1, ...]` coordinates relative to the origin.
        points: Vec<f64>,
        /// Whether the path closes back on itself.
        closed: bool,
    },
    /// A placed raster image. Origin is the top-left corner.
    Image(ImageShape),
}

impl ElementKind {
    /// Canonical type name used in serialized documents.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Rectangle { .. } => "rect",
            Self::Circle { .. } => "circle",
            Self::Star { .. } => "star",
            Self::Polygon { .. } => "polygon",
            Self::Arrow { .. } => "arrow",
            Self::Line { .. } => "line",
            Self::Image(_) => "image",
        }
    }

    /// Bounding box in the element's local frame (before rotation).
    #[must_use]
    pub fn local_bounds(&self) -> Rect {
        match self {
            Self::Text(text) => Rect::new(0.0, 0.0, text.box_width(), text.box_height()),
            Self::Rectangle { width, height, .. } => Rect::new(0.0, 0.0, *width, *height),
            Self::Image(image) => Rect::new(0.0, 0.0, image.width, image.height),
            Self::Circle { radius } | Self::Polygon { radius, .. } => {
                Rect::new(-radius, -radius, radius * 2.0, radius * 2.0)
            }
            Self::Star { outer_radius, .. } => Rect::new(
                -outer_radius,
                -outer_radius,
                outer_radius * 2.0,
                outer_radius * 2.0,
            ),
            Self::Arrow { points, .. } | Self::Line { points, .. } => {
                Rect::enclosing(&point_pairs(points))
            }
        }
    }
}

/// Split a flat coordinate list into `(x, y)` pairs. A trailing odd value is ignored.
#[must_use]
pub fn point_pairs(points: &[f64]) -> Vec<(f64, f64)> {
    points.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

/// A placed design object with geometry and style.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Origin X in workspace pixels.
    pub x: f64,
    /// Origin Y in workspace pixels.
    pub y: f64,
    /// Clockwise rotation about the origin, in degrees.
    pub rotation: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Locked elements reject transform gestures.
    pub locked: bool,
    /// Mirrored horizontally.
    pub flip_x: bool,
    /// Mirrored vertically.
    pub flip_y: bool,
    /// Fill and outline.
    pub paint: Paint,
    /// Kind-specific content.
    pub kind: ElementKind,
}

impl Element {
    /// Create a new element with the given kind at the origin.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::new(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            locked: false,
            flip_x: false,
            flip_y: false,
            paint: Paint::default(),
            kind,
        }
    }

    /// Set the origin position.
    #[must_use]
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: ElementId) -> Self {
        self.id = id;
        self
    }

    /// Set fill and outline.
    #[must_use]
    pub fn with_paint(mut self, paint: Paint) -> Self {
        self.paint = paint;
        self
    }

    /// Signed unit multipliers for the two mirror flags.
    #[must_use]
    pub fn flip_signs(&self) -> (f64, f64) {
        (
            if self.flip_x { -1.0 } else { 1.0 },
            if self.flip_y { -1.0 } else { 1.0 },
        )
    }

    /// Map a point from the element's local frame into workspace pixels.
    #[must_use]
    pub fn to_world(&self, local_x: f64, local_y: f64) -> (f64, f64) {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (
            self.x + local_x * cos - local_y * sin,
            self.y + local_x * sin + local_y * cos,
        )
    }

    /// Bounding box in the element's local frame (before rotation).
    #[must_use]
    pub fn local_bounds(&self) -> Rect {
        self.kind.local_bounds()
    }

    /// Axis-aligned bounding box in workspace pixels, accounting for rotation.
    ///
    /// Flips mirror about the local box centre and never change this box.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let corners = self.local_bounds().corners().map(|(cx, cy)| self.to_world(cx, cy));
        Rect::enclosing(&corners)
    }

    /// Visual centre in workspace pixels.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        let (cx, cy) = self.local_bounds().center();
        self.to_world(cx, cy)
    }

    /// Check whether a workspace point hits this element's rotated box.
    #[must_use]
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        let (dx, dy) = (px - self.x, py - self.y);
        let local_x = dx * cos + dy * sin;
        let local_y = -dx * sin + dy * cos;
        self.local_bounds().contains(local_x, local_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn rect(width: f64, height: f64) -> Element {
        Element::new(ElementKind::Rectangle {
            width,
            height,
            corner_radius: 0.0,
        })
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ElementId::new(), ElementId::new());
        assert_eq!(ElementId::from_string("text-1").as_str(), "text-1");
    }

    #[test]
    fn test_rect_bounds_unrotated() {
        let element = rect(100.0, 50.0).with_position(10.0, 20.0);
        assert_eq!(element.bounds(), Rect::new(10.0, 20.0, 100.0, 50.0));
        assert!(element.contains_point(60.0, 40.0));
        assert!(!element.contains_point(5.0, 40.0));
    }

    #[test]
    fn test_rect_bounds_rotated_quarter_turn() {
        let mut element = rect(100.0, 50.0).with_position(100.0, 100.0);
        element.rotation = 90.0;
        let bounds = element.bounds();
        assert!((bounds.x - 50.0).abs() < EPS);
        assert!((bounds.y - 100.0).abs() < EPS);
        assert!((bounds.width - 50.0).abs() < EPS);
        assert!((bounds.height - 100.0).abs() < EPS);
    }

    #[test]
    fn test_circle_bounds_centred_on_origin() {
        let element = Element::new(ElementKind::Circle { radius: 30.0 }).with_position(50.0, 50.0);
        assert_eq!(element.bounds(), Rect::new(20.0, 20.0, 60.0, 60.0));
        let (cx, cy) = element.center();
        assert!((cx - 50.0).abs() < EPS && (cy - 50.0).abs() < EPS);
    }

    #[test]
    fn test_line_bounds_from_points() {
        let element = Element::new(ElementKind::Line {
            points: vec![0.0, 0.0, 40.0, -10.0, 20.0, 30.0],
            closed: false,
        })
        .with_position(5.0, 5.0);
        assert_eq!(element.bounds(), Rect::new(5.0, -5.0, 40.0, 40.0));
    }

    #[test]
    fn test_text_box_estimate() {
        let text = TextShape {
            content: "abcd\nab".to_string(),
            font_family: "Arial".to_string(),
            font_size: 10.0,
            align: TextAlign::Left,
            line_height: 1.2,
            width: None,
        };
        assert!((text.box_width() - 24.0).abs() < EPS);
        assert!((text.box_height() - 24.0).abs() < EPS);
    }

    #[test]
    fn test_flip_does_not_move_bounds() {
        let mut element = rect(10.0, 10.0).with_position(1.0, 2.0);
        let before = element.bounds();
        element.flip_x = true;
        assert_eq!(element.bounds(), before);
        assert_eq!(element.flip_signs(), (-1.0, 1.0));
    }
}
