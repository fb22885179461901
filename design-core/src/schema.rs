//! Canonical serialized representation for scenes, shared by persistence,
//! history snapshots and template definitions.
//!
//! ```text
//! { "elements": [ { "id", "type", ...kind fields } ],
//!   "canvasSize": { "width", "height" },
//!   "backgroundColor": "#ffffff" }
//! ```
//!
//! Loading is lenient: missing fields fall back to per-field defaults, and
//! elements with an unknown type or malformed fields are skipped with a
//! warning instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::element::{Element, ElementId, ElementKind, ImageShape, Paint, TextAlign, TextShape};
use crate::quality::QualityReport;
use crate::scene::{Orientation, Scene, Workspace, DEFAULT_BACKGROUND};
use crate::{transform, CanvasResult};

const DEFAULT_FILL: &str = "#000000";
const DEFAULT_FONT_FAMILY: &str = "Arial";
const DEFAULT_FONT_SIZE: f64 = 24.0;
const DEFAULT_SIZE: f64 = 100.0;
const DEFAULT_RADIUS: f64 = 50.0;
const DEFAULT_INNER_RADIUS: f64 = 20.0;
const DEFAULT_STAR_POINTS: u32 = 5;
const DEFAULT_POLYGON_SIDES: u32 = 6;
const DEFAULT_POINTER: f64 = 10.0;
const DEFAULT_LINE_STROKE_WIDTH: f64 = 2.0;

/// Canvas pixel size as serialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

/// Flat, document-friendly element description.
///
/// Every field is optional on input; only fields relevant to the element's
/// kind are written on output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ElementDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// Legacy inverse of `locked`.
    #[serde(default, skip_serializing)]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip_x: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flip_y: Option<bool>,
    /// Legacy transform multiplier, absorbed on load.
    #[serde(default, skip_serializing)]
    pub scale_x: Option<f64>,
    /// Legacy transform multiplier, absorbed on load.
    #[serde(default, skip_serializing)]
    pub scale_y: Option<f64>,
    /// Outer `None` means absent (use the default), inner `None` means no fill.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub stroke: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_height: Option<u32>,
    /// Malformed reports are dropped rather than failing the element.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub quality: Option<QualityReport>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserialize a field, treating any shape mismatch as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: Option<f64>, default: u32, min: u32) -> u32 {
    value
        .filter(|v| v.is_finite())
        .map_or(default, |v| v.round().max(f64::from(min)) as u32)
}

impl From<&Element> for ElementDocument {
    fn from(element: &Element) -> Self {
        let mut doc = Self {
            id: Some(element.id.to_string()),
            kind: element.kind.type_name().to_string(),
            x: Some(element.x),
            y: Some(element.y),
            rotation: Some(element.rotation),
            opacity: Some(element.opacity),
            locked: Some(element.locked),
            flip_x: Some(element.flip_x),
            flip_y: Some(element.flip_y),
            fill: Some(element.paint.fill.clone()),
            stroke: Some(element.paint.stroke.clone()),
            stroke_width: Some(element.paint.stroke_width),
            ..Self::default()
        };
        match &element.kind {
            ElementKind::Text(text) => {
                doc.text = Some(text.content.clone());
                doc.font_family = Some(text.font_family.clone());
                doc.font_size = Some(text.font_size);
                doc.align = Some(text.align);
                doc.line_height = Some(text.line_height);
                doc.width = text.width;
            }
            ElementKind::Rectangle {
                width,
                height,
                corner_radius,
            } => {
                doc.width = Some(*width);
                doc.height = Some(*height);
                doc.corner_radius = Some(*corner_radius);
            }
            ElementKind::Circle { radius } => doc.radius = Some(*radius),
            ElementKind::Star {
                num_points,
                inner_radius,
                outer_radius,
            } => {
                doc.num_points = Some(f64::from(*num_points));
                doc.inner_radius = Some(*inner_radius);
                doc.outer_radius = Some(*outer_radius);
            }
            ElementKind::Polygon { sides, radius } => {
                doc.sides = Some(f64::from(*sides));
                doc.radius = Some(*radius);
            }
            ElementKind::Arrow {
                points,
                closed,
                pointer_length,
                pointer_width,
            } => {
                doc.points = Some(points.clone());
                doc.closed = Some(*closed);
                doc.pointer_length = Some(*pointer_length);
                doc.pointer_width = Some(*pointer_width);
            }
            ElementKind::Line { points, closed } => {
                doc.points = Some(points.clone());
                doc.closed = Some(*closed);
            }
            ElementKind::Image(image) => {
                doc.src = Some(image.source.clone());
                doc.width = Some(image.width);
                doc.height = Some(image.height);
                doc.natural_width = image.natural_width;
                doc.natural_height = image.natural_height;
                doc.quality.clone_from(&image.quality);
            }
        }
        doc
    }
}

impl ElementDocument {
    /// Materialize a runtime element, filling defaults for missing fields.
    ///
    /// Returns `None` for an unknown element type.
    #[must_use]
    pub fn into_element(self) -> Option<Element> {
        let kind = match self.kind.as_str() {
            "text" => ElementKind::Text(TextShape {
                content: self.text.clone().unwrap_or_default(),
                font_family: self
                    .font_family
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
                font_size: self.font_size.unwrap_or(DEFAULT_FONT_SIZE),
                align: self.align.unwrap_or_default(),
                line_height: self.line_height.unwrap_or(1.0),
                width: self.width,
            }),
            "rect" | "rectangle" => ElementKind::Rectangle {
                width: self.width.unwrap_or(DEFAULT_SIZE),
                height: self.height.unwrap_or(DEFAULT_SIZE),
                corner_radius: self.corner_radius.unwrap_or(0.0),
            },
            "circle" => ElementKind::Circle {
                radius: self.radius.unwrap_or(DEFAULT_RADIUS),
            },
            "star" => ElementKind::Star {
                num_points: count(self.num_points, DEFAULT_STAR_POINTS, 2),
                inner_radius: self.inner_radius.unwrap_or(DEFAULT_INNER_RADIUS),
                outer_radius: self.outer_radius.unwrap_or(DEFAULT_RADIUS),
            },
            "polygon" | "regularPolygon" => ElementKind::Polygon {
                sides: count(self.sides, DEFAULT_POLYGON_SIDES, 3),
                radius: self.radius.unwrap_or(DEFAULT_RADIUS),
            },
            "arrow" => ElementKind::Arrow {
                points: self
                    .points
                    .clone()
                    .unwrap_or_else(|| vec![0.0, 0.0, DEFAULT_SIZE, 0.0]),
                closed: self.closed.unwrap_or(false),
                pointer_length: self.pointer_length.unwrap_or(DEFAULT_POINTER),
                pointer_width: self.pointer_width.unwrap_or(DEFAULT_POINTER),
            },
            "line" | "freeform" => ElementKind::Line {
                points: self.points.clone().unwrap_or_default(),
                closed: self.closed.unwrap_or(false),
            },
            "image" => ElementKind::Image(ImageShape {
                source: self.src.clone().unwrap_or_default(),
                width: self
                    .width
                    .or_else(|| self.natural_width.map(f64::from))
                    .unwrap_or(DEFAULT_SIZE),
                height: self
                    .height
                    .or_else(|| self.natural_height.map(f64::from))
                    .unwrap_or(DEFAULT_SIZE),
                natural_width: self.natural_width,
                natural_height: self.natural_height,
                quality: self.quality.clone(),
            }),
            other => {
                tracing::warn!("Skipping element with unknown type {other:?}");
                return None;
            }
        };

        let paint = self.paint_for(&kind);
        let mut element = Element {
            id: self
                .id
                .map_or_else(ElementId::new, ElementId::from_string),
            x: self.x.unwrap_or(0.0),
            y: self.y.unwrap_or(0.0),
            rotation: self.rotation.unwrap_or(0.0),
            opacity: self.opacity.unwrap_or(1.0).clamp(0.0, 1.0),
            locked: self
                .locked
                .or(self.draggable.map(|draggable| !draggable))
                .unwrap_or(false),
            flip_x: self.flip_x.unwrap_or(false),
            flip_y: self.flip_y.unwrap_or(false),
            paint,
            kind,
        };

        let scale_x = self.scale_x.filter(|s| s.is_finite() && *s != 0.0).unwrap_or(1.0);
        let scale_y = self.scale_y.filter(|s| s.is_finite() && *s != 0.0).unwrap_or(1.0);
        if scale_x < 0.0 {
            element.flip_x = !element.flip_x;
        }
        if scale_y < 0.0 {
            element.flip_y = !element.flip_y;
        }
        if (scale_x.abs() - 1.0).abs() > f64::EPSILON || (scale_y.abs() - 1.0).abs() > f64::EPSILON
        {
            tracing::debug!(
                "Absorbing legacy scale ({scale_x}, {scale_y}) into element {}",
                element.id
            );
            transform::absorb_scale(&mut element, scale_x.abs(), scale_y.abs());
        }
        Some(element)
    }

    fn paint_for(&self, kind: &ElementKind) -> Paint {
        let (fill, stroke, stroke_width) = match kind {
            ElementKind::Image(_) => (None, None, 0.0),
            ElementKind::Line { .. } => (
                None,
                Some(DEFAULT_FILL.to_string()),
                DEFAULT_LINE_STROKE_WIDTH,
            ),
            ElementKind::Arrow { .. } => (
                Some(DEFAULT_FILL.to_string()),
                Some(DEFAULT_FILL.to_string()),
                DEFAULT_LINE_STROKE_WIDTH,
            ),
            _ => (Some(DEFAULT_FILL.to_string()), None, 0.0),
        };
        Paint {
            fill: self.fill.clone().unwrap_or(fill),
            stroke: self.stroke.clone().unwrap_or(stroke),
            stroke_width: self.stroke_width.unwrap_or(stroke_width).max(0.0),
        }
    }
}

/// Lenient wire shape; see [`SceneDocument`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSceneDocument {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    canvas_size: Option<CanvasSize>,
    #[serde(default, deserialize_with = "lenient")]
    background_color: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    orientation: Option<Orientation>,
}

impl From<RawSceneDocument> for SceneDocument {
    fn from(raw: RawSceneDocument) -> Self {
        let elements = raw
            .elements
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    tracing::warn!("Skipping malformed element at index {index}: {e}");
                    None
                }
            })
            .collect();
        let orientation = raw.orientation;
        let canvas_size = raw.canvas_size.unwrap_or_else(|| {
            let (width, height) = orientation.unwrap_or_default().canonical_size();
            CanvasSize { width, height }
        });
        Self {
            elements,
            canvas_size,
            background_color: raw
                .background_color
                .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()),
            orientation,
        }
    }
}

/// Canonical scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSceneDocument")]
pub struct SceneDocument {
    /// Elements in paint order.
    pub elements: Vec<ElementDocument>,
    /// Pixel size the element geometry is expressed in.
    pub canvas_size: CanvasSize,
    /// Workspace background colour.
    pub background_color: String,
    /// Logical orientation, derived from the size when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
}

impl SceneDocument {
    /// Build a document from a runtime scene.
    #[must_use]
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            elements: scene.elements().iter().map(ElementDocument::from).collect(),
            canvas_size: CanvasSize {
                width: scene.workspace.width,
                height: scene.workspace.height,
            },
            background_color: scene.workspace.background_color.clone(),
            orientation: Some(scene.workspace.orientation),
        }
    }

    /// Workspace described by this document.
    #[must_use]
    pub fn workspace(&self) -> Workspace {
        let CanvasSize { width, height } = self.canvas_size;
        Workspace {
            width,
            height,
            orientation: self
                .orientation
                .unwrap_or_else(|| Orientation::for_size(width, height)),
            background_color: self.background_color.clone(),
        }
    }

    /// Materialize the runtime elements, skipping unknown kinds.
    #[must_use]
    pub fn to_elements(&self) -> Vec<Element> {
        self.elements
            .iter()
            .cloned()
            .filter_map(ElementDocument::into_element)
            .collect()
    }

    /// Materialize a runtime scene.
    #[must_use]
    pub fn to_scene(&self) -> Scene {
        Scene::with_elements(self.workspace(), self.to_elements())
    }

    /// Serialize the document to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a document from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error only if the input is not a JSON object; individual
    /// malformed elements are skipped.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
