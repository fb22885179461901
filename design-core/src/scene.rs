//! Scene model: the ordered element list plus the workspace it is laid out on.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementId, ElementKind, TextAlign};
use crate::{CanvasError, CanvasResult};

/// Default workspace background.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Offset applied to duplicated elements, in pixels.
const DUPLICATE_OFFSET: f64 = 20.0;

/// Logical orientation of the print surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Wider than tall.
    #[default]
    Landscape,
    /// Taller than wide.
    Portrait,
}

impl Orientation {
    /// Orientation implied by a pixel size. Square counts as landscape.
    #[must_use]
    pub fn for_size(width: f64, height: f64) -> Self {
        if width >= height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    /// Canonical authoring size for templates of this orientation.
    #[must_use]
    pub const fn canonical_size(self) -> (f64, f64) {
        match self {
            Self::Landscape => (2400.0, 1200.0),
            Self::Portrait => (800.0, 1600.0),
        }
    }
}

/// The fixed-pixel canvas representing one physical print surface.
///
/// Width and height are authoritative; the orientation is metadata kept
/// consistent with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
    /// Logical orientation.
    pub orientation: Orientation,
    /// Background colour.
    pub background_color: String,
}

impl Workspace {
    /// Create a workspace of the given size with a white background.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            orientation: Orientation::for_size(width, height),
            background_color: DEFAULT_BACKGROUND.to_string(),
        }
    }

    /// Workspace at the canonical template size for an orientation.
    #[must_use]
    pub fn canonical(orientation: Orientation) -> Self {
        let (width, height) = orientation.canonical_size();
        Self::new(width, height)
    }

    /// Check that both dimensions are finite and positive.
    #[must_use]
    pub fn is_valid_size(width: f64, height: f64) -> bool {
        width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::canonical(Orientation::Landscape)
    }
}

/// Z-order move for [`Scene::reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderDirection {
    /// Swap with the element above.
    Up,
    /// Swap with the element below.
    Down,
    /// Move to the top of the stack.
    Top,
    /// Move to the bottom of the stack.
    Bottom,
}

/// Workspace edge or centre line for [`Scene::align`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left edge.
    Left,
    /// Vertical centre line.
    Center,
    /// Right edge.
    Right,
    /// Top edge.
    Top,
    /// Horizontal centre line.
    Middle,
    /// Bottom edge.
    Bottom,
}

/// Partial attribute update for [`Scene::update_element`].
///
/// Fields that do not apply to the target element's kind are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    /// Origin X.
    pub x: Option<f64>,
    /// Origin Y.
    pub y: Option<f64>,
    /// Rotation in degrees.
    pub rotation: Option<f64>,
    /// Opacity, clamped to `[0, 1]`.
    pub opacity: Option<f64>,
    /// Lock flag.
    pub locked: Option<bool>,
    /// Fill colour; `Some(None)` clears it.
    pub fill: Option<Option<String>>,
    /// Outline colour; `Some(None)` clears it.
    pub stroke: Option<Option<String>>,
    /// Outline width.
    pub stroke_width: Option<f64>,
    /// Text content.
    pub content: Option<String>,
    /// Font family.
    pub font_family: Option<String>,
    /// Font size.
    pub font_size: Option<f64>,
    /// Text alignment.
    pub align: Option<TextAlign>,
    /// Text line height multiple.
    pub line_height: Option<f64>,
    /// Width (rectangles, images, text wrapping box).
    pub width: Option<f64>,
    /// Height (rectangles, images).
    pub height: Option<f64>,
    /// Rectangle corner radius.
    pub corner_radius: Option<f64>,
    /// Circle or polygon radius.
    pub radius: Option<f64>,
    /// Star inner radius.
    pub inner_radius: Option<f64>,
    /// Star outer radius.
    pub outer_radius: Option<f64>,
    /// Star point count.
    pub num_points: Option<u32>,
    /// Polygon side count.
    pub sides: Option<u32>,
    /// Point list for arrows and lines.
    pub points: Option<Vec<f64>>,
    /// Closed flag for arrows and lines.
    pub closed: Option<bool>,
}

impl ElementPatch {
    /// Check whether the patch touches anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check whether the patch moves, rotates or resizes its target.
    ///
    /// Styling, content and the lock flag itself are not geometry.
    #[must_use]
    pub fn touches_geometry(&self) -> bool {
        self.x.is_some()
            || self.y.is_some()
            || self.rotation.is_some()
            || self.font_size.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.corner_radius.is_some()
            || self.radius.is_some()
            || self.inner_radius.is_some()
            || self.outer_radius.is_some()
            || self.num_points.is_some()
            || self.sides.is_some()
            || self.points.is_some()
            || self.closed.is_some()
    }

    /// Apply every applicable field to an element.
    pub fn apply(&self, element: &mut Element) {
        if let Some(x) = self.x {
            element.x = x;
        }
        if let Some(y) = self.y {
            element.y = y;
        }
        if let Some(rotation) = self.rotation {
            element.rotation = rotation;
        }
        if let Some(opacity) = self.opacity {
            element.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(locked) = self.locked {
            element.locked = locked;
        }
        if let Some(fill) = &self.fill {
            element.paint.fill.clone_from(fill);
        }
        if let Some(stroke) = &self.stroke {
            element.paint.stroke.clone_from(stroke);
        }
        if let Some(stroke_width) = self.stroke_width {
            element.paint.stroke_width = stroke_width.max(0.0);
        }

        match &mut element.kind {
            ElementKind::Text(text) => {
                if let Some(content) = &self.content {
                    text.content.clone_from(content);
                }
                if let Some(family) = &self.font_family {
                    text.font_family.clone_from(family);
                }
                if let Some(size) = self.font_size {
                    text.font_size = size;
                }
                if let Some(align) = self.align {
                    text.align = align;
                }
                if let Some(line_height) = self.line_height {
                    text.line_height = line_height;
                }
                if let Some(width) = self.width {
                    text.width = Some(width);
                }
            }
            ElementKind::Rectangle {
                width,
                height,
                corner_radius,
            } => {
                assign(width, self.width);
                assign(height, self.height);
                assign(corner_radius, self.corner_radius);
            }
            ElementKind::Image(image) => {
                assign(&mut image.width, self.width);
                assign(&mut image.height, self.height);
            }
            ElementKind::Circle { radius } => assign(radius, self.radius),
            ElementKind::Star {
                num_points,
                inner_radius,
                outer_radius,
            } => {
                assign(num_points, self.num_points);
                assign(inner_radius, self.inner_radius);
                assign(outer_radius, self.outer_radius);
            }
            ElementKind::Polygon { sides, radius } => {
                assign(sides, self.sides);
                assign(radius, self.radius);
            }
            ElementKind::Arrow { points, closed, .. } | ElementKind::Line { points, closed } => {
                if let Some(new_points) = &self.points {
                    points.clone_from(new_points);
                }
                assign(closed, self.closed);
            }
        }
    }
}

fn assign<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// A scene: every placed element plus the workspace settings.
///
/// Sequence order is paint order; later elements draw on top.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    elements: Vec<Element>,
    /// Workspace the element geometry is expressed in.
    pub workspace: Workspace,
}

impl Scene {
    /// Create an empty scene on the given workspace.
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self {
            elements: Vec::new(),
            workspace,
        }
    }

    /// Create a scene from an existing element list.
    #[must_use]
    pub fn with_elements(workspace: Workspace, elements: Vec<Element>) -> Self {
        Self {
            elements,
            workspace,
        }
    }

    /// Add an element on top of the stack.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = element.id.clone();
        self.elements.push(element);
        id
    }

    /// Remove an element from the scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn remove_element(&mut self, id: &ElementId) -> CanvasResult<Element> {
        let index = self
            .position(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        Ok(self.elements.remove(index))
    }

    /// Apply a partial update to an element.
    ///
    /// Unknown ids are tolerated: stale UI callbacks may reference elements
    /// that were deleted since. Returns whether an element was updated.
    pub fn update_element(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        match self.find_by_id_mut(id) {
            Some(element) => {
                patch.apply(element);
                true
            }
            None => {
                tracing::debug!("Ignoring update for unknown element {id}");
                false
            }
        }
    }

    /// Move an element in the paint order.
    ///
    /// Returns `Ok(false)` when the element is already at the requested end.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn reorder(&mut self, id: &ElementId, direction: ReorderDirection) -> CanvasResult<bool> {
        let index = self
            .position(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        let last = self.elements.len() - 1;
        match direction {
            ReorderDirection::Up if index < last => self.elements.swap(index, index + 1),
            ReorderDirection::Down if index > 0 => self.elements.swap(index, index - 1),
            ReorderDirection::Top if index < last => {
                let element = self.elements.remove(index);
                self.elements.push(element);
            }
            ReorderDirection::Bottom if index > 0 => {
                let element = self.elements.remove(index);
                self.elements.insert(0, element);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Find an element by id.
    #[must_use]
    pub fn find_by_id(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    /// Find an element by id for mutation.
    pub fn find_by_id_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    /// Index of an element in the paint order.
    #[must_use]
    pub fn position(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }

    /// All elements in paint order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable access to all elements in paint order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.iter_mut()
    }

    /// Replace the whole element list.
    pub fn replace_elements(&mut self, elements: Vec<Element>) {
        self.elements = elements;
    }

    /// Topmost element whose rotated box contains the point.
    #[must_use]
    pub fn element_at(&self, x: f64, y: f64) -> Option<&ElementId> {
        self.elements
            .iter()
            .rev()
            .find(|e| e.contains_point(x, y))
            .map(|e| &e.id)
    }

    /// Align an element's bounding box to a workspace edge or centre line.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn align(&mut self, id: &ElementId, alignment: Alignment) -> CanvasResult<()> {
        let (ws_width, ws_height) = (self.workspace.width, self.workspace.height);
        let element = self
            .find_by_id_mut(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        let bounds = element.bounds();
        match alignment {
            Alignment::Left => element.x -= bounds.x,
            Alignment::Center => element.x += (ws_width - bounds.width) / 2.0 - bounds.x,
            Alignment::Right => element.x += ws_width - bounds.right(),
            Alignment::Top => element.y -= bounds.y,
            Alignment::Middle => element.y += (ws_height - bounds.height) / 2.0 - bounds.y,
            Alignment::Bottom => element.y += ws_height - bounds.bottom(),
        }
        Ok(())
    }

    /// Copy an element with a fresh id, offset slightly, directly above it.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn duplicate(&mut self, id: &ElementId) -> CanvasResult<ElementId> {
        let index = self
            .position(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        let mut copy = self.elements[index].clone();
        copy.id = ElementId::new();
        copy.x += DUPLICATE_OFFSET;
        copy.y += DUPLICATE_OFFSET;
        let new_id = copy.id.clone();
        self.elements.insert(index + 1, copy);
        Ok(new_id)
    }

    /// Remove every element, keeping the workspace.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Check if the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: &str) -> Element {
        Element::new(ElementKind::Rectangle {
            width: 100.0,
            height: 50.0,
            corner_radius: 0.0,
        })
        .with_id(ElementId::from_string(id))
    }

    fn ids(scene: &Scene) -> Vec<&str> {
        scene.elements().iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_scene_add_remove() {
        let mut scene = Scene::default();
        assert!(scene.is_empty());
        let id = scene.add_element(rect("a"));
        assert_eq!(scene.element_count(), 1);
        assert!(scene.find_by_id(&id).is_some());

        scene.remove_element(&id).expect("should remove");
        assert!(scene.is_empty());
        assert!(matches!(
            scene.remove_element(&id),
            Err(CanvasError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut scene = Scene::default();
        scene.add_element(rect("a"));
        let before = scene.clone();
        let patch = ElementPatch {
            x: Some(5.0),
            ..ElementPatch::default()
        };
        assert!(!scene.update_element(&ElementId::from_string("gone"), &patch));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_update_applies_kind_fields_only_where_relevant() {
        let mut scene = Scene::default();
        let id = scene.add_element(rect("a"));
        let patch = ElementPatch {
            width: Some(10.0),
            radius: Some(99.0),
            opacity: Some(3.0),
            ..ElementPatch::default()
        };
        assert!(scene.update_element(&id, &patch));
        let element = scene.find_by_id(&id).expect("element");
        assert!((element.opacity - 1.0).abs() < f64::EPSILON);
        assert!(matches!(
            element.kind,
            ElementKind::Rectangle { width, height, .. } if (width - 10.0).abs() < f64::EPSILON && (height - 50.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_reorder_swaps_neighbours() {
        let mut scene = Scene::default();
        for id in ["a", "b", "c"] {
            scene.add_element(rect(id));
        }
        let a = ElementId::from_string("a");
        assert!(scene.reorder(&a, ReorderDirection::Up).expect("reorder"));
        assert_eq!(ids(&scene), ["b", "a", "c"]);
        assert!(scene.reorder(&a, ReorderDirection::Top).expect("reorder"));
        assert_eq!(ids(&scene), ["b", "c", "a"]);
        assert!(!scene.reorder(&a, ReorderDirection::Up).expect("reorder"));
        assert!(scene.reorder(&a, ReorderDirection::Bottom).expect("reorder"));
        assert_eq!(ids(&scene), ["a", "b", "c"]);
        assert!(!scene.reorder(&a, ReorderDirection::Down).expect("reorder"));
    }

    #[test]
    fn test_element_at_prefers_topmost() {
        let mut scene = Scene::default();
        scene.add_element(rect("below"));
        scene.add_element(rect("above"));
        assert_eq!(scene.element_at(10.0, 10.0).map(ElementId::as_str), Some("above"));
        assert!(scene.element_at(500.0, 500.0).is_none());
    }

    #[test]
    fn test_align_to_workspace() {
        let mut scene = Scene::new(Workspace::new(1000.0, 500.0));
        let id = scene.add_element(rect("a").with_position(30.0, 40.0));
        scene.align(&id, Alignment::Right).expect("align");
        scene.align(&id, Alignment::Middle).expect("align");
        let bounds = scene.find_by_id(&id).expect("element").bounds();
        assert!((bounds.right() - 1000.0).abs() < 1e-9);
        assert!((bounds.center().1 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_inserts_above_with_fresh_id() {
        let mut scene = Scene::default();
        scene.add_element(rect("a"));
        scene.add_element(rect("b"));
        let copy = scene
            .duplicate(&ElementId::from_string("a"))
            .expect("duplicate");
        assert_eq!(scene.position(&copy), Some(1));
        let element = scene.find_by_id(&copy).expect("copy");
        assert!((element.x - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_orientation_follows_size() {
        assert_eq!(Workspace::new(1600.0, 800.0).orientation, Orientation::Landscape);
        assert_eq!(Workspace::new(800.0, 1600.0).orientation, Orientation::Portrait);
        assert!(!Workspace::is_valid_size(f64::NAN, 10.0));
    }
}
