//! The editor aggregate: scene, history and UI-only state in one place.
//!
//! Every mutating action goes through [`EditorState`], which applies the
//! change to the scene and records exactly one history entry for it. Rejected
//! actions change nothing and record nothing. Transient UI fields (tool,
//! selection) are never part of the scene or its snapshots.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::autosave::AutoSaver;
use crate::element::{Element, ElementId, ElementKind, ImageShape, Paint, TextAlign, TextShape};
use crate::error::TransformError;
use crate::history::{History, Snapshot};
use crate::quality::{self, ImageDecoder, QualityReport};
use crate::scaling::{self, ScaleFactors, IDENTITY_TOLERANCE};
use crate::scene::{Alignment, ElementPatch, Orientation, ReorderDirection, Scene, Workspace};
use crate::schema::SceneDocument;
use crate::store::{ScenePersistence, StoreError};
use crate::template::Template;
use crate::transform::{self, FlipAxis, ResizeGesture};
use crate::{CanvasError, CanvasResult};

/// Default auto-save debounce delay.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

const DEFAULT_TEXT_SIZE: f64 = 48.0;
const DEFAULT_SHAPE_FILL: &str = "#3b82f6";
const DEFAULT_OUTLINE: &str = "#000000";

/// Editor settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Quiet period after the last change before an auto-save runs.
    pub autosave_delay: Duration,
    /// Scale factors this close to 1.0 leave geometry untouched.
    pub identity_tolerance: f64,
    /// Workspace a fresh editor starts with.
    pub workspace: Workspace,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            identity_tolerance: IDENTITY_TOLERANCE,
            workspace: Workspace::default(),
        }
    }
}

/// Active editing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Select and transform elements.
    #[default]
    Select,
    /// Place text.
    Text,
    /// Place shapes.
    Shape,
    /// Place images.
    Image,
}

/// Shapes offered by the shape tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// Rectangle.
    Rectangle,
    /// Circle.
    Circle,
    /// Five-pointed star.
    Star,
    /// Hexagon.
    Polygon,
    /// Straight arrow.
    Arrow,
    /// Straight line.
    Line,
}

/// Transient, never-persisted UI state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    /// Current tool.
    pub tool: Tool,
    /// Selected element, if any.
    pub selection: Option<ElementId>,
}

/// Explicit editor state: the scene, its history and UI-only fields.
#[derive(Debug)]
pub struct EditorState {
    scene: Scene,
    history: History,
    ui: UiState,
    config: EditorConfig,
    autosaver: Option<AutoSaver>,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorState {
    /// Create an editor with an empty scene on the configured workspace.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let scene = Scene::new(config.workspace.clone());
        let history = History::new(&scene);
        Self {
            scene,
            history,
            ui: UiState::default(),
            config,
            autosaver: None,
        }
    }

    /// Start debounced auto-saving to `store`. Requires a tokio runtime.
    pub fn enable_autosave(&mut self, store: Arc<dyn ScenePersistence>) {
        self.autosaver = Some(AutoSaver::spawn(store, self.config.autosave_delay));
    }

    /// Flush any pending auto-save and stop the background task.
    pub async fn shutdown(mut self) {
        if let Some(saver) = self.autosaver.take() {
            saver.shutdown().await;
        }
    }

    /// Current scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Undo/redo history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// UI-only state.
    #[must_use]
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Editor settings.
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Switch the active tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.ui.tool = tool;
    }

    /// Select an element, or clear the selection with `None`.
    ///
    /// Returns `false` (and clears the selection) if the id is unknown.
    pub fn select(&mut self, id: Option<ElementId>) -> bool {
        match id {
            Some(id) if self.scene.find_by_id(&id).is_some() => {
                self.ui.selection = Some(id);
                true
            }
            Some(id) => {
                tracing::debug!("Ignoring selection of unknown element {id}");
                self.ui.selection = None;
                false
            }
            None => {
                self.ui.selection = None;
                true
            }
        }
    }

    /// Select the topmost element under a workspace point.
    pub fn select_at(&mut self, x: f64, y: f64) -> Option<&ElementId> {
        self.ui.selection = self.scene.element_at(x, y).cloned();
        self.ui.selection.as_ref()
    }

    /// The selected element.
    #[must_use]
    pub fn selected_element(&self) -> Option<&Element> {
        self.ui
            .selection
            .as_ref()
            .and_then(|id| self.scene.find_by_id(id))
    }

    /// Snapshot to hand to the export pipeline.
    #[must_use]
    pub fn export_snapshot(&self) -> Snapshot {
        self.history.current().clone()
    }

    // -----------------------------------------------------------------------
    // Element actions
    // -----------------------------------------------------------------------

    /// Add an element on top, select it and commit.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = self.scene.add_element(element);
        self.ui.selection = Some(id.clone());
        self.commit();
        id
    }

    /// Add a text element at the workspace centre.
    pub fn add_text(&mut self, content: impl Into<String>) -> ElementId {
        let element = text_element(content.into(), &self.scene.workspace);
        self.add_element(element)
    }

    /// Add a default shape at the workspace centre.
    pub fn add_shape(&mut self, shape: ShapeKind) -> ElementId {
        let element = shape_element(shape, &self.scene.workspace);
        self.add_element(element)
    }

    /// Add a vector icon (an image source with no quality report) at the centre.
    pub fn add_icon(&mut self, source: impl Into<String>) -> ElementId {
        let workspace = &self.scene.workspace;
        let size = workspace.width.min(workspace.height) / 6.0;
        let element = centred_image(source.into(), size, size, None, None, workspace);
        self.add_element(element)
    }

    /// Decode, assess and place an uploaded image at the centre.
    ///
    /// The decoded bitmap handle replaces `source` when decoding succeeds.
    /// A decode failure still places the image, with an unknown report.
    pub fn add_image<D: ImageDecoder>(
        &mut self,
        decoder: &D,
        bytes: &[u8],
        source: impl Into<String>,
    ) -> ElementId {
        let workspace = &self.scene.workspace;
        let (decoded, report) = quality::assess_bytes(decoder, bytes, workspace);
        let element = match decoded {
            Some(decoded) => {
                let (width, height) =
                    fit_within(decoded.natural_width, decoded.natural_height, workspace);
                centred_image(
                    decoded.handle,
                    width,
                    height,
                    Some((decoded.natural_width, decoded.natural_height)),
                    Some(report),
                    workspace,
                )
            }
            None => {
                let size = workspace.width.min(workspace.height) / 4.0;
                centred_image(source.into(), size, size, None, Some(report), workspace)
            }
        };
        self.add_element(element)
    }

    /// Delete an element.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ElementNotFound`] if the id is unknown.
    pub fn delete(&mut self, id: &ElementId) -> CanvasResult<Element> {
        let removed = self.scene.remove_element(id)?;
        if self.ui.selection.as_ref() == Some(id) {
            self.ui.selection = None;
        }
        self.commit();
        Ok(removed)
    }

    /// Apply a property edit. Unknown ids and empty patches are no-ops.
    ///
    /// A locked element only accepts styling, content and lock changes; a
    /// patch that would move, rotate or resize it is refused without a commit.
    pub fn update(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let locked = self.scene.find_by_id(id).is_some_and(|e| e.locked);
        if locked && patch.touches_geometry() {
            tracing::debug!("Refusing geometry patch on locked element {id}");
            return false;
        }
        if patch.is_empty() || !self.scene.update_element(id, patch) {
            return false;
        }
        self.commit();
        true
    }

    /// Run several scene mutations as one logical action with a single commit.
    pub fn batch<R>(&mut self, edit: impl FnOnce(&mut Scene) -> R) -> R {
        let result = edit(&mut self.scene);
        self.prune_selection();
        self.commit();
        result
    }

    /// Move an element in the paint order. Commits only if it moved.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ElementNotFound`] if the id is unknown.
    pub fn reorder(&mut self, id: &ElementId, direction: ReorderDirection) -> CanvasResult<bool> {
        let moved = self.scene.reorder(id, direction)?;
        if moved {
            self.commit();
        }
        Ok(moved)
    }

    /// Align an element to a workspace edge or centre line.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is unknown or locked.
    pub fn align(&mut self, id: &ElementId, alignment: Alignment) -> CanvasResult<()> {
        let element = self
            .scene
            .find_by_id(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))?;
        if element.locked {
            return Err(TransformError::Locked(id.clone()).into());
        }
        self.scene.align(id, alignment)?;
        self.commit();
        Ok(())
    }

    /// Duplicate an element and select the copy.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ElementNotFound`] if the id is unknown.
    pub fn duplicate(&mut self, id: &ElementId) -> CanvasResult<ElementId> {
        let copy = self.scene.duplicate(id)?;
        self.ui.selection = Some(copy.clone());
        self.commit();
        Ok(copy)
    }

    // -----------------------------------------------------------------------
    // Transform gestures on the selection
    // -----------------------------------------------------------------------

    fn transform_selected<T>(
        &mut self,
        gesture: impl FnOnce(&mut Element) -> Result<T, TransformError>,
    ) -> CanvasResult<T> {
        let id = self.ui.selection.clone().ok_or(TransformError::NoSelection)?;
        let element = self
            .scene
            .find_by_id_mut(&id)
            .ok_or(TransformError::Missing(id))?;
        let result = gesture(element)?;
        self.commit();
        Ok(result)
    }

    /// Drag the selection by a delta.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected or it is locked.
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> CanvasResult<()> {
        self.transform_selected(|e| transform::move_by(e, dx, dy))
    }

    /// Apply a resize-handle drag to the selection.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected, it is locked, or
    /// the drag collapses the element.
    pub fn resize_selected(&mut self, gesture: &ResizeGesture) -> CanvasResult<ScaleFactors> {
        self.transform_selected(|e| transform::resize_with_handle(e, gesture))
    }

    /// Scale the selection about its origin by explicit factors.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected, it is locked, or
    /// the factors are invalid.
    pub fn scale_selected(&mut self, factors: ScaleFactors) -> CanvasResult<()> {
        self.transform_selected(|e| transform::resize(e, factors))
    }

    /// Set the selection's rotation.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected or it is locked.
    pub fn rotate_selected_to(&mut self, degrees: f64) -> CanvasResult<()> {
        self.transform_selected(|e| transform::rotate_to(e, degrees))
    }

    /// Rotate the selection by the toolbar step.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected or it is locked.
    pub fn rotate_selected_step(&mut self) -> CanvasResult<()> {
        self.transform_selected(transform::rotate_step)
    }

    /// Rotate the selection so its rotation handle faces a pointer position.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected or it is locked.
    pub fn rotate_selected_toward(&mut self, x: f64, y: f64) -> CanvasResult<()> {
        self.transform_selected(|e| transform::rotate_toward(e, x, y))
    }

    /// Mirror the selection on one axis.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] if nothing is selected or it is locked.
    pub fn flip_selected(&mut self, axis: FlipAxis) -> CanvasResult<()> {
        self.transform_selected(|e| transform::flip(e, axis))
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Step back one entry. Returns `false` at the start of history.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.scene = snapshot.restore();
        self.after_time_travel();
        true
    }

    /// Step forward one entry. Returns `false` at the end of history.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.scene = snapshot.restore();
        self.after_time_travel();
        true
    }

    fn after_time_travel(&mut self) {
        self.prune_selection();
        self.schedule_save();
    }

    // -----------------------------------------------------------------------
    // Workspace and whole-scene actions
    // -----------------------------------------------------------------------

    /// Replace the design with a template laid out for the current workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be mapped onto the workspace.
    pub fn load_template(&mut self, template: &Template) -> CanvasResult<()> {
        let elements = template.instantiate(&self.scene.workspace, self.config.identity_tolerance)?;
        tracing::info!(
            "Loaded template {:?} with {} elements",
            template.name,
            elements.len()
        );
        self.scene.replace_elements(elements);
        self.scene.workspace.background_color = template.background_color().to_string();
        self.ui.selection = None;
        self.commit();
        Ok(())
    }

    /// Resize the workspace, remapping every element and re-assessing images.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidWorkspace`] for a degenerate size.
    pub fn resize_workspace(&mut self, width: f64, height: f64) -> CanvasResult<bool> {
        let scaled =
            scaling::rescale_scene(&mut self.scene, width, height, self.config.identity_tolerance)?;
        reassess_images(&mut self.scene);
        self.commit();
        Ok(scaled)
    }

    /// Switch the workspace orientation.
    ///
    /// When the current size already fits `orientation` only the flag changes
    /// and elements keep their absolute pixel positions. Otherwise width and
    /// height swap and every element is remapped per axis, the same way a
    /// workspace resize is. Returns whether anything changed.
    pub fn set_orientation(&mut self, orientation: Orientation) -> bool {
        let Workspace {
            width,
            height,
            orientation: current,
            ..
        } = self.scene.workspace;
        if current == orientation {
            return false;
        }
        if Orientation::for_size(width, height) != orientation {
            if let Err(e) = scaling::rescale_scene(
                &mut self.scene,
                height,
                width,
                self.config.identity_tolerance,
            ) {
                tracing::warn!("Orientation change to {orientation:?} rejected: {e}");
                return false;
            }
            tracing::debug!("Orientation {orientation:?}: workspace now {height}x{width}");
        }
        self.scene.workspace.orientation = orientation;
        reassess_images(&mut self.scene);
        self.commit();
        true
    }

    /// Change the workspace background colour.
    pub fn set_background(&mut self, color: impl Into<String>) {
        self.scene.workspace.background_color = color.into();
        self.commit();
    }

    /// Remove every element, keeping the workspace.
    pub fn clear(&mut self) {
        self.scene.clear();
        self.ui.selection = None;
        self.commit();
    }

    /// Replace the scene with a persisted document and restart history from it.
    pub fn restore(&mut self, document: &SceneDocument) {
        self.scene = document.to_scene();
        self.history.reset(&self.scene);
        self.ui.selection = None;
        tracing::info!(
            "Restored design with {} elements",
            self.scene.element_count()
        );
    }

    /// Load the last saved design from `store`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the current scene is left untouched.
    pub async fn restore_from(&mut self, store: &dyn ScenePersistence) -> Result<bool, StoreError> {
        match store.load().await? {
            Some(document) => {
                self.restore(&document);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn commit(&mut self) {
        self.history.commit(&self.scene);
        self.schedule_save();
    }

    fn schedule_save(&self) {
        if let Some(saver) = &self.autosaver {
            saver.schedule(self.history.current().clone());
        }
    }

    fn prune_selection(&mut self) {
        if let Some(id) = &self.ui.selection {
            if self.scene.find_by_id(id).is_none() {
                self.ui.selection = None;
            }
        }
    }
}

/// Refresh quality reports for images whose natural size is known.
fn reassess_images(scene: &mut Scene) {
    let workspace = scene.workspace.clone();
    for element in scene.elements_mut() {
        if let ElementKind::Image(ImageShape {
            natural_width: Some(nw),
            natural_height: Some(nh),
            quality,
            ..
        }) = &mut element.kind
        {
            *quality = Some(quality::assess(*nw, *nh, &workspace));
        }
    }
}

/// Largest size within half the workspace that keeps the image's aspect.
fn fit_within(natural_width: u32, natural_height: u32, workspace: &Workspace) -> (f64, f64) {
    let (nw, nh) = (f64::from(natural_width.max(1)), f64::from(natural_height.max(1)));
    let scale = (workspace.width / 2.0 / nw)
        .min(workspace.height / 2.0 / nh)
        .min(1.0);
    (nw * scale, nh * scale)
}

fn centred_image(
    source: String,
    width: f64,
    height: f64,
    natural: Option<(u32, u32)>,
    quality: Option<QualityReport>,
    workspace: &Workspace,
) -> Element {
    Element::new(ElementKind::Image(ImageShape {
        source,
        width,
        height,
        natural_width: natural.map(|(w, _)| w),
        natural_height: natural.map(|(_, h)| h),
        quality,
    }))
    .with_paint(Paint {
        fill: None,
        stroke: None,
        stroke_width: 0.0,
    })
    .with_position((workspace.width - width) / 2.0, (workspace.height - height) / 2.0)
}

/// A default text element centred on the workspace.
#[must_use]
pub fn text_element(content: String, workspace: &Workspace) -> Element {
    let shape = TextShape {
        content,
        font_family: "Arial".to_string(),
        font_size: DEFAULT_TEXT_SIZE,
        align: TextAlign::Center,
        line_height: 1.2,
        width: None,
    };
    let (width, height) = (shape.box_width(), shape.box_height());
    Element::new(ElementKind::Text(shape)).with_position(
        (workspace.width - width) / 2.0,
        (workspace.height - height) / 2.0,
    )
}

/// A default shape centred on the workspace.
#[must_use]
pub fn shape_element(shape: ShapeKind, workspace: &Workspace) -> Element {
    let (cx, cy) = (workspace.width / 2.0, workspace.height / 2.0);
    let size = workspace.width.min(workspace.height) / 4.0;
    let filled = Paint {
        fill: Some(DEFAULT_SHAPE_FILL.to_string()),
        stroke: None,
        stroke_width: 0.0,
    };
    let outlined = Paint {
        fill: Some(DEFAULT_OUTLINE.to_string()),
        stroke: Some(DEFAULT_OUTLINE.to_string()),
        stroke_width: 4.0,
    };
    let (kind, x, y, paint) = match shape {
        ShapeKind::Rectangle => (
            ElementKind::Rectangle {
                width: size * 1.5,
                height: size,
                corner_radius: 0.0,
            },
            cx - size * 0.75,
            cy - size / 2.0,
            filled,
        ),
        ShapeKind::Circle => (ElementKind::Circle { radius: size / 2.0 }, cx, cy, filled),
        ShapeKind::Star => (
            ElementKind::Star {
                num_points: 5,
                inner_radius: size / 5.0,
                outer_radius: size / 2.0,
            },
            cx,
            cy,
            filled,
        ),
        ShapeKind::Polygon => (
            ElementKind::Polygon {
                sides: 6,
                radius: size / 2.0,
            },
            cx,
            cy,
            filled,
        ),
        ShapeKind::Arrow => (
            ElementKind::Arrow {
                points: vec![0.0, 0.0, size * 1.5, 0.0],
                closed: false,
                pointer_length: size / 8.0,
                pointer_width: size / 8.0,
            },
            cx - size * 0.75,
            cy,
            outlined,
        ),
        ShapeKind::Line => (
            ElementKind::Line {
                points: vec![0.0, 0.0, size * 1.5, 0.0],
                closed: false,
            },
            cx - size * 0.75,
            cy,
            Paint {
                fill: None,
                ..outlined
            },
        ),
    };
    Element::new(kind).with_position(x, y).with_paint(paint)
}
