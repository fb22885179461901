//! # Design Core
//!
//! Design canvas engine for print products: the scene model, coordinate
//! scaling between workspace sizes, undo/redo history, direct-manipulation
//! transforms and image print-quality assessment.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   EditorState                    │
//! │   UI state (tool, selection)   │   AutoSaver     │
//! ├──────────────────────────────────────────────────┤
//! │  Transform Controller  │  History (snapshots)    │
//! │  - move / resize       │  - commit / undo / redo │
//! │  - rotate / flip       │                         │
//! ├──────────────────────────────────────────────────┤
//! │  Scene + Workspace     │  Scaling Engine         │
//! │  - elements (z-order)  │  - templates            │
//! │  - schema documents    │  - workspace resize     │
//! ├──────────────────────────────────────────────────┤
//! │  Quality Assessor      │  ScenePersistence       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! All geometry lives in the pixel space of the current workspace. Rescaling
//! rewrites element attributes in place and resizes are absorbed into each
//! element's own size attributes, so no element ever carries a hidden scale.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod autosave;
pub mod editor;
pub mod element;
pub mod error;
pub mod history;
pub mod quality;
pub mod scaling;
pub mod scene;
pub mod schema;
pub mod store;
pub mod template;
pub mod transform;

pub use autosave::AutoSaver;
pub use editor::{EditorConfig, EditorState, ShapeKind, Tool, UiState};
pub use element::{Element, ElementId, ElementKind, ImageShape, Paint, Rect, TextAlign, TextShape};
pub use error::{CanvasError, CanvasResult, TransformError};
pub use history::{History, Snapshot};
pub use quality::{DecodedImage, ImageDecoder, QualityLevel, QualityReport};
pub use scaling::{ScaleFactors, IDENTITY_TOLERANCE};
pub use scene::{Alignment, ElementPatch, Orientation, ReorderDirection, Scene, Workspace};
pub use schema::{CanvasSize, ElementDocument, SceneDocument};
pub use store::{FileStore, MemoryStore, ScenePersistence, StoreError};
pub use template::{Template, TemplateCatalog};
pub use transform::{FlipAxis, Handle, ResizeGesture};

/// Design core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
