//! Scene persistence collaborator and its built-in stores.
//!
//! The editor only ever talks to [`ScenePersistence`]. [`FileStore`] keeps one
//! pretty-printed JSON file per design session on disk; [`MemoryStore`] keeps
//! the latest save in process and doubles as a local fallback.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::scene::Workspace;
use crate::schema::{CanvasSize, SceneDocument};

/// Default session identifier.
pub const DEFAULT_SESSION: &str = "default";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backing service refused or failed the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator for the editor.
///
/// Failures are reported to the caller, which treats them as non-fatal.
#[async_trait]
pub trait ScenePersistence: Send + Sync {
    /// Persist a serialized scene together with its workspace settings.
    async fn save(&self, document: &SceneDocument, workspace: &Workspace) -> Result<(), StoreError>;

    /// Fetch the last saved scene, if any.
    async fn load(&self) -> Result<Option<SceneDocument>, StoreError>;
}

/// On-disk record: the scene plus the workspace settings it was saved with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDesign {
    scene: SceneDocument,
    workspace: Workspace,
}

impl StoredDesign {
    /// Workspace settings win over whatever the scene document carries.
    fn into_document(self) -> SceneDocument {
        let mut document = self.scene;
        document.canvas_size = CanvasSize {
            width: self.workspace.width,
            height: self.workspace.height,
        };
        document.background_color = self.workspace.background_color;
        document.orientation = Some(self.workspace.orientation);
        document
    }
}

/// JSON file store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store for `session_id` under `data_dir`.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl AsRef<Path>, session_id: &str) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(format!("{}.json", sanitize_filename(session_id))),
        })
    }

    /// File this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ScenePersistence for FileStore {
    async fn save(&self, document: &SceneDocument, workspace: &Workspace) -> Result<(), StoreError> {
        let record = StoredDesign {
            scene: document.clone(),
            workspace: workspace.clone(),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json).await?;
        tracing::debug!("Saved design to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<SceneDocument>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: StoredDesign = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(record.into_document()))
    }
}

/// In-process store holding the most recent save.
#[derive(Debug, Default)]
pub struct MemoryStore {
    latest: Mutex<Option<SceneDocument>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a document.
    #[must_use]
    pub fn with_document(document: SceneDocument) -> Self {
        Self {
            latest: Mutex::new(Some(document)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The most recently saved document.
    #[must_use]
    pub fn latest(&self) -> Option<SceneDocument> {
        self.latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ScenePersistence for MemoryStore {
    async fn save(&self, document: &SceneDocument, workspace: &Workspace) -> Result<(), StoreError> {
        let record = StoredDesign {
            scene: document.clone(),
            workspace: workspace.clone(),
        };
        *self
            .latest
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(record.into_document());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> Result<Option<SceneDocument>, StoreError> {
        Ok(self.latest())
    }
}

/// Sanitize a session ID for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, ElementKind};
    use crate::scene::{Orientation, Scene};

    fn sample_scene() -> Scene {
        let mut scene = Scene::new(Workspace::new(1600.0, 800.0));
        scene.add_element(Element::new(ElementKind::Circle { radius: 40.0 }).with_position(100.0, 100.0));
        scene
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("order-42"), "order-42");
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path(), "order/7").expect("store");
        assert!(store.path().ends_with("order_7.json"));
        assert!(store.load().await.expect("load").is_none());

        let scene = sample_scene();
        let document = SceneDocument::from_scene(&scene);
        store.save(&document, &scene.workspace).await.expect("save");

        let loaded = store.load().await.expect("load").expect("document");
        assert_eq!(loaded.to_scene(), scene);
    }

    #[tokio::test]
    async fn test_workspace_settings_override_document() {
        let scene = sample_scene();
        let document = SceneDocument::from_scene(&scene);
        let mut workspace = scene.workspace.clone();
        workspace.background_color = "#112233".to_string();

        let store = MemoryStore::new();
        store.save(&document, &workspace).await.expect("save");
        let loaded = store.load().await.expect("load").expect("document");
        assert_eq!(loaded.background_color, "#112233");
        assert_eq!(loaded.orientation, Some(Orientation::Landscape));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_reports_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::new(dir.path(), DEFAULT_SESSION).expect("store");
        std::fs::write(store.path(), "not json").expect("write");
        assert!(matches!(store.load().await, Err(StoreError::Serialization(_))));
    }
}
