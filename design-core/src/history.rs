//! Linear undo/redo history of scene snapshots.

use std::sync::Arc;

use crate::scene::Scene;
use crate::schema::SceneDocument;

/// Immutable copy of a scene in its serialized form.
///
/// Cloning is cheap; clones share the same document.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot(Arc<SceneDocument>);

impl Snapshot {
    /// Capture the current state of a scene.
    #[must_use]
    pub fn capture(scene: &Scene) -> Self {
        Self(Arc::new(SceneDocument::from_scene(scene)))
    }

    /// Wrap an existing document.
    #[must_use]
    pub fn from_document(document: SceneDocument) -> Self {
        Self(Arc::new(document))
    }

    /// Rebuild a runtime scene from this snapshot.
    #[must_use]
    pub fn restore(&self) -> Scene {
        self.0.to_scene()
    }

    /// The serialized document.
    #[must_use]
    pub fn document(&self) -> &SceneDocument {
        &self.0
    }
}

/// Undo/redo stack with a current index.
///
/// Never empty: the entry at `index` is always the scene being displayed.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
}

impl History {
    /// Start a history whose only entry is `initial`.
    #[must_use]
    pub fn new(initial: &Scene) -> Self {
        Self {
            snapshots: vec![Snapshot::capture(initial)],
            index: 0,
        }
    }

    /// Record a new state, discarding any redo entries.
    pub fn commit(&mut self, scene: &Scene) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(Snapshot::capture(scene));
        self.index = self.snapshots.len() - 1;
        tracing::debug!("History commit -> index {}", self.index);
    }

    /// Step back. Returns `None` (and changes nothing) at the first entry.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        tracing::debug!("History undo -> index {}", self.index);
        self.snapshots.get(self.index)
    }

    /// Step forward. Returns `None` (and changes nothing) at the last entry.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        tracing::debug!("History redo -> index {}", self.index);
        self.snapshots.get(self.index)
    }

    /// Drop every entry and start over from `scene`.
    pub fn reset(&mut self, scene: &Scene) {
        self.snapshots = vec![Snapshot::capture(scene)];
        self.index = 0;
    }

    /// Snapshot at the current index.
    #[must_use]
    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.index]
    }

    /// Current index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Check whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Check whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, ElementKind};

    fn scene_with(count: usize) -> Scene {
        let mut scene = Scene::default();
        for i in 0..count {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64 * 10.0;
            scene.add_element(Element::new(ElementKind::Circle { radius: 5.0 }).with_position(offset, offset));
        }
        scene
    }

    #[test]
    fn test_undo_redo_walks_snapshots() {
        let s0 = scene_with(0);
        let s1 = scene_with(1);
        let mut history = History::new(&s0);
        history.commit(&s1);
        assert_eq!(history.len(), 2);

        let undone = history.undo().expect("undo").restore();
        assert_eq!(undone, s0);
        assert!(history.undo().is_none());
        assert_eq!(history.index(), 0);

        let redone = history.redo().expect("redo").restore();
        assert_eq!(redone.element_count(), 1);
        assert!(history.redo().is_none());
        assert_eq!(history.index(), 1);
    }

    #[test]
    fn test_commit_truncates_future() {
        let mut history = History::new(&scene_with(0));
        history.commit(&scene_with(1));
        history.commit(&scene_with(2));
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.commit(&scene_with(3));
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), 1);
        assert!(!history.can_redo());
        assert_eq!(history.current().document().elements.len(), 3);
    }

    #[test]
    fn test_reset_leaves_single_entry() {
        let mut history = History::new(&scene_with(0));
        history.commit(&scene_with(1));
        history.reset(&scene_with(2));
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo() && !history.can_redo());
        assert!(!history.is_empty());
    }
}
