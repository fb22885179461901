//! Debounced, fire-and-forget auto-save.
//!
//! Every scene change replaces the pending snapshot and restarts the delay.
//! When the delay elapses without another change the latest snapshot is
//! handed to the persistence collaborator. Editing never waits on a save.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::history::Snapshot;
use crate::store::ScenePersistence;

/// Handle to a running auto-save task.
#[derive(Debug)]
pub struct AutoSaver {
    tx: watch::Sender<Option<Snapshot>>,
    task: JoinHandle<()>,
}

impl AutoSaver {
    /// Spawn the auto-save task on the current tokio runtime.
    pub fn spawn<P>(store: Arc<P>, delay: Duration) -> Self
    where
        P: ScenePersistence + ?Sized + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let task = tokio::spawn(run(store, delay, rx));
        Self { tx, task }
    }

    /// Schedule a save of `snapshot`, cancelling any pending one.
    pub fn schedule(&self, snapshot: Snapshot) {
        self.tx.send_replace(Some(snapshot));
    }

    /// Save anything still pending and stop the task.
    pub async fn shutdown(self) {
        let Self { tx, task } = self;
        drop(tx);
        if let Err(e) = task.await {
            tracing::warn!("Auto-save task ended abnormally: {e}");
        }
    }
}

async fn run<P>(store: Arc<P>, delay: Duration, mut rx: watch::Receiver<Option<Snapshot>>)
where
    P: ScenePersistence + ?Sized,
{
    while rx.changed().await.is_ok() {
        let open = loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break false;
                    }
                }
                () = tokio::time::sleep(delay) => break true,
            }
        };

        let pending = rx.borrow_and_update().clone();
        if let Some(snapshot) = pending {
            save(store.as_ref(), &snapshot).await;
        }
        if !open {
            return;
        }
    }
}

async fn save<P>(store: &P, snapshot: &Snapshot)
where
    P: ScenePersistence + ?Sized,
{
    let document = snapshot.document();
    let workspace = document.workspace();
    match store.save(document, &workspace).await {
        Ok(()) => tracing::debug!("Auto-saved {} elements", document.elements.len()),
        Err(e) => tracing::warn!("Auto-save failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, ElementKind};
    use crate::scene::{Scene, Workspace};
    use crate::schema::SceneDocument;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    fn snapshot_with(count: usize) -> Snapshot {
        let mut scene = Scene::default();
        for _ in 0..count {
            scene.add_element(Element::new(ElementKind::Circle { radius: 1.0 }));
        }
        Snapshot::capture(&scene)
    }

    struct FailingStore;

    #[async_trait]
    impl ScenePersistence for FailingStore {
        async fn save(&self, _: &SceneDocument, _: &Workspace) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn load(&self) -> Result<Option<SceneDocument>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_within_delay_coalesce() {
        let store = Arc::new(MemoryStore::new());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(2));

        saver.schedule(snapshot_with(1));
        tokio::time::sleep(Duration::from_secs(1)).await;
        saver.schedule(snapshot_with(2));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(store.save_count(), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.save_count(), 1);
        let saved = store.latest().expect("saved document");
        assert_eq!(saved.elements.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_save_separately() {
        let store = Arc::new(MemoryStore::new());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(2));

        saver.schedule(snapshot_with(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        saver.schedule(snapshot_with(3));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_save() {
        let store = Arc::new(MemoryStore::new());
        let saver = AutoSaver::spawn(store.clone(), Duration::from_secs(60));
        saver.schedule(snapshot_with(1));
        tokio::task::yield_now().await;
        saver.shutdown().await;
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_does_not_stop_task() {
        let saver = AutoSaver::spawn(Arc::new(FailingStore), Duration::from_millis(10));
        saver.schedule(snapshot_with(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        saver.schedule(snapshot_with(2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!saver.task.is_finished());
    }
}
