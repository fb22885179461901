//! End-to-end editor flows: templates, workspace changes, auto-save and restore.

use std::sync::Arc;
use std::time::Duration;

use design_core::{
    EditorConfig, EditorState, ElementKind, ElementPatch, FileStore, MemoryStore, Orientation,
    ScenePersistence, ShapeKind, TemplateCatalog, Workspace,
};

const CATALOG: &str = r##"[
    {
        "name": "Banner",
        "orientation": "landscape",
        "canvasSize": { "width": 2400, "height": 1200 },
        "backgroundColor": "#fef3c7",
        "elements": [
            { "id": "panel", "type": "rect", "x": 0, "y": 0, "width": 600, "height": 1200, "draggable": false },
            { "id": "headline", "type": "text", "x": 900, "y": 300, "text": "SALE", "fontSize": 150 },
            { "id": "badge", "type": "mystery-shape", "x": 10, "y": 10 }
        ]
    }
]"##;

fn editor_at(width: f64, height: f64) -> EditorState {
    EditorState::new(EditorConfig {
        workspace: Workspace::new(width, height),
        ..EditorConfig::default()
    })
}

#[test]
fn test_template_load_into_smaller_workspace() {
    let catalog = TemplateCatalog::from_json(CATALOG).expect("catalog");
    let template = catalog.get("Banner").expect("template");
    let mut editor = editor_at(1600.0, 800.0);

    editor.load_template(template).expect("load");
    let scene = editor.scene();
    // The unknown kind is skipped, the rest are scaled by 2/3.
    assert_eq!(scene.element_count(), 2);
    assert_eq!(scene.workspace.background_color, "#fef3c7");

    let panel = &scene.elements()[0];
    assert!(!panel.locked);
    assert!(panel.x.abs() < 1e-9 && panel.y.abs() < 1e-9);
    let ElementKind::Rectangle { width, height, .. } = panel.kind else {
        panic!("expected rectangle");
    };
    assert!((width - 400.0).abs() < 1e-9);
    assert!((height - 800.0).abs() < 1e-9);

    let ElementKind::Text(text) = &scene.elements()[1].kind else {
        panic!("expected text");
    };
    assert!((text.font_size - 100.0).abs() < 1e-9);

    assert_eq!(editor.history().len(), 2);
    assert!(editor.undo());
    assert!(editor.scene().is_empty());
}

#[test]
fn test_workspace_resize_then_back_restores_design() {
    let mut editor = editor_at(2400.0, 1200.0);
    editor.add_shape(ShapeKind::Star);
    editor.add_text("Grand opening");
    let original = editor.scene().elements().to_vec();

    assert!(editor.resize_workspace(1200.0, 600.0).expect("shrink"));
    assert!(editor.resize_workspace(2400.0, 1200.0).expect("grow"));
    for (before, after) in original.iter().zip(editor.scene().elements()) {
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        assert_eq!(before.kind.type_name(), after.kind.type_name());
    }
    // Tiny changes are an identity skip but still a recorded action.
    assert!(!editor.resize_workspace(2410.0, 1205.0).expect("nudge"));
    assert_eq!(editor.history().len(), 6);
}

#[test]
fn test_orientation_round_trip_keeps_geometry() {
    let mut editor = editor_at(2400.0, 1200.0);
    let id = editor.add_shape(ShapeKind::Rectangle);
    let before = editor.scene().find_by_id(&id).cloned();

    editor.set_orientation(Orientation::Portrait);
    editor.set_orientation(Orientation::Landscape);
    assert_eq!(editor.scene().find_by_id(&id).cloned(), before);
    assert_eq!(editor.scene().workspace.width, 2400.0);
}

#[test]
fn test_orientation_swap_keeps_design_on_canvas() {
    let mut editor = editor_at(2400.0, 1200.0);
    let rect = editor.add_shape(ShapeKind::Rectangle);
    editor.add_shape(ShapeKind::Star);
    editor.add_text("Right edge");
    assert!(editor.update(
        &rect,
        &ElementPatch {
            x: Some(1800.0),
            ..ElementPatch::default()
        }
    ));

    assert!(editor.set_orientation(Orientation::Portrait));
    let workspace = &editor.scene().workspace;
    assert_eq!((workspace.width, workspace.height), (1200.0, 2400.0));
    for element in editor.scene().elements() {
        let bounds = element.bounds();
        assert!(bounds.x >= -1e-9 && bounds.y >= -1e-9, "{bounds:?}");
        assert!(bounds.right() <= workspace.width + 1e-9, "{bounds:?}");
        assert!(bounds.bottom() <= workspace.height + 1e-9, "{bounds:?}");
    }
    let moved = editor.scene().find_by_id(&rect).expect("rect");
    assert!((moved.x - 900.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_autosave_debounces_edits() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = EditorState::default();
    editor.enable_autosave(store.clone());

    editor.add_shape(ShapeKind::Circle);
    editor.add_shape(ShapeKind::Polygon);
    editor.set_background("#000000");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.save_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(store.save_count(), 1);
    let saved = store.latest().expect("saved");
    assert_eq!(saved.elements.len(), 2);
    assert_eq!(saved.background_color, "#000000");

    editor.add_text("late edit");
    editor.shutdown().await;
    assert_eq!(store.save_count(), 2);
}

#[tokio::test]
async fn test_restore_from_file_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(dir.path(), "order-1001").expect("store");

    let mut editor = editor_at(800.0, 1600.0);
    editor.add_text("Portrait tent");
    editor.add_shape(ShapeKind::Arrow);
    let snapshot = editor.export_snapshot();
    let document = snapshot.document();
    store
        .save(document, &document.workspace())
        .await
        .expect("save");

    let mut restored = EditorState::default();
    assert!(restored.restore_from(&store).await.expect("restore"));
    assert_eq!(restored.scene(), editor.scene());
    assert_eq!(restored.history().len(), 1);
    assert_eq!(restored.scene().workspace.orientation, Orientation::Portrait);
}
