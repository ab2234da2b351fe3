//! End-to-end editing scenarios: each user-visible operation lands as
//! exactly one undo step, and undo restores the prior document, selection
//! included.

use eframe_compose::{CropToggle, Document, History, InteractionController, PixelSource, Selection};
use egui::pos2;
use image::RgbaImage;

fn source(width: u32, height: u32) -> PixelSource {
    PixelSource::new(RgbaImage::from_pixel(
        width,
        height,
        image::Rgba([120, 120, 120, 255]),
    ))
}

fn populated_history() -> History<Document> {
    let mut doc = Document::default();
    doc.set_base(source(200, 160), "base.png".to_owned());
    History::new(doc)
}

fn commit_added_layer(history: &mut History<Document>, name: &str) -> eframe_compose::LayerId {
    let mut doc = history.current().clone();
    let id = doc.add_layer(source(40, 20), name).unwrap();
    history.commit(doc, "Add Layer");
    id
}

#[test]
fn test_duplicate_then_undo_restores_selection() {
    let mut history = populated_history();
    let a = commit_added_layer(&mut history, "A");

    let mut doc = history.current().clone();
    let copy = doc.duplicate(Selection::Layer(a)).unwrap();
    history.commit(doc, "Duplicate Layer");

    // [A copy, A], the copy selected.
    let ids: Vec<_> = history.current().layers.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![copy, a]);
    assert_eq!(history.current().selection, Selection::Layer(copy));

    assert_eq!(history.undo().as_deref(), Some("Duplicate Layer"));
    let ids: Vec<_> = history.current().layers.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![a]);
    assert_eq!(history.current().selection, Selection::Layer(a));
}

#[test]
fn test_drag_coalesces_to_one_entry() {
    let mut history = populated_history();
    let a = commit_added_layer(&mut history, "A");
    {
        let mut doc = history.current().clone();
        let layer = doc.layer_mut(a).unwrap();
        layer.x = 10.0;
        layer.y = 10.0;
        history.commit(doc, "Move Layer");
    }
    let len = history.len();

    // Press inside the body (clear of the corner handles), then five moves
    // ending 50 right, 30 down.
    let mut controller = InteractionController::default();
    controller.pointer_down(&mut history, pos2(30.0, 15.0));
    for (dx, dy) in [(8.0, 3.0), (17.0, 9.0), (28.0, 16.0), (41.0, 24.0), (50.0, 30.0)] {
        controller.pointer_move(&mut history, pos2(30.0 + dx, 15.0 + dy));
        assert_eq!(history.len(), len);
    }
    assert_eq!(controller.pointer_up(&mut history), Some("Move Layer"));

    assert_eq!(history.len(), len + 1);
    let layer = history.current().layer(a).unwrap();
    assert_eq!((layer.x, layer.y), (60.0, 40.0));

    // And the whole drag is a single undo.
    history.undo();
    let layer = history.current().layer(a).unwrap();
    assert_eq!((layer.x, layer.y), (10.0, 10.0));
}

#[test]
fn test_reorder_is_one_commit_and_undoable() {
    let mut history = populated_history();
    // Insert back to front so the list reads [A, B, C].
    let c = commit_added_layer(&mut history, "C");
    let b = commit_added_layer(&mut history, "B");
    let a = commit_added_layer(&mut history, "A");
    let len = history.len();

    let mut doc = history.current().clone();
    doc.reorder_layer(c, a);
    history.commit(doc, "Reorder Layers");

    let ids: Vec<_> = history.current().layers.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![c, a, b]);
    assert_eq!(history.len(), len + 1);

    assert_eq!(history.undo().as_deref(), Some("Reorder Layers"));
    let ids: Vec<_> = history.current().layers.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![a, b, c]);
}

#[test]
fn test_crop_flow_commits_once_and_undoes_clean() {
    let mut history = populated_history();
    let a = commit_added_layer(&mut history, "A");
    {
        let mut doc = history.current().clone();
        let layer = doc.layer_mut(a).unwrap();
        layer.x = 20.0;
        layer.y = 20.0;
        layer.scale = 1.0;
        history.commit(doc, "Move Layer");
    }
    let before = history.current().clone();
    let len = history.len();

    let mut controller = InteractionController::default();
    assert_eq!(controller.toggle_crop_mode(&mut history), CropToggle::Armed);
    controller.pointer_down(&mut history, pos2(25.0, 25.0));
    controller.pointer_move(&mut history, pos2(45.0, 35.0));
    // Releasing keeps the box pending; nothing is committed yet.
    assert_eq!(controller.pointer_up(&mut history), None);
    assert_eq!(history.len(), len);

    assert_eq!(
        controller.toggle_crop_mode(&mut history),
        CropToggle::Applied
    );
    assert_eq!(history.len(), len + 1);
    let layer = history.current().layer(a).unwrap();
    assert_eq!(layer.source.image().dimensions(), (20, 10));
    assert_eq!((layer.x, layer.y), (25.0, 25.0));
    assert_eq!(layer.scale, 1.0);

    history.undo();
    assert_eq!(*history.current(), before);
}

#[test]
fn test_delete_then_undo_brings_layer_back() {
    let mut history = populated_history();
    let a = commit_added_layer(&mut history, "A");

    let mut doc = history.current().clone();
    doc.delete_layer(a);
    history.commit(doc, "Delete Layer");
    assert!(history.current().layers.is_empty());
    assert_eq!(history.current().selection, Selection::Base);

    history.undo();
    assert!(history.current().layer(a).is_some());
    assert_eq!(history.current().selection, Selection::Layer(a));
}

#[test]
fn test_replace_commits_new_source_with_preserved_height() {
    let mut history = populated_history();
    let a = commit_added_layer(&mut history, "A");
    let old_source = history.current().layer(a).unwrap().source.clone();
    let old_height = history.current().layer(a).unwrap().height();

    let mut doc = history.current().clone();
    doc.replace_layer_image(a, source(10, 80), "tall.png");
    history.commit(doc, "Replace Layer");

    let layer = history.current().layer(a).unwrap();
    assert_ne!(layer.source, old_source);
    assert_eq!(layer.name, "tall.png");
    assert!((layer.height() - old_height).abs() < 1e-3);

    history.undo();
    assert_eq!(history.current().layer(a).unwrap().source, old_source);
}

#[test]
fn test_staged_selection_change_is_not_an_entry() {
    let mut history = populated_history();
    let a = commit_added_layer(&mut history, "A");
    let len = history.len();

    // Clicking empty canvas stages a selection change without a commit.
    let mut controller = InteractionController::default();
    controller.pointer_down(&mut history, pos2(190.0, 150.0));
    controller.pointer_up(&mut history);
    assert_eq!(history.current().selection, Selection::Base);
    assert_eq!(history.len(), len);

    // The next real commit carries the staged selection along.
    let mut doc = history.current().clone();
    doc.duplicate(Selection::Base).unwrap();
    history.commit(doc, "Duplicate Layer");
    history.undo();
    assert_eq!(history.current().selection, Selection::Layer(a));
}
