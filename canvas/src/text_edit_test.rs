#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use super::*;
use crate::camera::{Point, Viewport};
use crate::doc::ObjectKind;

fn setup() -> (SceneGraph, ViewTransform, CommandStack, TextEditBridge) {
    let mut view = ViewTransform::default();
    view.set_viewport(Viewport { width: 800.0, height: 600.0, pixel_density: 1.0 });
    (SceneGraph::new(), view, CommandStack::default(), TextEditBridge::new())
}

fn text_obj(text: &str) -> BoardObject {
    BoardObject::text(Uuid::new_v4(), 10.0, 20.0, 100.0, 30.0, text)
}

// =============================================================
// start
// =============================================================

#[test]
fn start_edit_places_overlay_through_view() {
    let (mut scene, mut view, _, mut bridge) = setup();
    let obj = text_obj("hello");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    view.zoom_by(2.0, Point::new(0.0, 0.0));
    view.pan_by(5.0, 5.0);

    let placement = bridge.start_edit(id, &mut scene, &view).unwrap();
    assert_eq!(placement.rect, Rect::new(25.0, 45.0, 200.0, 60.0));
    assert_eq!(placement.text, "hello");
    assert_eq!(placement.font_size_px, 32.0);
    assert!(bridge.is_editing());
    assert_eq!(bridge.editing_id(), Some(id));
}

#[test]
fn start_edit_rejects_missing_and_non_text() {
    let (mut scene, view, _, mut bridge) = setup();
    let missing = Uuid::new_v4();
    assert_eq!(bridge.start_edit(missing, &mut scene, &view), Err(SceneError::NotFound(missing)));

    let rect = BoardObject::rect(Uuid::new_v4(), 0.0, 0.0, 5.0, 5.0);
    let rid = rect.id;
    scene.add_object(rect).unwrap();
    assert_eq!(bridge.start_edit(rid, &mut scene, &view), Err(SceneError::NotText(rid)));
    assert!(!bridge.is_editing());
}

#[test]
fn start_new_adds_transient_object() {
    let (mut scene, view, history, mut bridge) = setup();
    let obj = text_obj("");
    let id = obj.id;
    bridge.start_new(obj, &mut scene, &view).unwrap();
    assert!(scene.get_object(&id).is_some());
    assert!(!history.can_undo());
}

// =============================================================
// commit
// =============================================================

#[test]
fn commit_existing_is_one_update_command() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let obj = text_obj("old");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    bridge.set_draft("new");

    assert_eq!(bridge.commit(&mut scene, &mut history), Ok(true));
    assert_eq!(scene.get_object(&id).unwrap().text_content(), Some("new"));
    assert_eq!(history.undo_len(), 1);
    assert!(!bridge.is_editing());

    history.undo(&mut scene).unwrap();
    assert_eq!(scene.get_object(&id).unwrap().text_content(), Some("old"));
}

#[test]
fn commit_unchanged_records_nothing() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let obj = text_obj("same");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    assert_eq!(bridge.commit(&mut scene, &mut history), Ok(false));
    assert!(!history.can_undo());
}

#[test]
fn commit_new_is_single_create() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let obj = text_obj("");
    let id = obj.id;
    bridge.start_new(obj, &mut scene, &view).unwrap();
    bridge.set_draft("typed");

    assert_eq!(bridge.commit(&mut scene, &mut history), Ok(true));
    assert_eq!(history.undo_len(), 1);
    assert!(matches!(history.last(), Some(Command::Create { object }) if object.text_content() == Some("typed")));

    history.undo(&mut scene).unwrap();
    assert!(scene.get_object(&id).is_none());
}

#[test]
fn commit_new_empty_discards() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let obj = text_obj("");
    let id = obj.id;
    bridge.start_new(obj, &mut scene, &view).unwrap();
    bridge.set_draft("   ");
    assert_eq!(bridge.commit(&mut scene, &mut history), Ok(false));
    assert!(scene.get_object(&id).is_none());
    assert!(!history.can_undo());
}

#[test]
fn commit_grows_box_for_multiline_text() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let obj = text_obj("");
    let id = obj.id;
    bridge.start_new(obj, &mut scene, &view).unwrap();
    bridge.set_draft("a\nb\nc");
    bridge.commit(&mut scene, &mut history).unwrap();
    let placed = scene.get_object(&id).unwrap();
    assert_eq!(placed.kind(), ObjectKind::Text);
    assert_eq!(placed.bounds().height, 16.0 * TEXT_LINE_HEIGHT * 3.0);
}

#[test]
fn commit_after_remote_delete_is_noop() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let obj = text_obj("x");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    scene.remove_object(&id);
    bridge.set_draft("y");
    assert_eq!(bridge.commit(&mut scene, &mut history), Ok(false));
    assert!(!bridge.is_editing());
}

// =============================================================
// cancel / reposition / events
// =============================================================

#[test]
fn cancel_new_leaves_no_net_mutation() {
    let (mut scene, view, history, mut bridge) = setup();
    let before = scene.get_all_objects().to_vec();
    bridge.start_new(text_obj(""), &mut scene, &view).unwrap();
    bridge.set_draft("abandoned");
    bridge.cancel(&mut scene);
    assert_eq!(scene.get_all_objects(), &before[..]);
    assert!(!history.can_undo());
}

#[test]
fn cancel_existing_keeps_original_text() {
    let (mut scene, view, _, mut bridge) = setup();
    let obj = text_obj("keep");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    bridge.set_draft("discard");
    bridge.cancel(&mut scene);
    assert_eq!(scene.get_object(&id).unwrap().text_content(), Some("keep"));
}

#[test]
fn reposition_follows_pan() {
    let (mut scene, mut view, _, mut bridge) = setup();
    let obj = text_obj("t");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    view.pan_by(100.0, 0.0);
    let placement = bridge.reposition(&mut scene, &view).unwrap();
    assert_eq!(placement.rect.x, 110.0);
    assert_eq!(bridge.placement().unwrap().rect.x, 110.0);
}

#[test]
fn reposition_ends_session_when_object_gone() {
    let (mut scene, view, _, mut bridge) = setup();
    let obj = text_obj("t");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    scene.remove_object(&id);
    assert!(bridge.reposition(&mut scene, &view).is_none());
    assert!(!bridge.is_editing());
}

#[test]
fn listeners_see_show_then_hide() {
    let (mut scene, view, mut history, mut bridge) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bridge.subscribe(move |e| {
        sink.borrow_mut().push(match e {
            TextEditEvent::Show(_) => "show",
            TextEditEvent::Hide => "hide",
        });
    });
    let obj = text_obj("t");
    let id = obj.id;
    scene.add_object(obj).unwrap();
    bridge.start_edit(id, &mut scene, &view).unwrap();
    bridge.commit(&mut scene, &mut history).unwrap();
    assert_eq!(*seen.borrow(), vec!["show", "hide"]);
}
