#![allow(clippy::float_cmp)]

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use super::*;
use crate::camera::Point;
use crate::doc::StylePatch;

fn rect_at(x: f64, y: f64, w: f64, h: f64) -> BoardObject {
    BoardObject::rect(Uuid::new_v4(), x, y, w, h)
}

fn ids(objects: &[BoardObject]) -> Vec<ObjectId> {
    objects.iter().map(|o| o.id).collect()
}

// =============================================================
// add / insert / remove
// =============================================================

#[test]
fn add_appends_in_z_order() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let b = rect_at(0.0, 0.0, 1.0, 1.0);
    let (ia, ib) = (a.id, b.id);
    scene.add_object(a).unwrap();
    scene.add_object(b).unwrap();
    assert_eq!(ids(scene.get_all_objects()), vec![ia, ib]);
    assert_eq!(scene.index_of(&ib), Some(1));
}

#[test]
fn add_duplicate_id_rejected() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    scene.add_object(a.clone()).unwrap();
    assert_eq!(scene.add_object(a.clone()), Err(SceneError::DuplicateId(a.id)));
    assert_eq!(scene.len(), 1);
}

#[test]
fn insert_at_index_shifts_later_objects() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let b = rect_at(0.0, 0.0, 1.0, 1.0);
    let c = rect_at(0.0, 0.0, 1.0, 1.0);
    let (ia, ib, ic) = (a.id, b.id, c.id);
    scene.add_object(a).unwrap();
    scene.add_object(c).unwrap();
    scene.insert_object(1, b).unwrap();
    assert_eq!(ids(scene.get_all_objects()), vec![ia, ib, ic]);
    assert_eq!(scene.index_of(&ic), Some(2));
}

#[test]
fn insert_past_end_appends() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let id = a.id;
    scene.insert_object(99, a).unwrap();
    assert_eq!(scene.index_of(&id), Some(0));
}

#[test]
fn remove_returns_object_and_reindexes() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let b = rect_at(0.0, 0.0, 1.0, 1.0);
    let (ia, ib) = (a.id, b.id);
    scene.add_object(a).unwrap();
    scene.add_object(b).unwrap();

    let removed = scene.remove_object(&ia).unwrap();
    assert_eq!(removed.id, ia);
    assert!(scene.get_object(&ia).is_none());
    assert_eq!(scene.index_of(&ib), Some(0));
}

#[test]
fn remove_missing_is_none() {
    let mut scene = SceneGraph::new();
    assert!(scene.remove_object(&Uuid::new_v4()).is_none());
    assert!(scene.take_events().is_empty());
}

// =============================================================
// update
// =============================================================

#[test]
fn update_merges_and_keeps_id() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 10.0, 10.0);
    let id = a.id;
    scene.add_object(a).unwrap();
    let patch = ObjectPatch {
        width: Some(50.0),
        style: Some(StylePatch { fill: Some("#abc".into()), ..Default::default() }),
        ..Default::default()
    };
    scene.update_object(&id, &patch).unwrap();

    let obj = scene.get_object(&id).unwrap();
    assert_eq!(obj.id, id);
    assert_eq!(obj.bounds(), Rect::new(0.0, 0.0, 50.0, 10.0));
    assert_eq!(obj.style.fill, "#abc");
    assert_eq!(obj.style.stroke, "#1F1A17");
}

#[test]
fn update_missing_is_not_found() {
    let mut scene = SceneGraph::new();
    let id = Uuid::new_v4();
    assert_eq!(scene.update_object(&id, &ObjectPatch::default()), Err(SceneError::NotFound(id)));
}

#[test]
fn update_without_change_emits_nothing() {
    let mut scene = SceneGraph::new();
    let a = rect_at(1.0, 1.0, 1.0, 1.0);
    let id = a.id;
    scene.add_object(a).unwrap();
    scene.take_events();
    scene.update_object(&id, &ObjectPatch { x: Some(1.0), ..Default::default() }).unwrap();
    assert!(scene.take_events().is_empty());
}

// =============================================================
// replace
// =============================================================

#[test]
fn replace_swaps_whole_object_in_place() {
    let mut scene = SceneGraph::new();
    let arrow = BoardObject::arrow(Uuid::new_v4(), Point::new(0.0, 0.0), Point::new(10.0, 10.0));
    let top = rect_at(5.0, 5.0, 1.0, 1.0);
    scene.add_object(arrow.clone()).unwrap();
    scene.add_object(top.clone()).unwrap();
    scene.take_events();

    let ellipse = BoardObject::ellipse(arrow.id, 2.0, 2.0, 4.0, 4.0);
    scene.replace_object(ellipse.clone()).unwrap();
    assert_eq!(ids(scene.get_all_objects()), vec![arrow.id, top.id]);
    assert_eq!(scene.get_object(&arrow.id), Some(&ellipse));
    assert_eq!(scene.take_events(), vec![SceneEvent::Update(ellipse.clone())]);

    scene.replace_object(ellipse).unwrap();
    assert!(scene.take_events().is_empty());
}

#[test]
fn replace_missing_is_not_found() {
    let mut scene = SceneGraph::new();
    let obj = rect_at(0.0, 0.0, 1.0, 1.0);
    assert_eq!(scene.replace_object(obj.clone()), Err(SceneError::NotFound(obj.id)));
    assert!(scene.is_empty());
}

// =============================================================
// get_objects_in_rect
// =============================================================

#[test]
fn objects_in_rect_exact_intersection_set() {
    let mut scene = SceneGraph::new();
    let inside = rect_at(10.0, 10.0, 10.0, 10.0);
    let touching = rect_at(30.0, 0.0, 10.0, 10.0);
    let outside = rect_at(31.0, 31.0, 5.0, 5.0);
    let overlapping = rect_at(-5.0, -5.0, 6.0, 6.0);
    let expected = vec![inside.id, touching.id, overlapping.id];
    for obj in [inside, touching, outside, overlapping] {
        scene.add_object(obj).unwrap();
    }

    let query = Rect::new(0.0, 0.0, 30.0, 30.0);
    let hits: Vec<ObjectId> = scene.get_objects_in_rect(&query).iter().map(|o| o.id).collect();
    assert_eq!(hits, expected);
}

#[test]
fn objects_in_rect_matches_brute_force() {
    let mut scene = SceneGraph::new();
    for i in 0..20 {
        let f = f64::from(i);
        scene.add_object(rect_at(f * 7.0 - 40.0, f * 3.0 - 10.0, 5.0 + f, 4.0)).unwrap();
        scene
            .add_object(BoardObject::arrow(Uuid::new_v4(), Point::new(f * 5.0, 0.0), Point::new(f * 5.0, f * 9.0)))
            .unwrap();
    }
    let query = Rect::new(-3.0, 2.0, 41.0, 17.0);
    let expected: Vec<ObjectId> = scene
        .get_all_objects()
        .iter()
        .filter(|o| {
            let b = o.bounds();
            b.x <= query.right() && query.x <= b.right() && b.y <= query.bottom() && query.y <= b.bottom()
        })
        .map(|o| o.id)
        .collect();
    let actual: Vec<ObjectId> = scene.get_objects_in_rect(&query).iter().map(|o| o.id).collect();
    assert_eq!(actual, expected);
}

#[test]
fn objects_in_rect_finds_zero_size_object() {
    let mut scene = SceneGraph::new();
    let dot = rect_at(5.0, 5.0, 0.0, 0.0);
    let id = dot.id;
    scene.add_object(dot).unwrap();
    let hits = scene.get_objects_in_rect(&Rect::new(5.5, 5.5, 0.0, 0.0));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, id);
}

// =============================================================
// load / clear
// =============================================================

#[test]
fn load_objects_replaces_everything() {
    let mut scene = SceneGraph::new();
    let old = rect_at(0.0, 0.0, 1.0, 1.0);
    let old_id = old.id;
    scene.add_object(old).unwrap();

    let fresh = rect_at(0.0, 0.0, 1.0, 1.0);
    let fresh_id = fresh.id;
    scene.load_objects(vec![fresh]);

    assert!(scene.get_object(&old_id).is_none());
    assert!(scene.get_object(&fresh_id).is_some());
    assert_eq!(scene.len(), 1);
}

#[test]
fn load_objects_drops_duplicate_ids() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let mut dup = a.clone();
    dup.x = 50.0;
    scene.load_objects(vec![a, dup]);
    assert_eq!(scene.len(), 1);
    assert_eq!(scene.get_all_objects()[0].x, 0.0);
}

#[test]
fn clear_empties_scene() {
    let mut scene = SceneGraph::new();
    scene.add_object(rect_at(0.0, 0.0, 1.0, 1.0)).unwrap();
    scene.clear();
    assert!(scene.is_empty());
}

// =============================================================
// events
// =============================================================

#[test]
fn subscribers_see_typed_events() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut scene = SceneGraph::new();
    let sink = Rc::clone(&seen);
    scene.subscribe(move |e| {
        let tag = match e {
            SceneEvent::Add(_) => "add",
            SceneEvent::Remove { .. } => "remove",
            SceneEvent::Update(_) => "update",
            SceneEvent::Reset { .. } => "reset",
        };
        sink.borrow_mut().push(tag);
    });

    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let id = a.id;
    scene.add_object(a).unwrap();
    scene.update_object(&id, &ObjectPatch { x: Some(3.0), ..Default::default() }).unwrap();
    scene.remove_object(&id);
    scene.clear();

    assert_eq!(*seen.borrow(), vec!["add", "update", "remove", "reset"]);
}

#[test]
fn unsubscribed_listener_is_silent() {
    let count = Rc::new(RefCell::new(0));
    let mut scene = SceneGraph::new();
    let c = Rc::clone(&count);
    let handle = scene.subscribe(move |_| *c.borrow_mut() += 1);
    scene.add_object(rect_at(0.0, 0.0, 1.0, 1.0)).unwrap();
    assert!(scene.unsubscribe(handle));
    scene.add_object(rect_at(0.0, 0.0, 1.0, 1.0)).unwrap();
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn remove_event_carries_index_and_last_state() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let b = rect_at(7.0, 8.0, 1.0, 1.0);
    let ib = b.id;
    scene.add_object(a).unwrap();
    scene.add_object(b).unwrap();
    scene.take_events();
    scene.remove_object(&ib);

    let events = scene.take_events();
    assert!(matches!(&events[..], [SceneEvent::Remove { object, index: 1 }] if object.x == 7.0));
    assert_eq!(events[0].ids(), vec![ib]);
}

#[test]
fn reset_event_ids_cover_previous_and_current() {
    let mut scene = SceneGraph::new();
    let a = rect_at(0.0, 0.0, 1.0, 1.0);
    let b = rect_at(0.0, 0.0, 1.0, 1.0);
    let (ia, ib) = (a.id, b.id);
    scene.add_object(a).unwrap();
    scene.take_events();
    scene.load_objects(vec![b]);
    let events = scene.take_events();
    assert_eq!(events[0].ids(), vec![ia, ib]);
}
