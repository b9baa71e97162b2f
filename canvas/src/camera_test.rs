#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn view(pan_x: f64, pan_y: f64, zoom: f64) -> ViewTransform {
    let mut v = ViewTransform::default();
    v.set_view_state(ViewState { pan: Point::new(pan_x, pan_y), zoom, viewport: Viewport::default() });
    v
}

// --- Point / Rect ---

#[test]
fn point_distance() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0));
}

#[test]
fn rect_from_corners_normalizes() {
    let r = Rect::from_corners(Point::new(110.0, 60.0), Point::new(10.0, 10.0));
    assert_eq!(r, Rect::new(10.0, 10.0, 100.0, 50.0));
}

#[test]
fn rect_intersects_overlapping() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(5.0, 5.0, 10.0, 10.0);
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
}

#[test]
fn rect_intersects_touching_edge() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(10.0, 0.0, 5.0, 5.0);
    assert!(a.intersects(&b));
}

#[test]
fn rect_intersects_touching_corner() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(10.0, 10.0, 5.0, 5.0);
    assert!(a.intersects(&b));
}

#[test]
fn rect_disjoint() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(10.5, 0.0, 5.0, 5.0);
    assert!(!a.intersects(&b));
}

#[test]
fn rect_contains_border() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(r.contains(Point::new(10.0, 5.0)));
    assert!(!r.contains(Point::new(10.1, 5.0)));
}

#[test]
fn rect_union_covers_both() {
    let u = Rect::new(0.0, 5.0, 10.0, 10.0).union(&Rect::new(-5.0, 0.0, 5.0, 5.0));
    assert_eq!(u, Rect::new(-5.0, 0.0, 15.0, 15.0));
}

// --- defaults ---

#[test]
fn default_is_identity() {
    let v = ViewTransform::default();
    assert_eq!(v.pan(), Point::new(0.0, 0.0));
    assert_eq!(v.zoom(), 1.0);
    assert_eq!(v.viewport().pixel_density, 1.0);
}

#[test]
fn unordered_zoom_bounds_use_defaults() {
    let mut v = ViewTransform::new(5.0, 0.5);
    v.zoom_by(1000.0, Point::new(0.0, 0.0));
    assert_eq!(v.zoom(), MAX_ZOOM);
    let mut v = ViewTransform::new(f64::NAN, 2.0);
    v.zoom_by(1.0e-6, Point::new(0.0, 0.0));
    assert_eq!(v.zoom(), MIN_ZOOM);
}

// --- conversions ---

#[test]
fn screen_to_world_with_pan_and_zoom() {
    let v = view(20.0, 10.0, 2.0);
    assert!(point_approx_eq(v.screen_to_world(Point::new(20.0, 10.0)), Point::new(0.0, 0.0)));
    assert!(point_approx_eq(v.screen_to_world(Point::new(40.0, 30.0)), Point::new(10.0, 10.0)));
}

#[test]
fn world_to_screen_with_pan_and_zoom() {
    let v = view(20.0, 10.0, 3.0);
    // 5*3 + 20 = 35, 5*3 + 10 = 25
    assert!(point_approx_eq(v.world_to_screen(Point::new(5.0, 5.0)), Point::new(35.0, 25.0)));
}

#[test]
fn round_trip_fractional_zoom() {
    let v = view(13.7, -42.3, 0.75);
    let world = Point::new(333.3, -999.9);
    assert!(point_approx_eq(world, v.screen_to_world(v.world_to_screen(world))));
}

#[test]
fn world_rect_to_screen_scales_size() {
    let v = view(5.0, 5.0, 2.0);
    let r = v.world_rect_to_screen(Rect::new(10.0, 10.0, 20.0, 30.0));
    assert_eq!(r, Rect::new(25.0, 25.0, 40.0, 60.0));
}

#[test]
fn screen_dist_to_world_ignores_pan() {
    let v = view(999.0, -999.0, 4.0);
    assert!(approx_eq(v.screen_dist_to_world(8.0), 2.0));
}

// --- zoom_by ---

#[test]
fn zoom_by_keeps_anchor_fixed() {
    let mut v = view(37.0, -12.0, 1.3);
    let anchor = Point::new(240.0, 180.0);
    let world_before = v.screen_to_world(anchor);

    assert!(v.zoom_by(1.7, anchor));

    let screen_after = v.world_to_screen(world_before);
    assert!(point_approx_eq(screen_after, anchor));
    assert!(approx_eq(v.zoom(), 1.3 * 1.7));
}

#[test]
fn zoom_by_anchor_fixed_across_many_steps() {
    let mut v = ViewTransform::default();
    let anchor = Point::new(123.0, 456.0);
    let world = v.screen_to_world(anchor);
    for factor in [1.1, 1.1, 0.5, 2.5, 0.9, 1.3] {
        v.zoom_by(factor, anchor);
        assert!(point_approx_eq(v.world_to_screen(world), anchor));
    }
}

#[test]
fn zoom_by_clamps_to_max() {
    let mut v = ViewTransform::default();
    v.zoom_by(100.0, Point::new(0.0, 0.0));
    assert_eq!(v.zoom(), MAX_ZOOM);
}

#[test]
fn zoom_by_clamps_to_min_and_keeps_anchor() {
    let mut v = ViewTransform::default();
    let anchor = Point::new(50.0, 50.0);
    let world = v.screen_to_world(anchor);
    v.zoom_by(0.0001, anchor);
    assert_eq!(v.zoom(), MIN_ZOOM);
    assert!(point_approx_eq(v.world_to_screen(world), anchor));
}

#[test]
fn zoom_by_at_limit_reports_no_change() {
    let mut v = view(0.0, 0.0, MAX_ZOOM);
    assert!(!v.zoom_by(2.0, Point::new(10.0, 10.0)));
}

#[test]
fn zoom_by_rejects_invalid_factor() {
    let mut v = ViewTransform::default();
    assert!(!v.zoom_by(0.0, Point::new(0.0, 0.0)));
    assert!(!v.zoom_by(-2.0, Point::new(0.0, 0.0)));
    assert!(!v.zoom_by(f64::NAN, Point::new(0.0, 0.0)));
    assert_eq!(v.zoom(), 1.0);
}

// --- set_view_state sanitizing ---

#[test]
fn set_view_state_clamps_zoom() {
    let v = view(0.0, 0.0, 50.0);
    assert_eq!(v.zoom(), MAX_ZOOM);
    let v = view(0.0, 0.0, -3.0);
    assert_eq!(v.zoom(), MIN_ZOOM);
}

#[test]
fn set_view_state_replaces_non_finite() {
    let v = view(f64::NAN, f64::INFINITY, f64::NAN);
    assert_eq!(v.pan(), Point::new(0.0, 0.0));
    assert_eq!(v.zoom(), 1.0);
}

#[test]
fn set_viewport_sanitizes_density() {
    let mut v = ViewTransform::default();
    v.set_viewport(Viewport { width: 800.0, height: -5.0, pixel_density: 0.0 });
    assert_eq!(v.viewport(), Viewport { width: 800.0, height: 0.0, pixel_density: 1.0 });
}

// --- pan / visible rect ---

#[test]
fn pan_by_shifts_world_mapping() {
    let mut v = ViewTransform::default();
    v.pan_by(30.0, -10.0);
    assert!(point_approx_eq(v.screen_to_world(Point::new(30.0, -10.0)), Point::new(0.0, 0.0)));
}

#[test]
fn visible_world_rect_accounts_for_zoom() {
    let mut v = view(100.0, 50.0, 2.0);
    v.set_viewport(Viewport { width: 800.0, height: 600.0, pixel_density: 2.0 });
    let r = v.visible_world_rect();
    assert!(approx_eq(r.x, -50.0));
    assert!(approx_eq(r.y, -25.0));
    assert!(approx_eq(r.width, 400.0));
    assert!(approx_eq(r.height, 300.0));
}

#[test]
fn view_state_serializes_camel_case() {
    let json = serde_json::to_value(ViewState::default()).unwrap();
    assert_eq!(json["viewport"]["pixelDensity"], 1.0);
    assert_eq!(json["zoom"], 1.0);
}
