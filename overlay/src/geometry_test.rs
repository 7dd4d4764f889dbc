#![allow(clippy::float_cmp)]

use super::*;

fn ready_observer(fit: FitPolicy) -> GeometryObserver {
    let mut obs = GeometryObserver::default();
    obs.set_fit_policy(fit);
    obs.set_element(Size::new(320.0, 240.0));
    obs.set_video(Size::new(1280.0, 720.0));
    obs
}

#[test]
fn missing_inputs_are_degenerate() {
    let mut obs = GeometryObserver::default();
    assert_eq!(obs.set_element(Size::new(320.0, 240.0)), GeometryUpdate::Degenerate);
    assert!(obs.geometry().is_none());
}

#[test]
fn first_complete_geometry_is_changed() {
    let mut obs = GeometryObserver::default();
    obs.set_element(Size::new(320.0, 240.0));
    let update = obs.set_video(Size::new(1280.0, 720.0));
    let GeometryUpdate::Changed(geom) = update else {
        panic!("expected change, got {update:?}");
    };
    assert_eq!(geom.element_aspect_ratio, 1.33);
    assert_eq!(geom.video_aspect_ratio, 1.78);
    assert_eq!(geom.fit, FitPolicy::Cover);
}

#[test]
fn element_falls_back_to_container() {
    let mut obs = GeometryObserver::default();
    obs.set_container(Size::new(800.0, 600.0));
    let update = obs.set_video(Size::new(640.0, 480.0));
    assert!(matches!(update, GeometryUpdate::Changed(g) if g.element_width == 800.0));
}

#[test]
fn identical_inputs_are_unchanged() {
    let mut obs = ready_observer(FitPolicy::Cover);
    assert_eq!(obs.set_element(Size::new(320.0, 240.0)), GeometryUpdate::Unchanged);
    assert_eq!(obs.set_video(Size::new(1280.0, 720.0)), GeometryUpdate::Unchanged);
}

#[test]
fn degenerate_resize_keeps_last_good_geometry() {
    let mut obs = ready_observer(FitPolicy::Cover);
    let before = *obs.geometry().expect("geometry");
    assert_eq!(obs.set_element(Size::new(0.0, 0.0)), GeometryUpdate::Degenerate);
    assert_eq!(obs.geometry(), Some(&before));

    // Recovery on the next valid trigger.
    let update = obs.set_element(Size::new(640.0, 480.0));
    assert!(matches!(update, GeometryUpdate::Changed(g) if g.element_width == 640.0));
}

#[test]
fn fit_policy_toggle_is_a_change() {
    let mut obs = ready_observer(FitPolicy::Cover);
    let update = obs.set_fit_policy(FitPolicy::Contain);
    assert!(matches!(update, GeometryUpdate::Changed(g) if g.fit == FitPolicy::Contain));
    assert_eq!(obs.fit_policy(), FitPolicy::Contain);
}

#[test]
fn layout_starts_as_column() {
    assert_eq!(GeometryObserver::default().layout(), LayoutAxis::Column);
}

#[test]
fn wide_container_switches_to_row() {
    let mut obs = ready_observer(FitPolicy::Contain);
    obs.set_container(Size::new(2000.0, 500.0));
    assert_eq!(obs.layout(), LayoutAxis::Row);
}

#[test]
fn tall_container_switches_to_column() {
    let mut obs = ready_observer(FitPolicy::Contain);
    obs.set_container(Size::new(2000.0, 500.0));
    obs.set_container(Size::new(500.0, 2000.0));
    assert_eq!(obs.layout(), LayoutAxis::Column);
}

#[test]
fn layout_inside_band_keeps_previous_axis() {
    let mut obs = ready_observer(FitPolicy::Contain);
    obs.set_container(Size::new(2000.0, 500.0));
    assert_eq!(obs.layout(), LayoutAxis::Row);

    // 1.79 vs 1.78: inside the band, no flip.
    let update = obs.set_container(Size::new(1790.0, 1000.0));
    assert_eq!(obs.layout(), LayoutAxis::Row);
    assert_eq!(update, GeometryUpdate::Unchanged);

    // 1.77 vs 1.78: still inside the band.
    obs.set_container(Size::new(1770.0, 1000.0));
    assert_eq!(obs.layout(), LayoutAxis::Row);
}

#[test]
fn layout_change_alone_is_reported() {
    let mut obs = ready_observer(FitPolicy::Contain);
    obs.set_container(Size::new(500.0, 2000.0));
    let update = obs.set_container(Size::new(2000.0, 500.0));
    assert!(matches!(update, GeometryUpdate::Changed(_)));
}

#[test]
fn cover_policy_does_not_decide_layout() {
    let mut obs = ready_observer(FitPolicy::Cover);
    obs.set_container(Size::new(2000.0, 500.0));
    assert_eq!(obs.layout(), LayoutAxis::Column);
}
