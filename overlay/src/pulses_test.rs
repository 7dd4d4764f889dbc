use super::*;
use crate::transform::{FitPolicy, Size};

const T: u64 = 1_700_000_000_000;

fn center() -> PercentPoint {
    PercentPoint::new(50.0, 50.0)
}

/// Drive the tick loop the way a host timer would, up to `until`.
fn run_ticks(reg: &mut PulseRegistry, until: u64) {
    while let Some(deadline) = reg.next_tick() {
        if deadline > until {
            break;
        }
        reg.on_tick(deadline);
    }
}

#[test]
fn first_add_arms_the_tick() {
    let mut reg = PulseRegistry::default();
    assert_eq!(reg.add(center(), None, Some(T), T), AddOutcome::Added { tick: Some(T + 1000) });
    assert_eq!(reg.next_tick(), Some(T + 1000));
}

#[test]
fn second_add_does_not_arm_another_tick() {
    let mut reg = PulseRegistry::default();
    reg.add(center(), None, Some(T), T);
    assert_eq!(reg.add(center(), None, Some(T + 10), T + 10), AddOutcome::Added { tick: None });
    assert_eq!(reg.len(), 2);
}

#[test]
fn pulse_present_before_ttl_and_gone_after() {
    let mut reg = PulseRegistry::default();
    reg.add(center(), None, Some(T), T);

    run_ticks(&mut reg, T + 2900);
    assert_eq!(reg.len(), 1);

    run_ticks(&mut reg, T + 3100);
    assert!(reg.is_empty());
}

#[test]
fn empty_registry_has_no_pending_tick() {
    let mut reg = PulseRegistry::default();
    assert_eq!(reg.next_tick(), None);
    reg.add(center(), None, Some(T), T);
    run_ticks(&mut reg, T + 10_000);
    assert!(reg.is_empty());
    assert_eq!(reg.next_tick(), None);
}

#[test]
fn tick_reschedules_while_pulses_remain() {
    let mut reg = PulseRegistry::default();
    reg.add(center(), None, Some(T), T);
    reg.add(center(), None, Some(T + 2500), T + 2500);

    // First pulse expires at T+3000, second survives.
    assert_eq!(reg.on_tick(T + 3000), Some(T + 4000));
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.on_tick(T + 4000), Some(T + 5000));
    assert_eq!(reg.on_tick(T + 5500), None);
    assert!(reg.is_empty());
}

#[test]
fn spurious_tick_without_pending_deadline_is_ignored() {
    let mut reg = PulseRegistry::default();
    assert_eq!(reg.on_tick(T), None);
}

#[test]
fn already_expired_pulse_is_discarded() {
    let mut reg = PulseRegistry::default();
    assert_eq!(reg.add(center(), None, Some(T), T + 3000), AddOutcome::Expired);
    assert!(reg.is_empty());
    assert_eq!(reg.next_tick(), None);
}

#[test]
fn missing_timestamp_uses_receive_time() {
    let mut reg = PulseRegistry::default();
    reg.add(center(), None, None, T);
    let pulse = reg.pulses()[0];
    assert_eq!(pulse.timestamp_ms, T);
    assert_eq!(pulse.expires_at_ms, T + 3000);
}

#[test]
fn future_timestamp_is_capped_at_receive_time() {
    let mut reg = PulseRegistry::default();
    assert_eq!(reg.add(center(), None, Some(T + 3_600_000), T), AddOutcome::Added { tick: Some(T + 1000) });
    assert_eq!(reg.pulses()[0].timestamp_ms, T);
    assert_eq!(reg.pulses()[0].expires_at_ms, T + 3000);
}

#[test]
fn future_timestamp_expires_within_ttl_plus_one_tick() {
    let mut reg = PulseRegistry::default();
    reg.add(center(), None, Some(T + 3_600_000), T);
    let mut now = T;
    while let Some(deadline) = reg.next_tick() {
        now = deadline;
        reg.on_tick(now);
    }
    assert!(reg.is_empty());
    assert!(now <= T + 3000 + 1000);
}

#[test]
fn add_projects_and_reproject_follows_geometry() {
    let small = DisplayGeometry::new(Size::new(320.0, 240.0), Size::new(1280.0, 720.0), FitPolicy::Cover);
    let big = DisplayGeometry::new(Size::new(640.0, 480.0), Size::new(1280.0, 720.0), FitPolicy::Cover);
    let mut reg = PulseRegistry::default();
    reg.add(center(), Some(&small), Some(T), T);
    let p = reg.pulses()[0].position.expect("position");
    assert!((p.x - 160.0).abs() < 1e-9);

    reg.reproject(Some(&big));
    let p = reg.pulses()[0].position.expect("position");
    assert!((p.x - 320.0).abs() < 1e-9);
}

#[test]
fn add_clamps_out_of_range_percentages() {
    let mut reg = PulseRegistry::default();
    reg.add(PercentPoint::new(120.0, -3.0), None, Some(T), T);
    assert_eq!(reg.pulses()[0].percent, PercentPoint::new(100.0, 0.0));
}

#[test]
fn clear_cancels_tick() {
    let mut reg = PulseRegistry::default();
    reg.add(center(), None, Some(T), T);
    reg.clear();
    assert!(reg.is_empty());
    assert_eq!(reg.next_tick(), None);
}
