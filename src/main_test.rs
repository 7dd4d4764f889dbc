#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn parse_size_accepts_either_separator() {
    let size = parse_size("640x360").expect("size");
    assert_eq!((size.width, size.height), (640.0, 360.0));
    let size = parse_size("1280X720").expect("size");
    assert_eq!((size.width, size.height), (1280.0, 720.0));
}

#[test]
fn parse_size_rejects_garbage() {
    assert!(parse_size("640").is_err());
    assert!(parse_size("ax360").is_err());
    assert!(parse_size("0x360").is_err());
}

#[test]
fn cli_defaults() {
    let cli = Cli::try_parse_from(["pointercast", "--loopback"]).expect("parse");
    assert!(cli.loopback);
    assert_eq!(cli.fit, Fit::Cover);
    assert_eq!(cli.element.width, 640.0);
    assert_eq!(cli.video.height, 720.0);
    assert_eq!(cli.log, "warn");
}

#[test]
fn cli_relay_conflicts_with_loopback() {
    assert!(Cli::try_parse_from(["pointercast", "--relay", "ws://x", "--loopback"]).is_err());
}

#[test]
fn fit_maps_to_policy() {
    assert_eq!(FitPolicy::from(Fit::Contain), FitPolicy::Contain);
    assert_eq!(FitPolicy::from(Fit::Cover), FitPolicy::Cover);
}
