use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__POINTERCAST_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_reads_valid_value() {
    unsafe { std::env::set_var("__POINTERCAST_TEST_VALID__", "0.05") };
    let val: f64 = env_parse("__POINTERCAST_TEST_VALID__", 0.0);
    assert!((val - 0.05).abs() < f64::EPSILON);
    unsafe { std::env::remove_var("__POINTERCAST_TEST_VALID__") };
}

#[test]
fn env_parse_invalid_value_falls_back() {
    unsafe { std::env::set_var("__POINTERCAST_TEST_INVALID__", "soon") };
    let val: usize = env_parse("__POINTERCAST_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__POINTERCAST_TEST_INVALID__") };
}

// =============================================================================
// SessionConfig
// =============================================================================

#[test]
fn session_config_defaults_match_overlay_constants() {
    let config = SessionConfig::default();
    assert_eq!(config.nickname_every, 10);
    assert_eq!(config.pulse_ttl_ms, 3000);
    assert_eq!(config.pulse_tick_ms, 1000);
    assert!((config.layout_hysteresis - 0.02).abs() < f64::EPSILON);
    assert_eq!(config.command_capacity, 256);
}

#[test]
fn engine_config_carries_session_values() {
    let config = SessionConfig { nickname_every: 3, pulse_ttl_ms: 10, pulse_tick_ms: 5, ..SessionConfig::default() };
    let engine = config.engine_config();
    assert_eq!(engine.nickname_every, 3);
    assert_eq!(engine.pulse_ttl_ms, 10);
    assert_eq!(engine.pulse_tick_ms, 5);
}

// =============================================================================
// RelayConfig
// =============================================================================

#[test]
fn relay_config_keeps_url_and_peer() {
    let config = RelayConfig::from_env("ws://127.0.0.1:9000", "peer-1");
    assert_eq!(config.url, "ws://127.0.0.1:9000");
    assert_eq!(config.peer_id, "peer-1");
    assert!(config.reconnect_max_ms >= config.reconnect_base_ms);
    assert!(config.queue_capacity >= 1);
}
