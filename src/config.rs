//! Runtime configuration loaded from environment variables.
//!
//! Every knob has a `DEFAULT_*` constant and falls back to it when the
//! variable is missing or does not parse.

use overlay::engine::EngineConfig;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

const DEFAULT_POINTER_NICKNAME_EVERY: u64 = overlay::consts::NICKNAME_EVERY;
const DEFAULT_PULSE_TTL_MS: u64 = overlay::consts::PULSE_TTL_MS;
const DEFAULT_PULSE_TICK_MS: u64 = overlay::consts::PULSE_TICK_MS;
const DEFAULT_LAYOUT_HYSTERESIS: f64 = overlay::consts::LAYOUT_HYSTERESIS;
const DEFAULT_SESSION_COMMAND_CAPACITY: usize = 256;
const DEFAULT_RELAY_QUEUE_CAPACITY: usize = 256;
const DEFAULT_RELAY_RECONNECT_BASE_MS: u64 = 1000;
const DEFAULT_RELAY_RECONNECT_MAX_MS: u64 = 30_000;

/// Tuning knobs for a pointer session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Attach the nickname to every Nth outbound pointer frame.
    pub nickname_every: u64,
    /// Lifetime of a click pulse in milliseconds.
    pub pulse_ttl_ms: u64,
    /// Interval of the pulse prune tick in milliseconds.
    pub pulse_tick_ms: u64,
    /// Aspect-ratio hysteresis band for the layout decision.
    pub layout_hysteresis: f64,
    /// Bounded capacity of the session command queue.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nickname_every: DEFAULT_POINTER_NICKNAME_EVERY,
            pulse_ttl_ms: DEFAULT_PULSE_TTL_MS,
            pulse_tick_ms: DEFAULT_PULSE_TICK_MS,
            layout_hysteresis: DEFAULT_LAYOUT_HYSTERESIS,
            command_capacity: DEFAULT_SESSION_COMMAND_CAPACITY,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            nickname_every: env_parse("POINTER_NICKNAME_EVERY", DEFAULT_POINTER_NICKNAME_EVERY).max(1),
            pulse_ttl_ms: env_parse("PULSE_TTL_MS", DEFAULT_PULSE_TTL_MS),
            pulse_tick_ms: env_parse("PULSE_TICK_MS", DEFAULT_PULSE_TICK_MS).max(1),
            layout_hysteresis: env_parse("LAYOUT_HYSTERESIS", DEFAULT_LAYOUT_HYSTERESIS),
            command_capacity: env_parse("SESSION_COMMAND_CAPACITY", DEFAULT_SESSION_COMMAND_CAPACITY).max(1),
        }
    }

    /// The subset the overlay engine needs.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            nickname_every: self.nickname_every,
            pulse_ttl_ms: self.pulse_ttl_ms,
            pulse_tick_ms: self.pulse_tick_ms,
            hysteresis: self.layout_hysteresis,
        }
    }
}

/// Connection settings for the WebSocket relay transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// `ws://` or `wss://` URL of the relay.
    pub url: String,
    /// Identity announced to the relay on every (re)connect.
    pub peer_id: String,
    /// Bounded capacity of the outbound and inbound queues.
    pub queue_capacity: usize,
    /// First reconnect delay; doubles per failure.
    pub reconnect_base_ms: u64,
    /// Ceiling for the reconnect delay.
    pub reconnect_max_ms: u64,
}

impl RelayConfig {
    #[must_use]
    pub fn from_env(url: impl Into<String>, peer_id: impl Into<String>) -> Self {
        let reconnect_base_ms = env_parse("RELAY_RECONNECT_BASE_MS", DEFAULT_RELAY_RECONNECT_BASE_MS).max(1);
        Self {
            url: url.into(),
            peer_id: peer_id.into(),
            queue_capacity: env_parse("RELAY_QUEUE_CAPACITY", DEFAULT_RELAY_QUEUE_CAPACITY).max(1),
            reconnect_base_ms,
            reconnect_max_ms: env_parse("RELAY_RECONNECT_MAX_MS", DEFAULT_RELAY_RECONNECT_MAX_MS).max(reconnect_base_ms),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
