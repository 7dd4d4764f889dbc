//! Shared pointer overlay: native session runtime.
//!
//! The overlay engine (geometry, pointer store, click pulses, drawing) lives
//! in the `overlay` crate and the wire codec in `frames`. This crate runs
//! them against a real-time mesh:
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment-driven tuning |
//! | [`state`] | Local identity and nickname |
//! | [`transport`] | Mesh abstraction, loopback mesh, WebSocket relay |
//! | [`services`] | Wire glue and the session actor |

pub mod config;
pub mod services;
pub mod state;
pub mod transport;
