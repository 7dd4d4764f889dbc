//! Session services driven by transports and host commands.
//!
//! ARCHITECTURE
//! ============
//! `cursor` owns the wire glue (encode, send, decode). `session` owns the
//! actor that ties a transport, a [`crate::state::SessionContext`] and an
//! overlay engine together.

pub mod cursor;
pub mod session;
