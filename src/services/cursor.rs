//! Cursor service: pointer frames on and off the wire.
//!
//! DESIGN
//! ======
//! Pointer traffic is ephemeral. Outbound messages are encoded in the
//! negotiated format and handed to the transport once; there is no retry.
//! Inbound payloads that fail to decode are logged and dropped, so one
//! misbehaving peer never interrupts the session.

use frames::{WireFormat, WireMessage};
use tracing::{debug, trace};

use crate::transport::{Transport, TransportError};

#[cfg(test)]
#[path = "cursor_test.rs"]
mod cursor_test;

/// Encode `message` and send it to every other peer.
///
/// # Errors
///
/// Returns the transport's error if the send fails.
pub async fn broadcast(transport: &dyn Transport, format: WireFormat, message: &WireMessage) -> Result<(), TransportError> {
    let encoded = frames::encode(format, message);
    trace!(kind = message_kind(message), topic = encoded.topic, bytes = encoded.payload.len(), "cursor: send");
    transport.send_to_all(encoded.topic, encoded.payload).await
}

/// Decode a payload from `peer`, or `None` if it is malformed.
#[must_use]
pub fn decode_inbound(format: WireFormat, peer: &str, topic: &str, payload: &[u8]) -> Option<WireMessage> {
    match frames::decode(format, topic, payload) {
        Ok(message) => {
            trace!(%peer, kind = message_kind(&message), "cursor: recv");
            Some(message)
        }
        Err(e) => {
            debug!(%peer, %topic, error = %e, "cursor: dropping malformed frame");
            None
        }
    }
}

/// Short label for logs.
#[must_use]
pub fn message_kind(message: &WireMessage) -> &'static str {
    match message {
        WireMessage::Move(_) => "move",
        WireMessage::Click(_) => "click",
        WireMessage::Hide => "hide",
        WireMessage::Nickname(_) => "nickname",
    }
}
