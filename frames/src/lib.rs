//! Pointer wire codec shared by the overlay engine and the session runtime.
//!
//! This crate owns the wire representation of pointer traffic. Two shapes
//! carry the same vocabulary ([`WireMessage`]):
//!
//! - keyed records `{l, t, n?, ts?}` for transports that already multiplex by
//!   topic (JSON text, or protobuf for byte-only channels);
//! - pipe-delimited positional frames `p|<left>|<top>|<nickname>|<timestamp>`
//!   for broadcast transports where every byte counts.
//!
//! The bare tag `d` means "hide my pointer" in both shapes, and `n|<name>` is
//! the identity frame that announces a nickname.

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Topic for position records (and hide frames on keyed channels).
pub const TOPIC_POINTER: &str = "pointer";

/// Topic for click records on keyed channels.
pub const TOPIC_CLICK: &str = "click";

/// Topic for identity frames on keyed channels.
pub const TOPIC_IDENTITY: &str = "identity";

/// Tag frame that hides the sender's pointer.
pub const HIDE_TAG: &str = "d";

/// Literal some senders emit for an absent optional field.
const UNDEFINED: &str = "undefined";

const TAG_POSITION: &str = "p";
const TAG_CLICK: &str = "c";
const TAG_NICKNAME: &str = "n";

/// Error returned by the decoders.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload was empty.
    #[error("empty frame")]
    Empty,
    /// The leading tag of a pipe frame is not known.
    #[error("unknown frame tag: {0}")]
    UnknownTag(String),
    /// A required field (`l` or `t`) is absent.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    /// A numeric field could not be parsed or is not finite.
    #[error("invalid number in field `{field}`: {value}")]
    InvalidNumber { field: &'static str, value: String },
    /// The keyed record is not valid JSON.
    #[error("invalid keyed record: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// The payload is not valid UTF-8 where text was expected.
    #[error("frame is not valid utf-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// The raw bytes could not be decoded as a protobuf keyed record.
    #[error("failed to decode protobuf record: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// A resolution-independent pointer position, relative to the native video frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// Horizontal position in percent of the video width.
    #[serde(rename = "l")]
    pub left: f64,
    /// Vertical position in percent of the video height.
    #[serde(rename = "t")]
    pub top: f64,
    /// Sender nickname. Absent means "no change", never "clear".
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Sender clock, milliseconds since the Unix epoch.
    #[serde(rename = "ts", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl PointerSample {
    #[must_use]
    pub fn new(left: f64, top: f64) -> Self {
        Self { left, top, nickname: None, timestamp: None }
    }

    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// One decoded unit of pointer traffic.
#[derive(Clone, Debug, PartialEq)]
pub enum WireMessage {
    /// Absolute pointer position update.
    Move(PointerSample),
    /// Discrete click at a position; becomes a pulse on receivers.
    Click(PointerSample),
    /// The sender's pointer left the video; hide it.
    Hide,
    /// Identity frame carrying the sender's nickname.
    Nickname(String),
}

/// Wire format chosen once per transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Keyed JSON records multiplexed by topic.
    Keyed,
    /// Keyed protobuf records multiplexed by topic.
    KeyedBinary,
    /// Pipe-delimited positional frames on a single broadcast.
    Pipe,
}

/// An encoded message and the topic it travels on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Encoded {
    pub topic: &'static str,
    pub payload: Vec<u8>,
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Encode a message in the given wire format.
#[must_use]
pub fn encode(format: WireFormat, message: &WireMessage) -> Encoded {
    match format {
        WireFormat::Pipe => Encoded { topic: TOPIC_POINTER, payload: encode_pipe(message).into_bytes() },
        WireFormat::Keyed | WireFormat::KeyedBinary => {
            let topic = keyed_topic(message);
            let payload = match message {
                WireMessage::Move(sample) | WireMessage::Click(sample) => {
                    if format == WireFormat::Keyed {
                        encode_keyed(sample).into_bytes()
                    } else {
                        encode_keyed_binary(sample)
                    }
                }
                WireMessage::Hide => HIDE_TAG.as_bytes().to_vec(),
                WireMessage::Nickname(name) => format!("{TAG_NICKNAME}|{name}").into_bytes(),
            };
            Encoded { topic, payload }
        }
    }
}

/// Decode a payload received on `topic` in the given wire format.
///
/// # Errors
///
/// Returns a [`CodecError`] describing why the payload is malformed. Callers
/// on the receive path drop such frames.
pub fn decode(format: WireFormat, topic: &str, payload: &[u8]) -> Result<WireMessage, CodecError> {
    if payload.is_empty() {
        return Err(CodecError::Empty);
    }
    if payload == HIDE_TAG.as_bytes() {
        return Ok(WireMessage::Hide);
    }
    match format {
        WireFormat::Pipe => decode_pipe(std::str::from_utf8(payload)?),
        WireFormat::Keyed | WireFormat::KeyedBinary if topic == TOPIC_IDENTITY => {
            decode_pipe(std::str::from_utf8(payload)?)
        }
        WireFormat::Keyed => {
            let sample = decode_keyed(std::str::from_utf8(payload)?)?;
            Ok(keyed_message(topic, sample))
        }
        WireFormat::KeyedBinary => {
            let sample = decode_keyed_binary(payload)?;
            Ok(keyed_message(topic, sample))
        }
    }
}

fn keyed_topic(message: &WireMessage) -> &'static str {
    match message {
        WireMessage::Move(_) | WireMessage::Hide => TOPIC_POINTER,
        WireMessage::Click(_) => TOPIC_CLICK,
        WireMessage::Nickname(_) => TOPIC_IDENTITY,
    }
}

fn keyed_message(topic: &str, sample: PointerSample) -> WireMessage {
    if topic == TOPIC_CLICK {
        WireMessage::Click(sample)
    } else {
        WireMessage::Move(sample)
    }
}

// =============================================================================
// PIPE FRAMES
// =============================================================================

/// Encode a message as a pipe-delimited frame.
///
/// Absent optional fields are left empty: `p|12.5|40||1700000000000`.
#[must_use]
pub fn encode_pipe(message: &WireMessage) -> String {
    match message {
        WireMessage::Move(sample) => pipe_position(TAG_POSITION, sample),
        WireMessage::Click(sample) => pipe_position(TAG_CLICK, sample),
        WireMessage::Hide => HIDE_TAG.to_owned(),
        WireMessage::Nickname(name) => format!("{TAG_NICKNAME}|{name}"),
    }
}

fn pipe_position(tag: &str, sample: &PointerSample) -> String {
    let nickname = sample.nickname.as_deref().unwrap_or("");
    let timestamp = sample.timestamp.map(|ts| ts.to_string()).unwrap_or_default();
    format!("{tag}|{}|{}|{nickname}|{timestamp}", sample.left, sample.top)
}

/// Decode a pipe-delimited frame.
///
/// The timestamp is split from the right so nicknames may contain `|`.
///
/// # Errors
///
/// Returns [`CodecError::UnknownTag`] for unrecognised tags and
/// [`CodecError::MissingField`] / [`CodecError::InvalidNumber`] for broken
/// position fields.
pub fn decode_pipe(text: &str) -> Result<WireMessage, CodecError> {
    let text = text.trim_end_matches(['\r', '\n']);
    if text.is_empty() {
        return Err(CodecError::Empty);
    }
    if text == HIDE_TAG {
        return Ok(WireMessage::Hide);
    }

    let (tag, rest) = text.split_once('|').unwrap_or((text, ""));
    match tag {
        TAG_POSITION => Ok(WireMessage::Move(decode_pipe_position(rest)?)),
        TAG_CLICK => Ok(WireMessage::Click(decode_pipe_position(rest)?)),
        TAG_NICKNAME => Ok(WireMessage::Nickname(rest.to_owned())),
        other => Err(CodecError::UnknownTag(other.to_owned())),
    }
}

fn decode_pipe_position(rest: &str) -> Result<PointerSample, CodecError> {
    let mut fields = rest.splitn(3, '|');
    let left = parse_number("l", fields.next())?;
    let top = parse_number("t", fields.next())?;

    let tail = fields.next().unwrap_or("");
    let (nickname, timestamp) = match tail.rsplit_once('|') {
        Some((nickname, timestamp)) => (nickname, timestamp),
        None => (tail, ""),
    };

    Ok(PointerSample {
        left,
        top,
        nickname: optional_text(nickname).map(str::to_owned),
        timestamp: parse_timestamp(optional_text(timestamp))?,
    })
}

// =============================================================================
// KEYED RECORDS
// =============================================================================

/// Encode a sample as a keyed JSON record, e.g. `{"l":50,"t":50}`.
#[must_use]
pub fn encode_keyed(sample: &PointerSample) -> String {
    let mut record = serde_json::Map::new();
    record.insert("l".into(), json_number(sample.left));
    record.insert("t".into(), json_number(sample.top));
    if let Some(nickname) = &sample.nickname {
        record.insert("n".into(), Value::String(nickname.clone()));
    }
    if let Some(ts) = sample.timestamp {
        record.insert("ts".into(), Value::from(ts));
    }
    Value::Object(record).to_string()
}

/// Decode a keyed JSON record.
///
/// Numbers may arrive as JSON numbers or numeric strings; `"undefined"` and
/// `null` optional fields are treated as absent.
///
/// # Errors
///
/// Returns [`CodecError::InvalidJson`] for non-JSON payloads,
/// [`CodecError::MissingField`] when `l` or `t` is absent, and
/// [`CodecError::InvalidNumber`] for unusable numbers.
pub fn decode_keyed(text: &str) -> Result<PointerSample, CodecError> {
    let record: KeyedRecord = serde_json::from_str(text)?;

    let left = json_field_number("l", record.l.as_ref())?.ok_or(CodecError::MissingField("l"))?;
    let top = json_field_number("t", record.t.as_ref())?.ok_or(CodecError::MissingField("t"))?;
    let nickname = match record.n {
        Some(Value::String(n)) => optional_text(&n).map(str::to_owned),
        _ => None,
    };
    let timestamp = match record.ts.as_ref() {
        Some(Value::Number(n)) => n.as_u64().or_else(|| timestamp_from_f64(n.as_f64())),
        Some(Value::String(s)) => parse_timestamp(optional_text(s))?,
        _ => None,
    };

    Ok(PointerSample { left, top, nickname, timestamp })
}

/// Encode a sample as a protobuf keyed record.
#[must_use]
pub fn encode_keyed_binary(sample: &PointerSample) -> Vec<u8> {
    let wire = WireRecord {
        l: Some(sample.left),
        t: Some(sample.top),
        n: sample.nickname.clone(),
        ts: sample.timestamp,
    };
    wire.encode_to_vec()
}

/// Decode a protobuf keyed record.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::MissingField`] when `l` or `t` is absent.
pub fn decode_keyed_binary(bytes: &[u8]) -> Result<PointerSample, CodecError> {
    let wire = WireRecord::decode(bytes)?;
    let left = finite("l", wire.l.ok_or(CodecError::MissingField("l"))?)?;
    let top = finite("t", wire.t.ok_or(CodecError::MissingField("t"))?)?;
    Ok(PointerSample {
        left,
        top,
        nickname: wire.n.as_deref().and_then(optional_text).map(str::to_owned),
        timestamp: wire.ts,
    })
}

#[derive(Deserialize)]
struct KeyedRecord {
    #[serde(default)]
    l: Option<Value>,
    #[serde(default)]
    t: Option<Value>,
    #[serde(default)]
    n: Option<Value>,
    #[serde(default)]
    ts: Option<Value>,
}

#[derive(Clone, PartialEq, Message)]
struct WireRecord {
    #[prost(double, optional, tag = "1")]
    l: Option<f64>,
    #[prost(double, optional, tag = "2")]
    t: Option<f64>,
    #[prost(string, optional, tag = "3")]
    n: Option<String>,
    #[prost(uint64, optional, tag = "4")]
    ts: Option<u64>,
}

// =============================================================================
// HELPERS
// =============================================================================

/// Normalise an optional text field: empty and `"undefined"` mean absent.
fn optional_text(value: &str) -> Option<&str> {
    if value.is_empty() || value == UNDEFINED {
        None
    } else {
        Some(value)
    }
}

fn parse_number(field: &'static str, value: Option<&str>) -> Result<f64, CodecError> {
    let Some(raw) = value.and_then(optional_text) else {
        return Err(CodecError::MissingField(field));
    };
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| CodecError::InvalidNumber { field, value: raw.to_owned() })?;
    finite(field, parsed)
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<u64>, CodecError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<u64>() {
        return Ok(Some(ts));
    }
    let parsed = raw
        .parse::<f64>()
        .map_err(|_| CodecError::InvalidNumber { field: "ts", value: raw.to_owned() })?;
    timestamp_from_f64(Some(parsed))
        .map(Some)
        .ok_or_else(|| CodecError::InvalidNumber { field: "ts", value: raw.to_owned() })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn timestamp_from_f64(value: Option<f64>) -> Option<u64> {
    let value = value?;
    if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
        Some(value.round() as u64)
    } else {
        None
    }
}

fn json_field_number(field: &'static str, value: Option<&Value>) -> Result<Option<f64>, CodecError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let Some(v) = n.as_f64() else {
                return Err(CodecError::InvalidNumber { field, value: n.to_string() });
            };
            finite(field, v).map(Some)
        }
        Some(Value::String(s)) => match optional_text(s) {
            None => Ok(None),
            Some(raw) => parse_number(field, Some(raw)).map(Some),
        },
        Some(other) => Err(CodecError::InvalidNumber { field, value: other.to_string() }),
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, CodecError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CodecError::InvalidNumber { field, value: value.to_string() })
    }
}

/// Integral values are written without a fractional part to save bytes.
#[allow(clippy::cast_possible_truncation)]
fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
