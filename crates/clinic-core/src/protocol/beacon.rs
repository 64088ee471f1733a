//! JSON codec for the server beacon datagram.
//!
//! Wire format (UTF-8 JSON, one object per UDP datagram):
//! ```text
//! { "type": "clinic-server", "timestamp": <u64 milliseconds since the Unix epoch> }
//! ```
//!
//! Only `type` is checked on receipt.  `timestamp` is carried for diagnostics
//! and read leniently: a missing, negative, fractional or non-numeric value
//! decodes as `0`.  Anything else sharing the discovery port (other
//! applications, garbage, truncated datagrams) fails to decode and is dropped
//! by the caller.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Sentinel carried in the `type` field of every beacon.
pub const BEACON_TYPE: &str = "clinic-server";

/// Errors that can occur while encoding or decoding a beacon.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload is not valid JSON.
    #[error("malformed beacon payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is valid JSON but not a JSON object.
    #[error("beacon payload is not a JSON object")]
    NotAnObject,

    /// The payload is a JSON object without a `type` field.
    #[error("beacon payload has no type")]
    MissingType,

    /// The payload is well-formed but its `type` is not [`BEACON_TYPE`].
    #[error("unexpected beacon type: {0:?}")]
    UnexpectedType(String),
}

/// The beacon broadcast periodically by the elected server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeaconMessage {
    /// Always [`BEACON_TYPE`] for beacons produced by this crate.
    #[serde(rename = "type")]
    pub kind: String,
    /// Send time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl BeaconMessage {
    /// Builds a beacon stamped with the given time.
    pub fn new(timestamp: u64) -> Self {
        Self {
            kind: BEACON_TYPE.to_string(),
            timestamp,
        }
    }

    /// Builds a beacon stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self::new(current_timestamp_ms())
    }
}

/// Encodes a beacon into its datagram payload.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use clinic_core::protocol::{decode_beacon, encode_beacon, BeaconMessage};
///
/// let bytes = encode_beacon(&BeaconMessage::new(1_700_000_000_000)).unwrap();
/// let decoded = decode_beacon(&bytes).unwrap();
/// assert_eq!(decoded.kind, "clinic-server");
/// assert_eq!(decoded.timestamp, 1_700_000_000_000);
/// ```
pub fn encode_beacon(beacon: &BeaconMessage) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(beacon)?)
}

/// Decodes a datagram payload and checks that it is a clinic beacon.
///
/// # Errors
///
/// Returns [`ProtocolError::Json`] for invalid JSON,
/// [`ProtocolError::NotAnObject`] for arrays and scalars,
/// [`ProtocolError::MissingType`] when there is no `type`, and
/// [`ProtocolError::UnexpectedType`] when `type` is not [`BEACON_TYPE`].
pub fn decode_beacon(payload: &[u8]) -> Result<BeaconMessage, ProtocolError> {
    let value: Value = serde_json::from_slice(payload)?;
    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

    match object.get("type") {
        Some(Value::String(kind)) if kind == BEACON_TYPE => {}
        Some(Value::String(kind)) => return Err(ProtocolError::UnexpectedType(kind.clone())),
        Some(other) => return Err(ProtocolError::UnexpectedType(other.to_string())),
        None => return Err(ProtocolError::MissingType),
    }

    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    Ok(BeaconMessage::new(timestamp))
}

/// Returns the current time as milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
