// ABCI Payload Normalization
//
// Event attributes arrive base64-encoded on older RPC flavors and as plain
// text on newer ones. Both are stored verbatim; a best-effort decoded
// companion (`key_text` / `value_text`) is attached for consumers.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// SHA-256 over the raw transaction bytes, uppercase hex: the CometBFT tx
/// hash. Undecodable input hashes as empty bytes rather than failing the
/// height.
pub fn tx_hash_hex(tx_b64: &str) -> String {
    let bytes = base64::decode(tx_b64).unwrap_or_default();
    hex::encode_upper(Sha256::digest(&bytes))
}

/// Best-effort base64 → UTF-8 text, falling back to the original value when
/// the payload does not decode, is not UTF-8, or contains control bytes
/// below U+0009.
///
/// A plaintext value that happens to be valid base64 of printable text still
/// gets decoded; consumers must not rely on the result differing from the
/// raw value on newer nodes.
pub fn maybe_b64_text(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let raw = match base64::decode(value) {
        Ok(raw) => raw,
        Err(_) => return value.to_string(),
    };
    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => return value.to_string(),
    };
    if text.chars().any(|ch| (ch as u32) < 0x09) {
        return value.to_string();
    }
    text
}

/// A single event in storage shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub event_type: Option<String>,
    /// JSON array of `{key, value, key_text, value_text, index}` objects.
    pub attributes: Value,
}

impl NormalizedEvent {
    /// The `{type, attributes}` object persisted into `events_json`.
    pub fn to_value(&self) -> Value {
        json!({ "type": self.event_type, "attributes": self.attributes })
    }
}

/// Normalize a raw RPC event list. Missing, null, or otherwise unexpected
/// shapes collapse to an empty list; each attribute keeps `key`/`value`
/// verbatim and gains decoded `key_text`/`value_text` companions.
pub fn normalize_events(events: Option<&Value>) -> Vec<NormalizedEvent> {
    let Some(list) = events.and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(list.len());
    for ev in list {
        let Some(ev) = ev.as_object() else { continue };

        let mut norm_attrs = Vec::new();
        if let Some(attrs) = ev.get("attributes").and_then(Value::as_array) {
            for attr in attrs {
                let Some(attr) = attr.as_object() else { continue };
                let key = attr.get("key").cloned().unwrap_or_else(|| json!(""));
                let value = attr.get("value").cloned().unwrap_or_else(|| json!(""));
                let key_text = decoded_companion(&key);
                let value_text = decoded_companion(&value);
                norm_attrs.push(json!({
                    "key": key,
                    "value": value,
                    "key_text": key_text,
                    "value_text": value_text,
                    "index": attr.get("index").cloned().unwrap_or(Value::Null),
                }));
            }
        }

        out.push(NormalizedEvent {
            event_type: ev.get("type").and_then(Value::as_str).map(str::to_string),
            attributes: Value::Array(norm_attrs),
        });
    }
    out
}

// Non-string keys/values pass through untouched.
fn decoded_companion(raw: &Value) -> Value {
    match raw {
        Value::String(s) => Value::String(maybe_b64_text(s)),
        other => other.clone(),
    }
}

/// Lenient i64 extraction: JSON numbers and numeric strings both count,
/// anything else is absent. Gas fields are strings on the wire.
pub fn lenient_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
