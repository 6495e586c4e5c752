use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{
    KEY_CONTENT, KEY_DATA, KEY_TIMESTAMP, KEY_TYPE, LEGACY_FIELDS, TYPE_MESSAGE, TYPE_RAW,
};

/// Canonical shape of every message exchanged over the socket.
///
/// `data` is always present. Top-level fields other than `type` and `data`
/// (legacy flat identifiers, server timestamps) are kept verbatim in `extra`
/// so older readers keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Creates an envelope with the given type and data.
    pub fn new(kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
            extra: Map::new(),
        }
    }

    /// Wraps text that is not a JSON object: `{"type":"raw","data":{"content":...}}`.
    pub fn raw(content: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert(KEY_CONTENT.into(), Value::String(content.into()));
        Self::new(TYPE_RAW, data)
    }

    /// Normalizes a text frame.
    ///
    /// JSON objects go through [`Envelope::from_map`]; anything else (invalid
    /// JSON, bare strings, numbers, arrays) becomes a raw envelope carrying
    /// the original text. A frame is never rejected.
    pub fn from_frame(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Self::from_map(map),
            _ => Self::raw(text),
        }
    }

    /// Normalizes a JSON object into an envelope.
    ///
    /// Objects without a string `type` are treated as legacy payloads and
    /// wrapped whole as `{"type":"message","data":<object>}`. A missing or
    /// null `data` becomes an empty map; a non-object `data` is moved under
    /// `data.content`. Legacy identifiers are then mirrored into `data`.
    pub fn from_map(mut map: Map<String, Value>) -> Self {
        let kind = match map.get(KEY_TYPE) {
            Some(Value::String(kind)) => Some(kind.clone()),
            _ => None,
        };

        let mut envelope = match kind {
            Some(kind) => {
                map.remove(KEY_TYPE);
                let data = match map.remove(KEY_DATA) {
                    Some(Value::Object(data)) => data,
                    None | Some(Value::Null) => Map::new(),
                    Some(other) => {
                        let mut data = Map::new();
                        data.insert(KEY_CONTENT.into(), other);
                        data
                    }
                };
                Self {
                    kind,
                    data,
                    extra: map,
                }
            }
            None => Self::new(TYPE_MESSAGE, map),
        };
        envelope.mirror_legacy_fields();
        envelope
    }

    /// Normalizes an arbitrary JSON value supplied by a caller.
    ///
    /// Strings are treated as frames, objects as maps. Returns `None` for
    /// null, booleans, numbers and arrays, which are not messages.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::from_map(map)),
            Value::String(text) => Some(Self::from_frame(&text)),
            _ => None,
        }
    }

    /// Copies legacy flat fields into their canonical `data` keys.
    ///
    /// Legacy keys are looked up at the top level first, then inside `data`
    /// (where they end up after a legacy payload was wrapped). An existing
    /// non-null canonical value is never overwritten and legacy keys are
    /// never removed.
    fn mirror_legacy_fields(&mut self) {
        for (legacy, canonical) in LEGACY_FIELDS {
            if self.data.get(canonical).is_some_and(|v| !v.is_null()) {
                continue;
            }
            let value = self
                .extra
                .get(legacy)
                .or_else(|| self.data.get(legacy))
                .filter(|v| !v.is_null())
                .cloned();
            if let Some(value) = value {
                self.data.insert(canonical.to_string(), value);
            }
        }
    }

    /// Returns a value from `data`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns `data.content` as a string, if it is one.
    pub fn content(&self) -> Option<&str> {
        self.data.get(KEY_CONTENT).and_then(Value::as_str)
    }

    /// Server-supplied send time in milliseconds since the Unix epoch.
    ///
    /// Read from the top level, falling back to `data`.
    pub fn timestamp_ms(&self) -> Option<i64> {
        let value = self
            .extra
            .get(KEY_TIMESTAMP)
            .or_else(|| self.data.get(KEY_TIMESTAMP))?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
    }

    /// Serializes the envelope for the wire.
    ///
    /// Map keys are emitted in sorted order, so the same envelope always
    /// produces the same text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn canonical_message_is_unchanged() {
        let env = Envelope::from_map(object(json!({
            "type": "message",
            "data": {"content": "hi", "recipientId": 5}
        })));
        assert_eq!(env.kind, "message");
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"type": "message", "data": {"content": "hi", "recipientId": 5}})
        );
    }

    #[test]
    fn missing_data_defaults_to_empty_map() {
        let env = Envelope::from_frame(r#"{"type":"typing"}"#);
        assert_eq!(env.kind, "typing");
        assert!(env.data.is_empty());
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"type": "typing", "data": {}})
        );
    }

    #[test]
    fn null_data_defaults_to_empty_map() {
        let env = Envelope::from_frame(r#"{"type":"typing","data":null}"#);
        assert!(env.data.is_empty());
    }

    #[test]
    fn scalar_data_moves_under_content() {
        let env = Envelope::from_frame(r#"{"type":"notice","data":"server restarting"}"#);
        assert_eq!(env.content(), Some("server restarting"));
    }

    #[test]
    fn malformed_frame_becomes_raw() {
        let env = Envelope::from_frame("not json{");
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"type": "raw", "data": {"content": "not json{"}})
        );
    }

    #[test]
    fn non_object_json_becomes_raw() {
        assert_eq!(Envelope::from_frame("pong").kind, TYPE_RAW);
        assert_eq!(Envelope::from_frame("42").content(), Some("42"));
        assert_eq!(Envelope::from_frame("[1,2]").content(), Some("[1,2]"));
    }

    #[test]
    fn untyped_legacy_payload_is_wrapped_and_mirrored() {
        let env = Envelope::from_frame(
            r#"{"id":7,"sender_id":3,"receiver_id":9,"content":"still available?","is_read":false}"#,
        );
        assert_eq!(env.kind, TYPE_MESSAGE);
        assert!(env.extra.is_empty());
        // Legacy keys stay, canonical keys are added.
        assert_eq!(env.get("sender_id"), Some(&json!(3)));
        assert_eq!(env.get("receiver_id"), Some(&json!(9)));
        assert_eq!(env.get("senderId"), Some(&json!(3)));
        assert_eq!(env.get("recipientId"), Some(&json!(9)));
        assert_eq!(env.content(), Some("still available?"));
        assert_eq!(env.get("id"), Some(&json!(7)));
    }

    #[test]
    fn top_level_legacy_fields_are_mirrored_but_kept() {
        let env = Envelope::from_frame(
            r#"{"type":"message","sender_id":3,"receiver_id":9,"content":"hello","data":{}}"#,
        );
        assert_eq!(env.get("senderId"), Some(&json!(3)));
        assert_eq!(env.get("recipientId"), Some(&json!(9)));
        assert_eq!(env.content(), Some("hello"));
        assert_eq!(env.extra.get("sender_id"), Some(&json!(3)));
        assert_eq!(env.extra.get("receiver_id"), Some(&json!(9)));
        assert_eq!(env.extra.get("content"), Some(&json!("hello")));
    }

    #[test]
    fn camel_case_receiver_is_mirrored() {
        let env = Envelope::from_map(object(json!({
            "type": "message",
            "receiverId": 12,
            "data": {"content": "x"}
        })));
        assert_eq!(env.get("recipientId"), Some(&json!(12)));
    }

    #[test]
    fn existing_canonical_value_wins() {
        let env = Envelope::from_map(object(json!({
            "type": "message",
            "receiver_id": 1,
            "data": {"recipientId": 2}
        })));
        assert_eq!(env.get("recipientId"), Some(&json!(2)));
    }

    #[test]
    fn null_legacy_values_are_ignored() {
        let env = Envelope::from_map(object(json!({
            "type": "message",
            "sender_id": null,
            "data": {}
        })));
        assert!(env.get("senderId").is_none());
    }

    #[test]
    fn from_value_rejects_non_messages() {
        assert!(Envelope::from_value(Value::Null).is_none());
        assert!(Envelope::from_value(json!(true)).is_none());
        assert!(Envelope::from_value(json!(3)).is_none());
        assert!(Envelope::from_value(json!([1])).is_none());
        assert_eq!(
            Envelope::from_value(json!("plain text")).unwrap(),
            Envelope::raw("plain text")
        );
    }

    #[test]
    fn timestamp_from_top_level_or_data() {
        let top = Envelope::from_frame(r#"{"type":"message","timestamp":1700000000000}"#);
        assert_eq!(top.timestamp_ms(), Some(1_700_000_000_000));

        let nested = Envelope::from_frame(r#"{"sender_id":1,"content":"x","timestamp":1.5e3}"#);
        assert_eq!(nested.timestamp_ms(), Some(1500));

        let none = Envelope::from_frame(r#"{"type":"message","timestamp":"yesterday"}"#);
        assert_eq!(none.timestamp_ms(), None);
    }

    #[test]
    fn serialization_is_deterministic() {
        let env = Envelope::from_frame(r#"{"type":"message","z":1,"a":2,"data":{"b":1,"a":2}}"#);
        let first = env.to_json().unwrap();
        let second = env.clone().to_json().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, r#"{"type":"message","data":{"a":2,"b":1},"a":2,"z":1}"#);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = Envelope::from_frame(r#"{"sender_id":3,"receiver_id":9,"content":"x"}"#);
        let twice = Envelope::from_frame(&once.to_json().unwrap());
        assert_eq!(once, twice);
    }
}
