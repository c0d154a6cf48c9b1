//! Reply payloads and the fragments they carry.

use std::time::Duration;

use {
    relay_common::Params,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use crate::error::{Error, Result};

/// Keys a pause directive may carry besides its delay.
const PAUSE_KEYS: &[&str] = &["time", "typing", "response_type"];

/// One unit of outbound content, or a pure delay directive.
///
/// Fragments are kept as raw JSON: content fields are passed through to the
/// channel verbatim and malformed fragments only fail when posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(Value);

impl Fragment {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Params> {
        self.0.as_object()
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Delay in milliseconds from the `time` field, if present, non-negative
    /// and representable as a `Duration`.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        let time = self.0.get("time")?;
        if let Some(ms) = time.as_u64() {
            return Some(Duration::from_millis(ms));
        }
        time.as_f64()
            .filter(|ms| ms.is_finite() && *ms >= 0.0)
            .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
    }

    /// True when the fragment is a delay and nothing else: a `time` field
    /// plus, at most, pause bookkeeping keys.
    #[must_use]
    pub fn is_pause(&self) -> bool {
        let Some(fields) = self.0.as_object() else {
            return false;
        };
        self.delay().is_some() && fields.keys().all(|k| PAUSE_KEYS.contains(&k.as_str()))
    }
}

impl From<Value> for Fragment {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// The `message` field of a reply: one fragment or an ordered sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyMessage {
    Single(Fragment),
    Sequence(Vec<Fragment>),
}

impl ReplyMessage {
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(Error::invalid_input("message is required")),
            Value::Array(items) => Ok(Self::Sequence(items.into_iter().map(Fragment).collect())),
            other => Ok(Self::Single(Fragment(other))),
        }
    }

    /// Number of fragments to deliver.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Sequence(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fragments in delivery order.
    #[must_use]
    pub fn into_fragments(self) -> Vec<Fragment> {
        match self {
            Self::Single(fragment) => vec![fragment],
            Self::Sequence(items) => items,
        }
    }
}

/// A normalized reply ready for delivery.
///
/// `metadata` holds every field except `message`: routing identifiers and
/// opaque credential references, passed through to each post unmodified.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyPayload {
    pub message: ReplyMessage,
    pub metadata: Params,
}

impl ReplyPayload {
    /// Split action params into the message and its pass-through metadata.
    pub fn from_params(mut params: Params) -> Result<Self> {
        let message = params
            .remove("message")
            .ok_or_else(|| Error::invalid_input("message is required"))?;
        Ok(Self {
            message: ReplyMessage::from_value(message)?,
            metadata: params,
        })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(params) => Self::from_params(params),
            _ => Err(Error::invalid_input("params must be a JSON object")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn single_object_is_one_fragment() {
        let payload = ReplyPayload::from_value(json!({
            "message": {"text": "hi"},
            "channel": "C1",
        }))
        .unwrap();
        assert_eq!(payload.message.len(), 1);
        assert_eq!(payload.metadata.get("channel"), Some(&json!("C1")));
        assert!(!payload.metadata.contains_key("message"));
        let fragments = payload.message.into_fragments();
        assert_eq!(fragments[0].get("text"), Some(&json!("hi")));
    }

    #[test]
    fn sequence_preserves_order() {
        let payload = ReplyPayload::from_value(json!({
            "message": [{"text": "a"}, {"time": 500}, {"text": "b"}],
        }))
        .unwrap();
        assert_eq!(payload.message.len(), 3);
        let texts: Vec<_> = payload
            .message
            .into_fragments()
            .iter()
            .map(|f| f.get("text").cloned())
            .collect();
        assert_eq!(texts, vec![Some(json!("a")), None, Some(json!("b"))]);
    }

    #[test]
    fn missing_message_is_invalid() {
        let err = ReplyPayload::from_value(json!({"channel": "C1"})).unwrap_err();
        assert_eq!(err.to_string(), "message is required");
        assert!(ReplyPayload::from_value(json!({"message": null})).is_err());
        assert!(ReplyPayload::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn malformed_fragments_are_not_rejected_upfront() {
        let payload = ReplyPayload::from_value(json!({"message": [42, "x"]})).unwrap();
        assert_eq!(payload.message.len(), 2);
    }

    #[test]
    fn delay_parsing() {
        assert_eq!(
            Fragment::new(json!({"time": 500})).delay(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            Fragment::new(json!({"time": 250.0})).delay(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(Fragment::new(json!({"time": -1})).delay(), None);
        assert_eq!(Fragment::new(json!({"time": 1e300})).delay(), None);
        assert!(!Fragment::new(json!({"time": 1e300})).is_pause());
        assert_eq!(Fragment::new(json!({"time": "500"})).delay(), None);
        assert_eq!(Fragment::new(json!({"text": "a"})).delay(), None);
    }

    #[test]
    fn pause_detection() {
        assert!(Fragment::new(json!({"time": 500})).is_pause());
        assert!(Fragment::new(json!({"time": 500, "typing": false})).is_pause());
        assert!(!Fragment::new(json!({"time": 500, "text": "a"})).is_pause());
        assert!(!Fragment::new(json!({"time": 500, "sender_action": "typing_on"})).is_pause());
        assert!(!Fragment::new(json!({"text": "a"})).is_pause());
        assert!(!Fragment::new(json!(500)).is_pause());
    }
}
