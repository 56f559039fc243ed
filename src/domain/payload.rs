//! Tracking payload: the data carried inside a token.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodingError, TrackingError};

/// Caller-defined metadata attached to a tracking link.
///
/// Values are restricted to JSON: string, number, bool, null, arrays and
/// nested objects of the same.
pub type Metadata = Map<String, Value>;

/// Converts any serializable value into [`Metadata`].
///
/// # Errors
///
/// Returns [`TrackingError::Encoding`] if the value cannot be represented as
/// JSON (e.g. a map with non-string keys) or is not a JSON object.
///
/// # Examples
///
/// ```ignore
/// let metadata = metadata_from(&json!({ "customer_id": 1 })).unwrap();
/// assert_eq!(metadata["customer_id"], 1);
/// ```
pub fn metadata_from<T: Serialize + ?Sized>(value: &T) -> Result<Metadata, TrackingError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Metadata::new()),
        other => Err(TrackingError::encoding(format!(
            "metadata must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Merges `extra` over `defaults`; keys in `extra` win.
pub fn merge_metadata(defaults: &Metadata, extra: Option<&Metadata>) -> Metadata {
    let mut merged = defaults.clone();
    if let Some(extra) = extra {
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The object serialized into a token.
///
/// Serialized shape: `metadata` (object), `is_click` (bool), `tracked_url`
/// (string, present iff `is_click`), `webhook_url` (string, optional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPayload {
    #[serde(default)]
    pub metadata: Metadata,
    pub is_click: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl TrackingPayload {
    /// Payload for an open-tracking (pixel) link.
    pub fn open(metadata: Metadata) -> Self {
        Self {
            metadata,
            is_click: false,
            tracked_url: None,
            webhook_url: None,
        }
    }

    /// Payload for a click-tracking link redirecting to `tracked_url`.
    pub fn click(tracked_url: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            metadata,
            is_click: true,
            tracked_url: Some(tracked_url.into()),
            webhook_url: None,
        }
    }

    pub fn with_webhook_url(mut self, webhook_url: Option<String>) -> Self {
        self.webhook_url = webhook_url;
        self
    }

    /// Checks that `tracked_url` is present exactly when `is_click` is set.
    ///
    /// # Errors
    ///
    /// Returns [`DecodingError::Malformed`] for an inconsistent payload.
    pub fn validate(&self) -> Result<(), DecodingError> {
        match (self.is_click, self.tracked_url.as_deref()) {
            (true, None) => Err(DecodingError::malformed(
                "click payload is missing tracked_url",
            )),
            (true, Some("")) => Err(DecodingError::malformed("click payload has empty tracked_url")),
            (false, Some(_)) => Err(DecodingError::malformed(
                "open payload must not carry tracked_url",
            )),
            _ => Ok(()),
        }
    }
}
