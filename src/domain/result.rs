//! Decoded tracking result and the webhook notification body built from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::payload::{Metadata, TrackingPayload};
use crate::error::TrackingError;

/// Request context attached by an HTTP adapter (client IP, user agent, ...).
pub type RequestData = Map<String, Value>;

/// Outcome of decoding a tracking token.
///
/// `timestamp` is the Unix time at which decoding happened, not when the
/// link was generated. `request_data` is never filled by the codec itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingResult {
    pub is_open_tracking: bool,
    pub is_click_tracking: bool,
    pub tracked_url: Option<String>,
    pub webhook_url: Option<String>,
    pub metadata: Metadata,
    pub request_data: Option<RequestData>,
    pub timestamp: i64,
}

impl TrackingResult {
    pub fn from_payload(payload: TrackingPayload, timestamp: i64) -> Self {
        Self {
            is_open_tracking: !payload.is_click,
            is_click_tracking: payload.is_click,
            tracked_url: payload.tracked_url,
            webhook_url: payload.webhook_url,
            metadata: payload.metadata,
            request_data: None,
            timestamp,
        }
    }

    pub fn with_request_data(mut self, request_data: Option<RequestData>) -> Self {
        self.request_data = request_data;
        self
    }

    /// Builds the body POSTed to `webhook_url`.
    pub fn webhook_payload(&self) -> WebhookPayload {
        WebhookPayload {
            is_open_tracking: self.is_open_tracking,
            is_click_tracking: self.is_click_tracking,
            metadata: self.metadata.clone(),
            request_data: self.request_data.clone(),
            tracked_url: self.tracked_url.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// JSON body of a webhook notification (`Content-Type: application/json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub is_open_tracking: bool,
    pub is_click_tracking: bool,
    pub metadata: Metadata,
    pub request_data: Option<RequestData>,
    pub tracked_url: Option<String>,
    pub timestamp: i64,
}

impl WebhookPayload {
    /// Serializes the body for the webhook request.
    pub fn to_json(&self) -> Result<String, TrackingError> {
        Ok(serde_json::to_string(self)?)
    }
}
