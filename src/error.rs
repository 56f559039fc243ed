//! Error types shared by the codec, the URL builder and the HTML adapter.
//!
//! Every failure in this crate is terminal: operations are pure, so the same
//! input fails the same way on retry.

/// Reason a token could not be turned back into a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodingError {
    /// Bad base64, MAC mismatch, bad padding, unparsable JSON or an
    /// inconsistent payload.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token is authentic but older than the configured maximum age.
    #[error("token expired: age {age}s exceeds maximum {max_age}s")]
    Expired { age: u64, max_age: u64 },

    /// The token timestamp lies further in the future than clock skew allows.
    #[error("token timestamp is {skew}s in the future")]
    FromFuture { skew: u64 },
}

impl DecodingError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(#[from] DecodingError),

    #[error("html parse error: {0}")]
    HtmlParse(String),
}

impl TrackingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    pub fn html_parse(message: impl Into<String>) -> Self {
        Self::HtmlParse(message.into())
    }

    /// Returns `true` when decoding failed only because the token is too old.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Decoding(DecodingError::Expired { .. }))
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}
