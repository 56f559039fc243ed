//! # linktrack
//!
//! Open and click tracking for HTML email.
//!
//! Tracking data (caller metadata, the destination of a click, optionally a
//! webhook URL) is carried inside the tracking link itself as a token, so no
//! storage is needed to resolve a hit.
//!
//! ## Architecture
//!
//! - **Domain** ([`domain`]) - Payloads serialized into tokens and results decoded from them
//! - **Codec** ([`codec`]) - Token encoding with optional authenticated encryption
//! - **Tracking API** ([`tracking`]) - Link generation and decoding under configured base URLs
//! - **HTML** ([`html`]) - Rewriting links and inserting the open-tracking pixel
//! - **Configuration** ([`config`]) - Immutable options with explicit precedence
//!
//! ## Quick Start
//!
//! ```ignore
//! use linktrack::prelude::*;
//! use serde_json::json;
//!
//! let config = Configuration::builder()
//!     .base_open_tracking_url("https://trackingdomain.com/path/")
//!     .base_click_tracking_url("https://trackingdomain.com/path/")
//!     .encryption_key(FernetCipher::generate_key()?)
//!     .build()?;
//!
//! let metadata = metadata_from(&json!({"customer_id": 1}))?;
//! let html = adapt_html("<body><a href=\"https://example.com\">hi</a></body>",
//!     Some(&metadata), true, true, &config)?;
//!
//! // Later, when the pixel is fetched:
//! let result = get_open_tracking_result("/gAAAAA...", None, &config)?;
//! ```
//!
//! The crate does not serve HTTP or send webhooks. Serve
//! [`pixel::get_open_tracking_pixel`] for open hits, redirect to
//! [`TrackingResult::tracked_url`] for click hits, and POST
//! [`TrackingResult::webhook_payload`] to the webhook yourself.
//!
//! ## Configuration
//!
//! See [`config`] for the available options and environment variables.

pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod html;
pub mod pixel;
pub mod tracking;
pub mod utils;

pub use config::Configuration;
pub use domain::{Metadata, TrackingPayload, TrackingResult};
pub use error::{DecodingError, TrackingError};

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::codec::{FernetCipher, TokenCipher};
    pub use crate::config::{ConfigOverrides, Configuration, PixelPosition, TrackableAttribute};
    pub use crate::domain::{Metadata, RequestData, TrackingPayload, TrackingResult, metadata_from};
    pub use crate::error::{DecodingError, TrackingError};
    pub use crate::html::adapt_html;
    pub use crate::tracking::{
        get_click_tracking_result, get_click_tracking_url, get_open_tracking_result,
        get_open_tracking_url,
    };
}
