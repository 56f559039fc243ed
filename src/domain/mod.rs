//! Value objects exchanged with the codec.
//!
//! - [`payload`] - [`TrackingPayload`], the data serialized into a token
//! - [`result`] - [`TrackingResult`], produced by decoding, and the webhook body
//!
//! Both are built fresh per call and never mutated afterwards.

pub mod payload;
pub mod result;

pub use payload::{Metadata, TrackingPayload, merge_metadata, metadata_from};
pub use result::{RequestData, TrackingResult, WebhookPayload};
