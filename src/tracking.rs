//! Link generation and decoding driven by a [`Configuration`].
//!
//! Generation flow: caller metadata -> [`TrackingPayload`] -> token -> full
//! link under the configured base URL. Decoding flow: link or request path
//! -> token -> [`TrackingResult`].

use chrono::Utc;
use tracing::{debug, warn};

use crate::codec;
use crate::config::Configuration;
use crate::domain::{Metadata, RequestData, TrackingPayload, TrackingResult, merge_metadata};
use crate::error::{DecodingError, TrackingError};
use crate::utils::{build_url, strip_base_url, token_from_path};

/// Metadata to embed in a token: configured defaults (when embedded) with
/// `extra` merged on top.
pub fn embedded_metadata(extra: Option<&Metadata>, config: &Configuration) -> Metadata {
    if config.include_default_metadata() {
        merge_metadata(config.default_metadata(), extra)
    } else {
        extra.cloned().unwrap_or_default()
    }
}

pub fn open_payload(extra: Option<&Metadata>, config: &Configuration) -> TrackingPayload {
    TrackingPayload::open(embedded_metadata(extra, config))
        .with_webhook_url(config.embedded_webhook_url())
}

pub fn click_payload(
    url_to_track: &str,
    extra: Option<&Metadata>,
    config: &Configuration,
) -> TrackingPayload {
    TrackingPayload::click(url_to_track, embedded_metadata(extra, config))
        .with_webhook_url(config.embedded_webhook_url())
}

/// Encodes a payload with the configured cipher, if any.
///
/// # Errors
///
/// See [`codec::encode`].
pub fn encode_payload(
    payload: &TrackingPayload,
    config: &Configuration,
) -> Result<String, TrackingError> {
    codec::encode(payload, config.cipher())
}

/// Decodes a bare token into a [`TrackingResult`] stamped with the current
/// time.
///
/// When defaults are not embedded they are merged under the decoded
/// metadata here. A token without an embedded webhook URL reports the
/// configured one, unless embedding is enabled.
///
/// # Errors
///
/// Returns [`TrackingError::Decoding`] if the token is malformed, tampered
/// with, or expired.
pub fn decode_token(token: &str, config: &Configuration) -> Result<TrackingResult, TrackingError> {
    let timestamp = Utc::now().timestamp();

    let mut payload = codec::decode(token, config.cipher(), config.max_token_age())
        .inspect_err(|e| warn!("Rejected tracking token: {}", e))?;

    if !config.include_default_metadata() {
        payload.metadata = merge_metadata(config.default_metadata(), Some(&payload.metadata));
    }
    if payload.webhook_url.is_none() && !config.include_webhook_url() {
        payload.webhook_url = config.webhook_url().map(str::to_owned);
    }

    debug!(is_click = payload.is_click, "Decoded tracking token");

    Ok(TrackingResult::from_payload(payload, timestamp))
}

/// Builds an open-tracking (pixel) link.
///
/// # Errors
///
/// Returns [`TrackingError::Configuration`] if `base_open_tracking_url` is
/// not set, or an encoding error from the codec.
///
/// # Examples
///
/// ```ignore
/// let config = Configuration::builder()
///     .base_open_tracking_url("https://trackingdomain.com/path/")
///     .build()?;
/// let url = get_open_tracking_url(Some(&metadata_from(&json!({"customer_id": 1}))?), &config)?;
/// ```
pub fn get_open_tracking_url(
    metadata: Option<&Metadata>,
    config: &Configuration,
) -> Result<String, TrackingError> {
    let base_url = config.require_open_base_url()?;
    let token = encode_payload(&open_payload(metadata, config), config)?;
    Ok(build_url(base_url, &token, config.append_slash()))
}

/// Builds a click-tracking link redirecting to `url_to_track`.
///
/// # Errors
///
/// Returns [`TrackingError::Configuration`] if `base_click_tracking_url` is
/// not set, or an encoding error from the codec.
pub fn get_click_tracking_url(
    url_to_track: &str,
    metadata: Option<&Metadata>,
    config: &Configuration,
) -> Result<String, TrackingError> {
    let base_url = config.require_click_base_url()?;
    let token = encode_payload(&click_payload(url_to_track, metadata, config), config)?;
    Ok(build_url(base_url, &token, config.append_slash()))
}

/// Decodes an open-tracking link.
///
/// `encoded` may be the full link (when it starts with the configured base
/// URL), a request path, or the bare token.
///
/// # Errors
///
/// See [`decode_token`].
pub fn get_open_tracking_result(
    encoded: &str,
    request_data: Option<RequestData>,
    config: &Configuration,
) -> Result<TrackingResult, TrackingError> {
    let path = config
        .base_open_tracking_url()
        .and_then(|base| strip_base_url(encoded, base))
        .unwrap_or(encoded);

    decode_token(token_from_path(path), config).map(|r| r.with_request_data(request_data))
}

/// Decodes a click-tracking link. See [`get_open_tracking_result`].
///
/// # Errors
///
/// See [`decode_token`].
pub fn get_click_tracking_result(
    encoded: &str,
    request_data: Option<RequestData>,
    config: &Configuration,
) -> Result<TrackingResult, TrackingError> {
    let path = config
        .base_click_tracking_url()
        .and_then(|base| strip_base_url(encoded, base))
        .unwrap_or(encoded);

    decode_token(token_from_path(path), config).map(|r| r.with_request_data(request_data))
}

/// Returns the encoded part of a full open-tracking link.
///
/// # Errors
///
/// Returns [`TrackingError::Configuration`] if no base URL is configured and
/// [`TrackingError::Decoding`] if `url` does not start with it.
pub fn get_open_tracking_url_path<'a>(
    url: &'a str,
    config: &Configuration,
) -> Result<&'a str, TrackingError> {
    let base_url = config.require_open_base_url()?;
    strip_base_url(url, base_url).ok_or_else(|| {
        DecodingError::malformed("link does not start with base_open_tracking_url").into()
    })
}

/// Returns the encoded part of a full click-tracking link.
///
/// # Errors
///
/// Returns [`TrackingError::Configuration`] if no base URL is configured and
/// [`TrackingError::Decoding`] if `url` does not start with it.
pub fn get_click_tracking_url_path<'a>(
    url: &'a str,
    config: &Configuration,
) -> Result<&'a str, TrackingError> {
    let base_url = config.require_click_base_url()?;
    strip_base_url(url, base_url).ok_or_else(|| {
        DecodingError::malformed("link does not start with base_click_tracking_url").into()
    })
}
