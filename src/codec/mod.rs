//! Tracking token codec.
//!
//! A token is URL-safe base64 (with padding) of either the compact JSON
//! serialization of a [`TrackingPayload`], or, when a [`TokenCipher`] is
//! supplied, of the sealed blob produced from that JSON.
//!
//! Decoding accepts tokens with or without trailing `=` padding.

pub mod cipher;

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use tracing::debug;

use crate::domain::TrackingPayload;
use crate::error::{DecodingError, TrackingError};

pub use cipher::{FernetCipher, TokenCipher};

/// URL-safe alphabet, padded on encode, padding-indifferent on decode.
pub const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes a payload into a token.
///
/// # Errors
///
/// Returns [`TrackingError::Encoding`] if the payload is inconsistent
/// (click without destination) or sealing fails.
pub fn encode(
    payload: &TrackingPayload,
    cipher: Option<&dyn TokenCipher>,
) -> Result<String, TrackingError> {
    payload
        .validate()
        .map_err(|e| TrackingError::encoding(e.to_string()))?;

    let serialized = serde_json::to_vec(payload)?;
    let bytes = match cipher {
        Some(cipher) => cipher.seal(&serialized)?,
        None => serialized,
    };

    debug!(
        encrypted = cipher.is_some(),
        is_click = payload.is_click,
        len = bytes.len(),
        "Encoded tracking payload"
    );

    Ok(TOKEN_ENGINE.encode(bytes))
}

/// Decodes a token back into a payload.
///
/// `max_age` is only enforced when a cipher is supplied, since plain tokens
/// carry no timestamp.
///
/// # Errors
///
/// Returns [`TrackingError::Decoding`] for bad base64, a failed
/// authentication or age check, unparsable JSON, or an inconsistent payload.
pub fn decode(
    token: &str,
    cipher: Option<&dyn TokenCipher>,
    max_age: Option<u64>,
) -> Result<TrackingPayload, TrackingError> {
    let bytes = TOKEN_ENGINE
        .decode(token)
        .map_err(|e| DecodingError::malformed(format!("invalid base64: {e}")))?;

    let serialized = match cipher {
        Some(cipher) => cipher.open(&bytes, max_age)?,
        None => bytes,
    };

    let payload: TrackingPayload = serde_json::from_slice(&serialized)
        .map_err(|e| DecodingError::malformed(format!("invalid payload: {e}")))?;
    payload.validate()?;

    Ok(payload)
}
