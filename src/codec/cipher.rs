//! Authenticated encryption for tracking tokens.
//!
//! [`FernetCipher`] implements the Fernet construction: AES-128-CBC with
//! PKCS#7 padding for confidentiality and HMAC-SHA256 for integrity. The
//! sealed blob layout is
//!
//! ```text
//! version (1) | timestamp (8, big-endian) | IV (16) | ciphertext (n * 16) | MAC (32)
//! ```
//!
//! The MAC covers everything before it and is verified before any decryption
//! or timestamp check. Keys are URL-safe base64 of 32 bytes: the first half
//! signs, the second half encrypts.

use std::fmt;

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::TOKEN_ENGINE;
use crate::error::{DecodingError, TrackingError};

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Format tag stored in the first byte of every sealed token.
pub const VERSION: u8 = 0x80;

/// Decoded length of the key material.
pub const KEY_LEN: usize = 32;

/// Tokens dated further than this into the future are rejected when a
/// maximum age is enforced.
pub const MAX_CLOCK_SKEW_SECS: u64 = 60;

const SUB_KEY_LEN: usize = KEY_LEN / 2;
const TIMESTAMP_LEN: usize = 8;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const MAC_LEN: usize = 32;
const HEADER_LEN: usize = 1 + TIMESTAMP_LEN + IV_LEN;

/// Capability to seal and open serialized payloads.
///
/// The codec runs the encryption branch only when it is handed a cipher;
/// without one, tokens carry plain serialized bytes.
#[cfg_attr(test, mockall::automock)]
pub trait TokenCipher: Send + Sync {
    /// Encrypts and authenticates `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Encoding`] if no random IV could be obtained.
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, TrackingError>;

    /// Verifies and decrypts a sealed blob, optionally rejecting it when it
    /// is older than `max_age` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`DecodingError`] on any authentication, format or age failure.
    fn open(&self, sealed: &[u8], max_age: Option<u64>) -> Result<Vec<u8>, DecodingError>;
}

/// Fernet-compatible [`TokenCipher`].
#[derive(Clone, PartialEq, Eq)]
pub struct FernetCipher {
    signing_key: [u8; SUB_KEY_LEN],
    encryption_key: [u8; SUB_KEY_LEN],
}

impl fmt::Debug for FernetCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FernetCipher").finish_non_exhaustive()
    }
}

impl FernetCipher {
    /// Builds a cipher from URL-safe base64 key material.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] if the key is not valid
    /// base64 or does not decode to exactly [`KEY_LEN`] bytes.
    pub fn from_key(key: &str) -> Result<Self, TrackingError> {
        let bytes = TOKEN_ENGINE.decode(key.trim()).map_err(|e| {
            TrackingError::configuration(format!("encryption key is not URL-safe base64: {e}"))
        })?;

        if bytes.len() != KEY_LEN {
            return Err(TrackingError::configuration(format!(
                "encryption key must decode to {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut signing_key = [0u8; SUB_KEY_LEN];
        let mut encryption_key = [0u8; SUB_KEY_LEN];
        signing_key.copy_from_slice(&bytes[..SUB_KEY_LEN]);
        encryption_key.copy_from_slice(&bytes[SUB_KEY_LEN..]);

        Ok(Self {
            signing_key,
            encryption_key,
        })
    }

    /// Generates fresh key material suitable for [`FernetCipher::from_key`].
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] if the OS random source fails.
    pub fn generate_key() -> Result<String, TrackingError> {
        let mut key = [0u8; KEY_LEN];
        getrandom::fill(&mut key).map_err(|e| {
            TrackingError::configuration(format!("failed to generate key material: {e}"))
        })?;
        Ok(TOKEN_ENGINE.encode(key))
    }

    /// Seals `plaintext` stamped with `timestamp` (Unix seconds) under a
    /// fresh random IV.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Encoding`] if the OS random source fails.
    pub fn seal_at(&self, plaintext: &[u8], timestamp: u64) -> Result<Vec<u8>, TrackingError> {
        let mut iv = [0u8; IV_LEN];
        getrandom::fill(&mut iv)
            .map_err(|e| TrackingError::encoding(format!("failed to generate IV: {e}")))?;
        Ok(self.seal_with_iv(plaintext, timestamp, iv))
    }

    fn seal_with_iv(&self, plaintext: &[u8], timestamp: u64, iv: [u8; IV_LEN]) -> Vec<u8> {
        let ciphertext = Aes128CbcEnc::new(&self.encryption_key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut sealed = Vec::with_capacity(HEADER_LEN + ciphertext.len() + MAC_LEN);
        sealed.push(VERSION);
        sealed.extend_from_slice(&timestamp.to_be_bytes());
        sealed.extend_from_slice(&iv);
        sealed.extend_from_slice(&ciphertext);

        let mut mac = self.mac();
        mac.update(&sealed);
        sealed.extend_from_slice(&mac.finalize().into_bytes());
        sealed
    }

    /// Opens a sealed blob as if the current Unix time were `now`.
    ///
    /// A token is expired when `now - timestamp > max_age`; a token exactly
    /// `max_age` seconds old is still accepted.
    ///
    /// # Errors
    ///
    /// - [`DecodingError::Malformed`] for a short blob, unknown version,
    ///   MAC mismatch or bad padding
    /// - [`DecodingError::Expired`] when the token is too old
    /// - [`DecodingError::FromFuture`] when the timestamp exceeds clock skew
    pub fn open_at(
        &self,
        sealed: &[u8],
        max_age: Option<u64>,
        now: u64,
    ) -> Result<Vec<u8>, DecodingError> {
        if sealed.len() < HEADER_LEN + BLOCK_LEN + MAC_LEN {
            return Err(DecodingError::malformed("sealed token is too short"));
        }
        if sealed[0] != VERSION {
            return Err(DecodingError::malformed(format!(
                "unsupported token version 0x{:02x}",
                sealed[0]
            )));
        }

        let (signed, tag) = sealed.split_at(sealed.len() - MAC_LEN);
        let mut mac = self.mac();
        mac.update(signed);
        mac.verify_slice(tag)
            .map_err(|_| DecodingError::malformed("authentication tag mismatch"))?;

        let mut timestamp_bytes = [0u8; TIMESTAMP_LEN];
        timestamp_bytes.copy_from_slice(&signed[1..1 + TIMESTAMP_LEN]);
        let timestamp = u64::from_be_bytes(timestamp_bytes);

        if let Some(max_age) = max_age {
            if timestamp > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
                return Err(DecodingError::FromFuture {
                    skew: timestamp - now,
                });
            }
            let age = now.saturating_sub(timestamp);
            if age > max_age {
                return Err(DecodingError::Expired { age, max_age });
            }
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&signed[1 + TIMESTAMP_LEN..HEADER_LEN]);
        let ciphertext = &signed[HEADER_LEN..];
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(DecodingError::malformed(
                "ciphertext is not a whole number of blocks",
            ));
        }

        Aes128CbcDec::new(&self.encryption_key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| DecodingError::malformed("invalid ciphertext padding"))
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.signing_key).expect("HMAC accepts any key length")
    }
}

impl TokenCipher for FernetCipher {
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, TrackingError> {
        self.seal_at(plaintext, unix_now())
    }

    fn open(&self, sealed: &[u8], max_age: Option<u64>) -> Result<Vec<u8>, DecodingError> {
        self.open_at(sealed, max_age, unix_now())
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Published Fernet test vector.
    const VECTOR_KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
    const VECTOR_TOKEN: &str = "gAAAAAAdwJ6wAAECAwQFBgcICQoLDA0ODy021cpGVWKZ_eEwCGM4BLLF_5CV9dOPmrhuVUPgJobwOz7JcbmrR64jVmpU4IwqDA==";
    const VECTOR_TIMESTAMP: u64 = 499_162_800;

    fn vector_iv() -> [u8; IV_LEN] {
        let mut iv = [0u8; IV_LEN];
        for (i, byte) in iv.iter_mut().enumerate() {
            *byte = i as u8;
        }
        iv
    }

    fn test_cipher() -> FernetCipher {
        FernetCipher::from_key(VECTOR_KEY).unwrap()
    }

    #[test]
    fn test_seal_matches_known_vector() {
        let sealed = test_cipher().seal_with_iv(b"hello", VECTOR_TIMESTAMP, vector_iv());
        assert_eq!(TOKEN_ENGINE.encode(sealed), VECTOR_TOKEN);
    }

    #[test]
    fn test_open_known_vector() {
        let sealed = TOKEN_ENGINE.decode(VECTOR_TOKEN).unwrap();
        let plaintext = test_cipher()
            .open_at(&sealed, Some(60), VECTOR_TIMESTAMP + 1)
            .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn test_seal_open_round_trip() {
        let cipher = test_cipher();
        let sealed = cipher.seal(b"{\"is_click\":false}").unwrap();
        let opened = cipher.open(&sealed, None).unwrap();
        assert_eq!(opened, b"{\"is_click\":false}");
    }

    #[test]
    fn test_seal_uses_fresh_iv() {
        let cipher = test_cipher();
        let first = cipher.seal_at(b"same", 1).unwrap();
        let second = cipher.seal_at(b"same", 1).unwrap();

        assert_ne!(first[9..HEADER_LEN], second[9..HEADER_LEN]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_sealed_layout() {
        let sealed = test_cipher().seal_at(b"0123456789abcdef", 0x0102).unwrap();

        assert_eq!(sealed[0], VERSION);
        assert_eq!(&sealed[1..9], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        // 16 bytes of plaintext pad to two blocks
        assert_eq!(sealed.len(), HEADER_LEN + 32 + MAC_LEN);
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = test_cipher().seal(b"secret").unwrap();
        let other = FernetCipher::from_key(&FernetCipher::generate_key().unwrap()).unwrap();

        let result = other.open(&sealed, None);
        assert!(matches!(result, Err(DecodingError::Malformed(_))));
    }

    #[test]
    fn test_any_flipped_byte_is_rejected() {
        let cipher = test_cipher();
        let sealed = cipher.seal_at(b"{\"metadata\":{}}", 1_000).unwrap();

        for i in 0..sealed.len() {
            let mut tampered = sealed.clone();
            tampered[i] ^= 0x01;
            assert!(
                cipher.open_at(&tampered, None, 1_000).is_err(),
                "flipping byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_max_age_boundaries() {
        let cipher = test_cipher();
        let issued = 1_000_000;
        let max_age = 30;
        let sealed = cipher.seal_at(b"ttl", issued).unwrap();

        assert!(cipher.open_at(&sealed, Some(max_age), issued + max_age - 1).is_ok());
        assert!(cipher.open_at(&sealed, Some(max_age), issued + max_age).is_ok());

        let result = cipher.open_at(&sealed, Some(max_age), issued + max_age + 1);
        assert_eq!(
            result,
            Err(DecodingError::Expired {
                age: max_age + 1,
                max_age
            })
        );
    }

    #[test]
    fn test_no_max_age_never_expires() {
        let cipher = test_cipher();
        let sealed = cipher.seal_at(b"old", 10).unwrap();
        assert!(cipher.open_at(&sealed, None, 10_000_000).is_ok());
    }

    #[test]
    fn test_future_timestamp_rejected_beyond_skew() {
        let cipher = test_cipher();
        let now = 5_000;

        let within = cipher.seal_at(b"x", now + MAX_CLOCK_SKEW_SECS).unwrap();
        assert!(cipher.open_at(&within, Some(10), now).is_ok());

        let beyond = cipher.seal_at(b"x", now + MAX_CLOCK_SKEW_SECS + 1).unwrap();
        assert!(matches!(
            cipher.open_at(&beyond, Some(10), now),
            Err(DecodingError::FromFuture { .. })
        ));
    }

    #[test]
    fn test_open_short_blob() {
        let result = test_cipher().open_at(&[VERSION; 40], None, 0);
        assert!(matches!(result, Err(DecodingError::Malformed(_))));
    }

    #[test]
    fn test_from_key_wrong_length() {
        let short = TOKEN_ENGINE.encode([7u8; 16]);
        let result = FernetCipher::from_key(&short);
        assert!(matches!(result, Err(TrackingError::Configuration(_))));
    }

    #[test]
    fn test_from_key_not_base64() {
        let result = FernetCipher::from_key("not a key!");
        assert!(matches!(result, Err(TrackingError::Configuration(_))));
    }

    #[test]
    fn test_generate_key_is_valid_and_unique() {
        let first = FernetCipher::generate_key().unwrap();
        let second = FernetCipher::generate_key().unwrap();

        assert_ne!(first, second);
        assert!(FernetCipher::from_key(&first).is_ok());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let debug = format!("{:?}", test_cipher());
        assert_eq!(debug, "FernetCipher { .. }");
    }
}
