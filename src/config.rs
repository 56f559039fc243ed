//! Tracking configuration.
//!
//! A [`Configuration`] is immutable once built and is passed by reference
//! into every encode, decode and adapt call. Precedence is explicit:
//!
//! 1. call-site [`ConfigOverrides`]
//! 2. an existing [`Configuration`]
//! 3. built-in defaults ([`Configuration::default`])
//!
//! See [`resolve_configuration`].
//!
//! ## Environment
//!
//! [`Configuration::from_env`] reads:
//!
//! - `TRACKING_BASE_OPEN_URL` - prefix of open-tracking (pixel) links
//! - `TRACKING_BASE_CLICK_URL` - prefix of click-tracking links
//! - `TRACKING_WEBHOOK_URL` - webhook notified on open/click
//! - `TRACKING_INCLUDE_WEBHOOK_URL` - embed the webhook URL in tokens (default: false)
//! - `TRACKING_DEFAULT_METADATA` - JSON object merged under caller metadata
//! - `TRACKING_INCLUDE_DEFAULT_METADATA` - embed defaults in tokens (default: true)
//! - `TRACKING_APPEND_SLASH` - add a trailing slash to generated links (default: false)
//! - `TRACKING_ENCRYPTION_KEY` - URL-safe base64 of 32 bytes; enables encryption
//! - `TRACKING_MAX_TOKEN_AGE` - maximum token age in seconds (encrypted tokens only)
//! - `TRACKING_PIXEL_POSITION` - `end-of-body` (default) or `start-of-body`
//! - `TRACKING_WEBHOOK_TIMEOUT` - webhook timeout in seconds (default: 5)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use url::Url;

use crate::codec::{FernetCipher, TokenCipher};
use crate::domain::{Metadata, metadata_from};
use crate::error::TrackingError;

pub const DEFAULT_WEBHOOK_TIMEOUT_SECONDS: u64 = 5;

/// Where the open-tracking pixel is inserted into a document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelPosition {
    #[default]
    EndOfBody,
    StartOfBody,
}

impl PixelPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EndOfBody => "end-of-body",
            Self::StartOfBody => "start-of-body",
        }
    }
}

impl FromStr for PixelPosition {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "end-of-body" | "end" | "bottom" => Ok(Self::EndOfBody),
            "start-of-body" | "start" | "top" => Ok(Self::StartOfBody),
            other => Err(TrackingError::configuration(format!(
                "pixel_position must be 'end-of-body' or 'start-of-body', got '{other}'"
            ))),
        }
    }
}

/// An element/attribute pair whose value is treated as a trackable link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackableAttribute {
    pub element: String,
    pub attribute: String,
}

impl TrackableAttribute {
    pub fn new(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            element: element.into().to_ascii_lowercase(),
            attribute: attribute.into().to_ascii_lowercase(),
        }
    }
}

/// Per-call overrides. `None` keeps the underlying value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_open_tracking_url: Option<String>,
    pub base_click_tracking_url: Option<String>,
    pub webhook_url: Option<String>,
    pub include_webhook_url: Option<bool>,
    pub webhook_timeout_seconds: Option<u64>,
    pub default_metadata: Option<Metadata>,
    pub include_default_metadata: Option<bool>,
    pub append_slash: Option<bool>,
    pub encryption_key: Option<String>,
    pub max_token_age: Option<u64>,
    pub pixel_position: Option<PixelPosition>,
    pub trackable_attributes: Option<Vec<TrackableAttribute>>,
}

/// Immutable set of options driving the codec and the HTML adapter.
#[derive(Clone)]
pub struct Configuration {
    base_open_tracking_url: Option<String>,
    base_click_tracking_url: Option<String>,
    webhook_url: Option<String>,
    include_webhook_url: bool,
    webhook_timeout_seconds: u64,
    default_metadata: Metadata,
    include_default_metadata: bool,
    append_slash: bool,
    encryption_key: Option<String>,
    cipher: Option<Arc<dyn TokenCipher>>,
    max_token_age: Option<u64>,
    pixel_position: PixelPosition,
    trackable_attributes: Vec<TrackableAttribute>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            base_open_tracking_url: None,
            base_click_tracking_url: None,
            webhook_url: None,
            include_webhook_url: false,
            webhook_timeout_seconds: DEFAULT_WEBHOOK_TIMEOUT_SECONDS,
            default_metadata: Metadata::new(),
            include_default_metadata: true,
            append_slash: false,
            encryption_key: None,
            cipher: None,
            max_token_age: None,
            pixel_position: PixelPosition::default(),
            trackable_attributes: vec![TrackableAttribute::new("a", "href")],
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("base_open_tracking_url", &self.base_open_tracking_url)
            .field("base_click_tracking_url", &self.base_click_tracking_url)
            .field("webhook_url", &self.webhook_url)
            .field("include_webhook_url", &self.include_webhook_url)
            .field("default_metadata", &self.default_metadata)
            .field("include_default_metadata", &self.include_default_metadata)
            .field("append_slash", &self.append_slash)
            .field("encrypted", &self.cipher.is_some())
            .field("max_token_age", &self.max_token_age)
            .field("pixel_position", &self.pixel_position)
            .finish_non_exhaustive()
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    /// Returns a new configuration with `overrides` applied on top of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] if the result fails
    /// [`Configuration::validate`] or a new encryption key is malformed.
    pub fn merged(&self, overrides: &ConfigOverrides) -> Result<Self, TrackingError> {
        let mut next = self.clone();

        if let Some(v) = &overrides.base_open_tracking_url {
            next.base_open_tracking_url = Some(v.clone());
        }
        if let Some(v) = &overrides.base_click_tracking_url {
            next.base_click_tracking_url = Some(v.clone());
        }
        if let Some(v) = &overrides.webhook_url {
            next.webhook_url = Some(v.clone());
        }
        if let Some(v) = overrides.include_webhook_url {
            next.include_webhook_url = v;
        }
        if let Some(v) = overrides.webhook_timeout_seconds {
            next.webhook_timeout_seconds = v;
        }
        if let Some(v) = &overrides.default_metadata {
            next.default_metadata = v.clone();
        }
        if let Some(v) = overrides.include_default_metadata {
            next.include_default_metadata = v;
        }
        if let Some(v) = overrides.append_slash {
            next.append_slash = v;
        }
        if let Some(key) = &overrides.encryption_key {
            next.cipher = Some(Arc::new(FernetCipher::from_key(key)?));
            next.encryption_key = Some(key.clone());
        }
        if let Some(v) = overrides.max_token_age {
            next.max_token_age = Some(v);
        }
        if let Some(v) = overrides.pixel_position {
            next.pixel_position = v;
        }
        if let Some(v) = &overrides.trackable_attributes {
            next.trackable_attributes = v.clone();
        }

        next.validate()?;
        Ok(next)
    }

    /// Loads configuration from `TRACKING_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    ///
    /// # Note
    ///
    /// Expects the environment to be already loaded (e.g. via
    /// `dotenvy::dotenv()` in `main.rs`).
    pub fn from_env() -> anyhow::Result<Self> {
        let default_metadata = match env::var("TRACKING_DEFAULT_METADATA") {
            Ok(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .context("TRACKING_DEFAULT_METADATA must be valid JSON")?;
                Some(metadata_from(&value).context("TRACKING_DEFAULT_METADATA must be an object")?)
            }
            Err(_) => None,
        };

        let pixel_position = env::var("TRACKING_PIXEL_POSITION")
            .ok()
            .map(|v| v.parse::<PixelPosition>())
            .transpose()
            .context("Invalid TRACKING_PIXEL_POSITION")?;

        let max_token_age = env_parse::<u64>("TRACKING_MAX_TOKEN_AGE")?;
        let webhook_timeout_seconds = env_parse::<u64>("TRACKING_WEBHOOK_TIMEOUT")?;

        let overrides = ConfigOverrides {
            base_open_tracking_url: env::var("TRACKING_BASE_OPEN_URL").ok(),
            base_click_tracking_url: env::var("TRACKING_BASE_CLICK_URL").ok(),
            webhook_url: env::var("TRACKING_WEBHOOK_URL").ok(),
            include_webhook_url: env_bool("TRACKING_INCLUDE_WEBHOOK_URL"),
            webhook_timeout_seconds,
            default_metadata,
            include_default_metadata: env_bool("TRACKING_INCLUDE_DEFAULT_METADATA"),
            append_slash: env_bool("TRACKING_APPEND_SLASH"),
            encryption_key: env::var("TRACKING_ENCRYPTION_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            max_token_age,
            pixel_position,
            trackable_attributes: None,
        };

        Configuration::default()
            .merged(&overrides)
            .context("Invalid tracking configuration")
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] if:
    /// - a base URL or the webhook URL is not an absolute http(s) URL
    /// - `webhook_timeout_seconds` is 0
    /// - no trackable attribute is configured
    pub fn validate(&self) -> Result<(), TrackingError> {
        for (name, value) in [
            ("base_open_tracking_url", &self.base_open_tracking_url),
            ("base_click_tracking_url", &self.base_click_tracking_url),
            ("webhook_url", &self.webhook_url),
        ] {
            if let Some(value) = value {
                validate_http_url(name, value)?;
            }
        }

        if self.webhook_timeout_seconds == 0 {
            return Err(TrackingError::configuration(
                "webhook_timeout_seconds must be greater than 0",
            ));
        }

        if self.trackable_attributes.is_empty() {
            return Err(TrackingError::configuration(
                "at least one trackable attribute is required",
            ));
        }

        Ok(())
    }

    /// Base open-tracking URL, required to build pixel links.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] if it is not set.
    pub fn require_open_base_url(&self) -> Result<&str, TrackingError> {
        self.base_open_tracking_url
            .as_deref()
            .ok_or_else(|| TrackingError::configuration("base_open_tracking_url is not set"))
    }

    /// Base click-tracking URL, required to build click links.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] if it is not set.
    pub fn require_click_base_url(&self) -> Result<&str, TrackingError> {
        self.base_click_tracking_url
            .as_deref()
            .ok_or_else(|| TrackingError::configuration("base_click_tracking_url is not set"))
    }

    pub fn base_open_tracking_url(&self) -> Option<&str> {
        self.base_open_tracking_url.as_deref()
    }

    pub fn base_click_tracking_url(&self) -> Option<&str> {
        self.base_click_tracking_url.as_deref()
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    pub fn include_webhook_url(&self) -> bool {
        self.include_webhook_url
    }

    pub fn webhook_timeout_seconds(&self) -> u64 {
        self.webhook_timeout_seconds
    }

    pub fn default_metadata(&self) -> &Metadata {
        &self.default_metadata
    }

    pub fn include_default_metadata(&self) -> bool {
        self.include_default_metadata
    }

    pub fn append_slash(&self) -> bool {
        self.append_slash
    }

    /// The cipher capability, present iff encryption is configured.
    pub fn cipher(&self) -> Option<&dyn TokenCipher> {
        self.cipher.as_deref()
    }

    pub fn max_token_age(&self) -> Option<u64> {
        self.max_token_age
    }

    pub fn pixel_position(&self) -> PixelPosition {
        self.pixel_position
    }

    pub fn trackable_attributes(&self) -> &[TrackableAttribute] {
        &self.trackable_attributes
    }

    /// Webhook URL to embed in a token, if the configuration opts in.
    pub fn embedded_webhook_url(&self) -> Option<String> {
        if self.include_webhook_url {
            self.webhook_url.clone()
        } else {
            None
        }
    }

    /// Prints configuration summary (without key material).
    pub fn print_summary(&self) {
        tracing::info!("Tracking configuration:");
        tracing::info!(
            "  Open tracking URL: {}",
            self.base_open_tracking_url.as_deref().unwrap_or("(unset)")
        );
        tracing::info!(
            "  Click tracking URL: {}",
            self.base_click_tracking_url.as_deref().unwrap_or("(unset)")
        );
        tracing::info!(
            "  Webhook URL: {} (embedded: {})",
            self.webhook_url.as_deref().unwrap_or("(unset)"),
            self.include_webhook_url
        );
        match &self.encryption_key {
            Some(key) => tracing::info!("  Encryption: enabled (key {})", mask_secret(key)),
            None if self.cipher.is_some() => tracing::info!("  Encryption: enabled (custom)"),
            None => tracing::info!("  Encryption: disabled"),
        }
        if let Some(max_age) = self.max_token_age {
            tracing::info!("  Max token age: {}s", max_age);
        }
        tracing::info!("  Pixel position: {}", self.pixel_position.as_str());
    }
}

/// Builder over [`ConfigOverrides`] applied to built-in defaults.
#[derive(Default)]
pub struct ConfigurationBuilder {
    overrides: ConfigOverrides,
    cipher: Option<Arc<dyn TokenCipher>>,
}

impl ConfigurationBuilder {
    pub fn base_open_tracking_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.base_open_tracking_url = Some(url.into());
        self
    }

    pub fn base_click_tracking_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.base_click_tracking_url = Some(url.into());
        self
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.webhook_url = Some(url.into());
        self
    }

    pub fn include_webhook_url(mut self, include: bool) -> Self {
        self.overrides.include_webhook_url = Some(include);
        self
    }

    pub fn webhook_timeout_seconds(mut self, seconds: u64) -> Self {
        self.overrides.webhook_timeout_seconds = Some(seconds);
        self
    }

    pub fn default_metadata(mut self, metadata: Metadata) -> Self {
        self.overrides.default_metadata = Some(metadata);
        self
    }

    pub fn include_default_metadata(mut self, include: bool) -> Self {
        self.overrides.include_default_metadata = Some(include);
        self
    }

    pub fn append_slash(mut self, append: bool) -> Self {
        self.overrides.append_slash = Some(append);
        self
    }

    pub fn encryption_key(mut self, key: impl Into<String>) -> Self {
        self.overrides.encryption_key = Some(key.into());
        self
    }

    /// Uses a custom cipher instead of one derived from an encryption key.
    pub fn cipher(mut self, cipher: Arc<dyn TokenCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn max_token_age(mut self, seconds: u64) -> Self {
        self.overrides.max_token_age = Some(seconds);
        self
    }

    pub fn pixel_position(mut self, position: PixelPosition) -> Self {
        self.overrides.pixel_position = Some(position);
        self
    }

    pub fn trackable_attributes(mut self, attributes: Vec<TrackableAttribute>) -> Self {
        self.overrides.trackable_attributes = Some(attributes);
        self
    }

    /// # Errors
    ///
    /// Returns [`TrackingError::Configuration`] on invalid options.
    pub fn build(self) -> Result<Configuration, TrackingError> {
        let mut config = Configuration::default().merged(&self.overrides)?;
        if let Some(cipher) = self.cipher {
            config.cipher = Some(cipher);
            config.encryption_key = None;
        }
        Ok(config)
    }
}

/// Applies `overrides` to `base`, or to built-in defaults when no base
/// configuration is given.
///
/// # Errors
///
/// Returns [`TrackingError::Configuration`] if the merged result is invalid.
pub fn resolve_configuration(
    base: Option<&Configuration>,
    overrides: &ConfigOverrides,
) -> Result<Configuration, TrackingError> {
    match base {
        Some(base) => base.merged(overrides),
        None => Configuration::default().merged(overrides),
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<(), TrackingError> {
    let url = Url::parse(value)
        .map_err(|e| TrackingError::configuration(format!("{name} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(TrackingError::configuration(format!(
            "{name} must use http or https, got '{scheme}'"
        ))),
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .ok()
        .map(|v| v.parse::<T>())
        .transpose()
        .with_context(|| format!("{name} must be a number"))
}

/// Masks key material for logging: `abcd***`.
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    const TEST_KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";

    #[test]
    fn test_defaults() {
        let config = Configuration::default();

        assert!(config.base_open_tracking_url().is_none());
        assert!(!config.include_webhook_url());
        assert!(config.include_default_metadata());
        assert!(!config.append_slash());
        assert!(config.cipher().is_none());
        assert_eq!(config.pixel_position(), PixelPosition::EndOfBody);
        assert_eq!(
            config.trackable_attributes(),
            &[TrackableAttribute::new("a", "href")]
        );
        assert_eq!(config.webhook_timeout_seconds(), DEFAULT_WEBHOOK_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_merge_precedence() {
        let base = Configuration::builder()
            .base_open_tracking_url("https://base.example.com/open/")
            .base_click_tracking_url("https://base.example.com/click/")
            .append_slash(true)
            .build()
            .unwrap();

        let overrides = ConfigOverrides {
            base_open_tracking_url: Some("https://override.example.com/o/".to_string()),
            ..Default::default()
        };
        let merged = resolve_configuration(Some(&base), &overrides).unwrap();

        assert_eq!(
            merged.base_open_tracking_url(),
            Some("https://override.example.com/o/")
        );
        assert_eq!(
            merged.base_click_tracking_url(),
            Some("https://base.example.com/click/")
        );
        assert!(merged.append_slash());
        // base is untouched
        assert_eq!(
            base.base_open_tracking_url(),
            Some("https://base.example.com/open/")
        );
    }

    #[test]
    fn test_resolve_without_base_uses_defaults() {
        let overrides = ConfigOverrides {
            append_slash: Some(true),
            ..Default::default()
        };
        let config = resolve_configuration(None, &overrides).unwrap();

        assert!(config.append_slash());
        assert_eq!(config.pixel_position(), PixelPosition::EndOfBody);
    }

    #[test]
    fn test_encryption_key_enables_cipher() {
        let config = Configuration::builder()
            .encryption_key(TEST_KEY)
            .build()
            .unwrap();
        assert!(config.cipher().is_some());
    }

    #[test]
    fn test_wrong_length_key_is_configuration_error() {
        let result = Configuration::builder()
            .encryption_key("c2hvcnQ=")
            .build();
        assert!(matches!(result, Err(TrackingError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let result = Configuration::builder()
            .base_click_tracking_url("ftp://example.com/")
            .build();
        assert!(result.is_err());

        let result = Configuration::builder()
            .base_open_tracking_url("not a url")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = Configuration::builder().webhook_timeout_seconds(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_trackable_attributes() {
        let result = Configuration::builder()
            .trackable_attributes(Vec::new())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_require_base_urls() {
        let config = Configuration::default();
        assert!(matches!(
            config.require_open_base_url(),
            Err(TrackingError::Configuration(_))
        ));
        assert!(config.require_click_base_url().is_err());
    }

    #[test]
    fn test_embedded_webhook_url() {
        let config = Configuration::builder()
            .webhook_url("http://requestb.in/123")
            .build()
            .unwrap();
        assert!(config.embedded_webhook_url().is_none());

        let config = Configuration::builder()
            .webhook_url("http://requestb.in/123")
            .include_webhook_url(true)
            .build()
            .unwrap();
        assert_eq!(
            config.embedded_webhook_url().as_deref(),
            Some("http://requestb.in/123")
        );
    }

    #[test]
    fn test_pixel_position_parse() {
        assert_eq!(
            "start-of-body".parse::<PixelPosition>().unwrap(),
            PixelPosition::StartOfBody
        );
        assert_eq!("TOP".parse::<PixelPosition>().unwrap(), PixelPosition::StartOfBody);
        assert_eq!("bottom".parse::<PixelPosition>().unwrap(), PixelPosition::EndOfBody);
        assert!("middle".parse::<PixelPosition>().is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(TEST_KEY), "cw_0***");
        assert_eq!(mask_secret("ab"), "ab***");
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let config = Configuration::builder()
            .encryption_key(TEST_KEY)
            .build()
            .unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains(TEST_KEY));
        assert!(debug.contains("encrypted: true"));
    }

    fn clear_env() {
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            for name in [
                "TRACKING_BASE_OPEN_URL",
                "TRACKING_BASE_CLICK_URL",
                "TRACKING_WEBHOOK_URL",
                "TRACKING_INCLUDE_WEBHOOK_URL",
                "TRACKING_DEFAULT_METADATA",
                "TRACKING_INCLUDE_DEFAULT_METADATA",
                "TRACKING_APPEND_SLASH",
                "TRACKING_ENCRYPTION_KEY",
                "TRACKING_MAX_TOKEN_AGE",
                "TRACKING_PIXEL_POSITION",
                "TRACKING_WEBHOOK_TIMEOUT",
            ] {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("TRACKING_BASE_OPEN_URL", "https://t.example.com/open/");
            env::set_var("TRACKING_BASE_CLICK_URL", "https://t.example.com/click/");
            env::set_var("TRACKING_WEBHOOK_URL", "https://hooks.example.com/track");
            env::set_var("TRACKING_INCLUDE_WEBHOOK_URL", "true");
            env::set_var("TRACKING_DEFAULT_METADATA", r#"{"campaign":"spring"}"#);
            env::set_var("TRACKING_APPEND_SLASH", "1");
            env::set_var("TRACKING_ENCRYPTION_KEY", TEST_KEY);
            env::set_var("TRACKING_MAX_TOKEN_AGE", "3600");
            env::set_var("TRACKING_PIXEL_POSITION", "start-of-body");
        }

        let config = Configuration::from_env().unwrap();

        assert_eq!(
            config.base_open_tracking_url(),
            Some("https://t.example.com/open/")
        );
        assert!(config.include_webhook_url());
        assert!(config.append_slash());
        assert!(config.cipher().is_some());
        assert_eq!(config.max_token_age(), Some(3600));
        assert_eq!(config.pixel_position(), PixelPosition::StartOfBody);
        assert_eq!(config.default_metadata()["campaign"], json!("spring"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_empty_is_default() {
        clear_env();

        let config = Configuration::from_env().unwrap();

        assert!(config.base_open_tracking_url().is_none());
        assert!(config.cipher().is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_values() {
        clear_env();
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("TRACKING_MAX_TOKEN_AGE", "soon");
        }
        assert!(Configuration::from_env().is_err());

        clear_env();
        // SAFETY: Tests are run serially due to #[serial], so no concurrent access
        unsafe {
            env::set_var("TRACKING_DEFAULT_METADATA", "[1, 2]");
        }
        assert!(Configuration::from_env().is_err());

        clear_env();
    }
}
