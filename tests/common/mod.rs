#![allow(dead_code)]

use linktrack::config::Configuration;
use linktrack::domain::{Metadata, metadata_from};
use serde_json::json;

pub const BASE_URL: &str = "https://trackingdomain.com/path/";
pub const WEBHOOK_URL: &str = "http://requestb.in/123";

/// Known-good Fernet key (URL-safe base64 of 32 bytes).
pub const TEST_KEY: &str = "cw_0x689RpI-jtRR7oE8h_eQsKImvJapLeSbXpwF4e4=";
pub const OTHER_KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

pub fn customer_metadata() -> Metadata {
    metadata_from(&json!({"customer_id": 1})).unwrap()
}

pub fn plain_config() -> Configuration {
    Configuration::builder()
        .base_open_tracking_url(BASE_URL)
        .base_click_tracking_url(BASE_URL)
        .build()
        .unwrap()
}

pub fn encrypted_config(key: &str) -> Configuration {
    Configuration::builder()
        .base_open_tracking_url(BASE_URL)
        .base_click_tracking_url(BASE_URL)
        .encryption_key(key)
        .build()
        .unwrap()
}

pub fn tracking_config() -> Configuration {
    Configuration::builder()
        .base_open_tracking_url("https://t.example.com/open/")
        .base_click_tracking_url("https://t.example.com/click/")
        .build()
        .unwrap()
}
