//! Codec configuration. The compiled-in constants are the defaults; a JSON file
//! can substitute any of them (alternate keys for testing, a different block
//! encoding) without touching global state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::asymmetric::BlockEncoding;
use crate::nonce::NonceVariant;

/// RSA public key (base64 SubjectPublicKeyInfo DER) used to encrypt request payloads.
pub const EMBEDDED_PUBLIC_KEY: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQCvxXa98E1uWXnBzXkS2yHUfnBM6n3PCwLdfIox03T91joBvjtoDqiQ5x3tTOfpHs3LtiqMMEafls6b0YWtgB1dse1W5m+FpeusVkCOkQxB4SZDH6tuerIknnmB/Hsq5wgEkIvO5Pff9biig6AyoAkdWpSek/1/B7zYIepYY0lxKQIDAQAB";

/// Digit-pair literal hiding the 32-byte AES key.
pub const EMBEDDED_KEY_LITERAL: &str = "6756696653534952657053656868665752665050485566485667545454484967";

/// Digit-pair literal hiding the 16-byte CBC IV.
pub const EMBEDDED_IV_LITERAL: &str = "53536868555767547048526949655455";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Precision of the envelope timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampResolution {
    #[default]
    Millis,
    /// Milliseconds truncated to whole seconds, as browser clients using
    /// `Date.parse` send them.
    Seconds,
}

impl TimestampResolution {
    pub fn apply(self, millis: u64) -> u64 {
        match self {
            TimestampResolution::Millis => millis,
            TimestampResolution::Seconds => millis - millis % 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// RSA public key, PEM or bare base64 DER.
    pub public_key: String,
    pub key_literal: String,
    pub iv_literal: String,
    pub block_encoding: BlockEncoding,
    pub timestamp_resolution: TimestampResolution,
    pub nonce_variant: NonceVariant,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            public_key: EMBEDDED_PUBLIC_KEY.to_string(),
            key_literal: EMBEDDED_KEY_LITERAL.to_string(),
            iv_literal: EMBEDDED_IV_LITERAL.to_string(),
            block_encoding: BlockEncoding::default(),
            timestamp_resolution: TimestampResolution::default(),
            nonce_variant: NonceVariant::default(),
        }
    }
}

impl CodecConfig {
    /// Loads a JSON configuration file. Missing fields fall back to the
    /// compiled-in defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
        Self::from_json_str(&raw_json)
    }

    pub fn from_json_str(raw_json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))
    }
}
