//! Signed request envelopes.
//!
//! A request payload is canonicalized, fingerprinted together with a fresh
//! request id and timestamp, and encrypted with the service's RSA key. The
//! remote side checks that `sign` matches the decrypted payload, `requestId`
//! and `timestamp`; nothing here verifies that relationship.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::canonical::canonicalize;
use crate::config::{CodecConfig, TimestampResolution};
use crate::crypto::asymmetric::{AsymmetricError, PayloadEncryptor};
use crate::crypto::digest::request_signature;
use crate::nonce::{new_request_id_with, NonceVariant};

/// Raw payload used when a request carries no `data`.
pub const DEFAULT_PAYLOAD: &str = "{}";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("payload encryption failed: {0}")]
    Asymmetric(#[from] AsymmetricError),
    #[error("system clock unusable: {0}")]
    Clock(String),
}

/// Outgoing request options: the query-string payload plus any other request
/// metadata, which is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            extra: Map::new(),
        }
    }

    /// Payload to canonicalize; absent or empty data falls back to [`DEFAULT_PAYLOAD`].
    pub fn raw_data(&self) -> &str {
        match self.data.as_deref() {
            Some(data) if !data.is_empty() => data,
            _ => DEFAULT_PAYLOAD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Lowercase hex MD5 of `plaintext || requestId || timestamp`.
    pub sign: String,
    pub request_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Encrypted canonical payload.
    pub url_param: String,
}

impl RequestEnvelope {
    /// Replaces the request body with the encrypted payload.
    pub fn apply_to(&self, options: &mut RequestOptions) {
        options.data = Some(self.url_param.clone());
    }

    /// Header pairs the service expects next to the encrypted body.
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("requestid", self.request_id.clone()),
            ("sign", self.sign.clone()),
            ("timestamp", self.timestamp.to_string()),
        ]
    }
}

/// Builds envelopes with a fixed public key.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    encryptor: PayloadEncryptor,
    timestamp_resolution: TimestampResolution,
    nonce_variant: NonceVariant,
}

impl RequestSigner {
    pub fn new(
        encryptor: PayloadEncryptor,
        timestamp_resolution: TimestampResolution,
        nonce_variant: NonceVariant,
    ) -> Self {
        Self {
            encryptor,
            timestamp_resolution,
            nonce_variant,
        }
    }

    pub fn from_config(config: &CodecConfig) -> Result<Self, EnvelopeError> {
        let encryptor = PayloadEncryptor::from_public_key(&config.public_key, config.block_encoding)?;
        Ok(Self::new(encryptor, config.timestamp_resolution, config.nonce_variant))
    }

    /// Builds an envelope using the system clock and thread-local randomness.
    pub fn build_envelope(&self, options: &RequestOptions) -> Result<RequestEnvelope, EnvelopeError> {
        let now = current_millis()?;
        self.build_envelope_with(options, &mut rand::thread_rng(), now)
    }

    /// Builds an envelope from an explicit random source and clock reading.
    /// The same source state and `now_millis` always give the same envelope.
    pub fn build_envelope_with<R>(
        &self,
        options: &RequestOptions,
        rng: &mut R,
        now_millis: u64,
    ) -> Result<RequestEnvelope, EnvelopeError>
    where
        R: RngCore + CryptoRng,
    {
        let plaintext = canonicalize(options.raw_data()).to_canonical_json();
        let timestamp = self.timestamp_resolution.apply(now_millis);
        let request_id = new_request_id_with(rng, self.nonce_variant);
        let sign = request_signature(&plaintext, &request_id, timestamp);
        let url_param = self.encryptor.encrypt_long(rng, &plaintext)?;

        debug!(
            request_id = %request_id,
            timestamp,
            plaintext_len = plaintext.len(),
            url_param_len = url_param.len(),
            "built request envelope"
        );

        Ok(RequestEnvelope {
            sign,
            request_id,
            timestamp,
            url_param,
        })
    }

    /// Builds an envelope and swaps `options.data` for the encrypted payload.
    pub fn seal(&self, options: &mut RequestOptions) -> Result<RequestEnvelope, EnvelopeError> {
        let envelope = self.build_envelope(options)?;
        envelope.apply_to(options);
        Ok(envelope)
    }
}

fn current_millis() -> Result<u64, EnvelopeError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| EnvelopeError::Clock(format!("{e}")))?;
    u64::try_from(elapsed.as_millis()).map_err(|e| EnvelopeError::Clock(format!("{e}")))
}
