//! Entry point tying the signer and the response decryptor to one configuration.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::{CodecConfig, ConfigError};
use crate::crypto::symmetric::{ResponseDecryptor, SymmetricError};
use crate::envelope::{EnvelopeError, RequestEnvelope, RequestOptions, RequestSigner};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("symmetric error: {0}")]
    Symmetric(#[from] SymmetricError),
}

/// Signer and decryptor built from the same configuration. Key material is
/// decoded and validated here, so a constructed codec never fails on setup.
#[derive(Debug)]
pub struct Codec {
    signer: RequestSigner,
    decryptor: ResponseDecryptor,
}

impl Codec {
    pub fn new(config: &CodecConfig) -> Result<Self, CodecError> {
        let signer = RequestSigner::from_config(config)?;
        let decryptor = ResponseDecryptor::from_literals(&config.key_literal, &config.iv_literal)?;
        debug!(
            block_encoding = ?config.block_encoding,
            timestamp_resolution = ?config.timestamp_resolution,
            nonce_variant = ?config.nonce_variant,
            "codec ready"
        );
        Ok(Self { signer, decryptor })
    }

    /// Codec using the compiled-in key, key literal and IV literal.
    pub fn embedded() -> Result<Self, CodecError> {
        Self::new(&CodecConfig::default())
    }

    pub fn signer(&self) -> &RequestSigner {
        &self.signer
    }

    pub fn decryptor(&self) -> &ResponseDecryptor {
        &self.decryptor
    }

    pub fn build_envelope(&self, options: &RequestOptions) -> Result<RequestEnvelope, CodecError> {
        Ok(self.signer.build_envelope(options)?)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CodecError> {
        Ok(self.decryptor.decrypt(ciphertext)?)
    }

    pub fn decrypt_json<T: DeserializeOwned>(&self, ciphertext: &str) -> Result<T, CodecError> {
        Ok(self.decryptor.decrypt_json(ciphertext)?)
    }
}
