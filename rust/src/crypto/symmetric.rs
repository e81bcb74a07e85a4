//! AES-CBC decryption of response payloads.
//! The key and IV are recovered from digit-pair literals once, at construction,
//! and are zeroed when the decryptor goes away.

use std::fmt;

use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose::STANDARD, Engine};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::crypto::literal::{decode_literal, LiteralError};

pub const BLOCK_SIZE: usize = 16;
pub const IV_LEN: usize = 16;

/// OpenSSL header (`Salted__` + 8 salt bytes) some encoders put in front of the ciphertext.
const SALTED_MAGIC: &[u8] = b"Salted__";
const SALTED_HEADER_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum SymmetricError {
    #[error("invalid key length {0}; expected 16, 24 or 32 bytes")]
    InvalidKeyLength(usize),
    #[error("invalid iv length {0}; expected 16 bytes")]
    InvalidIvLength(usize),
    #[error("key literal unreadable: {0}")]
    Literal(#[from] LiteralError),
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidCiphertextLength(usize),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("decrypted payload is not utf-8: {0}")]
    Utf8(String),
    #[error("decrypted payload is not valid json: {0}")]
    Json(String),
}

/// AES key and CBC initialization vector.
pub struct SymmetricKey {
    key: Vec<u8>,
    iv: [u8; IV_LEN],
}

impl SymmetricKey {
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, SymmetricError> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(SymmetricError::InvalidKeyLength(key.len()));
        }
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| SymmetricError::InvalidIvLength(iv.len()))?;
        Ok(Self { key: key.to_vec(), iv })
    }

    /// Decodes the key and IV literals and uses the UTF-8 bytes of the results.
    pub fn from_literals(key_literal: &str, iv_literal: &str) -> Result<Self, SymmetricError> {
        let mut key = decode_literal(key_literal)?;
        let mut iv = decode_literal(iv_literal)?;
        let material = Self::new(key.as_bytes(), iv.as_bytes());
        key.zeroize();
        iv.zeroize();
        material
    }

    pub fn key_len(&self) -> usize {
        self.key.len()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key_len", &self.key.len())
            .finish_non_exhaustive()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

/// Decrypts base64 response payloads with a fixed AES-CBC key.
#[derive(Debug)]
pub struct ResponseDecryptor {
    key: SymmetricKey,
}

impl ResponseDecryptor {
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    pub fn from_literals(key_literal: &str, iv_literal: &str) -> Result<Self, SymmetricError> {
        SymmetricKey::from_literals(key_literal, iv_literal).map(Self::new)
    }

    /// Decrypts a base64 ciphertext into UTF-8 text.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, SymmetricError> {
        let raw = STANDARD
            .decode(ciphertext.trim().as_bytes())
            .map_err(|e| SymmetricError::Base64DecodeFailed(format!("{e}")))?;
        let plaintext = self.decrypt_bytes(&raw)?;
        String::from_utf8(plaintext).map_err(|e| {
            warn!("decrypted response is not utf-8");
            SymmetricError::Utf8(format!("{e}"))
        })
    }

    /// Decrypts and deserializes a JSON response body.
    pub fn decrypt_json<T: DeserializeOwned>(&self, ciphertext: &str) -> Result<T, SymmetricError> {
        let text = self.decrypt(ciphertext)?;
        serde_json::from_str(&text).map_err(|e| SymmetricError::Json(format!("{e}")))
    }

    /// Decrypts raw ciphertext bytes, skipping an OpenSSL `Salted__` header when present.
    pub fn decrypt_bytes(&self, raw: &[u8]) -> Result<Vec<u8>, SymmetricError> {
        let body = if raw.len() >= SALTED_HEADER_LEN && raw.starts_with(SALTED_MAGIC) {
            debug!("skipping salted header");
            &raw[SALTED_HEADER_LEN..]
        } else {
            raw
        };
        if body.is_empty() || body.len() % BLOCK_SIZE != 0 {
            return Err(SymmetricError::InvalidCiphertextLength(body.len()));
        }

        let result = match self.key.key_len() {
            16 => cbc_decrypt::<Aes128>(&self.key, body),
            24 => cbc_decrypt::<Aes192>(&self.key, body),
            32 => cbc_decrypt::<Aes256>(&self.key, body),
            other => Err(SymmetricError::InvalidKeyLength(other)),
        };
        match &result {
            Ok(plaintext) => debug!(ciphertext_len = body.len(), plaintext_len = plaintext.len(), "decrypted response"),
            Err(err) => warn!(error = %err, "response decryption failed"),
        }
        result
    }
}

fn cbc_decrypt<C>(key: &SymmetricKey, body: &[u8]) -> Result<Vec<u8>, SymmetricError>
where
    C: BlockCipher + BlockDecryptMut + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(&key.key, &key.iv)
        .map_err(|e| SymmetricError::DecryptionFailed(format!("{e}")))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|e| SymmetricError::DecryptionFailed(format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::{ResponseDecryptor, SymmetricError, SymmetricKey};
    use crate::config::{EMBEDDED_IV_LITERAL, EMBEDDED_KEY_LITERAL};
    use aes::{Aes128, Aes256};
    use base64::{engine::general_purpose::STANDARD, Engine};
    use cbc::cipher::block_padding::Pkcs7;
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};
    use serde_json::Value;

    const KEY: &[u8] = b"C8EB5514AF5ADDB94B2207B08C66601C";
    const IV: &[u8] = b"55DD79C6F04E1A67";

    fn encrypt_256(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Vec<u8> {
        cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .expect("valid key and iv")
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    #[test]
    fn decrypts_with_embedded_literals() {
        let decryptor = ResponseDecryptor::from_literals(EMBEDDED_KEY_LITERAL, EMBEDDED_IV_LITERAL)
            .expect("embedded literals should decode");
        let ciphertext = STANDARD.encode(encrypt_256(KEY, IV, "[{\"reportId\":\"r1\",\"address\":\"北京市\"}]".as_bytes()));
        let plaintext = decryptor.decrypt(&ciphertext).expect("decryption should succeed");
        assert_eq!(plaintext, "[{\"reportId\":\"r1\",\"address\":\"北京市\"}]");
    }

    #[test]
    fn decrypts_json_bodies() {
        let decryptor = ResponseDecryptor::from_literals(EMBEDDED_KEY_LITERAL, EMBEDDED_IV_LITERAL)
            .expect("embedded literals should decode");
        let ciphertext = STANDARD.encode(encrypt_256(KEY, IV, br#"{"count":"120","data":[1,2]}"#));
        let body: Value = decryptor.decrypt_json(&ciphertext).expect("json should parse");
        assert_eq!(body["count"], "120");
        assert_eq!(body["data"][1], 2);
    }

    #[test]
    fn selects_aes_128_for_short_keys() {
        let key = b"0123456789012345";
        let iv = b"6543210987654321";
        let ciphertext = cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .expect("valid key and iv")
            .encrypt_padded_vec_mut::<Pkcs7>(b"short key payload");
        let decryptor = ResponseDecryptor::new(SymmetricKey::new(key, iv).expect("valid material"));
        let plaintext = decryptor.decrypt_bytes(&ciphertext).expect("decryption should succeed");
        assert_eq!(plaintext, b"short key payload");
    }

    #[test]
    fn skips_salted_header() {
        let decryptor = ResponseDecryptor::new(SymmetricKey::new(KEY, IV).expect("valid material"));
        let mut raw = b"Salted__12345678".to_vec();
        raw.extend(encrypt_256(KEY, IV, b"salted"));
        let plaintext = decryptor.decrypt(&STANDARD.encode(raw)).expect("decryption should succeed");
        assert_eq!(plaintext, "salted");
    }

    #[test]
    fn rejects_bad_key_material() {
        assert!(matches!(
            SymmetricKey::new(&[0u8; 20], IV),
            Err(SymmetricError::InvalidKeyLength(20))
        ));
        assert!(matches!(
            SymmetricKey::new(KEY, &[0u8; 8]),
            Err(SymmetricError::InvalidIvLength(8))
        ));
        assert!(matches!(
            SymmetricKey::from_literals("123", "53536868555767547048526949655455"),
            Err(SymmetricError::Literal(_))
        ));
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let decryptor = ResponseDecryptor::new(SymmetricKey::new(KEY, IV).expect("valid material"));
        let mut raw = encrypt_256(KEY, IV, b"some payload that spans blocks");
        raw.truncate(raw.len() - 3);
        let err = decryptor.decrypt(&STANDARD.encode(raw)).unwrap_err();
        assert!(matches!(err, SymmetricError::InvalidCiphertextLength(_)));
    }

    #[test]
    fn rejects_invalid_base64() {
        let decryptor = ResponseDecryptor::new(SymmetricKey::new(KEY, IV).expect("valid material"));
        let err = decryptor.decrypt("@@not-base64@@").unwrap_err();
        assert!(format!("{err}").contains("base64 decoding failed"));
    }

    #[test]
    fn wrong_key_does_not_yield_plaintext() {
        let ciphertext = STANDARD.encode(encrypt_256(KEY, IV, b"payload for the right key"));
        let other = ResponseDecryptor::new(SymmetricKey::new(&[9u8; 32], IV).expect("valid material"));
        assert!(other.decrypt(&ciphertext).is_err());
    }
}
