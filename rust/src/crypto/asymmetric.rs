//! Chunked RSA PKCS#1 v1.5 encryption for request payloads.
//! A single RSA operation only fits `modulus_len - 11` bytes, so longer
//! payloads are split into blocks that are encrypted independently and then
//! joined into one ASCII string.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{CryptoRng, RngCore};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes of every block consumed by PKCS#1 v1.5 padding.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Smallest block capacity that can still hold any single UTF-8 character.
const MIN_BLOCK_CAPACITY: usize = 4;

#[derive(Debug, Error)]
pub enum AsymmetricError {
    #[error("base64 decoding failed: {0}")]
    Base64DecodeFailed(String),
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("public key modulus of {0} bytes is too small for PKCS#1 v1.5 blocks")]
    KeyTooSmall(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// How encrypted blocks are turned into the final `urlParam` string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockEncoding {
    /// Each block is base64-encoded on its own and the encodings are concatenated.
    #[default]
    PerBlock,
    /// All block ciphertexts are concatenated first and base64-encoded once.
    Joined,
}

/// Encrypts request payloads with a fixed RSA public key.
#[derive(Debug, Clone)]
pub struct PayloadEncryptor {
    key: RsaPublicKey,
    encoding: BlockEncoding,
}

impl PayloadEncryptor {
    /// Parses a public key given either as PEM or as bare base64 of the
    /// SubjectPublicKeyInfo DER structure.
    pub fn from_public_key(encoded: &str, encoding: BlockEncoding) -> Result<Self, AsymmetricError> {
        let trimmed = encoded.trim();
        let key = if trimmed.starts_with("-----BEGIN") {
            RsaPublicKey::from_public_key_pem(trimmed)
                .map_err(|e| AsymmetricError::InvalidPublicKey(format!("{e}")))?
        } else {
            let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
            let der = STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| AsymmetricError::Base64DecodeFailed(format!("{e}")))?;
            RsaPublicKey::from_public_key_der(&der)
                .map_err(|e| AsymmetricError::InvalidPublicKey(format!("{e}")))?
        };
        Self::from_key(key, encoding)
    }

    pub fn from_key(key: RsaPublicKey, encoding: BlockEncoding) -> Result<Self, AsymmetricError> {
        if key.size() < PKCS1_V15_OVERHEAD + MIN_BLOCK_CAPACITY {
            return Err(AsymmetricError::KeyTooSmall(key.size()));
        }
        Ok(Self { key, encoding })
    }

    /// Largest plaintext block, in bytes, a single encryption can carry.
    pub fn max_block_len(&self) -> usize {
        self.key.size() - PKCS1_V15_OVERHEAD
    }

    /// Length in bytes of one encrypted block (the modulus length).
    pub fn cipher_block_len(&self) -> usize {
        self.key.size()
    }

    /// Encrypts `plaintext` block by block and returns the encoded result.
    pub fn encrypt_long<R>(&self, rng: &mut R, plaintext: &str) -> Result<String, AsymmetricError>
    where
        R: RngCore + CryptoRng,
    {
        let blocks = split_blocks(plaintext, self.max_block_len());
        let mut ciphertexts = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let ciphertext = self
                .key
                .encrypt(rng, Pkcs1v15Encrypt, block.as_bytes())
                .map_err(|e| AsymmetricError::EncryptionFailed(format!("{e}")))?;
            ciphertexts.push(ciphertext);
        }

        Ok(match self.encoding {
            BlockEncoding::PerBlock => ciphertexts.iter().map(|block| STANDARD.encode(block)).collect(),
            BlockEncoding::Joined => STANDARD.encode(ciphertexts.concat()),
        })
    }
}

/// Splits text into blocks of at most `max_len` bytes without cutting a
/// UTF-8 character in half. Empty text yields a single empty block.
pub fn split_blocks(text: &str, max_len: usize) -> Vec<&str> {
    let mut blocks = Vec::with_capacity(text.len() / max_len.max(1) + 1);
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        if index + ch.len_utf8() - start > max_len && index > start {
            blocks.push(&text[start..index]);
            start = index;
        }
    }
    blocks.push(&text[start..]);
    blocks
}

#[cfg(test)]
mod tests {
    use super::{split_blocks, BlockEncoding, PayloadEncryptor};
    use crate::config::EMBEDDED_PUBLIC_KEY;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

    fn test_key_pair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = StdRng::seed_from_u64(7);
        let private = RsaPrivateKey::new(&mut rng, 1024).expect("key generation should succeed");
        let public = RsaPublicKey::from(&private);
        (private, public)
    }

    fn decrypt_blocks(private: &RsaPrivateKey, blocks: &[Vec<u8>]) -> String {
        let mut plaintext = Vec::new();
        for block in blocks {
            let chunk = private
                .decrypt(Pkcs1v15Encrypt, block)
                .expect("block should decrypt");
            plaintext.extend_from_slice(&chunk);
        }
        String::from_utf8(plaintext).expect("plaintext should be utf-8")
    }

    #[test]
    fn parses_embedded_key() {
        let encryptor = PayloadEncryptor::from_public_key(EMBEDDED_PUBLIC_KEY, BlockEncoding::PerBlock)
            .expect("embedded key should parse");
        assert_eq!(encryptor.cipher_block_len(), 128);
        assert_eq!(encryptor.max_block_len(), 117);
    }

    #[test]
    fn rejects_garbage_keys() {
        assert!(PayloadEncryptor::from_public_key("not base64!", BlockEncoding::PerBlock).is_err());
        assert!(PayloadEncryptor::from_public_key("AAAA", BlockEncoding::PerBlock).is_err());
    }

    #[test]
    fn splits_on_byte_budget() {
        assert_eq!(split_blocks("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(split_blocks("abc", 3), vec!["abc"]);
        assert_eq!(split_blocks("", 3), vec![""]);
    }

    #[test]
    fn never_splits_inside_a_character() {
        let blocks = split_blocks("aé€", 3);
        assert_eq!(blocks, vec!["aé", "€"]);
        for block in blocks {
            assert!(block.len() <= 3);
        }
    }

    #[test]
    fn per_block_round_trip_with_test_key() {
        let (private, public) = test_key_pair();
        let encryptor = PayloadEncryptor::from_key(public, BlockEncoding::PerBlock).expect("key is large enough");
        let plaintext: String = (0..300).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

        let mut rng = StdRng::seed_from_u64(11);
        let encoded = encryptor.encrypt_long(&mut rng, &plaintext).expect("encryption should succeed");

        // 128-byte blocks encode to 172 base64 characters each.
        assert_eq!(encoded.len() % 172, 0);
        let blocks: Vec<Vec<u8>> = encoded
            .as_bytes()
            .chunks(172)
            .map(|chunk| STANDARD.decode(chunk).expect("each block is valid base64"))
            .collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(decrypt_blocks(&private, &blocks), plaintext);
    }

    #[test]
    fn joined_round_trip_with_test_key() {
        let (private, public) = test_key_pair();
        let encryptor = PayloadEncryptor::from_key(public, BlockEncoding::Joined).expect("key is large enough");
        let plaintext = r#"{"limit":"50","page":"1","remark":"观鸟记录"}"#.repeat(5);

        let mut rng = StdRng::seed_from_u64(12);
        let encoded = encryptor.encrypt_long(&mut rng, &plaintext).expect("encryption should succeed");
        let joined = STANDARD.decode(encoded).expect("joined output is one base64 string");
        assert_eq!(joined.len() % 128, 0);

        let blocks: Vec<Vec<u8>> = joined.chunks(128).map(<[u8]>::to_vec).collect();
        assert_eq!(decrypt_blocks(&private, &blocks), plaintext);
    }
}
