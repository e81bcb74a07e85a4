//! Digest helpers for request signing. The remote service fingerprints requests
//! with MD5, so this module only exposes what the signature needs.

use md5::{Digest, Md5};

/// Produces a raw MD5 digest of the provided bytes.
pub fn md5_digest(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Returns the lowercase hexadecimal representation of an MD5 digest.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5_digest(data))
}

/// Computes the request signature: `md5_hex(plaintext || request_id || timestamp)`
/// where the timestamp is rendered as a decimal string.
pub fn request_signature(plaintext: &str, request_id: &str, timestamp: u64) -> String {
    let mut hasher = Md5::new();
    hasher.update(plaintext.as_bytes());
    hasher.update(request_id.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
