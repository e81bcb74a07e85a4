//! Cryptographic building blocks of the codec: digit-pair literal decoding,
//! MD5 request fingerprints, chunked RSA payload encryption, and AES-CBC
//! response decryption.

pub mod asymmetric;
pub mod digest;
pub mod literal;
pub mod symmetric;
