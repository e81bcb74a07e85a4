//! Request-envelope codec for a service that expects canonicalized, signed and
//! RSA-encrypted request bodies and answers with AES-CBC encrypted payloads.
//!
//! Everything is synchronous and free of shared mutable state: a [`Codec`] is
//! built once from a [`CodecConfig`] and can be used from any number of threads.

pub mod canonical;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod nonce;

pub use canonical::{canonicalize, to_canonical_json, CanonicalParams};
pub use codec::{Codec, CodecError};
pub use config::CodecConfig;
pub use crypto::literal::{decode_literal, encode_literal};
pub use envelope::{RequestEnvelope, RequestOptions, RequestSigner};
pub use nonce::new_request_id;
