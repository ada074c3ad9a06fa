//! Error types for the security wrappers.
//!
//! Each operation fails with its own error type; the underlying cause is
//! kept as the error source.

use std::io;

use thiserror::Error;

/// Errors from message digests.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("failed to read digest input")]
    Read(#[source] io::Error),
}

/// Errors from key generation, decoding and encoding.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("unknown signature algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid key encoding")]
    Encoding(#[from] base64::DecodeError),

    #[error("invalid public key")]
    Malformed(#[source] ed25519_dalek::SignatureError),
}

/// Errors from signing.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("signing failed")]
    Failed(#[source] ed25519_dalek::SignatureError),
}

/// Errors from signature verification.
///
/// A well-formed signature that does not match is not an error; see
/// [`Verifier::verify`](crate::Verifier::verify).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed signature: expected {expected} bytes, got {actual}")]
    SignatureLength { expected: usize, actual: usize },

    #[error("signature is not valid base64")]
    Encoding(#[from] base64::DecodeError),
}
