//! Commons Security
//!
//! Thin, enum-keyed wrappers over SHA-2 message digests and Ed25519
//! signatures. Every operation reports failures through its own error type
//! with the underlying cause preserved.

pub mod digest;
pub mod error;
pub mod signature;

pub use digest::{DigestAlgorithm, Hasher};
pub use error::{DigestError, KeyError, SignError, VerifyError};
pub use signature::{KeyPair, KeyPairGenerator, PublicKey, SignatureAlgorithm, Signer, Verifier};
