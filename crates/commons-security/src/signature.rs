//! Ed25519 key pairs, signing and verification.
//!
//! Keys and detached signatures travel as standard base64. A key's
//! fingerprint is the SHA-256 hex digest of its public key bytes.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use ed25519_dalek::{
    Signature, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH,
};
use ed25519_dalek::{Signer as _, Verifier as _};
use serde::{Deserialize, Serialize};

use crate::digest::DigestAlgorithm;
use crate::error::{KeyError, SignError, VerifyError};

fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(text.trim())
}

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[default]
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ed25519") {
            Ok(Self::Ed25519)
        } else {
            Err(KeyError::UnknownAlgorithm(s.to_string()))
        }
    }
}

/// Creates fresh key pairs from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyPairGenerator {
    algorithm: SignatureAlgorithm,
}

impl KeyPairGenerator {
    pub fn new(algorithm: SignatureAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn generate(&self) -> KeyPair {
        let pair = KeyPair {
            signing: SigningKey::generate(&mut rand::thread_rng()),
        };
        tracing::debug!(
            algorithm = %self.algorithm,
            fingerprint = %pair.fingerprint(),
            "generated key pair"
        );
        pair
    }
}

/// A private signing key and its public half.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// Rebuild a pair from the 32 secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret: [u8; SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: SECRET_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self {
            signing: SigningKey::from_bytes(&secret),
        })
    }

    pub fn from_secret_base64(encoded: &str) -> Result<Self, KeyError> {
        Self::from_secret_bytes(&base64_decode(encoded)?)
    }

    pub fn secret_key_base64(&self) -> String {
        base64_encode(&self.signing.to_bytes())
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: self.signing.verifying_key(),
        }
    }

    pub fn public_key_base64(&self) -> String {
        self.public_key().to_base64()
    }

    /// SHA-256 fingerprint of the public key (hex-encoded)
    pub fn fingerprint(&self) -> String {
        self.public_key().fingerprint()
    }

    pub fn signer(&self) -> Signer {
        Signer {
            key: self.signing.clone(),
        }
    }

    pub fn verifier(&self) -> Verifier {
        self.public_key().verifier()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// An Ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; PUBLIC_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            })?;
        let key = VerifyingKey::from_bytes(&raw).map_err(KeyError::Malformed)?;
        Ok(Self { key })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        Self::from_bytes(&base64_decode(encoded)?)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.key.as_bytes()
    }

    pub fn to_base64(&self) -> String {
        base64_encode(self.key.as_bytes())
    }

    pub fn fingerprint(&self) -> String {
        DigestAlgorithm::Sha256.digest_hex(self.key.as_bytes())
    }

    pub fn verifier(&self) -> Verifier {
        Verifier { key: self.key }
    }
}

/// Produces detached signatures.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
}

impl Signer {
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature = self.key.try_sign(data).map_err(SignError::Failed)?;
        Ok(signature.to_bytes().to_vec())
    }

    pub fn sign_base64(&self, data: &[u8]) -> Result<String, SignError> {
        Ok(base64_encode(&self.sign(data)?))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

/// Checks detached signatures against one public key.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    key: VerifyingKey,
}

impl Verifier {
    /// Returns `Ok(false)` for a well-formed signature that does not match;
    /// errors only when `signature` cannot be a signature at all.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, VerifyError> {
        let raw: [u8; SIGNATURE_LENGTH] =
            signature
                .try_into()
                .map_err(|_| VerifyError::SignatureLength {
                    expected: SIGNATURE_LENGTH,
                    actual: signature.len(),
                })?;
        let signature = Signature::from_bytes(&raw);
        Ok(self.key.verify(data, &signature).is_ok())
    }

    pub fn verify_base64(&self, data: &[u8], signature: &str) -> Result<bool, VerifyError> {
        self.verify(data, &base64_decode(signature)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 8032 section 7.1, test 1.
    const RFC8032_SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const RFC8032_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    const RFC8032_SIGNATURE: &str = "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
                                     5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b";

    fn rfc_pair() -> KeyPair {
        KeyPair::from_secret_bytes(&hex::decode(RFC8032_SECRET).unwrap()).unwrap()
    }

    #[test]
    fn test_rfc8032_vector() {
        let pair = rfc_pair();
        assert_eq!(hex::encode(pair.public_key().as_bytes()), RFC8032_PUBLIC);
        let signature = pair.signer().sign(b"").unwrap();
        assert_eq!(hex::encode(&signature), RFC8032_SIGNATURE);
        assert!(pair.verifier().verify(b"", &signature).unwrap());
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let pair = KeyPairGenerator::default().generate();
        let signature = pair.signer().sign_base64(b"payload").unwrap();
        let verifier = PublicKey::from_base64(&pair.public_key_base64())
            .unwrap()
            .verifier();
        assert!(verifier.verify_base64(b"payload", &signature).unwrap());
    }

    #[test]
    fn test_tampered_data_is_false_not_error() {
        let pair = KeyPairGenerator::default().generate();
        let signature = pair.signer().sign(b"payload").unwrap();
        assert!(!pair.verifier().verify(b"payl0ad", &signature).unwrap());

        let other = KeyPairGenerator::default().generate();
        assert!(!other.verifier().verify(b"payload", &signature).unwrap());
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let pair = rfc_pair();
        let err = pair.verifier().verify(b"", &[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::SignatureLength {
                expected: 64,
                actual: 10
            }
        ));
        assert!(matches!(
            pair.verifier().verify_base64(b"", "not base64!"),
            Err(VerifyError::Encoding(_))
        ));
    }

    #[test]
    fn test_secret_key_base64_round_trip() {
        let pair = KeyPairGenerator::default().generate();
        let restored = KeyPair::from_secret_base64(&pair.secret_key_base64()).unwrap();
        assert_eq!(restored.public_key(), pair.public_key());
        assert_eq!(restored.fingerprint(), pair.fingerprint());
    }

    #[test]
    fn test_invalid_key_lengths() {
        assert!(matches!(
            KeyPair::from_secret_bytes(&[1, 2, 3]),
            Err(KeyError::InvalidLength {
                expected: 32,
                actual: 3
            })
        ));
        assert!(matches!(
            PublicKey::from_bytes(&[0u8; 31]),
            Err(KeyError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_fingerprint_is_sha256_of_public_key() {
        let pair = rfc_pair();
        assert_eq!(
            pair.fingerprint(),
            DigestAlgorithm::Sha256.digest_hex(&hex::decode(RFC8032_PUBLIC).unwrap())
        );
        assert_eq!(pair.fingerprint().len(), 64);
    }

    #[test]
    fn test_debug_hides_secret() {
        let pair = rfc_pair();
        let shown = format!("{:?}", pair);
        assert!(!shown.contains(RFC8032_SECRET));
        assert!(shown.contains(&pair.fingerprint()));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("ED25519".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::Ed25519);
        assert!(matches!(
            "RSA".parse::<SignatureAlgorithm>(),
            Err(KeyError::UnknownAlgorithm(_))
        ));
        assert_eq!(KeyPairGenerator::default().algorithm().to_string(), "Ed25519");
    }
}
