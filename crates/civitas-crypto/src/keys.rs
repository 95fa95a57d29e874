//! Ed25519 key management

use crate::{CertError, CryptoResult};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

/// A key pair for signing operations
///
/// The signing half never leaves this type; callers sign through
/// [`KeyPair::sign`].
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Restore from signing key bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Signing key bytes, for secure storage only
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The public key as hex, the form embedded in certificates
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.as_bytes())
    }

    /// The public verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Signature> {
        self.signing_key
            .try_sign(message)
            .map_err(|e| CertError::SigningFailed(e.to_string()))
    }
}

/// Parse a hex-encoded Ed25519 public key
pub fn decode_verifying_key(key_hex: &str) -> CryptoResult<VerifyingKey> {
    let bytes = hex::decode(key_hex).map_err(|e| CertError::InvalidKeyFormat(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CertError::InvalidKeyFormat("public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| CertError::InvalidKeyFormat(e.to_string()))
}
