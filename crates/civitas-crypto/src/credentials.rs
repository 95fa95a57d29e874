//! Per-call credential derivation (proof-of-possession)
//!
//! Every outbound remote call derives a fresh username/password pair from
//! the caller's certificate and private key:
//!
//! - `username = base64(certificate wire bytes)`
//! - `password = base64(sign(private key, certificate wire bytes))`
//!
//! The receiver authenticates by decoding the username back into the
//! certificate and checking that the password is a valid signature over
//! those bytes under the certificate's own embedded key. Possession of the
//! private key is proven without a shared secret.
//!
//! There is no freshness in the signed payload, so a captured pair replays.
//! Inherited wire contract; see the crate-level note.

use crate::certificate::signature_from_bytes;
use crate::{CertError, Certificate, CryptoResult, KeyPair};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::Verifier;
use serde::{Deserialize, Serialize};

/// A username/password pair for one authenticated remote call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCredentials {
    pub username: String,
    pub password: String,
}

impl CallCredentials {
    /// Derive credentials from a certificate and its matching private key
    ///
    /// Fails with [`CertError::KeyMismatch`] when the key does not match
    /// the certificate's embedded public key; such credentials could never
    /// verify on the receiving side.
    pub fn derive(certificate: &Certificate, key: &KeyPair) -> CryptoResult<Self> {
        if key.public_key_hex() != certificate.tbs.public_key {
            return Err(CertError::KeyMismatch {
                subject: certificate.subject_dn().to_string(),
            });
        }

        let payload = certificate.encoded()?;
        let signature = key.sign(&payload)?;

        Ok(Self {
            username: BASE64.encode(&payload),
            password: BASE64.encode(signature.to_bytes()),
        })
    }

    /// Receiver-side verification
    ///
    /// Returns the caller's certificate when the password proves possession
    /// of the private key matching the certificate's embedded public key.
    pub fn verify(&self) -> CryptoResult<Certificate> {
        let payload = BASE64
            .decode(&self.username)
            .map_err(|e| CertError::Malformed(format!("username is not base64: {e}")))?;
        let certificate = Certificate::from_encoded(&payload)?;

        let signature_bytes = BASE64
            .decode(&self.password)
            .map_err(|e| CertError::Malformed(format!("password is not base64: {e}")))?;
        let signature = signature_from_bytes(&signature_bytes)?;

        let key = certificate.embedded_key()?;
        key.verify(&payload, &signature).map_err(|_| {
            CertError::VerificationFailed(
                "password is not a valid signature over the username".to_string(),
            )
        })?;

        Ok(certificate)
    }
}
