//! RPC configuration
//!
//! An opaque options bag: where the remote services live, which namespace
//! the caller belongs to, and the local signing identity used to derive
//! per-call credentials.

use civitas_crypto::{CallCredentials, CertError, Certificate, CryptoResult, KeyPair};
use serde::{Deserialize, Serialize};

/// The local signing identity: a certificate and its private key reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningIdentity {
    pub certificate: Certificate,
    /// Hex-encoded Ed25519 signing key
    pub signing_key_hex: String,
}

impl SigningIdentity {
    pub fn new(certificate: Certificate, key: &KeyPair) -> Self {
        Self {
            certificate,
            signing_key_hex: hex::encode(key.to_bytes()),
        }
    }

    /// Reconstruct the key pair from the stored key reference
    pub fn keypair(&self) -> CryptoResult<KeyPair> {
        let bytes = hex::decode(&self.signing_key_hex)
            .map_err(|e| CertError::InvalidKeyFormat(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CertError::InvalidKeyFormat("signing key must be 32 bytes".to_string()))?;
        Ok(KeyPair::from_bytes(&bytes))
    }

    /// Derive fresh call credentials for one outbound call
    pub fn credentials(&self) -> CryptoResult<CallCredentials> {
        CallCredentials::derive(&self.certificate, &self.keypair()?)
    }
}

/// Options bag for a remote service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Endpoint URL of the remote service
    pub endpoint_url: String,
    /// Service namespace identifier
    pub namespace: String,
    /// Local signing identity; absent for anonymous read-only callers
    pub identity: Option<SigningIdentity>,
}

impl RpcConfig {
    pub fn new(endpoint_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            namespace: namespace.into(),
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: SigningIdentity) -> Self {
        self.identity = Some(identity);
        self
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080", "civitas")
    }
}
