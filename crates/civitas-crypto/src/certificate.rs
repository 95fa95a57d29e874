//! Certificates
//!
//! A [`Certificate`] binds a subject distinguished name to an embedded
//! Ed25519 public key and carries the issuer's signature over the
//! to-be-signed body. Only verification and use are in scope here; CA
//! infrastructure is not. [`Certificate::issue`] exists so that services
//! and tests can mint the certificates they hold.
//!
//! Two byte forms matter:
//! - [`Certificate::tbs_bytes`]: the canonical body the issuer signed
//! - [`Certificate::encoded`]: the whole certificate as transported on the
//!   wire and signed over for call credentials

use crate::{decode_verifying_key, CertError, CryptoResult, KeyPair};
use chrono::{DateTime, Utc};
use civitas_types::DistinguishedName;
use ed25519_dalek::{Signature, Verifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The to-be-signed certificate body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TbsCertificate {
    pub serial: Uuid,
    pub subject_dn: DistinguishedName,
    pub issuer_dn: DistinguishedName,
    /// Hex-encoded Ed25519 public key of the subject
    pub public_key: String,
    pub issued_at: DateTime<Utc>,
}

/// A certificate: signed body plus the issuer's signature (hex)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub tbs: TbsCertificate,
    pub signature: String,
}

impl Certificate {
    /// Issue a certificate for `subject_dn`, embedding the subject's public
    /// key and signing the body with the issuer's key
    pub fn issue(
        subject_dn: DistinguishedName,
        subject_public_key_hex: String,
        issuer_dn: DistinguishedName,
        issuer: &KeyPair,
    ) -> CryptoResult<Self> {
        let tbs = TbsCertificate {
            serial: Uuid::new_v4(),
            subject_dn,
            issuer_dn,
            public_key: subject_public_key_hex,
            issued_at: Utc::now(),
        };
        let body = canonical_bytes(&tbs)?;
        let signature = issuer.sign(&body)?;
        Ok(Self {
            tbs,
            signature: hex::encode(signature.to_bytes()),
        })
    }

    /// Issue a self-signed certificate, e.g. a trust store root
    pub fn self_signed(subject_dn: DistinguishedName, key: &KeyPair) -> CryptoResult<Self> {
        Self::issue(
            subject_dn.clone(),
            key.public_key_hex(),
            subject_dn,
            key,
        )
    }

    pub fn subject_dn(&self) -> &DistinguishedName {
        &self.tbs.subject_dn
    }

    pub fn issuer_dn(&self) -> &DistinguishedName {
        &self.tbs.issuer_dn
    }

    /// The canonical body bytes the issuer signed
    pub fn tbs_bytes(&self) -> CryptoResult<Vec<u8>> {
        canonical_bytes(&self.tbs)
    }

    /// The whole certificate in its wire form
    pub fn encoded(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CertError::Malformed(e.to_string()))
    }

    /// Parse a certificate from its wire form
    pub fn from_encoded(bytes: &[u8]) -> CryptoResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| CertError::Malformed(e.to_string()))
    }

    /// The subject's embedded public key
    pub fn embedded_key(&self) -> CryptoResult<ed25519_dalek::VerifyingKey> {
        decode_verifying_key(&self.tbs.public_key)
    }

    /// Verify this certificate's signature against the key embedded in
    /// `anchor`. Returns false for a valid-but-unrelated anchor; errors are
    /// reserved for malformed material.
    pub fn verify_signed_by(&self, anchor: &Certificate) -> CryptoResult<bool> {
        let anchor_key = anchor.embedded_key()?;
        let signature = decode_signature(&self.signature)?;
        Ok(anchor_key.verify(&self.tbs_bytes()?, &signature).is_ok())
    }

    pub fn is_self_signed(&self) -> bool {
        self.tbs.subject_dn == self.tbs.issuer_dn
    }

    /// SHA-256 fingerprint of the wire form, hex-encoded
    pub fn fingerprint(&self) -> CryptoResult<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.encoded()?);
        Ok(hex::encode(hasher.finalize()))
    }
}

fn canonical_bytes(tbs: &TbsCertificate) -> CryptoResult<Vec<u8>> {
    serde_json::to_vec(tbs).map_err(|e| CertError::Malformed(e.to_string()))
}

pub(crate) fn decode_signature(signature_hex: &str) -> CryptoResult<Signature> {
    let bytes =
        hex::decode(signature_hex).map_err(|e| CertError::Malformed(e.to_string()))?;
    signature_from_bytes(&bytes)
}

pub(crate) fn signature_from_bytes(bytes: &[u8]) -> CryptoResult<Signature> {
    let bytes: [u8; 64] = bytes
        .try_into()
        .map_err(|_| CertError::Malformed("signature must be 64 bytes".to_string()))?;
    Ok(Signature::from_bytes(&bytes))
}
