//! Civitas Crypto - Certificate and credential primitives
//!
//! This crate provides:
//! - Ed25519 key pairs ([`KeyPair`])
//! - Certificates binding a subject DN to an embedded public key,
//!   signed by an issuer ([`Certificate`])
//! - Per-call credential derivation ([`CallCredentials`]): the
//!   proof-of-possession scheme the federation uses instead of mutual TLS
//!
//! # Security note
//!
//! Derived credentials carry no nonce or timestamp: they are deterministic
//! for a fixed certificate/key and therefore replayable. This mirrors the
//! deployed scheme and is intentionally not "fixed" here; adding freshness
//! would change the wire contract for every receiving service.

pub mod certificate;
pub mod credentials;
pub mod keys;

pub use certificate::*;
pub use credentials::*;
pub use keys::*;

use thiserror::Error;

/// Certificate and credential errors
#[derive(Debug, Error)]
pub enum CertError {
    #[error("Malformed certificate: {0}")]
    Malformed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Private key does not match certificate for subject {subject}")]
    KeyMismatch { subject: String },

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Credential verification failed: {0}")]
    VerificationFailed(String),
}

pub type CryptoResult<T> = Result<T, CertError>;
