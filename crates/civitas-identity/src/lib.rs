//! Civitas Identity - Principal resolution and certificate trust
//!
//! Maps raw certificates to known principals and decides whether a
//! certificate is trustworthy at all. Trust is cryptographic: a certificate
//! is accepted iff an anchor for its issuer exists in the trust store AND
//! the certificate's signature verifies against that anchor's key. DN
//! string equality alone proves nothing.
//!
//! Absence and unavailability are distinct error kinds: a principal that is
//! not registered is [`IdentityError::PrincipalNotFound`], never conflated
//! with an upstream failure.

pub mod resolver;
pub mod trust;

pub use resolver::*;
pub use trust::*;

use civitas_types::CivitasError;
use thiserror::Error;

/// Identity resolution errors
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No principal is registered for the certificate subject
    #[error("No principal registered for subject {subject}")]
    PrincipalNotFound { subject: String },

    /// The upstream directory does not recognize the subject
    #[error("Upstream directory lookup failed for subject {subject}")]
    LookupFailure { subject: String },

    /// The certificate did not validate against the trust store
    #[error("Certificate for {subject} is not trusted: {reason}")]
    Untrusted { subject: String, reason: String },

    /// A principal with this subject is already registered
    #[error("Principal already registered for subject {subject}")]
    AlreadyRegistered { subject: String },

    /// The upstream directory could not be reached
    #[error("Upstream directory unavailable: {reason}")]
    DirectoryUnavailable { reason: String },

    #[error(transparent)]
    Certificate(#[from] civitas_crypto::CertError),
}

impl From<IdentityError> for CivitasError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::PrincipalNotFound { subject } => {
                CivitasError::not_found("Principal", subject)
            }
            IdentityError::LookupFailure { subject } => {
                CivitasError::not_found("Citizen", subject)
            }
            IdentityError::Untrusted { subject, reason } => {
                CivitasError::trust(format!("{subject}: {reason}"))
            }
            IdentityError::AlreadyRegistered { subject } => {
                CivitasError::validation(format!("principal already registered: {subject}"))
            }
            IdentityError::DirectoryUnavailable { reason } => {
                CivitasError::remote("citizen directory", reason)
            }
            IdentityError::Certificate(e) => CivitasError::validation(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
