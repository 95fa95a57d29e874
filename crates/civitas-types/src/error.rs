//! Error taxonomy shared across the Civitas services
//!
//! Crate-level errors (ledger, identity, rpc, tax) convert into these
//! variants where they cross a service seam, so callers of the federation
//! see one taxonomy. Failure is always explicit and typed; "absent" and
//! "storage unavailable" are distinct kinds.

use thiserror::Error;

/// Result type for federation-level operations
pub type Result<T> = std::result::Result<T, CivitasError>;

/// The shared error taxonomy
#[derive(Debug, Clone, Error)]
pub enum CivitasError {
    /// Malformed input: non-positive amount, unparseable certificate, ...
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// An account, principal, citizen, or tax record is absent
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// Certificate could not be verified against the trust store
    #[error("Trust validation failed: {reason}")]
    Trust { reason: String },

    /// Debit exceeds the available balance; no overdraft
    #[error("Insufficient funds in account {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: String,
        requested: String,
        available: String,
    },

    /// An upstream call failed or timed out
    #[error("Remote service unavailable at {endpoint}: {reason}")]
    RemoteUnavailable { endpoint: String, reason: String },

    /// A ledger mutation was partially applied. Must never occur; fatal.
    #[error("Inconsistent state: {reason}")]
    InconsistentState { reason: String },
}

impl CivitasError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    pub fn trust(reason: impl Into<String>) -> Self {
        Self::Trust {
            reason: reason.into(),
        }
    }

    pub fn remote(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error indicates a bug rather than a caller mistake
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InconsistentState { .. })
    }
}
