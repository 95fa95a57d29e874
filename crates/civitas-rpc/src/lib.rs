//! Civitas RPC - Remote service seams
//!
//! The identity registry and the bank are external collaborators reached
//! over an authenticated channel. This crate defines the client traits the
//! orchestrator programs against ([`RegistryClient`], [`BankClient`]), the
//! [`RemoteStatus`] reply shape, the configuration options bag, and
//! in-process loopback implementations that wire the real identity and
//! ledger engines behind the traits for tests and demos.
//!
//! Calls are synchronous from the caller's viewpoint: the calling task
//! blocks until a reply or a connection failure. No timeout is applied at
//! this layer; a hung remote blocks its caller. Known gap carried over
//! from the deployed design.

pub mod client;
pub mod config;
pub mod loopback;

pub use client::*;
pub use config::*;
pub use loopback::*;

use civitas_types::CivitasError;
use thiserror::Error;

/// Remote call errors
#[derive(Debug, Error)]
pub enum RpcError {
    /// The remote endpoint failed to answer
    #[error("Remote service unavailable at {endpoint}: {reason}")]
    RemoteUnavailable { endpoint: String, reason: String },

    /// The receiving service rejected the call credentials
    #[error("Call authentication failed: {reason}")]
    AuthenticationFailed { reason: String },
}

impl From<RpcError> for CivitasError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::RemoteUnavailable { endpoint, reason } => {
                CivitasError::remote(endpoint, reason)
            }
            RpcError::AuthenticationFailed { reason } => CivitasError::trust(reason),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
