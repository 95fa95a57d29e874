//! Client traits for the remote registry and bank services
//!
//! Every call carries [`CallCredentials`] derived for that call; the
//! transport places them in its standard authentication header.

use async_trait::async_trait;
use civitas_crypto::CallCredentials;
use civitas_types::{AccountId, Amount, CitizenSummary};
use serde::{Deserialize, Serialize};

use crate::RpcResult;

/// Reply from a bank mutation
///
/// Commit decisions on the calling side key off `success` alone; the
/// snapshot and reason are informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub success: bool,
    /// Updated balance snapshot, when the bank reports one
    pub balance: Option<Amount>,
    pub failure_reason: Option<String>,
}

impl RemoteStatus {
    pub fn ok(balance: Amount) -> Self {
        Self {
            success: true,
            balance: Some(balance),
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            balance: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// The citizen identity registry service
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// The full citizen population
    async fn list_citizens(&self, credentials: &CallCredentials)
        -> RpcResult<Vec<CitizenSummary>>;

    /// Look up one citizen by certificate wire bytes
    async fn get_citizen_by_cert(
        &self,
        cert_bytes: &[u8],
        credentials: &CallCredentials,
    ) -> RpcResult<Option<CitizenSummary>>;
}

/// The bank service
///
/// The caller is identified by certificate; the bank resolves the account
/// through the owning principal's tax id.
#[async_trait]
pub trait BankClient: Send + Sync {
    async fn pay(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus>;

    async fn deposit(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus>;

    async fn withdraw(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus>;

    async fn transfer(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        destination: AccountId,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus>;
}
