//! In-process loopback services
//!
//! These implement the client traits directly against the real identity
//! and ledger engines, standing in for the remote registry and bank. The
//! wire transport is out of scope; authentication is not: loopback
//! services verify proof-of-possession credentials exactly as a remote
//! receiver would before touching any state.

use async_trait::async_trait;
use civitas_crypto::{CallCredentials, Certificate};
use civitas_identity::{CitizenDirectory, IdentityResolver};
use civitas_ledger::{Account, LedgerEngine};
use civitas_types::{AccountId, Amount, CitizenSummary, CivitasError, DistinguishedName, Role};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{BankClient, RegistryClient, RemoteStatus, RpcError, RpcResult};

fn authenticate(credentials: &CallCredentials, cert_bytes: &[u8]) -> RpcResult<Certificate> {
    let caller = credentials
        .verify()
        .map_err(|e| RpcError::AuthenticationFailed {
            reason: e.to_string(),
        })?;

    let presented =
        Certificate::from_encoded(cert_bytes).map_err(|e| RpcError::AuthenticationFailed {
            reason: format!("presented certificate is malformed: {e}"),
        })?;
    if presented != caller {
        warn!(subject = %caller.subject_dn(), "presented certificate does not match credentials");
        return Err(RpcError::AuthenticationFailed {
            reason: "presented certificate does not match call credentials".to_string(),
        });
    }
    Ok(caller)
}

/// Loopback citizen identity registry
#[derive(Clone, Default)]
pub struct LoopbackRegistry {
    citizens: Arc<RwLock<HashMap<DistinguishedName, CitizenSummary>>>,
}

impl LoopbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_citizen(&self, citizen: CitizenSummary) {
        self.citizens
            .write()
            .await
            .insert(citizen.subject_dn.clone(), citizen);
    }
}

#[async_trait]
impl RegistryClient for LoopbackRegistry {
    async fn list_citizens(
        &self,
        credentials: &CallCredentials,
    ) -> RpcResult<Vec<CitizenSummary>> {
        credentials
            .verify()
            .map_err(|e| RpcError::AuthenticationFailed {
                reason: e.to_string(),
            })?;
        let citizens = self.citizens.read().await;
        debug!(count = citizens.len(), "citizen population listed");
        Ok(citizens.values().cloned().collect())
    }

    async fn get_citizen_by_cert(
        &self,
        cert_bytes: &[u8],
        credentials: &CallCredentials,
    ) -> RpcResult<Option<CitizenSummary>> {
        credentials
            .verify()
            .map_err(|e| RpcError::AuthenticationFailed {
                reason: e.to_string(),
            })?;
        let certificate =
            Certificate::from_encoded(cert_bytes).map_err(|e| RpcError::AuthenticationFailed {
                reason: format!("certificate is malformed: {e}"),
            })?;
        let citizens = self.citizens.read().await;
        Ok(citizens.get(certificate.subject_dn()).cloned())
    }
}

/// The registry doubles as the resolver's upstream directory
#[async_trait]
impl CitizenDirectory for LoopbackRegistry {
    async fn lookup_by_certificate(
        &self,
        cert_bytes: &[u8],
    ) -> civitas_identity::Result<Option<CitizenSummary>> {
        let certificate = Certificate::from_encoded(cert_bytes)?;
        let citizens = self.citizens.read().await;
        Ok(citizens.get(certificate.subject_dn()).cloned())
    }
}

/// Loopback bank service
///
/// Resolves the caller's account via the owning principal's tax id, then
/// delegates to the ledger engine. Domain failures come back as failed
/// [`RemoteStatus`]; only authentication failures are transport errors.
#[derive(Clone)]
pub struct LoopbackBank {
    resolver: IdentityResolver,
    ledger: LedgerEngine,
}

impl LoopbackBank {
    pub fn new(resolver: IdentityResolver, ledger: LedgerEngine) -> Self {
        Self { resolver, ledger }
    }

    pub fn ledger(&self) -> &LedgerEngine {
        &self.ledger
    }

    /// Certificate-bearing customer registration
    ///
    /// The resolver confirms the principal (trust plus upstream lookup),
    /// then the ledger allocates the customer's account with balance zero.
    pub async fn register_customer(
        &self,
        certificate: &Certificate,
    ) -> civitas_types::Result<Account> {
        let principal = self
            .resolver
            .register_principal(certificate, Role::Customer)
            .await
            .map_err(CivitasError::from)?;
        self.ledger
            .open_account(principal.tax_id)
            .await
            .map_err(CivitasError::from)
    }

    async fn caller_account(&self, cert_bytes: &[u8]) -> Result<AccountId, RemoteStatus> {
        let principal = self
            .resolver
            .resolve_principal(cert_bytes)
            .await
            .map_err(|e| RemoteStatus::failed(e.to_string()))?;
        self.ledger
            .account_by_owner(&principal.tax_id)
            .await
            .map_err(|e| RemoteStatus::failed(e.to_string()))
    }
}

#[async_trait]
impl BankClient for LoopbackBank {
    async fn pay(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus> {
        authenticate(credentials, cert_bytes)?;
        let account = match self.caller_account(cert_bytes).await {
            Ok(account) => account,
            Err(status) => return Ok(status),
        };
        Ok(match self.ledger.pay_bill(account, amount).await {
            Ok((balance, _)) => RemoteStatus::ok(balance),
            Err(e) => RemoteStatus::failed(e.to_string()),
        })
    }

    async fn deposit(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus> {
        authenticate(credentials, cert_bytes)?;
        let account = match self.caller_account(cert_bytes).await {
            Ok(account) => account,
            Err(status) => return Ok(status),
        };
        Ok(match self.ledger.deposit(account, amount).await {
            Ok((balance, _)) => RemoteStatus::ok(balance),
            Err(e) => RemoteStatus::failed(e.to_string()),
        })
    }

    async fn withdraw(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus> {
        authenticate(credentials, cert_bytes)?;
        let account = match self.caller_account(cert_bytes).await {
            Ok(account) => account,
            Err(status) => return Ok(status),
        };
        Ok(match self.ledger.withdraw(account, amount).await {
            Ok((balance, _)) => RemoteStatus::ok(balance),
            Err(e) => RemoteStatus::failed(e.to_string()),
        })
    }

    async fn transfer(
        &self,
        cert_bytes: &[u8],
        amount: Amount,
        destination: AccountId,
        credentials: &CallCredentials,
    ) -> RpcResult<RemoteStatus> {
        authenticate(credentials, cert_bytes)?;
        let account = match self.caller_account(cert_bytes).await {
            Ok(account) => account,
            Err(status) => return Ok(status),
        };
        match self.ledger.transfer(account, destination, amount).await {
            Ok(_) => {
                let balance = self
                    .ledger
                    .balance(account)
                    .await
                    .map_err(|e| RpcError::RemoteUnavailable {
                        endpoint: "loopback-bank".to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(RemoteStatus::ok(balance))
            }
            Err(e) => Ok(RemoteStatus::failed(e.to_string())),
        }
    }
}
