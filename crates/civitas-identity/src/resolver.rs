//! The identity resolver
//!
//! Maps certificates to registered principals and registers new ones. The
//! upstream citizen directory is a collaborator trait: the resolver submits
//! certificate content and receives canonical attributes (name, tax id)
//! back, or nothing when the subject is unknown there.

use crate::{IdentityError, Result, TrustStore};
use async_trait::async_trait;
use civitas_crypto::Certificate;
use civitas_types::{CitizenSummary, DistinguishedName, Principal, PrincipalId, Role, TaxId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Upstream registry that knows the canonical attributes of every citizen
#[async_trait]
pub trait CitizenDirectory: Send + Sync {
    /// Look up a citizen by certificate wire bytes
    ///
    /// `Ok(None)` means the subject is unknown upstream; `Err` means the
    /// directory itself could not answer.
    async fn lookup_by_certificate(&self, cert_bytes: &[u8]) -> Result<Option<CitizenSummary>>;
}

/// Resolves certificates to principals
#[derive(Clone)]
pub struct IdentityResolver {
    principals: Arc<RwLock<HashMap<DistinguishedName, Principal>>>,
    trust: TrustStore,
    directory: Arc<dyn CitizenDirectory>,
}

impl IdentityResolver {
    pub fn new(trust: TrustStore, directory: Arc<dyn CitizenDirectory>) -> Self {
        Self {
            principals: Arc::new(RwLock::new(HashMap::new())),
            trust,
            directory,
        }
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust
    }

    /// Resolve the principal a certificate identifies
    ///
    /// Extracts the subject DN and queries the registry by that key.
    pub async fn resolve_principal(&self, cert_bytes: &[u8]) -> Result<Principal> {
        let certificate = Certificate::from_encoded(cert_bytes)?;
        let principals = self.principals.read().await;
        principals
            .get(certificate.subject_dn())
            .cloned()
            .ok_or_else(|| IdentityError::PrincipalNotFound {
                subject: certificate.subject_dn().to_string(),
            })
    }

    /// Validate a certificate against the trust store
    pub async fn validate_trust(&self, certificate: &Certificate) -> Result<bool> {
        self.trust.validate(certificate).await
    }

    /// Register a new principal for a trusted certificate
    ///
    /// Canonical attributes come from the upstream directory; the supplied
    /// role is what the caller is being registered as.
    pub async fn register_principal(
        &self,
        certificate: &Certificate,
        role: Role,
    ) -> Result<Principal> {
        let subject = certificate.subject_dn().clone();

        if !self.trust.validate(certificate).await? {
            warn!(subject = %subject, "registration refused: certificate not trusted");
            return Err(IdentityError::Untrusted {
                subject: subject.to_string(),
                reason: "no anchor verifies the certificate signature".to_string(),
            });
        }

        {
            let principals = self.principals.read().await;
            if principals.contains_key(&subject) {
                return Err(IdentityError::AlreadyRegistered {
                    subject: subject.to_string(),
                });
            }
        }

        let citizen = self
            .directory
            .lookup_by_certificate(&certificate.encoded()?)
            .await?
            .ok_or_else(|| IdentityError::LookupFailure {
                subject: subject.to_string(),
            })?;

        let principal = Principal {
            id: PrincipalId::new(),
            subject_dn: subject.clone(),
            tax_id: citizen.tax_id,
            name: citizen.name,
            role,
        };

        info!(subject = %subject, role = %role, "principal registered");
        self.principals
            .write()
            .await
            .insert(subject, principal.clone());
        Ok(principal)
    }

    /// Look up a principal by its civil tax id
    pub async fn principal_by_tax_id(&self, tax_id: &TaxId) -> Result<Principal> {
        let principals = self.principals.read().await;
        principals
            .values()
            .find(|p| &p.tax_id == tax_id)
            .cloned()
            .ok_or_else(|| IdentityError::PrincipalNotFound {
                subject: tax_id.to_string(),
            })
    }

    /// All registered principals
    pub async fn principals(&self) -> Vec<Principal> {
        self.principals.read().await.values().cloned().collect()
    }
}
