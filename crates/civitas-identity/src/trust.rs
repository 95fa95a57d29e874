//! The certificate trust store
//!
//! Holds the anchors the federation accepts as authoritative for identity
//! claims. Validation matches the presented certificate's issuer against an
//! anchor subject and then verifies the signature cryptographically.

use crate::Result;
use civitas_crypto::Certificate;
use civitas_types::{DistinguishedName, TrustAnchorId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// One trust store entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedCertificate {
    pub id: TrustAnchorId,
    pub subject_dn: DistinguishedName,
    pub certificate: Certificate,
}

/// The set of certificates accepted as authoritative
///
/// Thread-safe; shared by cloning.
#[derive(Clone, Default)]
pub struct TrustStore {
    anchors: Arc<RwLock<HashMap<DistinguishedName, TrustedCertificate>>>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an anchor, keyed by its subject DN
    pub async fn add_anchor(&self, certificate: Certificate) -> TrustAnchorId {
        let entry = TrustedCertificate {
            id: TrustAnchorId::new(),
            subject_dn: certificate.subject_dn().clone(),
            certificate,
        };
        let id = entry.id;
        info!(subject = %entry.subject_dn, "trust anchor added");
        self.anchors
            .write()
            .await
            .insert(entry.subject_dn.clone(), entry);
        id
    }

    /// Remove the anchor for a subject; returns whether one existed
    pub async fn remove_anchor(&self, subject: &DistinguishedName) -> bool {
        self.anchors.write().await.remove(subject).is_some()
    }

    /// Snapshot of all anchors
    pub async fn anchors(&self) -> Vec<TrustedCertificate> {
        self.anchors.read().await.values().cloned().collect()
    }

    /// Validate a certificate against the store
    ///
    /// True iff an anchor whose subject matches the certificate's issuer
    /// exists and the certificate's signature verifies against that
    /// anchor's embedded key.
    pub async fn validate(&self, certificate: &Certificate) -> Result<bool> {
        let anchors = self.anchors.read().await;
        let anchor = match anchors.get(certificate.issuer_dn()) {
            Some(anchor) => anchor,
            None => return Ok(false),
        };
        Ok(certificate.verify_signed_by(&anchor.certificate)?)
    }
}
