//! Principals and identity attributes
//!
//! A [`Principal`] is an identity the federation has resolved from a
//! certificate: a citizen in the registry, a customer at the bank, or an
//! administrator. The subject distinguished name (DN) embedded in the
//! certificate is the external key; the tax id is the canonical civil key
//! shared across services.

use crate::PrincipalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An X.509 subject distinguished name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistinguishedName(pub String);

impl DistinguishedName {
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DistinguishedName {
    fn from(dn: &str) -> Self {
        Self(dn.to_string())
    }
}

impl From<String> for DistinguishedName {
    fn from(dn: String) -> Self {
        Self(dn)
    }
}

/// Civil tax identifier, shared between registry, tax authority, and bank
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxId(pub String);

impl TaxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaxId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaxId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role of a principal; gates which operations it may request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A citizen known to the identity registry
    Citizen,
    /// A customer of the bank
    Customer,
    /// An administrator of one of the services
    Administrator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Citizen => "citizen",
            Role::Customer => "customer",
            Role::Administrator => "administrator",
        };
        write!(f, "{s}")
    }
}

/// A resolved identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    /// External key: the certificate subject DN
    pub subject_dn: DistinguishedName,
    /// Canonical civil key
    pub tax_id: TaxId,
    pub name: String,
    pub role: Role,
}

/// One citizen as reported by the identity registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenSummary {
    pub id: PrincipalId,
    pub tax_id: TaxId,
    pub name: String,
    pub subject_dn: DistinguishedName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display() {
        assert_eq!(Role::Citizen.to_string(), "citizen");
        assert_eq!(Role::Administrator.to_string(), "administrator");
    }

    #[test]
    fn principal_serde_round_trip() {
        let p = Principal {
            id: PrincipalId::new(),
            subject_dn: "CN=Ada Lovelace,O=Civitas".into(),
            tax_id: "1815-1210".into(),
            name: "Ada Lovelace".to_string(),
            role: Role::Citizen,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
