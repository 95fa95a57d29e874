//! Civitas Types - Canonical domain types for the Civitas federation
//!
//! The federation joins three cooperating services: the citizen registry,
//! the tax authority, and the bank. This crate holds the vocabulary they
//! share:
//!
//! - Strongly typed identifiers (UUID wrappers)
//! - [`Amount`] - fixed-point money
//! - [`Principal`] and [`Role`] - resolved identities
//! - [`TaxRecord`] - one taxpayer's dues for the current cycle
//! - [`CivitasError`] - the shared error taxonomy
//!
//! No dependencies on other civitas crates.

pub mod amount;
pub mod error;
pub mod ids;
pub mod principal;
pub mod tax;

pub use amount::*;
pub use error::*;
pub use ids::*;
pub use principal::*;
pub use tax::*;
