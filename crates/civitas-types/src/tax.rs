//! Tax records
//!
//! One [`TaxRecord`] per taxpayer per recomputation cycle. The whole
//! population is replaced wholesale on every cycle; within a cycle, `paid`
//! moves false to true at most once and is never reversed automatically.

use crate::{Amount, TaxId};
use serde::{Deserialize, Serialize};

/// One taxpayer's dues for the current cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub taxpayer: TaxId,
    /// Amount due; always >= 0
    pub amount_due: Amount,
    /// True iff the record is exempt (`amount_due == 0`) or a remote debit
    /// explicitly confirmed success
    pub paid: bool,
    /// Reason of the most recent failed settlement attempt, if any
    pub failure_reason: Option<String>,
}

impl TaxRecord {
    /// Create a freshly computed record
    ///
    /// A zero liability is an exemption and counts as already paid.
    pub fn assessed(taxpayer: TaxId, amount_due: Amount) -> Self {
        let paid = amount_due.is_zero();
        Self {
            taxpayer,
            amount_due,
            paid,
            failure_reason: None,
        }
    }

    /// Exempt records owe nothing
    pub fn is_exempt(&self) -> bool {
        self.amount_due.is_zero()
    }
}
