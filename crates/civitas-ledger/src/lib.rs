//! Civitas Ledger - The bank's account ledger engine
//!
//! The ledger is:
//! - Account-keyed by [`AccountId`], owner-indexed by [`TaxId`]
//! - Append-only (entries are never updated or deleted; closing an account
//!   removes the account and its entries together)
//! - Strict about balances (never negative, no overdraft)
//!
//! # Invariants
//!
//! 1. An account's balance equals the sum of its entry deltas in commit
//!    order and never goes negative
//! 2. Every committed mutation appends exactly one entry whose
//!    `resulting_balance` equals the balance immediately afterward
//! 3. A transfer commits both entries or neither
//!
//! # Concurrency
//!
//! Each account has its own async lock, so mutations on one account are
//! serialized while distinct accounts proceed concurrently. The map-level
//! lock is held only long enough to fetch lock handles. Transfers take
//! both account locks in ascending [`AccountId`] order, which prevents
//! deadlock between concurrent opposite-direction transfers.

use chrono::{DateTime, Utc};
use civitas_types::{AccountId, Amount, CivitasError, TaxId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Errors from ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    #[error("An account already exists for owner {owner}")]
    AccountAlreadyExists { owner: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Insufficient funds in account {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: String,
        requested: Amount,
        available: Amount,
    },
}

impl From<LedgerError> for CivitasError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound { account } => {
                CivitasError::not_found("Account", account)
            }
            LedgerError::AccountAlreadyExists { owner } => {
                CivitasError::validation(format!("account already exists for owner {owner}"))
            }
            LedgerError::InvalidAmount { message } => CivitasError::validation(message),
            LedgerError::InsufficientFunds {
                account,
                requested,
                available,
            } => CivitasError::InsufficientFunds {
                account,
                requested: requested.to_string(),
                available: available.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Kind of balance-changing operation an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    Payment,
    TransferOut,
    TransferIn,
}

impl EntryKind {
    /// Whether this kind decreases the balance
    pub fn is_debit(&self) -> bool {
        matches!(
            self,
            EntryKind::Withdrawal | EntryKind::Payment | EntryKind::TransferOut
        )
    }
}

/// An immutable audit record of one committed mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Monotonic within the account, starting at 1
    pub sequence: u64,
    pub account: AccountId,
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
    /// Always > 0; direction comes from `kind`
    pub amount: Amount,
    /// The account balance immediately after the mutation
    pub resulting_balance: Amount,
}

/// Point-in-time view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner: TaxId,
    pub balance: Amount,
}

/// Internal per-account state, guarded by the account's own lock
#[derive(Debug)]
struct AccountState {
    owner: TaxId,
    balance: Amount,
    entries: Vec<LedgerEntry>,
    /// Set under the state lock when the account closes; a mutation that
    /// fetched its handle before the close re-checks this and fails
    /// instead of committing into discarded state
    closed: bool,
}

impl AccountState {
    fn append(&mut self, account: AccountId, kind: EntryKind, amount: Amount, balance: Amount) -> LedgerEntry {
        let entry = LedgerEntry {
            sequence: self.entries.len() as u64 + 1,
            account,
            timestamp: Utc::now(),
            kind,
            amount,
            resulting_balance: balance,
        };
        self.balance = balance;
        self.entries.push(entry.clone());
        entry
    }
}

type AccountHandle = Arc<Mutex<AccountState>>;

/// The ledger engine
///
/// Thread-safe; shared by cloning.
#[derive(Clone, Default)]
pub struct LedgerEngine {
    accounts: Arc<RwLock<HashMap<AccountId, AccountHandle>>>,
    owners: Arc<RwLock<HashMap<TaxId, AccountId>>>,
}

impl LedgerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account with balance zero
    ///
    /// Each owner holds at most one account.
    pub async fn open_account(&self, owner: TaxId) -> Result<Account> {
        let mut owners = self.owners.write().await;
        if owners.contains_key(&owner) {
            return Err(LedgerError::AccountAlreadyExists {
                owner: owner.to_string(),
            });
        }

        let id = AccountId::new();
        let state = AccountState {
            owner: owner.clone(),
            balance: Amount::zero(),
            entries: Vec::new(),
            closed: false,
        };
        self.accounts
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(state)));
        owners.insert(owner.clone(), id);

        info!(account = %id, owner = %owner, "account opened");
        Ok(Account {
            id,
            owner,
            balance: Amount::zero(),
        })
    }

    /// Close an account, removing it and its entries together
    pub async fn close_account(&self, id: AccountId) -> Result<()> {
        let mut owners = self.owners.write().await;
        let mut accounts = self.accounts.write().await;
        let handle = accounts
            .remove(&id)
            .ok_or_else(|| LedgerError::AccountNotFound {
                account: id.to_string(),
            })?;
        let mut state = handle.lock().await;
        state.closed = true;
        owners.remove(&state.owner);
        info!(account = %id, "account closed");
        Ok(())
    }

    /// Resolve the account owned by a tax id (certificate-identified calls)
    pub async fn account_by_owner(&self, owner: &TaxId) -> Result<AccountId> {
        self.owners
            .read()
            .await
            .get(owner)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound {
                account: owner.to_string(),
            })
    }

    /// Credit an account
    pub async fn deposit(&self, id: AccountId, amount: Amount) -> Result<(Amount, LedgerEntry)> {
        require_positive(amount)?;
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;
        ensure_open(&state, id)?;

        let balance = state
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount {
                message: "balance overflow".to_string(),
            })?;
        let entry = state.append(id, EntryKind::Deposit, amount, balance);
        info!(account = %id, %amount, %balance, "deposit committed");
        Ok((balance, entry))
    }

    /// Debit an account
    pub async fn withdraw(&self, id: AccountId, amount: Amount) -> Result<(Amount, LedgerEntry)> {
        self.debit(id, amount, EntryKind::Withdrawal).await
    }

    /// Debit an account to settle a bill
    pub async fn pay_bill(&self, id: AccountId, amount: Amount) -> Result<(Amount, LedgerEntry)> {
        self.debit(id, amount, EntryKind::Payment).await
    }

    /// Move funds between two accounts atomically
    ///
    /// Both entries commit or neither does: every precondition (accounts
    /// exist, amount valid, funds sufficient, no overflow) is checked while
    /// holding both locks and before the first mutation.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(LedgerEntry, LedgerEntry)> {
        require_positive(amount)?;
        if from == to {
            return Err(LedgerError::InvalidAmount {
                message: "transfer source and destination are the same account".to_string(),
            });
        }

        let (from_handle, to_handle) = {
            let accounts = self.accounts.read().await;
            let lookup = |id: AccountId| {
                accounts
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| LedgerError::AccountNotFound {
                        account: id.to_string(),
                    })
            };
            (lookup(from)?, lookup(to)?)
        };

        // Fixed total order on AccountId keeps concurrent opposite-direction
        // transfers deadlock-free.
        let (mut low_guard, mut high_guard);
        let (from_state, to_state) = if from < to {
            low_guard = from_handle.lock().await;
            high_guard = to_handle.lock().await;
            (&mut *low_guard, &mut *high_guard)
        } else {
            low_guard = to_handle.lock().await;
            high_guard = from_handle.lock().await;
            (&mut *high_guard, &mut *low_guard)
        };

        ensure_open(from_state, from)?;
        ensure_open(to_state, to)?;

        let from_balance = checked_debit(from, from_state.balance, amount)?;
        let to_balance =
            to_state
                .balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::InvalidAmount {
                    message: "destination balance overflow".to_string(),
                })?;

        let out_entry = from_state.append(from, EntryKind::TransferOut, amount, from_balance);
        let in_entry = to_state.append(to, EntryKind::TransferIn, amount, to_balance);

        info!(%from, %to, %amount, "transfer committed");
        Ok((out_entry, in_entry))
    }

    /// Current balance
    pub async fn balance(&self, id: AccountId) -> Result<Amount> {
        let handle = self.handle(id).await?;
        let state = handle.lock().await;
        Ok(state.balance)
    }

    /// Point-in-time account snapshot
    pub async fn account(&self, id: AccountId) -> Result<Account> {
        let handle = self.handle(id).await?;
        let state = handle.lock().await;
        Ok(Account {
            id,
            owner: state.owner.clone(),
            balance: state.balance,
        })
    }

    /// All entries of an account, in commit order
    pub async fn entries(&self, id: AccountId) -> Result<Vec<LedgerEntry>> {
        let handle = self.handle(id).await?;
        let state = handle.lock().await;
        Ok(state.entries.clone())
    }

    /// Number of committed entries on an account
    pub async fn entry_count(&self, id: AccountId) -> Result<usize> {
        let handle = self.handle(id).await?;
        let state = handle.lock().await;
        Ok(state.entries.len())
    }

    async fn handle(&self, id: AccountId) -> Result<AccountHandle> {
        self.accounts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::AccountNotFound {
                account: id.to_string(),
            })
    }

    async fn debit(
        &self,
        id: AccountId,
        amount: Amount,
        kind: EntryKind,
    ) -> Result<(Amount, LedgerEntry)> {
        require_positive(amount)?;
        let handle = self.handle(id).await?;
        let mut state = handle.lock().await;
        ensure_open(&state, id)?;

        let balance = checked_debit(id, state.balance, amount)?;
        let entry = state.append(id, kind, amount, balance);
        info!(account = %id, %amount, %balance, kind = ?kind, "debit committed");
        Ok((balance, entry))
    }
}

fn ensure_open(state: &AccountState, id: AccountId) -> Result<()> {
    if state.closed {
        return Err(LedgerError::AccountNotFound {
            account: id.to_string(),
        });
    }
    Ok(())
}

fn require_positive(amount: Amount) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount {
            message: format!("amount must be greater than zero, got {amount}"),
        });
    }
    Ok(())
}

fn checked_debit(id: AccountId, balance: Amount, amount: Amount) -> Result<Amount> {
    if amount > balance {
        return Err(LedgerError::InsufficientFunds {
            account: id.to_string(),
            requested: amount,
            available: balance,
        });
    }
    // amount <= balance and both are non-negative, so this cannot underflow
    balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::InvalidAmount {
            message: "balance underflow".to_string(),
        })
}
