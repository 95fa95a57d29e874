//! Civitas Tax - The tax authority's orchestration layer
//!
//! Two responsibilities:
//!
//! - [`TaxOrchestrator::recompute_all`]: pull the full citizen population
//!   from the identity registry and replace every tax record in one
//!   snapshot swap. A reader never observes a partially purged table, and
//!   an exclusive cycle lock forbids overlapping recomputations.
//! - [`TaxOrchestrator::pay_online`]: settle one citizen's bill by debiting
//!   the bank remotely. `paid` flips to true only on an explicitly
//!   successful reply. On failure or an ambiguous reply the record stays
//!   unpaid and the reason is kept on the record.
//!
//! There is no retry and no compensation: if a debit succeeds remotely but
//! the acknowledgment is lost, the record stays unpaid until an operator
//! intervenes. Known limitation carried over from the deployed design.

use civitas_crypto::{CallCredentials, Certificate, CertError, KeyPair};
use civitas_identity::{IdentityError, IdentityResolver};
use civitas_rpc::{BankClient, RegistryClient, RpcError, SigningIdentity};
use civitas_types::{Amount, CivitasError, TaxId, TaxRecord};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Tax orchestration errors
#[derive(Debug, Error)]
pub enum TaxError {
    #[error("No tax record for taxpayer {taxpayer}")]
    RecordNotFound { taxpayer: String },

    #[error("Tax record for {taxpayer} is already paid")]
    AlreadyPaid { taxpayer: String },

    #[error("Certificate subject pays taxes as {payer}, not {taxpayer}")]
    PayerMismatch { taxpayer: String, payer: String },

    #[error("Settlement failed for {taxpayer}: {reason}")]
    SettlementFailed { taxpayer: String, reason: String },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Credential(#[from] CertError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl From<TaxError> for CivitasError {
    fn from(err: TaxError) -> Self {
        match err {
            TaxError::RecordNotFound { taxpayer } => {
                CivitasError::not_found("TaxRecord", taxpayer)
            }
            TaxError::AlreadyPaid { taxpayer } => {
                CivitasError::validation(format!("tax record already paid: {taxpayer}"))
            }
            TaxError::PayerMismatch { taxpayer, payer } => CivitasError::validation(format!(
                "certificate subject pays taxes as {payer}, not {taxpayer}"
            )),
            TaxError::SettlementFailed { taxpayer, reason } => {
                CivitasError::remote(format!("bank (settling {taxpayer})"), reason)
            }
            TaxError::Identity(e) => e.into(),
            TaxError::Credential(e) => CivitasError::validation(e.to_string()),
            TaxError::Rpc(e) => e.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TaxError>;

/// Outcome of one recomputation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// Records written in this cycle
    pub assessed: usize,
    /// Of those, exempt (zero liability, auto-paid)
    pub exempt: usize,
}

/// The tax authority orchestrator
#[derive(Clone)]
pub struct TaxOrchestrator {
    records: Arc<RwLock<HashMap<TaxId, TaxRecord>>>,
    /// Exclusive section for recomputation; a cycle purges shared state
    cycle: Arc<Mutex<()>>,
    /// Per-taxpayer settlement guards; one attempt per record at a time
    settlements: Arc<Mutex<HashMap<TaxId, Arc<Mutex<()>>>>>,
    registry: Arc<dyn RegistryClient>,
    bank: Arc<dyn BankClient>,
    identity: IdentityResolver,
    /// The tax office's own signing identity for outbound registry calls
    office: SigningIdentity,
}

impl TaxOrchestrator {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        bank: Arc<dyn BankClient>,
        identity: IdentityResolver,
        office: SigningIdentity,
    ) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            cycle: Arc::new(Mutex::new(())),
            settlements: Arc::new(Mutex::new(HashMap::new())),
            registry,
            bank,
            identity,
            office,
        }
    }

    /// Recompute dues for the entire population
    ///
    /// Liability per citizen is `max(0, (U - 0.2) * 1000)` for
    /// `U ~ Uniform(0, 1)`; a zero liability is an exemption and counts as
    /// paid. The previous record set is replaced wholesale by swapping in
    /// the new table under the write lock.
    pub async fn recompute_all(&self) -> Result<CycleSummary> {
        let _cycle = self.cycle.lock().await;

        let credentials = self.office.credentials()?;
        let citizens = self.registry.list_citizens(&credentials).await?;

        let mut fresh = HashMap::with_capacity(citizens.len());
        let mut exempt = 0;
        {
            let mut rng = rand::thread_rng();
            for citizen in citizens {
                let draw: f64 = rng.gen();
                let due = ((draw - 0.2) * 1000.0).max(0.0);
                // `due` is finite by construction
                let amount = Amount::from_f64(due).unwrap_or_else(Amount::zero);
                let record = TaxRecord::assessed(citizen.tax_id.clone(), amount);
                if record.is_exempt() {
                    exempt += 1;
                }
                fresh.insert(citizen.tax_id, record);
            }
        }

        let summary = CycleSummary {
            assessed: fresh.len(),
            exempt,
        };

        // Snapshot swap: purge and insert become one atomic replacement.
        *self.records.write().await = fresh;

        info!(
            assessed = summary.assessed,
            exempt = summary.exempt,
            "tax cycle recomputed"
        );
        Ok(summary)
    }

    /// Settle one citizen's bill via a remote debit at the bank
    ///
    /// The paying principal is derived from the certificate; call
    /// credentials are derived fresh from the certificate and key. The
    /// record flips to paid only when the bank explicitly confirms
    /// success. Settlement is serialized per taxpayer: concurrent attempts
    /// on the same record queue, and the loser fails with
    /// [`TaxError::AlreadyPaid`] instead of debiting the bank twice.
    pub async fn pay_online(
        &self,
        taxpayer: &TaxId,
        certificate: &Certificate,
        key: &KeyPair,
    ) -> Result<TaxRecord> {
        // The unpaid check, the remote debit, and the commit must not
        // interleave with another attempt on the same record. Guards are
        // retained across cycles; the map is bounded by the population.
        let settlement = {
            let mut settlements = self.settlements.lock().await;
            settlements.entry(taxpayer.clone()).or_default().clone()
        };
        let _settlement = settlement.lock().await;

        let record = self
            .records
            .read()
            .await
            .get(taxpayer)
            .cloned()
            .ok_or_else(|| TaxError::RecordNotFound {
                taxpayer: taxpayer.to_string(),
            })?;
        if record.paid {
            return Err(TaxError::AlreadyPaid {
                taxpayer: taxpayer.to_string(),
            });
        }

        let cert_bytes = certificate.encoded()?;
        let payer = self.identity.resolve_principal(&cert_bytes).await?;
        if &payer.tax_id != taxpayer {
            return Err(TaxError::PayerMismatch {
                taxpayer: taxpayer.to_string(),
                payer: payer.tax_id.to_string(),
            });
        }

        let credentials = CallCredentials::derive(certificate, key)?;
        let outcome = self
            .bank
            .pay(&cert_bytes, record.amount_due, &credentials)
            .await;

        match outcome {
            Ok(status) if status.success => self.commit_paid(taxpayer).await,
            Ok(status) => {
                let reason = status
                    .failure_reason
                    .unwrap_or_else(|| "remote debit did not confirm success".to_string());
                self.record_failure(taxpayer, reason).await
            }
            Err(e) => self.record_failure(taxpayer, e.to_string()).await,
        }
    }

    /// Manually assess or correct one record outside the cycle
    pub async fn assess(&self, record: TaxRecord) {
        self.records
            .write()
            .await
            .insert(record.taxpayer.clone(), record);
    }

    /// The current record for a taxpayer
    pub async fn record(&self, taxpayer: &TaxId) -> Option<TaxRecord> {
        self.records.read().await.get(taxpayer).cloned()
    }

    /// Snapshot of all records in the current cycle
    pub async fn records(&self) -> Vec<TaxRecord> {
        self.records.read().await.values().cloned().collect()
    }

    /// Records still owing in the current cycle
    pub async fn unpaid_count(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| !r.paid)
            .count()
    }

    async fn commit_paid(&self, taxpayer: &TaxId) -> Result<TaxRecord> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(taxpayer)
            .ok_or_else(|| TaxError::RecordNotFound {
                taxpayer: taxpayer.to_string(),
            })?;
        record.paid = true;
        record.failure_reason = None;
        info!(taxpayer = %taxpayer, amount = %record.amount_due, "tax bill settled");
        Ok(record.clone())
    }

    async fn record_failure(&self, taxpayer: &TaxId, reason: String) -> Result<TaxRecord> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(taxpayer) {
            record.failure_reason = Some(reason.clone());
        }
        warn!(taxpayer = %taxpayer, reason = %reason, "tax settlement failed");
        Err(TaxError::SettlementFailed {
            taxpayer: taxpayer.to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use civitas_identity::{CitizenDirectory, TrustStore};
    use civitas_ledger::LedgerEngine;
    use civitas_rpc::{LoopbackBank, LoopbackRegistry, RemoteStatus, RpcResult};
    use civitas_types::{CitizenSummary, DistinguishedName, PrincipalId, Role};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn citizen(n: usize) -> CitizenSummary {
        CitizenSummary {
            id: PrincipalId::new(),
            tax_id: format!("tax-{n}").into(),
            name: format!("Citizen {n}"),
            subject_dn: format!("CN=Citizen {n}").into(),
        }
    }

    /// Registry returning a fixed population
    struct FixedRegistry {
        citizens: Vec<CitizenSummary>,
    }

    #[async_trait]
    impl RegistryClient for FixedRegistry {
        async fn list_citizens(
            &self,
            _credentials: &CallCredentials,
        ) -> RpcResult<Vec<CitizenSummary>> {
            Ok(self.citizens.clone())
        }

        async fn get_citizen_by_cert(
            &self,
            cert_bytes: &[u8],
            _credentials: &CallCredentials,
        ) -> RpcResult<Option<CitizenSummary>> {
            let cert = Certificate::from_encoded(cert_bytes)
                .map_err(|e| RpcError::AuthenticationFailed {
                    reason: e.to_string(),
                })?;
            Ok(self
                .citizens
                .iter()
                .find(|c| &c.subject_dn == cert.subject_dn())
                .cloned())
        }
    }

    /// Bank scripted to a fixed reply
    struct ScriptedBank {
        reply: std::result::Result<RemoteStatus, String>,
    }

    #[async_trait]
    impl BankClient for ScriptedBank {
        async fn pay(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            match &self.reply {
                Ok(status) => Ok(status.clone()),
                Err(reason) => Err(RpcError::RemoteUnavailable {
                    endpoint: "bank".to_string(),
                    reason: reason.clone(),
                }),
            }
        }

        async fn deposit(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            unimplemented!("not exercised")
        }

        async fn withdraw(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            unimplemented!("not exercised")
        }

        async fn transfer(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _destination: civitas_types::AccountId,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            unimplemented!("not exercised")
        }
    }

    /// Bank that counts debits and answers slowly, widening any window
    /// between the unpaid check and the commit
    struct CountingBank {
        debits: AtomicUsize,
    }

    #[async_trait]
    impl BankClient for CountingBank {
        async fn pay(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            self.debits.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(RemoteStatus::ok(Amount::zero()))
        }

        async fn deposit(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            unimplemented!("not exercised")
        }

        async fn withdraw(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            unimplemented!("not exercised")
        }

        async fn transfer(
            &self,
            _cert_bytes: &[u8],
            _amount: Amount,
            _destination: civitas_types::AccountId,
            _credentials: &CallCredentials,
        ) -> RpcResult<RemoteStatus> {
            unimplemented!("not exercised")
        }
    }

    struct Fixture {
        orchestrator: TaxOrchestrator,
        root_dn: DistinguishedName,
        root_key: KeyPair,
    }

    async fn fixture(
        citizens: Vec<CitizenSummary>,
        bank: Arc<dyn BankClient>,
    ) -> Fixture {
        let trust = TrustStore::new();
        let root_dn = DistinguishedName::from("CN=Civitas Root");
        let root_key = KeyPair::generate();
        let root = Certificate::self_signed(root_dn.clone(), &root_key).unwrap();
        trust.add_anchor(root).await;

        let registry = Arc::new(FixedRegistry {
            citizens: citizens.clone(),
        });

        // The same population backs the resolver's upstream directory.
        struct Dir(Vec<CitizenSummary>);
        #[async_trait]
        impl CitizenDirectory for Dir {
            async fn lookup_by_certificate(
                &self,
                cert_bytes: &[u8],
            ) -> civitas_identity::Result<Option<CitizenSummary>> {
                let cert = Certificate::from_encoded(cert_bytes)?;
                Ok(self
                    .0
                    .iter()
                    .find(|c| &c.subject_dn == cert.subject_dn())
                    .cloned())
            }
        }
        let resolver = IdentityResolver::new(trust, Arc::new(Dir(citizens)));

        let office_key = KeyPair::generate();
        let office_cert = Certificate::issue(
            "CN=Tax Office".into(),
            office_key.public_key_hex(),
            root_dn.clone(),
            &root_key,
        )
        .unwrap();

        Fixture {
            orchestrator: TaxOrchestrator::new(
                registry,
                bank,
                resolver,
                SigningIdentity::new(office_cert, &office_key),
            ),
            root_dn,
            root_key,
        }
    }

    async fn registered_payer(fx: &Fixture, subject: &str) -> (Certificate, KeyPair) {
        let key = KeyPair::generate();
        let cert = Certificate::issue(
            subject.into(),
            key.public_key_hex(),
            fx.root_dn.clone(),
            &fx.root_key,
        )
        .unwrap();
        fx.orchestrator
            .identity
            .register_principal(&cert, Role::Citizen)
            .await
            .unwrap();
        (cert, key)
    }

    #[tokio::test]
    async fn recompute_assesses_whole_population_in_range() {
        let citizens: Vec<_> = (0..200).map(citizen).collect();
        let bank = Arc::new(ScriptedBank {
            reply: Ok(RemoteStatus::ok(Amount::zero())),
        });
        let fx = fixture(citizens, bank).await;

        let summary = fx.orchestrator.recompute_all().await.unwrap();
        assert_eq!(summary.assessed, 200);

        let records = fx.orchestrator.records().await;
        assert_eq!(records.len(), 200);
        for record in &records {
            assert!(record.amount_due >= Amount::zero());
            assert!(record.amount_due < Amount::new(dec!(1000)));
            assert_eq!(record.paid, record.amount_due.is_zero());
        }
        let exempt = records.iter().filter(|r| r.is_exempt()).count();
        assert_eq!(summary.exempt, exempt);
    }

    #[tokio::test]
    async fn recompute_replaces_previous_cycle_wholesale() {
        let bank = Arc::new(ScriptedBank {
            reply: Ok(RemoteStatus::ok(Amount::zero())),
        });
        let fx = fixture(vec![citizen(1)], bank).await;

        // A stale record from an earlier cycle.
        fx.orchestrator
            .assess(TaxRecord::assessed("tax-departed".into(), Amount::new(dec!(400))))
            .await;

        fx.orchestrator.recompute_all().await.unwrap();
        let records = fx.orchestrator.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].taxpayer, TaxId::from("tax-1"));
        assert!(fx.orchestrator.record(&"tax-departed".into()).await.is_none());
    }

    #[tokio::test]
    async fn confirmed_debit_marks_record_paid() {
        let bank = Arc::new(ScriptedBank {
            reply: Ok(RemoteStatus::ok(Amount::new(dec!(750)))),
        });
        let fx = fixture(vec![citizen(1)], bank).await;
        let (cert, key) = registered_payer(&fx, "CN=Citizen 1").await;

        fx.orchestrator
            .assess(TaxRecord::assessed("tax-1".into(), Amount::new(dec!(250))))
            .await;

        let settled = fx
            .orchestrator
            .pay_online(&"tax-1".into(), &cert, &key)
            .await
            .unwrap();
        assert!(settled.paid);
        assert!(settled.failure_reason.is_none());
        assert_eq!(fx.orchestrator.unpaid_count().await, 0);
    }

    #[tokio::test]
    async fn failed_debit_leaves_record_unpaid_with_reason() {
        let bank = Arc::new(ScriptedBank {
            reply: Ok(RemoteStatus::failed("insufficient funds")),
        });
        let fx = fixture(vec![citizen(1)], bank).await;
        let (cert, key) = registered_payer(&fx, "CN=Citizen 1").await;

        fx.orchestrator
            .assess(TaxRecord::assessed("tax-1".into(), Amount::new(dec!(250))))
            .await;

        let err = fx
            .orchestrator
            .pay_online(&"tax-1".into(), &cert, &key)
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::SettlementFailed { .. }));

        let record = fx.orchestrator.record(&"tax-1".into()).await.unwrap();
        assert!(!record.paid);
        assert_eq!(record.failure_reason.as_deref(), Some("insufficient funds"));
    }

    #[tokio::test]
    async fn unreachable_bank_leaves_record_unpaid() {
        let bank = Arc::new(ScriptedBank {
            reply: Err("connection refused".to_string()),
        });
        let fx = fixture(vec![citizen(1)], bank).await;
        let (cert, key) = registered_payer(&fx, "CN=Citizen 1").await;

        fx.orchestrator
            .assess(TaxRecord::assessed("tax-1".into(), Amount::new(dec!(250))))
            .await;

        let err = fx
            .orchestrator
            .pay_online(&"tax-1".into(), &cert, &key)
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::SettlementFailed { .. }));

        let record = fx.orchestrator.record(&"tax-1".into()).await.unwrap();
        assert!(!record.paid);
        assert!(record
            .failure_reason
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn concurrent_settlements_debit_the_bank_once() {
        let bank = Arc::new(CountingBank {
            debits: AtomicUsize::new(0),
        });
        let fx = fixture(vec![citizen(1)], bank.clone()).await;
        let (cert, key) = registered_payer(&fx, "CN=Citizen 1").await;

        fx.orchestrator
            .assess(TaxRecord::assessed("tax-1".into(), Amount::new(dec!(250))))
            .await;

        let attempt = |orchestrator: TaxOrchestrator, cert: Certificate, key: KeyPair| {
            tokio::spawn(async move { orchestrator.pay_online(&"tax-1".into(), &cert, &key).await })
        };
        let first = attempt(fx.orchestrator.clone(), cert.clone(), key.clone());
        let second = attempt(fx.orchestrator.clone(), cert, key);
        let outcomes = [first.await.unwrap(), second.await.unwrap()];

        // One bill, one charge: the loser observes the committed record.
        assert_eq!(bank.debits.load(Ordering::SeqCst), 1);
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(TaxError::AlreadyPaid { .. }))));

        let record = fx.orchestrator.record(&"tax-1".into()).await.unwrap();
        assert!(record.paid);
        assert!(record.failure_reason.is_none());
    }

    #[tokio::test]
    async fn paid_and_missing_records_are_rejected() {
        let bank = Arc::new(ScriptedBank {
            reply: Ok(RemoteStatus::ok(Amount::zero())),
        });
        let fx = fixture(vec![citizen(1)], bank).await;
        let (cert, key) = registered_payer(&fx, "CN=Citizen 1").await;

        let err = fx
            .orchestrator
            .pay_online(&"tax-1".into(), &cert, &key)
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::RecordNotFound { .. }));

        // Exempt records are born paid.
        fx.orchestrator
            .assess(TaxRecord::assessed("tax-1".into(), Amount::zero()))
            .await;
        let err = fx
            .orchestrator
            .pay_online(&"tax-1".into(), &cert, &key)
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::AlreadyPaid { .. }));
    }

    #[tokio::test]
    async fn certificate_of_another_taxpayer_cannot_settle() {
        let bank = Arc::new(ScriptedBank {
            reply: Ok(RemoteStatus::ok(Amount::zero())),
        });
        let fx = fixture(vec![citizen(1), citizen(2)], bank).await;
        let (cert2, key2) = registered_payer(&fx, "CN=Citizen 2").await;

        fx.orchestrator
            .assess(TaxRecord::assessed("tax-1".into(), Amount::new(dec!(250))))
            .await;

        let err = fx
            .orchestrator
            .pay_online(&"tax-1".into(), &cert2, &key2)
            .await
            .unwrap_err();
        assert!(matches!(err, TaxError::PayerMismatch { .. }));
    }

    #[tokio::test]
    async fn end_to_end_settlement_against_loopback_bank() {
        // Full federation wiring: registry backs the resolver, the bank
        // wraps the real ledger, the orchestrator ties them together.
        let trust = TrustStore::new();
        let root_dn = DistinguishedName::from("CN=Civitas Root");
        let root_key = KeyPair::generate();
        let root = Certificate::self_signed(root_dn.clone(), &root_key).unwrap();
        trust.add_anchor(root).await;

        let registry = LoopbackRegistry::new();
        registry.add_citizen(citizen(1)).await;

        let resolver = IdentityResolver::new(trust, Arc::new(registry.clone()));
        let ledger = LedgerEngine::new();
        let bank = LoopbackBank::new(resolver.clone(), ledger.clone());

        let office_key = KeyPair::generate();
        let office_cert = Certificate::issue(
            "CN=Tax Office".into(),
            office_key.public_key_hex(),
            root_dn.clone(),
            &root_key,
        )
        .unwrap();

        let orchestrator = TaxOrchestrator::new(
            Arc::new(registry),
            Arc::new(bank),
            resolver.clone(),
            SigningIdentity::new(office_cert, &office_key),
        );

        // The citizen registers with a trusted certificate and funds an
        // account large enough for any assessed liability (< 1000).
        let key = KeyPair::generate();
        let cert = Certificate::issue(
            "CN=Citizen 1".into(),
            key.public_key_hex(),
            root_dn,
            &root_key,
        )
        .unwrap();
        resolver.register_principal(&cert, Role::Citizen).await.unwrap();
        let account = ledger.open_account("tax-1".into()).await.unwrap();
        ledger
            .deposit(account.id, Amount::new(dec!(1000)))
            .await
            .unwrap();

        let summary = orchestrator.recompute_all().await.unwrap();
        assert_eq!(summary.assessed, 1);

        let record = orchestrator.record(&"tax-1".into()).await.unwrap();
        if record.paid {
            // Exempt draw: nothing to settle, balance untouched.
            assert!(record.is_exempt());
            assert_eq!(
                ledger.balance(account.id).await.unwrap(),
                Amount::new(dec!(1000))
            );
        } else {
            let settled = orchestrator
                .pay_online(&"tax-1".into(), &cert, &key)
                .await
                .unwrap();
            assert!(settled.paid);
            assert_eq!(
                ledger.balance(account.id).await.unwrap(),
                Amount::new(dec!(1000)) - record.amount_due
            );
            // The debit is on the books as a payment entry.
            let entries = ledger.entries(account.id).await.unwrap();
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[1].kind, civitas_ledger::EntryKind::Payment);
        }
    }
}
