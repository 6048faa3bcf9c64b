//! # Payment Ledger
//!
//! The single authoritative table mapping live payments to their amounts,
//! and the state transitions every issuer, mint and purse operation funnels
//! through.
//!
//! ## State Machine
//!
//! ```text
//!   mint / split / combine / claim / withdraw
//!                    │
//!               ┌────▼────┐
//!               │  Live   │  id present in the table, definite amount
//!               └────┬────┘
//!                    │ burn / claim / combine / split / deposit
//!               ┌────▼────┐
//!               │  Dead   │  id absent; terminal, never re-inserted
//!               └─────────┘
//! ```
//!
//! ## Atomicity
//!
//! Issuer operations resolve their eventual inputs first and only then call
//! into this module. Each call takes the table lock once and performs every
//! read, the conservation check and the commit while holding it, with no
//! suspension point in between. Two operations racing for the same payment
//! are therefore serialized: the loser finds the payment dead.
//!
//! ## Commit Points
//!
//! Everything before a commit is checked without mutating the table, so a
//! rejected operation leaves the ledger exactly as it was. Once a commit has
//! started, any failure is fatal. The ledger is quarantined (unless
//! configured otherwise) before the table lock is released. The shutdown
//! handler then runs with the lock free, so it may query or call back into
//! the issuer, and the caller receives [`LedgerError::Fatal`].

use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::amount::{self, shape, Amount, AmountShape, AssetKind, DisplayInfo};
use crate::brand::Brand;
use crate::config::LedgerConfig;
use crate::error::{BoxError, LedgerError};
use crate::metrics::LedgerMetrics;
use crate::payment::{make_payment, Payment, PaymentId};
use crate::purse::BalanceStore;

/// Callback invoked when a commit fails after mutation began.
pub(crate) type ShutdownHandler = Arc<dyn Fn(&LedgerError) -> Result<(), BoxError> + Send + Sync>;

type Table = HashMap<PaymentId, Amount>;

/// Everything a ledger is built from, besides its brand.
pub(crate) struct LedgerParts {
    pub alleged_name: String,
    pub asset_kind: AssetKind,
    pub display_info: DisplayInfo,
    pub config: LedgerConfig,
    pub shutdown: Option<ShutdownHandler>,
    pub metrics: Option<LedgerMetrics>,
}

pub(crate) struct PaymentLedger {
    brand: Brand,
    asset_kind: AssetKind,
    empty: Amount,
    config: LedgerConfig,
    shutdown: Option<ShutdownHandler>,
    metrics: Option<LedgerMetrics>,
    table: Mutex<Table>,
    quarantined: AtomicBool,
}

impl PaymentLedger {
    /// Builds the ledger and its brand together. The brand receives a weak
    /// reference to the ledger before the ledger exists; it becomes
    /// upgradeable only once this function returns.
    pub(crate) fn new(parts: LedgerParts) -> Arc<Self> {
        Arc::new_cyclic(|ledger| {
            let brand = Brand::new(&parts.alleged_name, parts.display_info, ledger.clone());
            let empty = amount::make_empty(&brand, parts.asset_kind);
            Self {
                brand,
                asset_kind: parts.asset_kind,
                empty,
                config: parts.config,
                shutdown: parts.shutdown,
                metrics: parts.metrics,
                table: Mutex::new(HashMap::new()),
                quarantined: AtomicBool::new(false),
            }
        })
    }

    pub(crate) fn brand(&self) -> &Brand {
        &self.brand
    }

    pub(crate) fn alleged_name(&self) -> &str {
        self.brand.alleged_name()
    }

    pub(crate) fn asset_kind(&self) -> AssetKind {
        self.asset_kind
    }

    pub(crate) fn empty_amount(&self) -> &Amount {
        &self.empty
    }

    pub(crate) fn is_quarantined(&self) -> bool {
        self.quarantined.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub(crate) fn is_live(&self, payment: &Payment) -> bool {
        self.table.lock().contains_key(&payment.id())
    }

    pub(crate) fn get_amount_of(&self, payment: &Payment) -> Result<Amount, LedgerError> {
        self.observe("get_amount_of", || {
            let table = self.lock_table()?;
            let balance = self.assert_live(&table, payment)?.clone();
            Ok(balance)
        })
    }

    // -----------------------------------------------------------------------
    // Issuer operations
    // -----------------------------------------------------------------------

    pub(crate) fn burn(
        &self,
        payment: &Payment,
        shape: Option<&AmountShape>,
    ) -> Result<Amount, LedgerError> {
        self.observe("burn", || {
            self.ensure_operational()?;
            let table = self.lock_table()?;
            let balance = self.assert_live(&table, payment)?.clone();
            shape::check(&balance, shape)?;

            self.commit("burn", table, |table| self.delete(table, payment))?;
            debug!(
                brand = %self.alleged_name(),
                payment = %payment.id(),
                amount = %balance,
                "burned payment"
            );
            Ok(balance)
        })
    }

    pub(crate) fn claim(
        &self,
        payment: &Payment,
        shape: Option<&AmountShape>,
    ) -> Result<Payment, LedgerError> {
        self.observe("claim", || {
            self.ensure_operational()?;
            let table = self.lock_table()?;
            let balance = self.assert_live(&table, payment)?.clone();
            shape::check(&balance, shape)?;

            let [fresh] = self.move_exact(table, "claim", &[payment.clone()], [balance])?;
            Ok(fresh)
        })
    }

    pub(crate) fn combine(
        &self,
        payments: &[Payment],
        total_shape: Option<&AmountShape>,
    ) -> Result<Payment, LedgerError> {
        self.observe("combine", || {
            self.ensure_operational()?;
            self.check_count(payments.len())?;
            self.assert_distinct(payments)?;
            let table = self.lock_table()?;
            let total = self.sum_live(&table, payments)?;
            shape::check(&total, total_shape)?;

            let [combined] = self.move_exact(table, "combine", payments, [total])?;
            Ok(combined)
        })
    }

    pub(crate) fn split(
        &self,
        payment: &Payment,
        amount_a: &Amount,
    ) -> Result<[Payment; 2], LedgerError> {
        self.observe("split", || {
            self.ensure_operational()?;
            let amount_a = amount::coerce(&self.brand, amount_a)?;
            let table = self.lock_table()?;
            let balance = self.assert_live(&table, payment)?;
            let amount_b = amount::subtract(balance, &amount_a)?;

            self.move_exact(table, "split", &[payment.clone()], [amount_a, amount_b])
        })
    }

    pub(crate) fn split_many(
        &self,
        payment: &Payment,
        amounts: &[Amount],
    ) -> Result<Vec<Payment>, LedgerError> {
        self.observe("split_many", || {
            self.ensure_operational()?;
            self.check_count(amounts.len())?;
            let amounts = amounts
                .iter()
                .map(|a| amount::coerce(&self.brand, a))
                .collect::<Result<Vec<_>, _>>()?;
            let table = self.lock_table()?;
            self.assert_live(&table, payment)?;

            self.move_assets(table, "split_many", &[payment.clone()], amounts)
        })
    }

    // -----------------------------------------------------------------------
    // Mint operation
    // -----------------------------------------------------------------------

    /// The only operation that adds value: no inputs are consumed and no
    /// prior total is consulted.
    pub(crate) fn mint_payment(&self, new_amount: &Amount) -> Result<Payment, LedgerError> {
        self.observe("mint_payment", || {
            self.ensure_operational()?;
            let new_amount = amount::coerce(&self.brand, new_amount)?;
            let payment = make_payment(self.alleged_name(), &self.brand);
            let table = self.lock_table()?;

            self.commit("mint_payment", table, |table| {
                self.init(table, &payment, new_amount.clone())
            })?;
            debug!(
                brand = %self.alleged_name(),
                payment = %payment.id(),
                amount = %new_amount,
                "minted payment"
            );
            Ok(payment)
        })
    }

    // -----------------------------------------------------------------------
    // Purse primitives
    // -----------------------------------------------------------------------

    /// Moves the whole balance of `payment` into a purse. The purse balance
    /// is read and written under the table lock, so concurrent deposits into
    /// one purse cannot lose updates.
    pub(crate) fn deposit(
        &self,
        store: &dyn BalanceStore,
        payment: &Payment,
        shape: Option<&AmountShape>,
    ) -> Result<Amount, LedgerError> {
        self.observe("deposit", || {
            self.ensure_operational()?;
            let table = self.lock_table()?;
            let src_balance = self.assert_live(&table, payment)?.clone();
            shape::check(&src_balance, shape)?;
            let current = store.current_amount();
            let new_purse_balance = amount::add(&current, &src_balance)?;

            self.commit("deposit", table, |table| {
                self.delete(table, payment)?;
                store.set_amount(new_purse_balance)?;
                Ok(())
            })?;
            debug!(
                brand = %self.alleged_name(),
                payment = %payment.id(),
                amount = %src_balance,
                "deposited payment into purse"
            );
            Ok(src_balance)
        })
    }

    /// Carves `amount` out of a purse into a fresh payment.
    pub(crate) fn withdraw(
        &self,
        store: &dyn BalanceStore,
        amount: &Amount,
    ) -> Result<Payment, LedgerError> {
        self.observe("withdraw", || {
            self.ensure_operational()?;
            let amount = amount::coerce(&self.brand, amount)?;
            let table = self.lock_table()?;
            let current = store.current_amount();
            if !amount::is_gte(&current, &amount)? {
                return Err(LedgerError::InsufficientBalance {
                    requested: amount.to_string(),
                    available: current.to_string(),
                });
            }
            let new_purse_balance = amount::subtract(&current, &amount)?;
            let payment = make_payment(self.alleged_name(), &self.brand);

            self.commit("withdraw", table, |table| {
                store.set_amount(new_purse_balance)?;
                self.init(table, &payment, amount.clone())
            })?;
            debug!(
                brand = %self.alleged_name(),
                payment = %payment.id(),
                amount = %amount,
                "withdrew payment from purse"
            );
            Ok(payment)
        })
    }

    // -----------------------------------------------------------------------
    // move_assets
    // -----------------------------------------------------------------------

    /// The atomic primitive behind claim, combine, split and split_many.
    ///
    /// Consumes every payment in `payments` and creates one new payment per
    /// entry of `new_amounts`, provided the totals on both sides are equal.
    /// All checks happen before the first deletion. Takes the table guard so
    /// the lock can be released before a fatal failure is escalated.
    fn move_assets(
        &self,
        table: MutexGuard<'_, Table>,
        op: &'static str,
        payments: &[Payment],
        new_amounts: Vec<Amount>,
    ) -> Result<Vec<Payment>, LedgerError> {
        self.check_count(payments.len())?;
        self.check_count(new_amounts.len())?;
        if payments.len() > 1 {
            self.assert_distinct(payments)?;
        }

        let total_in = self.sum_live(&table, payments)?;
        let total_out = new_amounts
            .iter()
            .try_fold(self.empty.clone(), |acc, a| amount::add(&acc, a))?;
        if !amount::is_equal(&total_in, &total_out)? {
            warn!(
                brand = %self.alleged_name(),
                op,
                inputs = %total_in,
                outputs = %total_out,
                "rejected non-conserving move"
            );
            return Err(LedgerError::Conservation {
                brand: self.alleged_name().to_string(),
                inputs: total_in.to_string(),
                outputs: total_out.to_string(),
            });
        }

        let created = self.commit(op, table, |table| {
            for payment in payments {
                self.delete(table, payment)?;
            }
            new_amounts
                .into_iter()
                .map(|new_amount| {
                    let fresh = make_payment(self.alleged_name(), &self.brand);
                    self.init(table, &fresh, new_amount)?;
                    Ok::<_, LedgerError>(fresh)
                })
                .collect::<Result<Vec<_>, _>>()
        })?;
        debug!(
            brand = %self.alleged_name(),
            op,
            consumed = payments.len(),
            created = created.len(),
            total = %total_in,
            "moved assets"
        );
        Ok(created)
    }

    /// [`move_assets`](Self::move_assets) for a statically known number of
    /// outputs.
    fn move_exact<const N: usize>(
        &self,
        table: MutexGuard<'_, Table>,
        op: &'static str,
        payments: &[Payment],
        new_amounts: [Amount; N],
    ) -> Result<[Payment; N], LedgerError> {
        let created = self.move_assets(table, op, payments, Vec::from(new_amounts))?;
        <[Payment; N]>::try_from(created).map_err(|created| {
            LedgerError::Invariant(format!(
                "{op} created {} payments, expected {N}",
                created.len()
            ))
        })
    }

    // -----------------------------------------------------------------------
    // Table helpers
    // -----------------------------------------------------------------------

    fn assert_live<'t>(&self, table: &'t Table, payment: &Payment) -> Result<&'t Amount, LedgerError> {
        table.get(&payment.id()).ok_or_else(|| LedgerError::NotLive {
            brand: self.alleged_name().to_string(),
            payment: payment.id(),
        })
    }

    fn assert_distinct(&self, payments: &[Payment]) -> Result<(), LedgerError> {
        let mut seen = HashSet::with_capacity(payments.len());
        for payment in payments {
            if !seen.insert(payment.id()) {
                warn!(
                    brand = %self.alleged_name(),
                    payment = %payment.id(),
                    "rejected aliased payments"
                );
                return Err(LedgerError::Aliased {
                    brand: self.alleged_name().to_string(),
                    payment: payment.id(),
                });
            }
        }
        Ok(())
    }

    fn sum_live(&self, table: &Table, payments: &[Payment]) -> Result<Amount, LedgerError> {
        payments.iter().try_fold(self.empty.clone(), |acc, payment| {
            let balance = self.assert_live(table, payment)?;
            Ok(amount::add(&acc, balance)?)
        })
    }

    fn check_count(&self, count: usize) -> Result<(), LedgerError> {
        let limit = self.config.max_payments_per_operation;
        if count > limit {
            return Err(LedgerError::TooManyPayments { count, limit });
        }
        Ok(())
    }

    fn delete(&self, table: &mut Table, payment: &Payment) -> Result<(), LedgerError> {
        table.remove(&payment.id()).map(drop).ok_or_else(|| {
            LedgerError::Invariant(format!("{} vanished during a commit", payment.id()))
        })
    }

    fn init(&self, table: &mut Table, payment: &Payment, amount: Amount) -> Result<(), LedgerError> {
        use std::collections::hash_map::Entry;

        match table.entry(payment.id()) {
            Entry::Occupied(_) => Err(LedgerError::Invariant(format!(
                "{} is already registered",
                payment.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(amount);
                Ok(())
            }
        }
    }

    fn track_live(&self, table: &Table) {
        if let Some(metrics) = &self.metrics {
            metrics.set_live_payments(self.alleged_name(), table.len());
        }
    }

    // -----------------------------------------------------------------------
    // Failure handling
    // -----------------------------------------------------------------------

    fn ensure_operational(&self) -> Result<(), LedgerError> {
        if self.is_quarantined() {
            return Err(LedgerError::Quarantined {
                brand: self.alleged_name().to_string(),
            });
        }
        Ok(())
    }

    /// Takes the table lock, refusing if the ledger was quarantined while
    /// this caller waited for it.
    fn lock_table(&self) -> Result<MutexGuard<'_, Table>, LedgerError> {
        let table = self.table.lock();
        self.ensure_operational()?;
        Ok(table)
    }

    /// Runs the mutating half of an operation and releases the table lock.
    ///
    /// On failure the quarantine flag and the live-payments gauge are set
    /// while the lock is still held, so no other caller can observe the
    /// damaged table as operational. The error is escalated only after the
    /// lock is released.
    fn commit<T>(
        &self,
        op: &'static str,
        mut table: MutexGuard<'_, Table>,
        apply: impl FnOnce(&mut Table) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let result = apply(&mut table);
        if result.is_err() && self.config.quarantine_on_fatal {
            self.quarantined.store(true, Ordering::SeqCst);
        }
        self.track_live(&table);
        drop(table);
        result.map_err(|err| self.fail(op, err))
    }

    /// Escalates a mid-commit failure. Called with the table lock released,
    /// so the shutdown handler may call back into this ledger.
    fn fail(&self, op: &'static str, err: LedgerError) -> LedgerError {
        error!(
            brand = %self.alleged_name(),
            op,
            error = %err,
            "commit failed after mutation began; ledger state is undefined"
        );
        if self.is_quarantined() {
            error!(brand = %self.alleged_name(), "ledger quarantined");
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_fatal(self.alleged_name());
        }

        let shutdown_error = self.shutdown.as_ref().and_then(|handler| {
            handler(&err).err().map(|handler_err| {
                error!(
                    brand = %self.alleged_name(),
                    error = %handler_err,
                    "shutdown handler failed"
                );
                handler_err.to_string()
            })
        });

        LedgerError::Fatal {
            brand: self.alleged_name().to_string(),
            source: Box::new(err),
            shutdown_error,
        }
    }

    /// Records the outcome of a public operation in metrics and logs.
    fn observe<T>(
        &self,
        op: &'static str,
        run: impl FnOnce() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let result = run();
        match &result {
            Ok(_) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_success(self.alleged_name(), op);
                }
            }
            Err(err) => {
                debug!(brand = %self.alleged_name(), op, kind = err.kind(), error = %err, "operation rejected");
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(self.alleged_name(), err.kind());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::AssetValue;
    use crate::purse::MemoryBalanceStore;

    fn ledger(kind: AssetKind) -> Arc<PaymentLedger> {
        PaymentLedger::new(LedgerParts {
            alleged_name: "moola".into(),
            asset_kind: kind,
            display_info: DisplayInfo::default().normalized(kind),
            config: LedgerConfig::default(),
            shutdown: None,
            metrics: None,
        })
    }

    fn nat(ledger: &PaymentLedger, n: u128) -> Amount {
        amount::make(ledger.brand(), n).unwrap()
    }

    #[test]
    fn mint_registers_a_live_payment() {
        let l = ledger(AssetKind::Nat);
        let p = l.mint_payment(&nat(&l, 10)).unwrap();
        assert!(l.is_live(&p));
        assert_eq!(l.get_amount_of(&p).unwrap(), nat(&l, 10));
    }

    #[test]
    fn move_assets_rejects_non_conserving_outputs_without_mutation() {
        let l = ledger(AssetKind::Nat);
        let p = l.mint_payment(&nat(&l, 10)).unwrap();
        let err = l
            .move_assets(l.table.lock(), "test", &[p.clone()], vec![nat(&l, 4), nat(&l, 5)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conservation { .. }));
        let table = l.table.lock();
        assert_eq!(table.get(&p.id()), Some(&nat(&l, 10)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn move_assets_rejects_aliases_before_summing() {
        let l = ledger(AssetKind::CopySet);
        let tickets = amount::make(l.brand(), AssetValue::set(["a"])).unwrap();
        let p = l.mint_payment(&tickets).unwrap();
        let err = l
            .move_assets(l.table.lock(), "test", &[p.clone(), p.clone()], vec![])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Aliased { .. }));
        assert!(l.is_live(&p));
    }

    #[test]
    fn move_assets_with_no_inputs_may_only_create_empty_payments() {
        let l = ledger(AssetKind::Nat);
        let created = l
            .move_assets(l.table.lock(), "test", &[], vec![l.empty_amount().clone()])
            .unwrap();
        assert_eq!(created.len(), 1);
        let err = l
            .move_assets(l.table.lock(), "test", &[], vec![nat(&l, 1)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conservation { .. }));
    }

    #[test]
    fn too_many_outputs_are_rejected_up_front() {
        let l = PaymentLedger::new(LedgerParts {
            alleged_name: "moola".into(),
            asset_kind: AssetKind::Nat,
            display_info: DisplayInfo::default(),
            config: LedgerConfig {
                max_payments_per_operation: 2,
                ..LedgerConfig::default()
            },
            shutdown: None,
            metrics: None,
        });
        let p = l.mint_payment(&nat(&l, 3)).unwrap();
        let err = l
            .split_many(&p, &[nat(&l, 1), nat(&l, 1), nat(&l, 1)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::TooManyPayments { count: 3, limit: 2 }));
        assert!(l.is_live(&p));
    }

    #[test]
    fn withdraw_checks_purse_balance() {
        let l = ledger(AssetKind::Nat);
        let store = MemoryBalanceStore::new(nat(&l, 5));
        let err = l.withdraw(&store, &nat(&l, 6)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(store.current_amount(), nat(&l, 5));

        let p = l.withdraw(&store, &nat(&l, 5)).unwrap();
        assert_eq!(l.get_amount_of(&p).unwrap(), nat(&l, 5));
        assert!(amount::is_empty(&store.current_amount()));
    }

    #[test]
    fn brand_is_wired_to_its_ledger() {
        let l = ledger(AssetKind::Nat);
        let issuer = crate::issuer::Issuer::new(Arc::clone(&l));
        assert!(l.brand().issued_by(&issuer));
        let other = ledger(AssetKind::Nat);
        assert!(!l.brand().issued_by(&crate::issuer::Issuer::new(other)));
    }
}
