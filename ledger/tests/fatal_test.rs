//! Integration tests for failures after the commit point: shutdown handler
//! invocation, error chaining, quarantine, and the metrics that record them.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::Duration;

use tessera_ledger::{
    amount, Amount, AssetKind, BalanceStore, BalanceStoreError, Issuer, IssuerKit,
    IssuerKitBuilder, LedgerConfig, LedgerError, LedgerMetrics, Mint, Payment,
};

/// A balance store whose writes can be made to fail on demand.
struct FlakyStore {
    balance: Mutex<Amount>,
    broken: Arc<AtomicBool>,
}

impl FlakyStore {
    fn new(kit: &IssuerKit, broken: Arc<AtomicBool>) -> Self {
        Self {
            balance: Mutex::new(amount::make_empty(&kit.brand, AssetKind::Nat)),
            broken,
        }
    }
}

impl BalanceStore for FlakyStore {
    fn current_amount(&self) -> Amount {
        self.balance.lock().clone()
    }

    fn set_amount(&self, amount: Amount) -> Result<(), BalanceStoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(BalanceStoreError("disk full".into()));
        }
        *self.balance.lock() = amount;
        Ok(())
    }
}

/// Helper: a Nat amount of the kit's brand.
fn nat(kit: &IssuerKit, n: u64) -> Amount {
    amount::make(&kit.brand, n).unwrap()
}

// ---------------------------------------------------------------------------
// Shutdown Handler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_store_escalates_to_fatal_and_runs_the_handler() {
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reasons);
    let kit = IssuerKitBuilder::new("moola")
        .shutdown_with_failure(move |reason| {
            seen.lock().push(reason.to_string());
            Ok(())
        })
        .build()
        .unwrap();

    let broken = Arc::new(AtomicBool::new(false));
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::clone(&broken)))
        .unwrap();
    let p = kit.mint.mint_payment(&nat(&kit, 10)).unwrap();

    broken.store(true, Ordering::SeqCst);
    let err = purse.deposit(&p, None).unwrap_err();
    assert!(err.is_fatal());
    match &err {
        LedgerError::Fatal {
            source,
            shutdown_error,
            ..
        } => {
            assert!(matches!(**source, LedgerError::BalanceStore(_)));
            assert!(shutdown_error.is_none());
        }
        other => panic!("expected a fatal error, got {other:?}"),
    }
    assert_eq!(
        reasons.lock().as_slice(),
        ["purse balance store failure: disk full".to_string()]
    );
    assert!(kit.issuer.is_quarantined());
}

#[test]
fn handler_failure_is_chained_to_the_original_error() {
    let kit = IssuerKitBuilder::new("moola")
        .shutdown_with_failure(|_| Err("could not halt".into()))
        .build()
        .unwrap();
    let broken = Arc::new(AtomicBool::new(false));
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::clone(&broken)))
        .unwrap();
    let p = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();

    broken.store(true, Ordering::SeqCst);
    let err = purse.deposit(&p, None).unwrap_err();
    let LedgerError::Fatal {
        source,
        shutdown_error,
        ..
    } = err
    else {
        panic!("expected a fatal error");
    };
    assert_eq!(shutdown_error.as_deref(), Some("could not halt"));
    assert_eq!(source.kind(), "balance_store");
}

#[test]
fn withdraw_with_failing_store_is_fatal() {
    let kit = IssuerKitBuilder::new("moola").build().unwrap();
    let broken = Arc::new(AtomicBool::new(false));
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::clone(&broken)))
        .unwrap();
    purse
        .deposit(&kit.mint.mint_payment(&nat(&kit, 5)).unwrap(), None)
        .unwrap();

    broken.store(true, Ordering::SeqCst);
    let err = purse.withdraw(&nat(&kit, 2)).unwrap_err();
    assert_eq!(err.kind(), "fatal");
    assert_eq!(purse.current_amount(), nat(&kit, 5));
}

#[test]
fn rejected_operations_never_reach_the_store() {
    let kit = IssuerKitBuilder::new("moola").build().unwrap();
    let broken = Arc::new(AtomicBool::new(true));
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::clone(&broken)))
        .unwrap();

    let err = purse.withdraw(&nat(&kit, 1)).unwrap_err();
    assert_eq!(err.kind(), "insufficient_balance");
    assert!(!kit.issuer.is_quarantined());
}

// ---------------------------------------------------------------------------
// Quarantine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn quarantined_ledger_refuses_every_operation() {
    let kit = IssuerKitBuilder::new("moola").build().unwrap();
    let survivor = kit.mint.mint_payment(&nat(&kit, 3)).unwrap();
    let broken = Arc::new(AtomicBool::new(true));
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, broken))
        .unwrap();
    let doomed = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();
    assert!(purse.deposit(&doomed, None).unwrap_err().is_fatal());

    let quarantined = |err: LedgerError| matches!(err, LedgerError::Quarantined { .. });
    assert!(quarantined(kit.mint.mint_payment(&nat(&kit, 1)).unwrap_err()));
    assert!(quarantined(kit.issuer.get_amount_of(&survivor).await.unwrap_err()));
    assert!(quarantined(kit.issuer.burn(&survivor, None).await.unwrap_err()));
    assert!(quarantined(kit.issuer.claim(&survivor, None).await.unwrap_err()));
    assert!(quarantined(
        kit.issuer.split(&survivor, &nat(&kit, 1)).await.unwrap_err()
    ));
    assert!(quarantined(kit.issuer.make_empty_purse().withdraw(&nat(&kit, 0)).unwrap_err()));

    // Liveness stays observable.
    assert!(kit.issuer.is_live(&survivor).await);
}

#[test]
fn quarantine_can_be_disabled() {
    let kit = IssuerKitBuilder::new("moola")
        .config(LedgerConfig {
            quarantine_on_fatal: false,
            ..LedgerConfig::default()
        })
        .build()
        .unwrap();
    let broken = Arc::new(AtomicBool::new(true));
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, broken))
        .unwrap();
    let p = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();
    assert!(purse.deposit(&p, None).unwrap_err().is_fatal());

    assert!(!kit.issuer.is_quarantined());
    assert!(kit.mint.mint_payment(&nat(&kit, 1)).is_ok());
}

#[test]
fn reentrant_handler_sees_a_quarantined_ledger() {
    let mint_slot: Arc<OnceLock<Mint>> = Arc::new(OnceLock::new());
    let reentry = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&mint_slot);
    let observed = Arc::clone(&reentry);
    let kit = IssuerKitBuilder::new("moola")
        .shutdown_with_failure(move |_| {
            if let Some(mint) = slot.get() {
                let brand = mint.issuer().brand().clone();
                let one = amount::make(&brand, 1u64)?;
                let outcome = mint.mint_payment(&one).map(drop).map_err(|e| e.kind());
                *observed.lock() = Some(outcome);
            }
            Ok(())
        })
        .build()
        .unwrap();
    assert!(mint_slot.set(kit.mint.clone()).is_ok());

    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::new(AtomicBool::new(true))))
        .unwrap();
    let p = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();
    assert!(purse.deposit(&p, None).unwrap_err().is_fatal());
    assert_eq!(*reentry.lock(), Some(Err("quarantined")));
}

#[test]
fn handler_can_query_liveness_while_the_ledger_fails() {
    let watched: Arc<OnceLock<(Issuer, Payment, Payment)>> = Arc::new(OnceLock::new());
    let answers = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&watched);
    let observed = Arc::clone(&answers);
    let kit = IssuerKitBuilder::new("moola")
        .shutdown_with_failure(move |_| {
            if let Some((issuer, survivor, doomed)) = slot.get() {
                let survivor_live = futures::executor::block_on(issuer.is_live(survivor));
                let doomed_live = futures::executor::block_on(issuer.is_live(doomed));
                *observed.lock() = Some((survivor_live, doomed_live));
            }
            Ok(())
        })
        .build()
        .unwrap();

    let survivor = kit.mint.mint_payment(&nat(&kit, 3)).unwrap();
    let doomed = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();
    assert!(watched
        .set((kit.issuer.clone(), survivor, doomed.clone()))
        .is_ok());
    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::new(AtomicBool::new(true))))
        .unwrap();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(purse.deposit(&doomed, None));
    });
    let outcome = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("deposit blocked while the shutdown handler queried the issuer");
    assert!(outcome.unwrap_err().is_fatal());
    assert_eq!(*answers.lock(), Some((true, false)));
}

#[test]
fn handler_can_call_back_when_quarantine_is_disabled() {
    let mint_slot: Arc<OnceLock<Mint>> = Arc::new(OnceLock::new());
    let reentry = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&mint_slot);
    let observed = Arc::clone(&reentry);
    let kit = IssuerKitBuilder::new("moola")
        .config(LedgerConfig {
            quarantine_on_fatal: false,
            ..LedgerConfig::default()
        })
        .shutdown_with_failure(move |_| {
            if let Some(mint) = slot.get() {
                let one = amount::make(mint.issuer().brand(), 1u64)?;
                *observed.lock() = Some(mint.mint_payment(&one).is_ok());
            }
            Ok(())
        })
        .build()
        .unwrap();
    assert!(mint_slot.set(kit.mint.clone()).is_ok());

    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::new(AtomicBool::new(true))))
        .unwrap();
    let p = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(purse.deposit(&p, None).map(drop));
    });
    let outcome = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("deposit blocked while the shutdown handler minted");
    assert!(outcome.unwrap_err().is_fatal());
    assert_eq!(*reentry.lock(), Some(true));
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_track_operations_failures_and_fatalities() {
    let metrics = LedgerMetrics::new().unwrap();
    let kit = IssuerKitBuilder::new("moola")
        .metrics(metrics.clone())
        .build()
        .unwrap();

    let p = kit.mint.mint_payment(&nat(&kit, 10)).unwrap();
    let (a, _b) = kit.issuer.split(&p, &nat(&kit, 4)).await.unwrap();
    assert!(kit.issuer.burn(&p, None).await.is_err());
    kit.issuer.burn(&a, None).await.unwrap();
    let text = metrics.encode().unwrap();
    assert!(text.contains("tessera_ledger_live_payments{brand=\"moola\"} 1"));

    let purse = kit
        .issuer
        .make_purse_with_store(FlakyStore::new(&kit, Arc::new(AtomicBool::new(true))))
        .unwrap();
    let q = kit.mint.mint_payment(&nat(&kit, 1)).unwrap();
    let text = metrics.encode().unwrap();
    assert!(text.contains("tessera_ledger_live_payments{brand=\"moola\"} 2"));
    assert!(purse.deposit(&q, None).is_err());

    // The failed commit had already consumed `q`.
    let text = metrics.encode().unwrap();
    assert!(text.contains("tessera_ledger_live_payments{brand=\"moola\"} 1"));
    assert!(text.contains("tessera_ledger_operations_total{brand=\"moola\",op=\"mint_payment\"} 2"));
    assert!(text.contains("tessera_ledger_operations_total{brand=\"moola\",op=\"split\"} 1"));
    assert!(text.contains("tessera_ledger_failures_total{brand=\"moola\",kind=\"liveness\"} 1"));
    assert!(text.contains("tessera_ledger_failures_total{brand=\"moola\",kind=\"fatal\"} 1"));
    assert!(text.contains("tessera_ledger_fatal_failures_total{brand=\"moola\"} 1"));
}
