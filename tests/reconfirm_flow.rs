mod common;

use common::Harness;
use sol_deposit_watcher::{
    core::{
        task::{ReconfirmReport, ScanOutcome, TaskReport, WatchTask},
        types::{DepositRecord, UpchainStatus},
    },
    error::WatchError,
};

const DEST: &str = "DestWallet111";

/// Scan `(1000, tip]` with a single matching transfer at `height`
async fn matched_at(h: &Harness, height: u64, tip: u64) {
    h.chain.set_tip(1000);
    h.scanner().scan("SOL").await.unwrap();

    h.deposits
        .insert_expectation(&DepositRecord::expect("order-1", "SOL", DEST, 2_000))
        .unwrap();
    h.chain.add_transfer(height, "sig-1", DEST, 2_000);
    h.chain.set_tip(tip);
    let outcome = h.scanner().scan("SOL").await.unwrap();
    assert!(matches!(outcome, ScanOutcome::Scanned { matched: 1, .. }));
}

#[tokio::test]
async fn waiting_deposit_is_promoted_once_deep_enough() {
    let h = Harness::new(3, 1000);
    matched_at(&h, 1003, 1005).await;

    let record = h.deposits.get("SOL", "order-1").unwrap().unwrap();
    assert_eq!(record.current_confirm, 2);
    assert_eq!(record.upchain_status, Some(UpchainStatus::WaitingConfirm));

    h.chain.set_tip(1006);
    let report = h.promoter().reconfirm("SOL").await.unwrap();

    assert_eq!(
        report,
        ReconfirmReport {
            tip: 1006,
            checked: 1,
            promoted: 1,
            ..Default::default()
        }
    );
    let record = h.deposits.get("SOL", "order-1").unwrap().unwrap();
    assert_eq!(record.current_confirm, 3);
    assert!(record.is_success());
    assert!(record.upchain_success_at.is_some());

    // Terminal: nothing left to look at
    let again = h.promoter().reconfirm("SOL").await.unwrap();
    assert_eq!(again.checked, 0);
}

#[tokio::test]
async fn shallow_deposit_only_has_its_count_refreshed() {
    let h = Harness::new(10, 1000);
    matched_at(&h, 1005, 1007).await;

    h.chain.set_tip(1010);
    let report = h.promoter().reconfirm("SOL").await.unwrap();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.promoted, 0);
    let record = h.deposits.get("SOL", "order-1").unwrap().unwrap();
    assert_eq!(record.current_confirm, 5);
    assert_eq!(record.upchain_status, Some(UpchainStatus::WaitingConfirm));
    assert!(record.upchain_success_at.is_none());
}

#[tokio::test]
async fn transaction_unknown_to_node_is_left_unchanged() {
    let h = Harness::new(10, 1000);
    matched_at(&h, 1005, 1007).await;
    let before = h.deposits.get("SOL", "order-1").unwrap().unwrap();

    h.chain.forget_transaction("sig-1");
    h.chain.set_tip(1020);
    let report = h.promoter().reconfirm("SOL").await.unwrap();

    assert_eq!(report.missing, 1);
    assert_eq!(report.failed, 0);
    let after = h.deposits.get("SOL", "order-1").unwrap().unwrap();
    assert_eq!(after.current_confirm, before.current_confirm);
    assert_eq!(after.upchain_status, Some(UpchainStatus::WaitingConfirm));
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn broken_record_does_not_stop_the_pass() {
    let h = Harness::new(3, 1000);
    matched_at(&h, 1003, 1004).await;

    let mut broken = DepositRecord::expect("order-2", "SOL", "OtherDest", 1);
    broken.upchain_status = Some(UpchainStatus::WaitingConfirm);
    h.deposits.persist(&broken).unwrap();

    h.chain.set_tip(1010);
    let report = h.promoter().reconfirm("SOL").await.unwrap();

    assert_eq!(report.checked, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.promoted, 1);
    assert!(h.deposits.get("SOL", "order-1").unwrap().unwrap().is_success());
}

#[tokio::test]
async fn unmatched_expectations_are_not_reconfirmed() {
    let h = Harness::new(3, 1000);
    h.deposits
        .insert_expectation(&DepositRecord::expect("order-1", "SOL", DEST, 5))
        .unwrap();

    let report = h.promoter().reconfirm("SOL").await.unwrap();

    assert_eq!(report.checked, 0);
    let record = h.deposits.get("SOL", "order-1").unwrap().unwrap();
    assert!(record.upchain_status.is_none());
}

#[tokio::test]
async fn unknown_currency_is_config_missing() {
    let h = Harness::new(3, 1000);
    let err = h.promoter().reconfirm("BTC").await.unwrap_err();
    assert!(matches!(err, WatchError::ConfigMissing(_)));
}

#[tokio::test]
async fn run_once_wraps_reconfirm_report() {
    let h = Harness::new(3, 1000);
    let promoter = h.promoter();

    assert_eq!(promoter.name(), "reconfirm");
    let report = promoter.run_once("SOL").await.unwrap();
    assert_eq!(
        report,
        TaskReport::Reconfirm(ReconfirmReport {
            tip: 1000,
            ..Default::default()
        })
    );
}

#[tokio::test]
async fn shutdown_stops_reconfirmation_before_the_next_record() {
    let h = Harness::new(3, 1000);
    matched_at(&h, 1003, 1005).await;
    let before = h.deposits.get("SOL", "order-1").unwrap().unwrap();

    let (tx, rx) = tokio::sync::watch::channel(false);
    let promoter = h.promoter().with_shutdown(rx);
    tx.send(true).unwrap();

    h.chain.set_tip(1010);
    let report = promoter.reconfirm("SOL").await.unwrap();

    assert_eq!(
        report,
        ReconfirmReport {
            tip: 1010,
            interrupted: true,
            ..Default::default()
        }
    );
    assert!(TaskReport::Reconfirm(report).to_string().ends_with("(interrupted)"));
    let after = h.deposits.get("SOL", "order-1").unwrap().unwrap();
    assert_eq!(after.current_confirm, before.current_confirm);
    assert_eq!(after.upchain_status, Some(UpchainStatus::WaitingConfirm));

    // A fresh pass without the flag picks the record up again
    let report = h.promoter().reconfirm("SOL").await.unwrap();
    assert_eq!(report.promoted, 1);
    assert!(!report.interrupted);
}
