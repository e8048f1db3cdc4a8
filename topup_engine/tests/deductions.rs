use log::*;
use serde_json::json;
use topup_engine::{
    db_types::{AccountId, NewOrder, Rupees, DAILY_CHARGE},
    events::EventProducers,
    test_utils::prepare_env::{drop_database, new_test_database},
    AccountManagement,
    DeductionApi,
    DeductionPolicy,
    LedgerDatabase,
    RechargeError,
    ReconcilePolicy,
    ReconciliationApi,
    SqliteDatabase,
};

async fn setup() -> SqliteDatabase {
    let (_url, db) = new_test_database(5).await;
    db
}

async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    drop_database(&url).await;
}

/// Gives the account a balance by reconciling an order for `amount`.
async fn fund(db: &SqliteDatabase, account: &str, amount: &str) {
    let order_id = format!("FUND-{account}");
    let order = NewOrder::new(account.into(), order_id.as_str().into(), amount.into(), "monthly");
    db.insert_order(order).await.expect("Error inserting order");
    let api = ReconciliationApi::new(db.clone(), ReconcilePolicy::default(), EventProducers::default());
    let outcome = api.reconcile(&account.into(), &order_id.into(), &json!({})).await.expect("Error funding account");
    assert!(outcome.is_reconciled());
}

async fn balance(db: &SqliteDatabase, account: &str) -> Rupees {
    db.fetch_account(&account.into()).await.unwrap().map(|a| a.balance).unwrap_or_default()
}

#[tokio::test]
async fn accounts_that_cannot_pay_are_skipped() {
    let db = setup().await;
    fund(&db, "9990000001", "100").await;
    fund(&db, "9990000002", "10").await;
    fund(&db, "9990000003", "12").await;
    let api = DeductionApi::new(db.clone(), DeductionPolicy::default());
    let summary = api.run_daily_deduction().await.unwrap();
    assert_eq!(summary.accounts_scanned, 3);
    assert_eq!(summary.accounts_debited, 2);
    assert_eq!(summary.total_debited, Rupees::from(24));
    assert_eq!(balance(&db, "9990000001").await, Rupees::from(88));
    assert_eq!(balance(&db, "9990000002").await, Rupees::from(10));
    assert_eq!(balance(&db, "9990000003").await, Rupees::from(0));

    let skipped = db.fetch_account(&"9990000002".into()).await.unwrap().unwrap();
    assert!(skipped.last_deduction_at.is_none());
    assert!(db.fetch_deductions(&"9990000002".into()).await.unwrap().is_empty());

    let entries = db.fetch_deductions(&AccountId::from("9990000001")).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, Rupees::from(12));
    assert_eq!(entries[0].previous_balance, Rupees::from(100));
    assert_eq!(entries[0].new_balance, Rupees::from(88));
    assert_eq!(entries[0].kind, DAILY_CHARGE);
    tear_down(db).await;
}

#[tokio::test]
async fn balances_never_go_negative() {
    let db = setup().await;
    fund(&db, "9990000004", "30").await;
    let api = DeductionApi::new(db.clone(), DeductionPolicy::default());
    for _ in 0..4 {
        api.run_daily_deduction().await.unwrap();
    }
    assert_eq!(balance(&db, "9990000004").await, Rupees::from(6));
    assert_eq!(db.fetch_deductions(&"9990000004".into()).await.unwrap().len(), 2);
    tear_down(db).await;
}

#[tokio::test]
async fn an_empty_ledger_is_fine() {
    let db = setup().await;
    let api = DeductionApi::new(db.clone(), DeductionPolicy::default());
    let summary = api.run_daily_deduction().await.unwrap();
    assert_eq!(summary.accounts_scanned, 0);
    assert_eq!(summary.total_debited, Rupees::from(0));
    tear_down(db).await;
}

#[tokio::test]
async fn non_positive_fees_are_refused() {
    let db = setup().await;
    let policy = DeductionPolicy { amount: Rupees::from(0), ..Default::default() };
    let api = DeductionApi::new(db.clone(), policy);
    let err = api.run_daily_deduction().await.unwrap_err();
    assert!(matches!(err, RechargeError::Validation(_)));
    tear_down(db).await;
}
