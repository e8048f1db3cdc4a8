use chrono::{Duration, Utc};
use cucumber::{given, then, when};
use topup_engine::{
    db_types::{AccountId, DeclaredAmount, NewOrder, OrderId, OrderStatusType, Rupees},
    test_utils::scripted_gateway::attempt,
    AccountManagement,
    GatewayError,
    LedgerDatabase,
    RechargeError,
    TransitionOutcome,
};

use crate::cucumber::TopupWorld;

#[given(expr = "account '{word}' orders {word} for {string} rupees on the {word} plan, {int} minutes ago")]
async fn place_order(world: &mut TopupWorld, account: String, order: String, amount: String, plan: String, age: i64) {
    let created_at = Utc::now() - Duration::minutes(age);
    let order = NewOrder::new(account.into(), order.into(), DeclaredAmount(amount), &plan).with_created_at(created_at);
    world.db().insert_order(order).await.expect("Error inserting order");
}

#[given(expr = "the gateway reports {word} for order {word}")]
async fn gateway_reports(world: &mut TopupWorld, status: String, order: String) {
    let statuses = status.split(',').collect::<Vec<_>>();
    world.gateway().with_payments(&order, &statuses);
}

#[given(expr = "the gateway is down for order {word}")]
async fn gateway_down(world: &mut TopupWorld, order: String) {
    world.gateway().with_fetch_error(&order, GatewayError::Unavailable("connection refused".into()));
}

#[when(expr = "the gateway notifies {word} for order {word} of account '{word}'")]
async fn notify(world: &mut TopupWorld, status: String, order: String, account: String) {
    let result = world.api().process_payment_notification(&account.into(), &order.into(), attempt(&status)).await;
    world.last_result = Some(result);
}

#[when(expr = "the client verifies order {word} of account '{word}'")]
async fn verify(world: &mut TopupWorld, order: String, account: String) {
    let result = world.api().verify_order(&account.into(), &order.into()).await;
    world.last_result = Some(result);
}

#[when("the payment checker runs")]
async fn poll(world: &mut TopupWorld) {
    world.api().poll_pending_orders().await.expect("Error polling orders");
}

#[when("the daily deduction runs")]
async fn deduct(world: &mut TopupWorld) {
    world.system().deductions.run_daily_deduction().await.expect("Error running the daily deduction");
}

#[then(expr = "account '{word}' has a balance of {int} rupees")]
async fn check_balance(world: &mut TopupWorld, account: String, balance: i64) {
    let account = world.db().fetch_account(&AccountId::from(account)).await.expect("Error fetching account");
    let actual = account.map(|a| a.balance).unwrap_or_default();
    assert_eq!(actual, Rupees::from(balance), "Balance is incorrect");
}

#[then(expr = "order {word} of account '{word}' has status {word}")]
async fn check_status(world: &mut TopupWorld, order: String, account: String, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world
        .db()
        .fetch_order(&AccountId::from(account), &OrderId::from(order))
        .await
        .expect("Error fetching order")
        .expect("Order is not live");
    assert_eq!(order.status, expected, "Status is incorrect");
}

#[then(expr = "order {word} of account '{word}' is archived in the ledger")]
async fn check_archived(world: &mut TopupWorld, order: String, account: String) {
    let (account, order) = (AccountId::from(account), OrderId::from(order));
    let live = world.db().fetch_order(&account, &order).await.expect("Error fetching order");
    assert!(live.is_none(), "Order is still live");
    let entry = world.db().fetch_ledger_entry(&account, &order).await.expect("Error fetching ledger entry");
    assert!(entry.is_some(), "Order has no ledger entry");
}

#[then(expr = "the result is {word}")]
async fn check_result(world: &mut TopupWorld, expected: String) {
    let result = world.last_result.as_ref().expect("No result was recorded");
    let matched = match expected.as_str() {
        "credited" => matches!(result, Ok(TransitionOutcome::Credited(_))),
        "already_processed" => matches!(result, Ok(TransitionOutcome::AlreadyProcessed)),
        "ignored" => matches!(result, Ok(TransitionOutcome::Ignored)),
        "pending" => matches!(result, Ok(TransitionOutcome::StatusChanged { status: OrderStatusType::Pending })),
        "terminal" => matches!(result, Err(RechargeError::TerminalPayment { .. })),
        "manual_review" => matches!(result, Err(RechargeError::RequiresManualReview(_))),
        "validation_error" => matches!(result, Err(RechargeError::Validation(_))),
        "not_found" => matches!(result, Err(RechargeError::OrderNotFound(_, _))),
        other => panic!("Unknown result type: {other}"),
    };
    assert!(matched, "Expected {expected}, got {result:?}");
}
