//! The single place where a confirmed payment turns into balance.
use std::{fmt::Debug, time::Duration};

use backon::Retryable;
use chrono::Utc;
use log::*;
use serde_json::Value;

use crate::{
    db_types::{AccountId, Credit, Order, OrderAnnotation, OrderId, OrderStatusType},
    events::{EventProducers, OrderReconciledEvent, ReviewRequiredEvent},
    helpers::conflict_backoff,
    topup_api::{errors::RechargeError, policy::ReconcilePolicy},
    traits::{LedgerDatabase, ReconcileOutcome},
};

/// `ReconciliationApi` applies gateway-confirmed payments to the ledger, exactly once per order.
///
/// Callers must already have seen the gateway report `SUCCESS` for the order. The API never talks to the gateway.
pub struct ReconciliationApi<B> {
    db: B,
    policy: ReconcilePolicy,
    producers: EventProducers,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.policy)
    }
}

impl<B: Clone> Clone for ReconciliationApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), policy: self.policy.clone(), producers: self.producers.clone() }
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, policy: ReconcilePolicy, producers: EventProducers) -> Self {
        Self { db, policy, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn policy(&self) -> &ReconcilePolicy {
        &self.policy
    }
}

impl<B> ReconciliationApi<B>
where B: LedgerDatabase
{
    /// Credits the order's amount (plus any plan bonus) to the account, writes the ledger entry and retires the
    /// live order, all in one transaction.
    ///
    /// * If the order is no longer live, [`ReconcileOutcome::AlreadyProcessed`] is returned and nothing changes.
    /// * Transactions that lose a race with a concurrent writer are retried with exponential backoff. If every retry
    ///   loses, the order keeps its status, the failure is noted in `last_error` and [`RechargeError::Conflict`] is
    ///   returned, so that a driver can try again later.
    /// * Any other failure marks the order as `ReconcileFailed` (best effort) and raises a review event. Such orders
    ///   are refused with [`RechargeError::RequiresManualReview`] until an operator releases them.
    pub async fn reconcile(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        payment_details: &Value,
    ) -> Result<ReconcileOutcome, RechargeError> {
        let result = (|| self.try_reconcile(account_id, order_id, payment_details))
            .retry(conflict_backoff(self.policy.max_retries))
            .when(|e: &RechargeError| matches!(e, RechargeError::Conflict(_)))
            .notify(|e: &RechargeError, delay: Duration| {
                debug!("💸️ Reconciling {order_id} lost a race. Retrying in {delay:?}. {e}")
            })
            .await;
        match result {
            Ok(ReconcileOutcome::Reconciled(entry)) => {
                info!(
                    "💸️ Order {order_id} credited {} (+{} bonus) to account {account_id}",
                    entry.amount, entry.bonus
                );
                self.producers.order_reconciled(OrderReconciledEvent::new(entry.clone())).await;
                Ok(ReconcileOutcome::Reconciled(entry))
            },
            Ok(ReconcileOutcome::AlreadyProcessed) => {
                debug!("💸️ Order {order_id} for {account_id} was already processed");
                Ok(ReconcileOutcome::AlreadyProcessed)
            },
            Err(RechargeError::Conflict(reason)) => {
                warn!("💸️ Gave up reconciling {order_id} after {} retries. {reason}", self.policy.max_retries);
                let note = format!("Reconciliation kept conflicting with other writers. {reason}");
                let annotation = OrderAnnotation::default().with_error(note).with_processed_at(Utc::now());
                self.annotate_best_effort(account_id, order_id, annotation).await;
                Err(RechargeError::Conflict(reason))
            },
            Err(RechargeError::RequiresManualReview(id)) => {
                warn!("💸️ Order {id} for {account_id} is waiting for manual review. Not crediting it");
                Err(RechargeError::RequiresManualReview(id))
            },
            Err(RechargeError::Validation(reason)) => {
                error!("💸️ Confirmed payment for {order_id} ({account_id}) cannot be credited. {reason}");
                self.mark_for_review(account_id, order_id, &reason).await;
                Err(RechargeError::Validation(reason))
            },
            Err(e) => {
                let reason = e.to_string();
                error!("💸️ Confirmed payment for {order_id} ({account_id}) could not be written to the ledger. {reason}");
                self.mark_for_review(account_id, order_id, &reason).await;
                Err(RechargeError::InternalProcessing { order_id: order_id.clone(), reason })
            },
        }
    }

    async fn try_reconcile(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        payment_details: &Value,
    ) -> Result<ReconcileOutcome, RechargeError> {
        let bonuses = &self.policy.plan_bonuses;
        self.db
            .reconcile_order(account_id, order_id, payment_details, |_account, order: &Order| {
                if order.status == OrderStatusType::ReconcileFailed {
                    return Err(RechargeError::RequiresManualReview(order.order_id.clone()));
                }
                let amount = order.amount.to_rupees().map_err(RechargeError::Validation)?;
                let bonus = bonuses.bonus_for(&order.plan);
                Ok(Credit { amount, bonus })
            })
            .await
    }

    /// Durably flags the order for an operator. This is a separate write, outside the failed transaction. If it fails
    /// too, the failure is logged and swallowed.
    async fn mark_for_review(&self, account_id: &AccountId, order_id: &OrderId, reason: &str) {
        let status = OrderStatusType::ReconcileFailed;
        let annotation = OrderAnnotation::status(status).with_error(reason).with_processed_at(Utc::now());
        self.annotate_best_effort(account_id, order_id, annotation).await;
        let event = ReviewRequiredEvent::new(account_id.clone(), order_id.clone(), status, reason.to_string());
        self.producers.review_required(event).await;
    }

    async fn annotate_best_effort(&self, account_id: &AccountId, order_id: &OrderId, annotation: OrderAnnotation) {
        match self.db.annotate_order(account_id, order_id, annotation).await {
            Ok(true) => trace!("💸️ Order {order_id} annotated"),
            Ok(false) => warn!("💸️ Order {order_id} for {account_id} is not live, so it could not be annotated"),
            Err(e) => error!("💸️ Failed to annotate order {order_id} for {account_id}. {e}"),
        }
    }

    /// Puts an order that is waiting for review back into the `Pending` state, so that the drivers pick it up again.
    /// Only call this once the cause of the failure has been fixed.
    pub async fn release_for_review(&self, account_id: &AccountId, order_id: &OrderId) -> Result<Order, RechargeError> {
        let order = self
            .db
            .fetch_order(account_id, order_id)
            .await?
            .ok_or_else(|| RechargeError::OrderNotFound(account_id.clone(), order_id.clone()))?;
        if !order.status.requires_review() {
            return Err(RechargeError::Validation(format!(
                "Order {order_id} is {}, and is not waiting for review",
                order.status
            )));
        }
        let note = format!("Released from {} after manual review", order.status);
        if !self.db.release_order(account_id, order_id, &note).await? {
            return Err(RechargeError::OrderNotFound(account_id.clone(), order_id.clone()));
        }
        info!("💸️ Order {order_id} for {account_id} released from {} to Pending", order.status);
        self.db
            .fetch_order(account_id, order_id)
            .await?
            .ok_or_else(|| RechargeError::OrderNotFound(account_id.clone(), order_id.clone()))
    }
}
