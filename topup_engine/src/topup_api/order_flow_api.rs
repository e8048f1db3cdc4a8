use std::{fmt::Debug, future::Future};

use chrono::Utc;
use futures_util::{stream, StreamExt};
use log::*;
use serde_json::Value;
use topup_common::helpers::is_blank;

use crate::{
    db_types::{AccountId, NewOrder, Order, OrderAnnotation, OrderId, OrderStatusType},
    events::{EventProducers, ReviewRequiredEvent},
    order_state::{next_transition, Transition},
    topup_api::{
        api_objects::{PollSummary, TransitionOutcome},
        errors::RechargeError,
        policy::{PollPolicy, ReconcilePolicy},
        reconciliation_api::ReconciliationApi,
    },
    traits::{GatewayError, GatewayOrderRequest, LedgerDatabase, PaymentAttempt, PaymentGateway, ReconcileOutcome},
};

/// `OrderFlowApi` is the primary API for handling order and payment flows.
///
/// It owns the three reconciliation drivers:
/// * [`Self::process_payment_notification`] for payment attempts pushed to us by the gateway,
/// * [`Self::poll_pending_orders`] for the periodic sweep over orders nobody has told us about, and
/// * [`Self::verify_order`] for clients asking about a single order.
///
/// The drivers do not coordinate with each other. They are all safe to run concurrently, because every balance
/// change goes through [`ReconciliationApi::reconcile`].
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    reconciler: ReconciliationApi<B>,
    policy: PollPolicy,
    producers: EventProducers,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?})", self.policy)
    }
}

impl<B: Clone, G> OrderFlowApi<B, G> {
    pub fn new(
        db: B,
        gateway: G,
        reconcile_policy: ReconcilePolicy,
        policy: PollPolicy,
        producers: EventProducers,
    ) -> Self {
        let reconciler = ReconciliationApi::new(db.clone(), reconcile_policy, producers.clone());
        Self { db, gateway, reconciler, policy, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn reconciler(&self) -> &ReconciliationApi<B> {
        &self.reconciler
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: LedgerDatabase,
    G: PaymentGateway,
{
    /// Writes a new `Initiated` order and opens the matching gateway order. The gateway's session payload is returned.
    ///
    /// The amount is checked before anything is written. If the gateway call fails, the order is removed again (best
    /// effort) and the gateway error is returned.
    pub async fn create_order(&self, order: NewOrder, return_url: String) -> Result<Value, RechargeError> {
        let amount = order.amount.to_rupees().map_err(RechargeError::Validation)?;
        let request = GatewayOrderRequest {
            account_id: order.account_id.clone(),
            order_id: order.order_id.clone(),
            amount,
            plan: order.plan.clone(),
            plan_details: order.plan_details.clone(),
            shop_name: order.shop_name.clone(),
            return_url,
        };
        let order = self.db.insert_order(order).await?;
        info!("🔄️ Order {} for {} initiated for {amount}", order.order_id, order.account_id);
        match self.bounded(self.gateway.create_order(request)).await {
            Ok(session) => {
                debug!("🔄️ Gateway order {} opened", order.order_id);
                Ok(session)
            },
            Err(e) => {
                warn!("🔄️ The gateway could not open order {}. Removing it. {e}", order.order_id);
                if let Err(err) = self.db.remove_order(&order.account_id, &order.order_id).await {
                    error!("🔄️ Could not clean up order {} after the gateway failed. {err}", order.order_id);
                }
                Err(e.into())
            },
        }
    }

    /// Push driver. Applies a single payment attempt that the gateway sent us for the order.
    ///
    /// The caller is responsible for having authenticated the notification. Duplicate notifications are harmless.
    pub async fn process_payment_notification(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        attempt: PaymentAttempt,
    ) -> Result<TransitionOutcome, RechargeError> {
        debug!("🔄️ Payment notification for {order_id} ({account_id}): {}", attempt.status);
        let Some(order) = self.db.fetch_order(account_id, order_id).await? else {
            info!("🔄️ {} notification for {order_id} ignored. The order is not live", attempt.status);
            return Ok(TransitionOutcome::Ignored);
        };
        self.apply_attempts(&order, &[attempt]).await
    }

    /// On-demand driver. Asks the gateway about one order and applies the answer.
    ///
    /// Definitive failures are reported as [`RechargeError::TerminalPayment`], after they have been recorded.
    pub async fn verify_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<TransitionOutcome, RechargeError> {
        if is_blank(account_id.as_str()) || is_blank(order_id.as_str()) {
            return Err(RechargeError::Validation("Both an order id and an account id are required".into()));
        }
        let Some(order) = self.db.fetch_order(account_id, order_id).await? else {
            return match self.db.fetch_ledger_entry(account_id, order_id).await? {
                Some(_) => Ok(TransitionOutcome::AlreadyProcessed),
                None => Err(RechargeError::OrderNotFound(account_id.clone(), order_id.clone())),
            };
        };
        if order.status == OrderStatusType::ReconcileFailed {
            return Err(RechargeError::RequiresManualReview(order.order_id));
        }
        let attempts = self.bounded(self.gateway.fetch_payments(order_id)).await?;
        match self.apply_attempts(&order, &attempts).await? {
            TransitionOutcome::StatusChanged { status }
                if matches!(status, OrderStatusType::Failed | OrderStatusType::Cancelled | OrderStatusType::Stuck) =>
            {
                Err(RechargeError::TerminalPayment { order_id: order.order_id, status })
            },
            outcome => Ok(outcome),
        }
    }

    /// Scheduled driver. Checks every `Initiated` or `Pending` order that is older than the minimum order age.
    ///
    /// Orders are checked independently, a few at a time. A failure on one order is counted and logged, and never
    /// stops the sweep.
    pub async fn poll_pending_orders(&self) -> Result<PollSummary, RechargeError> {
        let cutoff = Utc::now() - self.policy.min_order_age();
        let orders = self.db.fetch_orders_created_before(&OrderStatusType::POLLABLE, cutoff).await?;
        if orders.is_empty() {
            debug!("⏱️ No orders are due for a payment check");
            return Ok(PollSummary::default());
        }
        info!("⏱️ Checking {} orders with the gateway", orders.len());
        let results = stream::iter(orders)
            .map(|order| async move { self.check_order(&order).await })
            .buffer_unordered(self.policy.concurrency.max(1))
            .collect::<Vec<_>>()
            .await;
        let summary = results.iter().fold(PollSummary::default(), |mut summary, result| {
            summary.record(result);
            summary
        });
        info!("⏱️ Payment check complete. {summary:?}");
        Ok(summary)
    }

    async fn check_order(&self, order: &Order) -> Result<TransitionOutcome, RechargeError> {
        let attempts = match self.bounded(self.gateway.fetch_payments(&order.order_id)).await {
            Ok(attempts) => attempts,
            Err(e) => {
                warn!("⏱️ Could not fetch payments for {}. Its status is left alone. {e}", order.order_id);
                let annotation = OrderAnnotation::default().with_error(e.to_string()).with_processed_at(Utc::now());
                if let Err(err) = self.db.annotate_order(&order.account_id, &order.order_id, annotation).await {
                    error!("⏱️ Could not record the gateway failure on {}. {err}", order.order_id);
                }
                return Err(e.into());
            },
        };
        let result = self.apply_attempts(order, &attempts).await;
        match &result {
            Err(e) if e.is_retryable() => warn!("⏱️ Order {} will be retried on the next sweep. {e}", order.order_id),
            Err(e) => error!("⏱️ Order {} could not be processed. {e}", order.order_id),
            Ok(_) => {},
        }
        result
    }

    /// Runs the state machine for the order against the observed attempts and carries out the transition.
    pub async fn apply_attempts(
        &self,
        order: &Order,
        attempts: &[PaymentAttempt],
    ) -> Result<TransitionOutcome, RechargeError> {
        let now = Utc::now();
        let transition = next_transition(order, attempts, now, self.policy.max_pending_age());
        trace!("🔄️ Order {} ({}) transition: {transition:?}", order.order_id, order.status);
        match transition {
            Transition::Reconcile(attempt) => {
                let outcome = self.reconciler.reconcile(&order.account_id, &order.order_id, &attempt.details).await?;
                match outcome {
                    ReconcileOutcome::Reconciled(entry) => Ok(TransitionOutcome::Credited(entry)),
                    ReconcileOutcome::AlreadyProcessed => Ok(TransitionOutcome::AlreadyProcessed),
                }
            },
            Transition::Frozen => {
                debug!("🔄️ Order {} is waiting for manual review. Leaving it alone", order.order_id);
                Ok(TransitionOutcome::ManualReview)
            },
            Transition::NoChange => Ok(TransitionOutcome::Unchanged),
            transition => {
                let (Some(status), Some(annotation)) = (transition.target_status(), transition.annotation(now)) else {
                    return Ok(TransitionOutcome::Unchanged);
                };
                if !self.db.annotate_order(&order.account_id, &order.order_id, annotation).await? {
                    let current = self.db.fetch_order(&order.account_id, &order.order_id).await?;
                    return match current {
                        Some(o) if o.status == OrderStatusType::ReconcileFailed => {
                            debug!("🔄️ Order {} is waiting for review. {status} not recorded", order.order_id);
                            Ok(TransitionOutcome::ManualReview)
                        },
                        _ => {
                            debug!("🔄️ Order {} is no longer live. {status} not recorded", order.order_id);
                            Ok(TransitionOutcome::Ignored)
                        },
                    };
                }
                if let Transition::Unhandled(raw) = &transition {
                    warn!("🔄️ Order {} has an unrecognised payment status '{raw}'. Flagged for review", order.order_id);
                    let reason = format!("Unhandled payment status: {raw}");
                    let event = ReviewRequiredEvent::new(order.account_id.clone(), order.order_id.clone(), status, reason);
                    self.producers.review_required(event).await;
                } else {
                    debug!("🔄️ Order {} is now {status}", order.order_id);
                }
                Ok(TransitionOutcome::StatusChanged { status })
            },
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where F: Future<Output = Result<T, GatewayError>> {
        let limit = self.policy.gateway_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| GatewayError::Timeout(format!("No answer within {}ms", limit.as_millis())))?
    }
}
