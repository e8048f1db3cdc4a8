//! # Order state machine
//!
//! Every status change of a live order is driven by a freshly observed set of gateway payment attempts. This module
//! decides *what* should happen; the [`OrderFlowApi`](crate::OrderFlowApi) carries it out.
//!
//! | Observed attempt(s)                    | Transition                     |
//! |----------------------------------------|--------------------------------|
//! | any `SUCCESS`                          | [`Transition::Reconcile`]      |
//! | `FAILED`                               | [`Transition::Fail`]           |
//! | `CANCELLED`, `USER_DROPPED`            | [`Transition::Cancel`]         |
//! | `PENDING`                              | [`Transition::StillPending`]   |
//! | anything else                          | [`Transition::Unhandled`]      |
//! | none, order older than max pending age | [`Transition::Stuck`]          |
//! | none, order younger                    | [`Transition::NoChange`]       |
//!
//! If there is no `SUCCESS` attempt, the most recent attempt (the first one the gateway lists) decides.
//! Orders in `ReconcileFailed` are frozen: they only move once an operator releases them.
use chrono::{DateTime, Duration, Utc};

use crate::{
    db_types::{Order, OrderAnnotation, OrderStatusType},
    traits::{GatewayPaymentStatus, PaymentAttempt},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The payment succeeded. Credit the account and archive the order.
    Reconcile(PaymentAttempt),
    Fail(PaymentAttempt),
    Cancel(PaymentAttempt),
    StillPending,
    /// The gateway reported a status we do not recognise. The raw value is kept.
    Unhandled(String),
    /// Nobody has tried to pay for the order and it is too old to wait for any longer.
    Stuck,
    NoChange,
    /// The order is waiting for manual review and must not be touched.
    Frozen,
}

/// Picks the attempt that decides the order's fate: any successful attempt, else the most recent one.
pub fn deciding_attempt(attempts: &[PaymentAttempt]) -> Option<&PaymentAttempt> {
    attempts.iter().find(|a| a.status == GatewayPaymentStatus::Success).or_else(|| attempts.first())
}

/// Works out the transition for `order`, given the attempts the gateway reported for it.
pub fn next_transition(
    order: &Order,
    attempts: &[PaymentAttempt],
    now: DateTime<Utc>,
    max_pending_age: Duration,
) -> Transition {
    if order.status == OrderStatusType::ReconcileFailed {
        return Transition::Frozen;
    }
    let Some(attempt) = deciding_attempt(attempts) else {
        let age = now - order.created_at;
        return if age > max_pending_age { Transition::Stuck } else { Transition::NoChange };
    };
    match &attempt.status {
        GatewayPaymentStatus::Success => Transition::Reconcile(attempt.clone()),
        GatewayPaymentStatus::Failed => Transition::Fail(attempt.clone()),
        GatewayPaymentStatus::Cancelled | GatewayPaymentStatus::UserDropped => Transition::Cancel(attempt.clone()),
        GatewayPaymentStatus::Pending => Transition::StillPending,
        GatewayPaymentStatus::Unrecognized(raw) => Transition::Unhandled(raw.clone()),
    }
}

impl Transition {
    /// The status the order ends up in, for transitions that only annotate the order.
    pub fn target_status(&self) -> Option<OrderStatusType> {
        match self {
            Transition::Fail(_) => Some(OrderStatusType::Failed),
            Transition::Cancel(_) => Some(OrderStatusType::Cancelled),
            Transition::StillPending => Some(OrderStatusType::Pending),
            Transition::Unhandled(_) => Some(OrderStatusType::Unhandled),
            Transition::Stuck => Some(OrderStatusType::Stuck),
            Transition::Reconcile(_) | Transition::NoChange | Transition::Frozen => None,
        }
    }

    /// The merge-write that records this transition on the order. `None` if the order is left alone.
    pub fn annotation(&self, now: DateTime<Utc>) -> Option<OrderAnnotation> {
        let status = self.target_status()?;
        let annotation = OrderAnnotation::status(status);
        let annotation = match self {
            Transition::StillPending => annotation.with_last_checked_at(now),
            Transition::Unhandled(raw) => {
                annotation.with_processed_at(now).with_error(format!("Unhandled payment status: {raw}"))
            },
            Transition::Stuck => annotation.with_processed_at(now).with_error("No payment attempt was ever made"),
            _ => annotation.with_processed_at(now),
        };
        Some(annotation)
    }
}
