use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Account, DeductionEntry, LedgerEntry, Order, OrderStatusType},
    topup_api::errors::RechargeError,
};

/// What a driver did with an order after looking at its payment attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The payment was credited to the account by this call.
    Credited(LedgerEntry),
    /// The payment had already been credited.
    AlreadyProcessed,
    /// The order moved to (or stayed in) the given status.
    StatusChanged { status: OrderStatusType },
    /// Nothing to do yet.
    Unchanged,
    /// The order is waiting for an operator and was left alone.
    ManualReview,
    /// A notification for an order that is no longer live. Nothing was done.
    Ignored,
}

impl TransitionOutcome {
    pub fn is_credited(&self) -> bool {
        matches!(self, Self::Credited(_))
    }
}

/// The tally of one scheduled poll sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    pub checked: usize,
    pub credited: usize,
    pub already_processed: usize,
    pub pending: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub stuck: usize,
    pub unhandled: usize,
    pub unchanged: usize,
    pub errors: usize,
}

impl PollSummary {
    pub fn record(&mut self, result: &Result<TransitionOutcome, RechargeError>) {
        self.checked += 1;
        match result {
            Ok(TransitionOutcome::Credited(_)) => self.credited += 1,
            Ok(TransitionOutcome::AlreadyProcessed) | Ok(TransitionOutcome::Ignored) => self.already_processed += 1,
            Ok(TransitionOutcome::StatusChanged { status }) => match status {
                OrderStatusType::Pending => self.pending += 1,
                OrderStatusType::Failed => self.failed += 1,
                OrderStatusType::Cancelled => self.cancelled += 1,
                OrderStatusType::Stuck => self.stuck += 1,
                _ => self.unhandled += 1,
            },
            Ok(TransitionOutcome::Unchanged) | Ok(TransitionOutcome::ManualReview) => self.unchanged += 1,
            Err(_) => self.errors += 1,
        }
    }
}

/// Everything we know about an account, for the read-only account view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOverview {
    pub account: Account,
    pub recharges: Vec<LedgerEntry>,
    pub deductions: Vec<DeductionEntry>,
    pub orders: Vec<Order>,
}
