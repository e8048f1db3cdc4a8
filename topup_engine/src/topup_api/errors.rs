use thiserror::Error;

use crate::{
    db_types::{AccountId, OrderId, OrderStatusType},
    traits::{GatewayError, LedgerError},
};

#[derive(Debug, Clone, Error)]
pub enum RechargeError {
    #[error("Invalid request. {0}")]
    Validation(String),
    #[error("{0}")]
    Gateway(#[from] GatewayError),
    #[error("The ledger transaction lost a race with a concurrent writer. {0}")]
    Conflict(String),
    #[error("The payment for order {order_id} is {status}.")]
    TerminalPayment { order_id: OrderId, status: OrderStatusType },
    #[error("The payment for order {order_id} was confirmed, but could not be credited. {reason}")]
    InternalProcessing { order_id: OrderId, reason: String },
    #[error("Order {0} is waiting for manual review.")]
    RequiresManualReview(OrderId),
    #[error("Order {1} does not exist for account {0}.")]
    OrderNotFound(AccountId, OrderId),
    #[error("Order {1} already exists for account {0}.")]
    OrderAlreadyExists(AccountId, OrderId),
    #[error("Database error. {0}")]
    Database(String),
}

impl RechargeError {
    /// Whether the operation may succeed if it is simply tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(_) | Self::Conflict(_) | Self::Database(_))
    }
}

impl From<LedgerError> for RechargeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Conflict(s) => Self::Conflict(s),
            LedgerError::OrderAlreadyExists(a, o) | LedgerError::AlreadyReconciled(a, o) => {
                Self::OrderAlreadyExists(a, o)
            },
            LedgerError::OrderNotFound(a, o) => Self::OrderNotFound(a, o),
            LedgerError::DatabaseError(s) | LedgerError::SerializationError(s) => Self::Database(s),
            e @ LedgerError::BalanceOverflow(..) => Self::Validation(e.to_string()),
        }
    }
}
