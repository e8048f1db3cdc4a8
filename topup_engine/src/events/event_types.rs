use serde::{Deserialize, Serialize};

use crate::db_types::{AccountId, LedgerEntry, OrderId, OrderStatusType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReconciledEvent {
    pub entry: LedgerEntry,
}

impl OrderReconciledEvent {
    pub fn new(entry: LedgerEntry) -> Self {
        Self { entry }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequiredEvent {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub reason: String,
}

impl ReviewRequiredEvent {
    pub fn new(account_id: AccountId, order_id: OrderId, status: OrderStatusType, reason: String) -> Self {
        Self { account_id, order_id, status, reason }
    }
}
