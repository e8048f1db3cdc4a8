use crate::{
    db_types::{Account, AccountId, DeductionEntry, LedgerEntry, Order, OrderId, OrderStatusType},
    traits::LedgerError,
};

/// The `AccountManagement` trait provides read-only queries over accounts, live orders and the two histories.
///
/// The [`LedgerDatabase`](crate::traits::LedgerDatabase) trait handles everything that mutates the store.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the account with the given id. If no account exists, `None` is returned.
    async fn fetch_account(&self, account_id: &AccountId) -> Result<Option<Account>, LedgerError>;

    /// Fetches every account, in order of creation.
    async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Fetches a live order. Reconciled orders are no longer live, and return `None`.
    async fn fetch_order(&self, account_id: &AccountId, order_id: &OrderId) -> Result<Option<Order>, LedgerError>;

    /// All orders still held for the account, newest first. This includes terminal orders that are kept for audit.
    async fn fetch_orders_for_account(&self, account_id: &AccountId) -> Result<Vec<Order>, LedgerError>;

    /// Fetches all orders in any of the given states.
    async fn fetch_orders_with_status(&self, statuses: &[OrderStatusType]) -> Result<Vec<Order>, LedgerError>;

    async fn fetch_ledger_entry(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<LedgerEntry>, LedgerError>;

    /// The recharge history for the account, newest first.
    async fn fetch_ledger_entries(&self, account_id: &AccountId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// The deduction history for the account, newest first.
    async fn fetch_deductions(&self, account_id: &AccountId) -> Result<Vec<DeductionEntry>, LedgerError>;
}
