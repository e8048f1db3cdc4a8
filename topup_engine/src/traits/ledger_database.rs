use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::{
    db_types::{Account, AccountId, Credit, NewOrder, Order, OrderAnnotation, OrderId, OrderStatusType, Rupees},
    traits::{AccountManagement, DeductionSummary, ReconcileOutcome},
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The transaction lost a race with a concurrent writer: {0}")]
    Conflict(String),
    #[error("Order {1} already exists for account {0}")]
    OrderAlreadyExists(AccountId, OrderId),
    #[error("Order {1} for account {0} was already reconciled")]
    AlreadyReconciled(AccountId, OrderId),
    #[error("Order {1} does not exist for account {0}")]
    OrderNotFound(AccountId, OrderId),
    #[error("Could not serialize or deserialize a stored value: {0}")]
    SerializationError(String),
    #[error("Crediting order {1} would overflow the balance of account {0}")]
    BalanceOverflow(AccountId, OrderId),
}

impl LedgerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// SQLite primary result codes that mean "someone else holds the lock, or your snapshot is stale".
/// Extended codes (e.g. `SQLITE_BUSY_SNAPSHOT` = 517) carry the primary code in their low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_lock_contention(code: Option<&str>, message: &str) -> bool {
    let by_code = code.and_then(|c| c.parse::<i32>().ok()).map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED));
    by_code.unwrap_or(false) || message.contains("database is locked")
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if is_lock_contention(db.code().as_deref(), db.message()) => {
                LedgerError::Conflict(e.to_string())
            },
            _ => LedgerError::DatabaseError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::SerializationError(e.to_string())
    }
}

/// This trait defines the mutating behaviour for ledger backends supporting the top-up engine.
///
/// This behaviour includes:
/// * Writing new orders and removing them again if the gateway rejects them.
/// * Single-row status annotations on live orders (last write wins).
/// * The atomic reconciliation transaction, which is the only place balances go up.
/// * The daily deduction transaction, which is the only place balances go down.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new live order in the `Initiated` state, creating the account if it does not exist yet.
    ///
    /// The (account, order) pair is unique across live orders *and* the ledger. If the pair already exists in either,
    /// [`LedgerError::OrderAlreadyExists`] or [`LedgerError::AlreadyReconciled`] is returned and nothing is written.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError>;

    /// Deletes a live order. Returns `true` if a row was removed.
    async fn remove_order(&self, account_id: &AccountId, order_id: &OrderId) -> Result<bool, LedgerError>;

    /// Merge-writes the fields set in `annotation` onto a live order. Returns `false` if the order is not live.
    ///
    /// An order in `ReconcileFailed` is only touched by an annotation that sets `ReconcileFailed` again. Any other
    /// annotation is skipped and `false` is returned. Use [`LedgerDatabase::release_order`] to move it on.
    async fn annotate_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        annotation: OrderAnnotation,
    ) -> Result<bool, LedgerError>;

    /// Moves a live order that is waiting for review back to `Pending`, recording `note` as its last error.
    /// Returns `false` if the order is not live or no longer waiting for review.
    async fn release_order(&self, account_id: &AccountId, order_id: &OrderId, note: &str) -> Result<bool, LedgerError>;

    /// Fetches all live orders in one of `statuses` that were created strictly before `created_before`, oldest first.
    async fn fetch_orders_created_before(
        &self,
        statuses: &[OrderStatusType],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Order>, LedgerError>;

    /// Applies a confirmed payment in one atomic transaction.
    ///
    /// 1. The account (or a fresh, empty account) and the live order are read before anything is written.
    /// 2. If the order is not live, nothing happens and [`ReconcileOutcome::AlreadyProcessed`] is returned.
    /// 3. `credit` decides what the order is worth. If it returns an error, the transaction is abandoned and the
    ///    error is returned unchanged.
    /// 4. The account balance and `last_recharge_at` are upserted, the ledger entry is inserted and the live order is
    ///    deleted. A delete that removes no rows means a concurrent writer got there first, and the transaction is
    ///    abandoned with [`LedgerError::Conflict`].
    ///
    /// A credit that would overflow the balance abandons the transaction with [`LedgerError::BalanceOverflow`].
    /// Lock contention also surfaces as [`LedgerError::Conflict`]. Retrying is the caller's business.
    async fn reconcile_order<F, E>(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        payment_details: &Value,
        credit: F,
    ) -> Result<ReconcileOutcome, E>
    where
        F: FnOnce(&Account, &Order) -> Result<Credit, E>,
        E: From<LedgerError>;

    /// Debits `amount` from every account whose balance covers it, in a single all-or-nothing transaction.
    ///
    /// Each debited account gets a deduction entry of the given `kind` and has `last_deduction_at` set to `at`.
    /// Accounts with insufficient balance are skipped.
    async fn apply_deduction(&self, amount: Rupees, kind: &str, at: DateTime<Utc>)
        -> Result<DeductionSummary, LedgerError>;

    /// Closes the database connection pool.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}
