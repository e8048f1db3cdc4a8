//! `SqliteDatabase` is a concrete implementation of a top-up engine ledger backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
//!
//! Transactions are opened as deferred transactions in WAL mode. Two transactions that read the same account and then
//! both try to write it cannot both commit: the loser sees `SQLITE_BUSY` (or `SQLITE_BUSY_SNAPSHOT`), which is
//! reported as [`LedgerError::Conflict`].
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::Value;
use sqlx::{migrate, SqlitePool};

use super::db::{accounts, db_url, deductions, ledger, new_pool, orders};
use crate::{
    db_types::{
        Account,
        AccountId,
        Credit,
        DeductionEntry,
        LedgerEntry,
        NewOrder,
        Order,
        OrderAnnotation,
        OrderId,
        OrderStatusType,
        Rupees,
    },
    traits::{AccountManagement, DeductionSummary, LedgerDatabase, LedgerError, ReconcileOutcome},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        if ledger::fetch_entry(&order.account_id, &order.order_id, &mut tx).await?.is_some() {
            debug!("🗃️ Order {} for {} was already reconciled. Not inserting it again", order.order_id, order.account_id);
            return Err(LedgerError::AlreadyReconciled(order.account_id, order.order_id));
        }
        accounts::create_account_if_missing(&order.account_id, order.created_at, &mut tx).await?;
        orders::insert_order(&order, &mut tx).await?;
        let result = orders::fetch_order(&order.account_id, &order.order_id, &mut tx)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order.account_id.clone(), order.order_id.clone()))?;
        tx.commit().await?;
        Ok(result)
    }

    async fn remove_order(&self, account_id: &AccountId, order_id: &OrderId) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let removed = orders::delete_order(account_id, order_id, &mut conn).await?;
        debug!("🗃️ Order {order_id} for {account_id} removed: {removed}");
        Ok(removed)
    }

    async fn annotate_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        annotation: OrderAnnotation,
    ) -> Result<bool, LedgerError> {
        if annotation.is_empty() {
            return Ok(false);
        }
        let mut conn = self.pool.acquire().await?;
        orders::annotate_order(account_id, order_id, annotation, &mut conn).await
    }

    async fn release_order(&self, account_id: &AccountId, order_id: &OrderId, note: &str) -> Result<bool, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::release_order(account_id, order_id, note, &mut conn).await
    }

    async fn fetch_orders_created_before(
        &self,
        statuses: &[OrderStatusType],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_created_before(statuses, created_before, &mut conn).await
    }

    async fn reconcile_order<F, E>(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        payment_details: &Value,
        credit: F,
    ) -> Result<ReconcileOutcome, E>
    where
        F: FnOnce(&Account, &Order) -> Result<Credit, E>,
        E: From<LedgerError>,
    {
        let mut tx = self.pool.begin().await.map_err(LedgerError::from)?;
        let now = Utc::now();
        let account = accounts::fetch_account(account_id, &mut tx).await?;
        let Some(order) = orders::fetch_order(account_id, order_id, &mut tx).await? else {
            trace!("🗃️ Order {order_id} for {account_id} is not live. Nothing to reconcile");
            return Ok(ReconcileOutcome::AlreadyProcessed);
        };
        let account = account.unwrap_or_else(|| Account::new(account_id.clone(), now));
        let Credit { amount, bonus } = credit(&account, &order)?;
        let Some(new_balance) = account.balance.checked_add(amount).and_then(|b| b.checked_add(bonus)) else {
            return Err(LedgerError::BalanceOverflow(account_id.clone(), order_id.clone()).into());
        };
        accounts::upsert_recharged_balance(&account, new_balance, now, &mut tx).await?;
        let entry = LedgerEntry {
            account_id: account_id.clone(),
            order_id: order_id.clone(),
            amount,
            bonus,
            plan: order.plan.clone(),
            plan_details: order.plan_details.clone(),
            payment_details: payment_details.clone(),
            order_created_at: order.created_at,
            resolved_at: now,
        };
        ledger::insert_entry(&entry, &mut tx).await?;
        if !orders::delete_order(account_id, order_id, &mut tx).await? {
            return Err(LedgerError::Conflict(format!("Order {order_id} was removed by a concurrent writer")).into());
        }
        tx.commit().await.map_err(LedgerError::from)?;
        debug!("🗃️ Order {order_id} reconciled. {account_id} balance is now {new_balance}");
        Ok(ReconcileOutcome::Reconciled(entry))
    }

    async fn apply_deduction(
        &self,
        amount: Rupees,
        kind: &str,
        at: DateTime<Utc>,
    ) -> Result<DeductionSummary, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let accounts = accounts::fetch_accounts(&mut tx).await?;
        let mut summary = DeductionSummary { accounts_scanned: accounts.len(), ..Default::default() };
        for account in accounts {
            if account.balance < amount {
                trace!("🗃️ {} has {}, which does not cover {amount}. Skipping", account.account_id, account.balance);
                continue;
            }
            let Some(new_balance) = accounts::debit_if_sufficient(&account.account_id, amount, at, &mut tx).await?
            else {
                continue;
            };
            deductions::insert_deduction(&account.account_id, amount, new_balance, kind, at, &mut tx).await?;
            summary.accounts_debited += 1;
            summary.total_debited += amount;
        }
        tx.commit().await?;
        debug!(
            "🗃️ Deduction of {amount} applied to {} of {} accounts",
            summary.accounts_debited, summary.accounts_scanned
        );
        Ok(summary)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_account(&self, account_id: &AccountId) -> Result<Option<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(account_id, &mut conn).await
    }

    async fn fetch_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_accounts(&mut conn).await
    }

    async fn fetch_order(&self, account_id: &AccountId, order_id: &OrderId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(account_id, order_id, &mut conn).await
    }

    async fn fetch_orders_for_account(&self, account_id: &AccountId) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_for_account(account_id, &mut conn).await
    }

    async fn fetch_orders_with_status(&self, statuses: &[OrderStatusType]) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders_with_status(statuses, &mut conn).await
    }

    async fn fetch_ledger_entry(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<LedgerEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_entry(account_id, order_id, &mut conn).await
    }

    async fn fetch_ledger_entries(&self, account_id: &AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_entries_for_account(account_id, &mut conn).await
    }

    async fn fetch_deductions(&self, account_id: &AccountId) -> Result<Vec<DeductionEntry>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        deductions::fetch_deductions_for_account(account_id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `TOPUP_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
