//! Read-only access to accounts, their histories and orders awaiting review.
use std::fmt::Debug;

use log::trace;

use crate::{
    db_types::{Account, AccountId, LedgerEntry, Order, OrderId, OrderStatusType},
    topup_api::{api_objects::AccountOverview, errors::RechargeError},
    traits::AccountManagement,
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn account(&self, account_id: &AccountId) -> Result<Option<Account>, RechargeError> {
        Ok(self.db.fetch_account(account_id).await?)
    }

    /// The account with its recharge history, deductions and orders. `None` if the account does not exist.
    pub async fn account_overview(&self, account_id: &AccountId) -> Result<Option<AccountOverview>, RechargeError> {
        let Some(account) = self.db.fetch_account(account_id).await? else {
            trace!("💻️ No account {account_id}");
            return Ok(None);
        };
        let recharges = self.db.fetch_ledger_entries(account_id).await?;
        let deductions = self.db.fetch_deductions(account_id).await?;
        let orders = self.db.fetch_orders_for_account(account_id).await?;
        Ok(Some(AccountOverview { account, recharges, deductions, orders }))
    }

    pub async fn ledger_entry(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<LedgerEntry>, RechargeError> {
        Ok(self.db.fetch_ledger_entry(account_id, order_id).await?)
    }

    /// Orders that need a human: confirmed payments that could not be credited, and unrecognised gateway statuses.
    pub async fn orders_for_review(&self) -> Result<Vec<Order>, RechargeError> {
        Ok(self.db.fetch_orders_with_status(&OrderStatusType::REVIEWABLE).await?)
    }
}
