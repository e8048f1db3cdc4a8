use std::{fmt::Debug, time::Duration};

use backon::Retryable;
use chrono::Utc;
use log::*;

use crate::{
    db_types::{Rupees, DAILY_CHARGE},
    helpers::{conflict_backoff, DailySchedule},
    topup_api::{errors::RechargeError, policy::DEFAULT_DEDUCTION_AMOUNT},
    traits::{DeductionSummary, LedgerDatabase, LedgerError},
};

#[derive(Debug, Clone)]
pub struct DeductionPolicy {
    /// The flat daily usage fee
    pub amount: Rupees,
    /// When the sweep runs
    pub schedule: DailySchedule,
    pub max_retries: usize,
}

impl Default for DeductionPolicy {
    fn default() -> Self {
        Self { amount: Rupees::from(DEFAULT_DEDUCTION_AMOUNT), schedule: DailySchedule::default(), max_retries: 5 }
    }
}

/// `DeductionApi` debits the daily usage fee from every account that can afford it.
pub struct DeductionApi<B> {
    db: B,
    policy: DeductionPolicy,
}

impl<B> Debug for DeductionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeductionApi ({:?})", self.policy)
    }
}

impl<B> DeductionApi<B> {
    pub fn new(db: B, policy: DeductionPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &DeductionPolicy {
        &self.policy
    }
}

impl<B> DeductionApi<B>
where B: LedgerDatabase
{
    /// Runs one deduction sweep. Every qualifying account is debited in a single all-or-nothing transaction, so a
    /// failure leaves every balance as it was.
    pub async fn run_daily_deduction(&self) -> Result<DeductionSummary, RechargeError> {
        let amount = self.policy.amount;
        if !amount.is_positive() {
            return Err(RechargeError::Validation(format!("The daily deduction must be positive, not {amount}")));
        }
        info!("🧾️ Starting the daily deduction of {amount}");
        let result = (|| async { self.db.apply_deduction(amount, DAILY_CHARGE, Utc::now()).await })
            .retry(conflict_backoff(self.policy.max_retries))
            .when(|e: &LedgerError| e.is_conflict())
            .notify(|e: &LedgerError, delay: Duration| {
                debug!("🧾️ The deduction lost a race. Retrying in {delay:?}. {e}")
            })
            .await;
        match result {
            Ok(summary) => {
                info!(
                    "🧾️ Daily deduction complete. {} of {} accounts debited, {} in total",
                    summary.accounts_debited, summary.accounts_scanned, summary.total_debited
                );
                Ok(summary)
            },
            Err(e) => {
                error!("🧾️ The daily deduction failed. No account was debited. {e}");
                Err(e.into())
            },
        }
    }
}
