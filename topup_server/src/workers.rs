//! Background workers. Do not await the returned JoinHandles, as they run indefinitely.
use std::time::Duration;

use chrono::Utc;
use log::*;
use tokio::task::JoinHandle;
use topup_engine::{DeductionApi, OrderFlowApi, SqliteDatabase};

use crate::integrations::cashfree::CashfreeGateway;

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Starts the scheduled payment checker. Each tick runs one sweep over the orders nobody has told us about.
pub fn start_payment_checker(api: OrderFlowApi<SqliteDatabase, CashfreeGateway>, interval: Duration) -> JoinHandle<()> {
    let interval = checker_interval(interval);
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("⏱️ Payment checker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("⏱️ Running the payment checker");
            match api.poll_pending_orders().await {
                Ok(summary) if summary.checked > 0 => info!("⏱️ Payment checker finished. {summary:?}"),
                Ok(_) => trace!("⏱️ Payment checker finished. Nothing to check"),
                Err(e) => error!("⏱️ Error running the payment checker: {e}"),
            }
        }
    })
}

fn checker_interval(interval: Duration) -> Duration {
    if interval < MIN_POLL_INTERVAL {
        warn!("⏱️ A payment check interval of {interval:?} is too short. Using {MIN_POLL_INTERVAL:?}");
        return MIN_POLL_INTERVAL;
    }
    interval
}

/// Starts the daily deduction. It sleeps until the next scheduled time, runs the sweep and goes back to sleep.
pub fn start_deduction_worker(api: DeductionApi<SqliteDatabase>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let schedule = api.policy().schedule;
        info!("⏱️ Daily deduction worker started. Deductions run at {schedule}");
        let mut last_firing = None;
        loop {
            let now = Utc::now();
            let next = schedule.next_firing(now, last_firing);
            let wait = (next - now).to_std().unwrap_or_default();
            debug!("⏱️ Next deduction at {next} ({}s from now)", wait.as_secs());
            tokio::time::sleep(wait).await;
            if let Err(e) = api.run_daily_deduction().await {
                error!("⏱️ The scheduled deduction failed: {e}");
            }
            last_firing = Some(next);
        }
    })
}
