//! Tunable business rules. They are plain data, built once at start-up and handed to the APIs.
use std::{collections::HashMap, fmt::Display, str::FromStr, time::Duration};

use crate::db_types::Rupees;

pub const DEFAULT_MAX_RECONCILE_RETRIES: usize = 5;
pub const DEFAULT_MIN_ORDER_AGE: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_PENDING_AGE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_CONCURRENCY: usize = 4;
pub const DEFAULT_DEDUCTION_AMOUNT: i64 = 12;

//--------------------------------------      PlanBonuses       --------------------------------------------------------
/// Extra credit granted on top of the amount paid, by plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBonuses(HashMap<String, Rupees>);

impl Default for PlanBonuses {
    fn default() -> Self {
        Self(HashMap::from([("yearly".to_string(), Rupees::from(720))]))
    }
}

impl PlanBonuses {
    pub fn none() -> Self {
        Self(HashMap::new())
    }

    pub fn with_bonus(mut self, plan: &str, bonus: Rupees) -> Self {
        self.0.insert(plan.trim().to_string(), bonus);
        self
    }

    pub fn bonus_for(&self, plan: &str) -> Rupees {
        self.0.get(plan.trim()).copied().unwrap_or_default()
    }
}

impl FromStr for PlanBonuses {
    type Err = String;

    /// Parses a comma separated list of `plan:bonus` pairs, e.g. `yearly:720,half-yearly:300`. An empty string means
    /// no bonuses at all.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bonuses = Self::none();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (plan, bonus) = pair.split_once(':').ok_or_else(|| format!("'{pair}' is not a plan:bonus pair"))?;
            let bonus = bonus.parse::<Rupees>().map_err(|e| format!("Invalid bonus for plan '{plan}'. {e}"))?;
            if bonus.value() < 0 {
                return Err(format!("The bonus for plan '{plan}' cannot be negative"));
            }
            bonuses = bonuses.with_bonus(plan, bonus);
        }
        Ok(bonuses)
    }
}

impl Display for PlanBonuses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pairs = self.0.iter().map(|(k, v)| format!("{k}:{}", v.value())).collect::<Vec<_>>();
        pairs.sort();
        write!(f, "{}", pairs.join(","))
    }
}

//--------------------------------------   ReconcilePolicy      --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    pub plan_bonuses: PlanBonuses,
    /// How many times a transaction that lost a race is retried before giving up
    pub max_retries: usize,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self { plan_bonuses: PlanBonuses::default(), max_retries: DEFAULT_MAX_RECONCILE_RETRIES }
    }
}

//--------------------------------------      PollPolicy       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Orders younger than this are left to the webhook and the client
    pub min_order_age: Duration,
    /// Orders with no payment attempt older than this are marked `Stuck`
    pub max_pending_age: Duration,
    pub gateway_timeout: Duration,
    /// How many orders are checked at the same time
    pub concurrency: usize,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            min_order_age: DEFAULT_MIN_ORDER_AGE,
            max_pending_age: DEFAULT_MAX_PENDING_AGE,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            concurrency: DEFAULT_POLL_CONCURRENCY,
        }
    }
}

impl PollPolicy {
    pub fn max_pending_age(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.max_pending_age).unwrap_or_else(|_| chrono::Duration::days(36_500))
    }

    pub fn min_order_age(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.min_order_age).unwrap_or_else(|_| chrono::Duration::days(36_500))
    }
}
