use std::{env, fmt::Display, str::FromStr, time::Duration};

use cashfree_tools::CashfreeConfig;
use log::*;
use topup_common::{helpers::parse_boolean_flag, Rupees, Secret};
use topup_engine::{
    helpers::DailySchedule,
    topup_api::policy::{
        DEFAULT_DEDUCTION_AMOUNT,
        DEFAULT_GATEWAY_TIMEOUT,
        DEFAULT_MAX_PENDING_AGE,
        DEFAULT_MAX_RECONCILE_RETRIES,
        DEFAULT_MIN_ORDER_AGE,
        DEFAULT_POLL_CONCURRENCY,
    },
    DeductionPolicy,
    PlanBonuses,
    PollPolicy,
    ReconcilePolicy,
};

const DEFAULT_TOPUP_HOST: &str = "127.0.0.1";
const DEFAULT_TOPUP_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/topup_store.db";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RETURN_URL: &str =
    "https://unoshops.com/payment-status?order_id={order_id}&status={payment_status}&mobileNumber={account_id}";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub cashfree: CashfreeConfig,
    /// The key webhook deliveries are signed with. Defaults to the Cashfree client secret.
    pub webhook_secret: Secret<String>,
    /// Where the gateway sends the customer after checkout. `{order_id}` and `{account_id}` are substituted.
    pub return_url_template: String,
    /// Admin routes are disabled if this is empty.
    pub admin_token: Secret<String>,
    pub deduction: DeductionPolicy,
    pub poll_interval: Duration,
    pub poll: PollPolicy,
    pub reconcile: ReconcilePolicy,
    /// If true, neither the payment checker nor the daily deduction run in the background. The manual triggers
    /// still work.
    pub disable_workers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TOPUP_HOST.to_string(),
            port: DEFAULT_TOPUP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            cashfree: CashfreeConfig::default(),
            webhook_secret: Secret::default(),
            return_url_template: DEFAULT_RETURN_URL.to_string(),
            admin_token: Secret::default(),
            deduction: DeductionPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll: PollPolicy::default(),
            reconcile: ReconcilePolicy::default(),
            disable_workers: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TOPUP_HOST").ok().unwrap_or_else(|| DEFAULT_TOPUP_HOST.into());
        let port = parse_env("TOPUP_PORT", DEFAULT_TOPUP_PORT);
        let database_url = env::var("TOPUP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TOPUP_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let cashfree = CashfreeConfig::new_from_env_or_default();
        let webhook_secret = match env::var("TOPUP_WEBHOOK_SECRET") {
            Ok(s) if !s.is_empty() => Secret::new(s),
            _ => {
                info!("🪛️ TOPUP_WEBHOOK_SECRET is not set. Webhooks will be verified with the Cashfree client secret.");
                cashfree.client_secret.clone()
            },
        };
        if webhook_secret.is_empty() {
            warn!("🚨️ There is no webhook secret. Every webhook delivery will be rejected.");
        }
        let return_url_template = env::var("TOPUP_RETURN_URL").ok().unwrap_or_else(|| DEFAULT_RETURN_URL.to_string());
        if !return_url_template.contains("{order_id}") {
            warn!("🪛️ TOPUP_RETURN_URL does not contain {{order_id}}. Customers will not land on their order status.");
        }
        let admin_token = Secret::new(env::var("TOPUP_ADMIN_TOKEN").unwrap_or_default());
        if admin_token.is_empty() {
            warn!("🪛️ TOPUP_ADMIN_TOKEN is not set. Admin routes are disabled.");
        }
        let deduction = configure_deduction();
        let poll_interval = parse_env_secs("TOPUP_POLL_INTERVAL", DEFAULT_POLL_INTERVAL);
        let poll = PollPolicy {
            min_order_age: parse_env_secs("TOPUP_MIN_ORDER_AGE", DEFAULT_MIN_ORDER_AGE),
            max_pending_age: parse_env_secs("TOPUP_MAX_PENDING_AGE", DEFAULT_MAX_PENDING_AGE),
            gateway_timeout: parse_env_secs("TOPUP_GATEWAY_TIMEOUT", DEFAULT_GATEWAY_TIMEOUT),
            concurrency: parse_env("TOPUP_POLL_CONCURRENCY", DEFAULT_POLL_CONCURRENCY),
        };
        let reconcile = ReconcilePolicy {
            plan_bonuses: parse_env("TOPUP_PLAN_BONUSES", PlanBonuses::default()),
            max_retries: parse_env("TOPUP_RECONCILE_RETRIES", DEFAULT_MAX_RECONCILE_RETRIES),
        };
        let disable_workers = parse_boolean_flag(env::var("TOPUP_DISABLE_WORKERS").ok(), false);
        Self {
            host,
            port,
            database_url,
            cashfree,
            webhook_secret,
            return_url_template,
            admin_token,
            deduction,
            poll_interval,
            poll,
            reconcile,
            disable_workers,
        }
    }
}

fn configure_deduction() -> DeductionPolicy {
    let amount = parse_env("TOPUP_DEDUCTION_AMOUNT", Rupees::from(DEFAULT_DEDUCTION_AMOUNT));
    let amount = if amount.is_positive() {
        amount
    } else {
        warn!("🪛️ TOPUP_DEDUCTION_AMOUNT must be positive. Using the default of {DEFAULT_DEDUCTION_AMOUNT}.");
        Rupees::from(DEFAULT_DEDUCTION_AMOUNT)
    };
    let default_schedule = DailySchedule::default();
    let time = env::var("TOPUP_DEDUCTION_TIME").unwrap_or_else(|_| "00:00".to_string());
    let offset = env::var("TOPUP_DEDUCTION_UTC_OFFSET").unwrap_or_else(|_| "+05:30".to_string());
    let schedule = DailySchedule::parse(&time, &offset).unwrap_or_else(|e| {
        warn!("🪛️ Invalid deduction schedule ({time} {offset}). {e} Using {default_schedule} instead.");
        default_schedule
    });
    DeductionPolicy { amount, schedule, ..Default::default() }
}

/// Parses an environment variable, falling back to (and logging) the default if it is missing or invalid.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

/// Like [`parse_env`], for a whole number of seconds. Zero is rejected in favour of the default.
fn parse_env_secs(name: &str, default: Duration) -> Duration {
    match parse_env(name, default.as_secs()) {
        0 => {
            warn!("🪛️ {name} must be at least one second. Using the default, {}s, instead.", default.as_secs());
            default
        },
        secs => Duration::from_secs(secs),
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The parts of the configuration that route handlers need. Secrets are kept out of it, with the exception of the
/// tokens the middleware checks requests against.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub return_url_template: String,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { return_url_template: config.return_url_template.clone() }
    }
}

/// The shared secret webhook deliveries are signed with.
#[derive(Clone, Debug, Default)]
pub struct WebhookSecret(pub Secret<String>);

/// The token admin requests must present in the `x-admin-token` header.
#[derive(Clone, Debug, Default)]
pub struct AdminToken(pub Secret<String>);
