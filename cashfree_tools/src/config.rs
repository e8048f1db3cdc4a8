use std::{fmt::Display, str::FromStr, time::Duration};

use log::*;
use topup_common::Secret;

pub const DEFAULT_API_VERSION: &str = "2023-08-01";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CashfreeEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl CashfreeEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.cashfree.com/pg",
            Self::Production => "https://api.cashfree.com/pg",
        }
    }
}

impl FromStr for CashfreeEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" | "test" | "development" => Ok(Self::Sandbox),
            "production" | "prod" | "live" => Ok(Self::Production),
            s => Err(format!("Unknown Cashfree environment: {s}")),
        }
    }
}

impl Display for CashfreeEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sandbox => write!(f, "sandbox"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CashfreeConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub environment: CashfreeEnvironment,
    pub api_version: String,
    /// Overrides the environment's base url. Only really useful for pointing the client at a stub server.
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for CashfreeConfig {
    fn default() -> Self {
        Self {
            client_id: String::default(),
            client_secret: Secret::default(),
            environment: CashfreeEnvironment::default(),
            api_version: DEFAULT_API_VERSION.to_string(),
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CashfreeConfig {
    pub fn new_from_env_or_default() -> Self {
        let client_id = std::env::var("TOPUP_CASHFREE_CLIENT_ID").unwrap_or_else(|_| {
            warn!("TOPUP_CASHFREE_CLIENT_ID not set. Gateway calls will be rejected.");
            String::default()
        });
        let client_secret = Secret::new(std::env::var("TOPUP_CASHFREE_CLIENT_SECRET").unwrap_or_else(|_| {
            warn!("TOPUP_CASHFREE_CLIENT_SECRET not set. Gateway calls will be rejected.");
            String::default()
        }));
        let environment = std::env::var("TOPUP_CASHFREE_ENVIRONMENT")
            .map_err(|_| info!("TOPUP_CASHFREE_ENVIRONMENT not set, using the sandbox."))
            .and_then(|s| s.parse::<CashfreeEnvironment>().map_err(|e| warn!("{e}. Using the sandbox.")))
            .unwrap_or_default();
        let api_version = std::env::var("TOPUP_CASHFREE_API_VERSION").unwrap_or_else(|_| {
            info!("TOPUP_CASHFREE_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let base_url = std::env::var("TOPUP_CASHFREE_BASE_URL").ok();
        Self { client_id, client_secret, environment, api_version, base_url, ..Default::default() }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_else(|| self.environment.base_url())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn environments() {
        assert_eq!("Production".parse::<CashfreeEnvironment>().unwrap(), CashfreeEnvironment::Production);
        assert_eq!("sandbox".parse::<CashfreeEnvironment>().unwrap(), CashfreeEnvironment::Sandbox);
        assert!("staging".parse::<CashfreeEnvironment>().is_err());
        let config = CashfreeConfig::default();
        assert_eq!(config.base_url(), "https://sandbox.cashfree.com/pg");
        let config = CashfreeConfig { base_url: Some("http://localhost:9999".into()), ..Default::default() };
        assert_eq!(config.base_url(), "http://localhost:9999");
    }
}
