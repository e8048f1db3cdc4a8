use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Type;
use thiserror::Error;
pub use topup_common::Rupees;

//--------------------------------------        AccountId       ------------------------------------------------------
/// The external identifier of an account. In practice, this is the customer's phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The caller-assigned order identifier. It is also the gateway's order id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been written and handed to the gateway. No payment attempt has been seen yet.
    Initiated,
    /// The gateway reports a payment attempt that has not settled yet.
    Pending,
    /// The gateway reported the payment as failed.
    Failed,
    /// The customer cancelled or abandoned the payment.
    Cancelled,
    /// No payment attempt was ever made and the order is older than the maximum pending age.
    Stuck,
    /// The gateway reported a status we do not understand. Needs a human.
    Unhandled,
    /// The gateway confirmed the payment, but the ledger write failed. Needs a human.
    ReconcileFailed,
}

impl OrderStatusType {
    /// Orders in these states are picked up by the scheduled poller.
    pub const POLLABLE: [OrderStatusType; 2] = [OrderStatusType::Initiated, OrderStatusType::Pending];
    /// Orders in these states are listed for manual review.
    pub const REVIEWABLE: [OrderStatusType; 2] = [OrderStatusType::ReconcileFailed, OrderStatusType::Unhandled];

    pub fn is_pollable(&self) -> bool {
        Self::POLLABLE.contains(self)
    }

    pub fn requires_review(&self) -> bool {
        Self::REVIEWABLE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::Pending => "Pending",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Stuck => "Stuck",
            Self::Unhandled => "Unhandled",
            Self::ReconcileFailed => "ReconcileFailed",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initiated" => Ok(Self::Initiated),
            "Pending" => Ok(Self::Pending),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            "Stuck" => Ok(Self::Stuck),
            "Unhandled" => Ok(Self::Unhandled),
            "ReconcileFailed" => Ok(Self::ReconcileFailed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. This conversion cannot fail, so the order is flagged as Unhandled");
            OrderStatusType::Unhandled
        })
    }
}

//--------------------------------------   DeclaredAmount      ---------------------------------------------------------
/// The amount a client asked to pay, exactly as it was supplied.
///
/// It is only checked when the order is reconciled, so that a bad amount cannot silently turn into a credit.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct DeclaredAmount(pub String);

impl DeclaredAmount {
    /// Accepts JSON numbers and strings, e.g. `100`, `100.0` and `"100"`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The amount as a positive, whole number of rupees.
    pub fn to_rupees(&self) -> Result<Rupees, String> {
        let amount = self.0.parse::<Rupees>().map_err(|e| format!("Invalid amount '{}'. {e}", self.0))?;
        if !amount.is_positive() {
            return Err(format!("Invalid amount '{}'. Amounts must be positive", self.0));
        }
        Ok(amount)
    }
}

impl From<&str> for DeclaredAmount {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<Rupees> for DeclaredAmount {
    fn from(amount: Rupees) -> Self {
        Self(amount.value().to_string())
    }
}

impl Display for DeclaredAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------        Account       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: Rupees,
    pub last_recharge_at: Option<DateTime<Utc>>,
    pub last_deduction_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// A fresh, empty account. Used when an account is seen for the first time.
    pub fn new(account_id: AccountId, created_at: DateTime<Utc>) -> Self {
        Self { account_id, balance: Rupees::default(), last_recharge_at: None, last_deduction_at: None, created_at }
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub amount: DeclaredAmount,
    pub plan: String,
    /// Opaque plan description supplied by the client
    pub plan_details: Value,
    pub shop_name: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(account_id: AccountId, order_id: OrderId, amount: DeclaredAmount, plan: &str) -> Self {
        Self {
            account_id,
            order_id,
            amount,
            plan: plan.to_string(),
            plan_details: Value::Null,
            shop_name: String::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_plan_details(mut self, details: Value) -> Self {
        self.plan_details = details;
        self
    }

    pub fn with_shop_name(mut self, shop_name: &str) -> Self {
        self.shop_name = shop_name.to_string();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub amount: DeclaredAmount,
    pub plan: String,
    pub plan_details: Value,
    pub shop_name: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

//--------------------------------------     OrderAnnotation     -------------------------------------------------------
/// A partial update to a live order. Only the fields that are set are written (merge semantics).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderAnnotation {
    pub status: Option<OrderStatusType>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl OrderAnnotation {
    pub fn status(status: OrderStatusType) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_last_checked_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_checked_at = Some(at);
        self
    }

    pub fn with_processed_at(mut self, at: DateTime<Utc>) -> Self {
        self.processed_at = Some(at);
        self
    }

    pub fn with_error<S: Into<String>>(mut self, error: S) -> Self {
        self.last_error = Some(error.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

//--------------------------------------      LedgerEntry      ---------------------------------------------------------
/// The immutable record of a reconciled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_id: AccountId,
    pub order_id: OrderId,
    pub amount: Rupees,
    pub bonus: Rupees,
    pub plan: String,
    pub plan_details: Value,
    /// Snapshot of the gateway's payment record that confirmed this order
    pub payment_details: Value,
    pub order_created_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn total_credit(&self) -> Rupees {
        self.amount + self.bonus
    }
}

//--------------------------------------     DeductionEntry     --------------------------------------------------------
pub const DAILY_CHARGE: &str = "daily_charge";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionEntry {
    pub id: i64,
    pub account_id: AccountId,
    pub amount: Rupees,
    pub previous_balance: Rupees,
    pub new_balance: Rupees,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     Credit     ---------------------------------------------------------
/// The amount (and plan bonus) an order is worth once the payment is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub amount: Rupees,
    pub bonus: Rupees,
}

impl Credit {
    pub fn total(&self) -> Rupees {
        self.amount + self.bonus
    }
}
