use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use topup_common::helpers::is_blank;
use topup_engine::db_types::{AccountId, DeclaredAmount, NewOrder, OrderId};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The body of `POST /create-order`. Every field is required. Older clients send the account id as `mobileNumber`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderParams {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub plan_details: Option<Value>,
    #[serde(default, alias = "mobileNumber")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub shop_name: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ServerError> {
    value.filter(|s| !is_blank(s)).ok_or_else(|| ServerError::InvalidRequestBody(format!("Missing field: {name}")))
}

impl CreateOrderParams {
    /// Checks that every field is present. The amount is only checked for presence here. The engine decides whether
    /// it is a valid amount.
    pub fn into_new_order(self) -> Result<NewOrder, ServerError> {
        let plan = required(self.plan, "plan")?;
        let amount = self
            .amount
            .as_ref()
            .and_then(DeclaredAmount::from_json)
            .filter(|a| !is_blank(a.as_str()))
            .ok_or_else(|| ServerError::InvalidRequestBody("Missing field: amount".into()))?;
        let plan_details = self
            .plan_details
            .filter(|v| !v.is_null())
            .ok_or_else(|| ServerError::InvalidRequestBody("Missing field: planDetails".into()))?;
        let account_id = required(self.account_id, "accountId")?;
        let shop_name = required(self.shop_name, "shopName")?;
        let order_id = required(self.order_id, "orderId")?;
        let order = NewOrder::new(AccountId::from(account_id.trim()), OrderId::from(order_id.trim()), amount, &plan)
            .with_plan_details(plan_details)
            .with_shop_name(&shop_name);
        Ok(order)
    }
}

/// Identifies a single order, as in `POST /verify` and `POST /orders/review/release`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default, alias = "mobileNumber")]
    pub account_id: Option<String>,
}

impl OrderRef {
    pub fn ids(self) -> Result<(AccountId, OrderId), ServerError> {
        let account_id = required(self.account_id, "accountId")?;
        let order_id = required(self.order_id, "orderId")?;
        Ok((AccountId::from(account_id.trim()), OrderId::from(order_id.trim())))
    }
}
