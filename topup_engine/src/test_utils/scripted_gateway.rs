//! A [`PaymentGateway`] whose answers are scripted by the test.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::{json, Value};

use crate::{
    db_types::OrderId,
    traits::{GatewayError, GatewayOrderRequest, GatewayPaymentStatus, PaymentAttempt, PaymentGateway},
};

#[derive(Default)]
struct Script {
    payments: HashMap<String, Result<Vec<PaymentAttempt>, GatewayError>>,
    create_error: Option<GatewayError>,
    delay: Option<Duration>,
    created: Vec<GatewayOrderRequest>,
    fetches: usize,
}

/// Unscripted orders have no payment attempts.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

pub fn attempt(status: &str) -> PaymentAttempt {
    let details = json!({
        "cf_payment_id": format!("cf_{}", rand::random::<u32>()),
        "payment_status": status,
        "payment_group": "upi",
    });
    PaymentAttempt::new(GatewayPaymentStatus::from(status), details)
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("Gateway script lock poisoned")
    }

    /// The gateway reports one attempt per status, most recent first.
    pub fn with_payments(&self, order_id: &str, statuses: &[&str]) -> &Self {
        let attempts = statuses.iter().map(|s| attempt(s)).collect();
        self.script().payments.insert(order_id.to_string(), Ok(attempts));
        self
    }

    pub fn with_fetch_error(&self, order_id: &str, error: GatewayError) -> &Self {
        self.script().payments.insert(order_id.to_string(), Err(error));
        self
    }

    pub fn with_create_error(&self, error: GatewayError) -> &Self {
        self.script().create_error = Some(error);
        self
    }

    /// Every call waits this long before answering.
    pub fn with_delay(&self, delay: Duration) -> &Self {
        self.script().delay = Some(delay);
        self
    }

    pub fn created_orders(&self) -> Vec<GatewayOrderRequest> {
        self.script().created.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.script().fetches
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn create_order(&self, request: GatewayOrderRequest) -> Result<Value, GatewayError> {
        let (delay, error) = {
            let mut script = self.script();
            script.created.push(request.clone());
            (script.delay, script.create_error.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(e) => Err(e),
            None => Ok(json!({
                "order_id": request.order_id.as_str(),
                "order_amount": request.amount.value(),
                "payment_session_id": format!("session_{}", request.order_id.as_str()),
            })),
        }
    }

    async fn fetch_payments(&self, order_id: &OrderId) -> Result<Vec<PaymentAttempt>, GatewayError> {
        let (delay, result) = {
            let mut script = self.script();
            script.fetches += 1;
            let result = script.payments.get(order_id.as_str()).cloned().unwrap_or_else(|| Ok(Vec::new()));
            (script.delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
