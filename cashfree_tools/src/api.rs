use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    Url,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::CashfreeConfig,
    data_objects::{CashfreePayment, CreateOrderRequest},
    CashfreeApiError,
};

#[derive(Clone)]
pub struct CashfreeApi {
    config: CashfreeConfig,
    client: Arc<Client>,
}

impl CashfreeApi {
    pub fn new(config: CashfreeConfig) -> Result<Self, CashfreeApiError> {
        let mut headers = HeaderMap::with_capacity(4);
        let id = HeaderValue::from_str(config.client_id.as_str())
            .map_err(|e| CashfreeApiError::Initialization(format!("Invalid client id. {e}")))?;
        let mut secret = HeaderValue::from_str(config.client_secret.reveal().as_str())
            .map_err(|e| CashfreeApiError::Initialization(format!("Invalid client secret. {e}")))?;
        secret.set_sensitive(true);
        let version = HeaderValue::from_str(config.api_version.as_str())
            .map_err(|e| CashfreeApiError::Initialization(format!("Invalid API version. {e}")))?;
        headers.insert("x-client-id", id);
        headers.insert("x-client-secret", secret);
        headers.insert("x-api-version", version);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CashfreeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &CashfreeConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, CashfreeApiError> {
        let url = Url::parse(&self.url(path)).map_err(|e| CashfreeApiError::RestRequestError(format!("{path}: {e}")))?;
        self.send(method, url, body).await
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<B>,
    ) -> Result<T, CashfreeApiError> {
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                CashfreeApiError::Timeout(e.to_string())
            } else {
                CashfreeApiError::RestRequestError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| CashfreeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let text = response.text().await.map_err(|e| CashfreeApiError::RestResponseError(e.to_string()))?;
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(String::from))
                .unwrap_or(text);
            Err(CashfreeApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url())
    }

    /// Appends each segment to the base URL, percent-encoding it. Caller-supplied ids can never change the path.
    pub fn url_with_segments(&self, segments: &[&str]) -> Result<Url, CashfreeApiError> {
        let base = self.config.base_url();
        let mut url = Url::parse(base).map_err(|e| CashfreeApiError::Initialization(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CashfreeApiError::Initialization(format!("{base} cannot be used as a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Creates a new order on the gateway. The response (which contains the `payment_session_id` the client needs to
    /// open the checkout) is returned verbatim.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Value, CashfreeApiError> {
        debug!("Creating gateway order {} for {}", request.order_id, request.order_amount);
        let result = self.rest_query::<Value, _>(Method::POST, "/orders", Some(request)).await?;
        info!("Created gateway order {}", request.order_id);
        Ok(result)
    }

    /// Fetches all payment attempts for the given order, most recent first.
    pub async fn fetch_payments(&self, order_id: &str) -> Result<Vec<CashfreePayment>, CashfreeApiError> {
        let url = self.url_with_segments(&["orders", order_id, "payments"])?;
        debug!("Fetching payments for order {order_id}");
        let result = self.send::<Value, ()>(Method::GET, url, None).await?;
        // The gateway answers with a bare array, but be lenient about `null` for orders with no attempts
        let payments: Vec<CashfreePayment> = match result {
            Value::Null => Vec::new(),
            v => serde_json::from_value(v).map_err(|e| CashfreeApiError::JsonError(e.to_string()))?,
        };
        trace!("Order {order_id} has {} payment attempts", payments.len());
        Ok(payments)
    }
}

#[cfg(test)]
mod test {
    use topup_common::Secret;

    use super::*;

    #[test]
    fn urls() {
        let config = CashfreeConfig {
            client_id: "id".into(),
            client_secret: Secret::new("secret".into()),
            ..Default::default()
        };
        let api = CashfreeApi::new(config).unwrap();
        assert_eq!(api.url("/orders/ORD1/payments"), "https://sandbox.cashfree.com/pg/orders/ORD1/payments");
        let url = api.url_with_segments(&["orders", "ORD1", "payments"]).unwrap();
        assert_eq!(url.as_str(), "https://sandbox.cashfree.com/pg/orders/ORD1/payments");
    }

    #[test]
    fn order_ids_are_escaped_in_paths() {
        let api = CashfreeApi::new(CashfreeConfig::default()).unwrap();
        let url = api.url_with_segments(&["orders", "../refunds/x y?z", "payments"]).unwrap();
        assert_eq!(url.as_str(), "https://sandbox.cashfree.com/pg/orders/..%2Frefunds%2Fx%20y%3Fz/payments");
        assert_eq!(url.path_segments().unwrap().count(), 4);
        let config = CashfreeConfig { base_url: Some("http://localhost:8080/pg/".into()), ..Default::default() };
        let api = CashfreeApi::new(config).unwrap();
        let url = api.url_with_segments(&["orders", "ORD 2", "payments"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/pg/orders/ORD%202/payments");
    }

    #[test]
    fn invalid_header_values_are_rejected() {
        let config = CashfreeConfig { client_id: "bad\nid".into(), ..Default::default() };
        assert!(matches!(CashfreeApi::new(config), Err(CashfreeApiError::Initialization(_))));
    }
}
