//! Webhook signature middleware for Actix Web.
//!
//! Cashfree signs each webhook delivery with the merchant secret. The signature is carried in the
//! `x-webhook-signature` header and covers the `x-webhook-timestamp` header followed by the raw request body.
//!
//! The middleware reads the whole body, checks the signature against the [`WebhookSecret`] in the app data, and hands
//! the untouched body on to the route handler. Requests that fail the check are answered with 401 and never reach
//! the handler. If no secret is configured, every delivery fails the check.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
};
use cashfree_tools::verify_webhook_signature;
use futures::future::LocalBoxFuture;
use log::{trace, warn};

use crate::{config::WebhookSecret, errors::ServerError, helpers::header_value};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";

#[derive(Default)]
pub struct WebhookSignatureMiddlewareFactory;

impl WebhookSignatureMiddlewareFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookSignatureMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct WebhookSignatureMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature");
            let secret = req.app_data::<web::Data<WebhookSecret>>().map(|s| s.0.reveal().clone()).unwrap_or_default();
            let signature = header_value(&req, SIGNATURE_HEADER).map(String::from);
            let timestamp = header_value(&req, TIMESTAMP_HEADER).map(String::from);
            let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
                warn!("🔐️ Webhook delivery is missing its signature headers. Denying access.");
                return Err(ServerError::InvalidSignature.into());
            };
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract webhook body: {e:?}");
                ServerError::InvalidRequestBody("Failed to read request body.".into())
            })?;
            if verify_webhook_signature(&signature, data.as_ref(), &timestamp, &secret) {
                trace!("🔐️ Webhook signature ✅️");
                req.set_payload(bytes_to_payload(data));
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature. Denying access.");
                Err(ServerError::InvalidSignature.into())
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
