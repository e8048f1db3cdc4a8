mod admin;
mod webhook_signature;

pub use admin::{AdminTokenMiddlewareFactory, AdminTokenMiddlewareService, ADMIN_TOKEN_HEADER};
pub use webhook_signature::{
    WebhookSignatureMiddlewareFactory,
    WebhookSignatureMiddlewareService,
    SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
