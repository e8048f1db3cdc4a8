use actix_web::dev::ServiceRequest;
use topup_engine::db_types::{AccountId, OrderId};

/// Fills the `{order_id}` and `{account_id}` placeholders in a return url template. Other placeholders, such as the
/// gateway's own `{payment_status}`, are left alone.
pub fn build_return_url(template: &str, order_id: &OrderId, account_id: &AccountId) -> String {
    template.replace("{order_id}", order_id.as_str()).replace("{account_id}", account_id.as_str())
}

/// The value of a header as a string, if it is present and readable.
pub fn header_value<'a>(req: &'a ServiceRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}
