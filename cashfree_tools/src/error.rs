use thiserror::Error;

#[derive(Debug, Error)]
pub enum CashfreeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("The gateway did not respond in time: {0}")]
    Timeout(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl CashfreeApiError {
    /// The message to show an end user. Gateway error bodies carry a `message` field, which is used when available.
    pub fn user_message(&self) -> String {
        match self {
            Self::QueryError { message, .. } => message.clone(),
            _ => "Failed to create order".to_string(),
        }
    }
}
