use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use topup_engine::{GatewayError, RechargeError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("{0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The webhook signature is invalid.")]
    InvalidSignature,
    #[error("Admin routes are disabled on this server.")]
    AdminDisabled,
    #[error("A valid admin token is required.")]
    InvalidAdminToken,
    #[error("{0}")]
    Recharge(#[from] RechargeError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::InvalidAdminToken => StatusCode::UNAUTHORIZED,
            Self::AdminDisabled => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Recharge(e) => match e {
                RechargeError::Validation(_) => StatusCode::BAD_REQUEST,
                RechargeError::Gateway(GatewayError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
                RechargeError::Gateway(_) => StatusCode::BAD_GATEWAY,
                RechargeError::TerminalPayment { .. } => StatusCode::PAYMENT_REQUIRED,
                RechargeError::OrderNotFound(_, _) => StatusCode::NOT_FOUND,
                RechargeError::OrderAlreadyExists(_, _) => StatusCode::CONFLICT,
                RechargeError::RequiresManualReview(_) => StatusCode::CONFLICT,
                RechargeError::Conflict(_) => StatusCode::SERVICE_UNAVAILABLE,
                RechargeError::InternalProcessing { .. } | RechargeError::Database(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
