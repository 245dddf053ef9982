use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bb_payment_engine::{OrderFlowError, ReconciliationError};
use razorpay_tools::RazorpayApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    NoRecordFound(String),
    #[error("The payment gateway request failed. {0}")]
    GatewayError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Bearer token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Bearer token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Bearer token has expired.")]
    TokenExpired,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::NotFound(_) => Self::NoRecordFound("Order not found".to_string()),
            OrderFlowError::ValidationFailure(s) => Self::InvalidRequestBody(s),
            OrderFlowError::PersistenceFailure(s) => Self::BackendError(s),
        }
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::SignatureMismatch => {
                Self::AuthenticationError(AuthError::ValidationError("Invalid payment signature".into()))
            },
            ReconciliationError::NotFound(_) => Self::NoRecordFound("Order not found".to_string()),
            ReconciliationError::ValidationFailure(s) => Self::InvalidRequestBody(s),
            ReconciliationError::PersistenceFailure(s) => Self::BackendError(s),
        }
    }
}

impl From<RazorpayApiError> for ServerError {
    fn from(e: RazorpayApiError) -> Self {
        match e {
            RazorpayApiError::InvalidAmount(s) => Self::InvalidRequestBody(s),
            e => Self::GatewayError(e.to_string()),
        }
    }
}
