use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use chainpay_engine::traits::{InvoiceApiError, PaymentGatewayError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The notification conflicts with the invoice state. {0}")]
    StatusConflict(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::StatusConflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "success": false, "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No webhook signature found in the request.")]
    MissingSignature,
    #[error("Invalid webhook signature.")]
    InvalidSignature,
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match &e {
            PaymentGatewayError::InvalidNotification(_) => Self::InvalidRequestBody(e.to_string()),
            PaymentGatewayError::InvoiceNotFound(_) | PaymentGatewayError::NoMatchingInvoice(_, _) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentGatewayError::StatusConflict(_, _) => Self::StatusConflict(e.to_string()),
            PaymentGatewayError::DuplicateDepositAddress(_, _) => {
                // An upstream bug assigned one deposit address to several active invoices. Surface loudly;
                // picking one silently would credit the wrong merchant.
                error!("🚨️ Data integrity alert: {e}");
                Self::BackendError(e.to_string())
            },
            _ => Self::BackendError(e.to_string()),
        }
    }
}

impl From<InvoiceApiError> for ServerError {
    fn from(e: InvoiceApiError) -> Self {
        Self::BackendError(e.to_string())
    }
}
