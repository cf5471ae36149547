use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found")]
    NotFound,

    /// Network or I/O failure talking to the payment provider. Never retried here.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Structured non-2xx response from the payment provider.
    #[error("Provider error {status}: {message}")]
    Provider {
        status: u16,
        message: String,
        kind: String,
    },

    /// The subscription was created remotely but its payment intent did not
    /// settle. Nothing was persisted; the caller owns reconciliation.
    #[error("Payment failed for invoice {invoice_id}: {status}")]
    PaymentFailure { invoice_id: String, status: String },

    #[error("Event already processed")]
    DuplicateEvent,

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Invalid signature: {0}")]
    SignatureInvalid(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    InvalidInput,
    ValidationError,
    NotFound,
    TransportError,
    ProviderError,
    PaymentFailure,
    DuplicateEvent,
    UnknownResource,
    SignatureInvalid,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::PaymentFailure => "PAYMENT_FAILURE",
            ErrorCode::DuplicateEvent => "DUPLICATE_EVENT",
            ErrorCode::UnknownResource => "UNKNOWN_RESOURCE",
            ErrorCode::SignatureInvalid => "SIGNATURE_INVALID",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::ValidationError(_) => ErrorCode::ValidationError,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Transport(_) => ErrorCode::TransportError,
            AppError::Provider { .. } => ErrorCode::ProviderError,
            AppError::PaymentFailure { .. } => ErrorCode::PaymentFailure,
            AppError::DuplicateEvent => ErrorCode::DuplicateEvent,
            AppError::UnknownResource(_) => ErrorCode::UnknownResource,
            AppError::SignatureInvalid(_) => ErrorCode::SignatureInvalid,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
