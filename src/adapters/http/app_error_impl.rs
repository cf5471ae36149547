use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        match self {
            AppError::DuplicateEvent => {
                tracing::debug!("Duplicate event acknowledged");
                error_resp(StatusCode::ACCEPTED, code, None)
            }
            AppError::PaymentFailure { invoice_id, status } => {
                tracing::warn!(invoice_id = %invoice_id, status = %status, "Payment failed");
                let body = serde_json::json!({
                    "code": code.as_str(),
                    "invoice_id": invoice_id,
                    "status": status,
                });
                (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
            }
            other => {
                // Log the error before it gets converted into a status response.
                tracing::error!(error = ?other, "Request failed");
                match other {
                    AppError::InvalidInput(msg)
                    | AppError::ValidationError(msg)
                    | AppError::SignatureInvalid(msg) => {
                        error_resp(StatusCode::BAD_REQUEST, code, Some(msg))
                    }
                    AppError::UnknownResource(kind) => error_resp(
                        StatusCode::BAD_REQUEST,
                        code,
                        Some(format!("unsupported resource kind {}", kind)),
                    ),
                    AppError::NotFound => error_resp(StatusCode::NOT_FOUND, code, None),
                    AppError::Provider { message, .. } => {
                        error_resp(StatusCode::BAD_GATEWAY, code, Some(message))
                    }
                    AppError::Transport(_) => error_resp(StatusCode::BAD_GATEWAY, code, None),
                    _ => error_resp(StatusCode::INTERNAL_SERVER_ERROR, code, None),
                }
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
