use sqlx::PgPool;

use crate::{
    app_error::AppError, domain::entities::payment_method::PaymentMethodDetails,
};

const MAX_JSON_LOG_LEN: usize = 200;

/// Decode a stored payment method `info` column, logging and falling back to
/// `Unknown` when the JSON does not match its type tag.
pub fn parse_payment_method_info(
    kind: &str,
    json: serde_json::Value,
    payment_method_id: &str,
) -> PaymentMethodDetails {
    let raw_str = json.to_string();
    PaymentMethodDetails::from_info(kind, json).unwrap_or_else(|err| {
        let truncated = if raw_str.len() > MAX_JSON_LOG_LEN {
            format!("{}...", raw_str.chars().take(MAX_JSON_LOG_LEN).collect::<String>())
        } else {
            raw_str
        };

        tracing::warn!(
            payment_method_id = payment_method_id,
            kind = kind,
            raw_json = %truncated,
            error = %err,
            "Failed to parse payment method info, using unknown details"
        );
        PaymentMethodDetails::Unknown
    })
}

pub mod customer;
pub mod event;
pub mod in_memory;
pub mod invoice;
pub mod payment_method;
pub mod store;
pub mod subscription;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // PostgreSQL unique violation
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::InvalidInput("A record with this value already exists".into())
                }
                // PostgreSQL not-null violation
                else if msg.contains("null value") && msg.contains("violates not-null") {
                    AppError::InvalidInput("Required field is missing".into())
                } else {
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
