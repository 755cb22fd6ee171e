//! Error handling for the Distributor Stock Ledger
//!
//! The ledger returns typed errors with enough context (product id,
//! requested vs. available quantity, offending entity) for callers to
//! render a precise message; HTTP status mapping is the caller's job.

use thiserror::Error;
use uuid::Uuid;

/// Ledger error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// The backing store aborted the operation due to a concurrent write.
    /// The only error class callers should retry automatically.
    #[error("Operation aborted by a concurrent write; safe to retry")]
    Concurrency,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the caller should retry the whole operation (with backoff)
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Concurrency)
    }

    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                // serialization_failure / deadlock_detected
                Some("40001") | Some("40P01") => return AppError::Concurrency,
                // unique_violation
                Some("23505") => {
                    return AppError::Conflict(format!(
                        "unique constraint violated: {}",
                        db_err.constraint().unwrap_or("unknown")
                    ))
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

/// Result type alias for ledger operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_concurrency_errors_are_retryable() {
        assert!(AppError::Concurrency.is_retryable());
        assert!(!AppError::NotFound("Product".to_string()).is_retryable());
        assert!(!AppError::InsufficientStock {
            product_id: Uuid::new_v4(),
            requested: 41,
            available: 0,
        }
        .is_retryable());
    }

    #[test]
    fn insufficient_stock_names_the_shortfall() {
        let product_id = Uuid::new_v4();
        let err = AppError::InsufficientStock {
            product_id,
            requested: 60,
            available: 40,
        };
        let message = err.to_string();
        assert!(message.contains(&product_id.to_string()));
        assert!(message.contains("requested 60"));
        assert!(message.contains("available 40"));
    }
}
