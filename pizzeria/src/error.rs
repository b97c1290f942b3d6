use crate::model::FieldError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error taxonomy for the ordering core.
///
/// Validation and empty-cart failures are locally recoverable and never touch
/// server state. Sync failures leave the local cart store untouched so guest
/// data is never silently lost.
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("invalid customer details")]
    Validation(Vec<FieldError>),

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid or expired session")]
    Auth,

    #[error("order not found")]
    NotFound,

    #[error("cart sync failed: {0}")]
    Sync(#[source] BoxError),

    #[error("storage failure: {0}")]
    Storage(#[source] BoxError),
}

impl OrderingError {
    /// True when the underlying driver reported a unique-constraint hit.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            OrderingError::Storage(e) => e
                .downcast_ref::<sqlx::Error>()
                .and_then(|e| e.as_database_error())
                .is_some_and(|db| db.is_unique_violation()),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for OrderingError {
    fn from(e: sqlx::Error) -> Self {
        OrderingError::Storage(Box::new(e))
    }
}

impl From<serde_json::Error> for OrderingError {
    fn from(e: serde_json::Error) -> Self {
        OrderingError::Storage(Box::new(e))
    }
}
