use crate::domain::order::OrderError;

// ============================================================================
// Query Errors
// ============================================================================
//
// Store failures are not handled here; they propagate to the caller as-is.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Order id list cannot be empty")]
    EmptyOrderIds,

    #[error("Invalid row data: {0}")]
    InvalidRow(#[from] OrderError),
}

pub type QueryResult<T> = Result<T, QueryError>;
