// ============================================================================
// Order Data Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Unknown status value: {0}")]
    InvalidStatus(String),
}
