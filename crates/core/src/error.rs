use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A multi-row structural mutation was rolled back. Safe to retry.
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
