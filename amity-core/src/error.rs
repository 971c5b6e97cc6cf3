use thiserror::Error;

/// Failure while persisting the relationship graph. Load-side problems are
/// handled internally by the store (backup recovery or reset), so only the
/// save path surfaces errors, and the caller rolls back its in-memory change.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write relation data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode relation data: {0}")]
    Serialize(#[from] serde_json::Error),
}
