/// Errors raised inside the storage layer.
///
/// Store methods surface `anyhow::Result` at the crate boundary; this type
/// carries the cases that need to stay matchable (missing rows, corrupt
/// JSON columns) through that boundary via downcasting.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A stored column failed enum or JSON decoding. Indicates a row
    /// written by an incompatible version, not a caller mistake.
    #[error("storage: corrupt column '{column}' on {entity} {id}: {reason}")]
    CorruptColumn {
        entity: &'static str,
        id: String,
        column: &'static str,
        reason: String,
    },

    /// An underlying database error.
    #[error("storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization failure for `*_json` columns.
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
