use thiserror::Error;

/// Errors that can occur when interacting with the store.
///
/// These are infrastructure failures only. Business outcomes such as a
/// missing row are reported through `Option` return values so the domain
/// layer can decide what they mean.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted value could not be mapped back into a record.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
