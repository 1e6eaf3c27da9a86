use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// File-scoped: the document is unparseable or missing its sport object.
    /// The offending file is skipped; the batch continues.
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Data directory not found: {0}")]
    DataDirMissing(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
