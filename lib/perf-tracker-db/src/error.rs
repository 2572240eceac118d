use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),
    #[error(transparent)]
    MigrateError(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    RedisError(#[from] redis::RedisError),
    #[error("malformed document: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
    #[error("cache operation on {0} timed out")]
    Timeout(String),
}
