use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported database type '{0}', expected one of: mysql, postgresql")]
    UnsupportedDatabase(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid secret override for '{secret_id}': {reason}")]
    InvalidOverride { secret_id: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
