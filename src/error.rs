//! Error types shared across the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The shared buffer store could not be reached. Transient from the
    /// webhook's point of view; the gateway decides whether to redeliver.
    #[error("buffer store error: {0}")]
    Store(String),

    /// The answering engine failed to produce a reply.
    #[error("answer failed: {0}")]
    Answer(String),

    /// The messaging gateway rejected or never received the reply.
    #[error("notify failed: {0}")]
    Notify(String),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for Error {
    fn from(error: redis::RedisError) -> Self {
        Error::Store(error.to_string())
    }
}
