use thiserror::Error;

use crate::id::{CollectionId, TransformId};

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown collection {0}")]
    UnknownCollection(CollectionId),

    #[error("unknown transform {0}")]
    UnknownTransform(TransformId),

    #[error("collection {collection} is already produced by {producer}")]
    AlreadyProduced {
        collection: CollectionId,
        producer: TransformId,
    },

    #[error("flatten of zero collections needs an explicit output coder")]
    MissingCoder,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
