use runnel_core::coder::Coder;
use runnel_core::id::CollectionId;
use runnel_core::window::WindowFn;
use thiserror::Error;

/// Canonical result for translation.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Build-time failures. None of these are retried; they surface to the caller
/// of `translate`/`run` before any engine sees the plan.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("collection {collection} has no producer and no bound source")]
    UntranslatableGraph { collection: CollectionId },

    #[error("cycle through {collection} (path: {})", format_path(.path))]
    CyclicGraph {
        collection: CollectionId,
        path: Vec<CollectionId>,
    },

    #[error("no translator registered for transform '{urn}'")]
    UnsupportedTransform { urn: String },

    #[error(
        "incompatible element types: {left} is {left_coder} but {right} is {right_coder}"
    )]
    IncompatibleElementType {
        left: CollectionId,
        left_coder: Coder,
        right: CollectionId,
        right_coder: Coder,
    },

    #[error(
        "incompatible windowing: {left} is {left_window} but {right} is {right_window}"
    )]
    IncompatibleWindowing {
        left: CollectionId,
        left_window: WindowFn,
        right: CollectionId,
        right_window: WindowFn,
    },

    #[error("invalid transform '{transform}': {reason}")]
    InvalidTransform { transform: String, reason: String },

    #[error("encoding operator config: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] runnel_core::error::Error),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

fn format_path(path: &[CollectionId]) -> String {
    path.iter()
        .map(|c| c.get().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Failure of a full run: either translation failed, or the engine did.
/// Engine errors are passed through uninterpreted.
#[derive(Debug, Error)]
pub enum RunError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("engine failed: {0}")]
    Engine(#[source] E),
}
