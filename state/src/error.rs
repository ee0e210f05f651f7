use thiserror::Error;

/// Errors returned by the typed state wrappers
#[derive(Debug, Error)]
pub enum StateError {
    /// A key, value or queue element could not be encoded or decoded
    #[error("State codec error: {0}")]
    Codec(#[from] bincode::Error),
}
