use crate::provider::BoxError;

/// Error type for typed storage reads.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("no value stored under key {0:?}")]
    NotFound(String),
    #[error("value under key {key:?} is {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// Failure raised by a computation or value object, passed through as-is.
    #[error(transparent)]
    Resolve(#[from] BoxError),
}
