use crate::store::StoreError;
use thiserror::Error;

pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("payload is {size} bytes, exceeds the {max}-byte cap")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("payload must not be empty")]
    EmptyPayload,

    #[error("prerequisites not met: {0}")]
    PrerequisitesNotMet(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
