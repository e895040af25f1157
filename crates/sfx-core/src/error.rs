//! Error types for the sfx crates

use thiserror::Error;

use crate::KeyId;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SfxError {
    #[error("The reserved empty key cannot be registered")]
    ReservedKey,

    #[error("Key id {id} already names '{existing}', refusing to alias '{requested}'")]
    KeyCollision {
        id: KeyId,
        existing: String,
        requested: String,
    },

    #[error("Key registry exhausted after {0} entries")]
    RegistryFull(usize),
}

/// Result type alias
pub type SfxResult<T> = Result<T, SfxError>;
