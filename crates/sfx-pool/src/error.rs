//! Error types for the effect pool
//!
//! Nothing here is fatal. Configuration defects skip the offending
//! registration, lookup misses surface as `None`, and voice errors are
//! reported and then playback continues best-effort.

use sfx_core::{Key, SfxError};
use thiserror::Error;

use crate::voice::VoiceId;

/// Errors reported by a [`PlaybackDevice`](crate::PlaybackDevice) or its channels
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("Failed to create channel from template '{0}'")]
    ChannelCreation(String),

    #[error("Unknown mixer parameter '{0}'")]
    UnknownParameter(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Registration and pool-management errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("Effect '{name}' uses the reserved empty key")]
    ReservedKey { name: String },

    #[error("The key '{key}' assigned to '{name}' already exists; '{name}' will not be added")]
    DuplicateKey { key: Key, name: String },

    #[error("An effect set with key '{0}' is already registered")]
    DuplicateSet(Key),

    #[error("Effect '{key}' has no clips")]
    EmptyClips { key: Key },

    #[error("No voice template available for '{key}' (no override and no default template)")]
    MissingTemplate { key: Key },

    #[error("Voice {0} does not exist")]
    UnknownVoice(VoiceId),

    #[error("Voice {0} is linked to a key and does not belong to the recycling pool")]
    NotPooled(VoiceId),

    #[error("Voice {0} was released twice")]
    AlreadyReleased(VoiceId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Core(#[from] SfxError),
}

impl PoolError {
    /// Duplicates are expected while merging catalogs and only warrant a warning
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PoolError::DuplicateKey { .. } | PoolError::DuplicateSet(_))
    }
}

/// Errors raised while triggering a voice
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("Attempted to play voice {0} with no playback channel")]
    NoChannel(VoiceId),

    #[error("Attempted to play voice {0} with no effect definition bound")]
    Unbound(VoiceId),

    #[error("Attempted to play effect '{key}' on voice {voice} with no clips")]
    EmptyClips { voice: VoiceId, key: Key },

    #[error("Device rejected playback on voice {voice}: {source}")]
    Device {
        voice: VoiceId,
        #[source]
        source: DeviceError,
    },
}

/// Result type alias
pub type PoolResult<T> = Result<T, PoolError>;
