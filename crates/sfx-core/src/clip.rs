//! Clip handles and the Clip Loader contract
//!
//! Clips are opaque to the pool. Decoding and streaming belong to the host
//! audio subsystem, which the pool only talks to through [`ClipLoader`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ClipStatus;

/// Clip identifier assigned by the host asset system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u32);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip:{}", self.0)
    }
}

/// Opaque audio clip handle
///
/// `length_secs` is import metadata; the pool uses it to time automatic
/// returns of transient voices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipHandle {
    pub id: ClipId,
    pub length_secs: f32,
}

impl ClipHandle {
    pub fn new(id: u32, length_secs: f32) -> Self {
        Self {
            id: ClipId(id),
            length_secs: length_secs.max(0.0),
        }
    }
}

/// Background clip loading, owned by the host audio subsystem
///
/// Requests are fire-and-forget; the pool never waits on them.
pub trait ClipLoader {
    /// Current load status of the clip
    fn load_state(&self, clip: ClipHandle) -> ClipStatus;

    /// Ask for the clip's audio data to be loaded
    fn request_load(&mut self, clip: ClipHandle);

    /// Ask for the clip's audio data to be released
    fn request_unload(&mut self, clip: ClipHandle);

    /// Whether the clip is flagged for preloading with its owning asset
    fn preload_flag(&self, clip: ClipHandle) -> bool;
}
