//! Playback Device contract
//!
//! The pool never produces audio itself. Each [`Voice`](crate::Voice) owns one
//! [`PlaybackChannel`] created by the host's [`PlaybackDevice`] from a
//! [`VoiceTemplate`], and pushes its final per-play parameters into it.

use serde::{Deserialize, Serialize};
use sfx_core::{ClipHandle, MixerGroup};
use std::fmt;

use crate::definition::SpatialParams;
use crate::error::DeviceError;

/// Named recipe for instantiating playback channels
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoiceTemplate {
    pub name: String,
}

impl VoiceTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for VoiceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One device output channel
pub trait PlaybackChannel {
    /// Enable or disable the owning container; disabling silences the channel
    fn set_enabled(&mut self, enabled: bool);
    fn set_loop(&mut self, looping: bool);
    fn set_volume(&mut self, volume: f32);
    fn set_pitch(&mut self, pitch: f32);
    fn set_priority(&mut self, priority: u16);
    fn set_spatial(&mut self, spatial: &SpatialParams);
    fn set_output_group(&mut self, group: &MixerGroup);
    fn set_position(&mut self, position: [f32; 3]);

    /// Fire-and-forget playback, may overlap with other plays on this channel
    fn play_one_shot(&mut self, clip: ClipHandle) -> Result<(), DeviceError>;

    /// Bind the clip as the channel's exclusive stream and start it,
    /// replacing any stream in flight
    fn bind_and_play(&mut self, clip: ClipHandle) -> Result<(), DeviceError>;

    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn current_clip(&self) -> Option<ClipHandle>;
}

/// Audio output owned by the host
pub trait PlaybackDevice {
    fn create_channel(
        &mut self,
        template: &VoiceTemplate,
    ) -> Result<Box<dyn PlaybackChannel>, DeviceError>;

    /// Release a channel the pool no longer needs
    fn destroy_channel(&mut self, channel: Box<dyn PlaybackChannel>);

    /// Set a named mixer parameter, in dB
    fn set_mixer_parameter(&mut self, name: &str, value_db: f32) -> Result<(), DeviceError>;
}
