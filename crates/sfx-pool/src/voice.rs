//! Voice
//!
//! A [`Voice`] is the mutable runtime object that plays one
//! [`EffectDefinition`] at a time through its own playback channel.
//!
//! ## State machine
//!
//! ```text
//!            init(def)              play()
//!   Idle ─────────────► Ready ◄─────────────► Playing
//!    ▲                    │    stop() / clip end
//!    └────── deinit() ────┘
//! ```
//!
//! Per-play overrides (`set_clip_index`, `set_volume`, `set_pitch`,
//! `set_spatial`, `override_channel`) are queued and applied in order on
//! top of the ambient parameters of the next [`Voice::play`], then cleared.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfx_core::{ClipHandle, ClipLoader, Key, KeyId};
use std::fmt;
use std::sync::Arc;

use crate::definition::{ClipSelection, EffectDefinition, MAX_PITCH, MIN_PITCH, SpatialParams};
use crate::device::{PlaybackChannel, PlaybackDevice};
use crate::error::VoiceError;

/// Voice identifier, unique within one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Voice lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Unbound and disabled
    Idle,
    /// Bound, not producing audio
    Ready,
    /// Bound, the channel is producing audio
    Playing,
}

/// Where a voice lives in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOrigin {
    /// Pre-warmed at registration for this key
    Template(KeyId),
    /// Instantiated on demand for this key
    Linked(KeyId),
    /// Anonymous transient voice owned by the recycler
    Pooled,
}

impl VoiceOrigin {
    pub fn key_id(self) -> Option<KeyId> {
        match self {
            VoiceOrigin::Template(id) | VoiceOrigin::Linked(id) => Some(id),
            VoiceOrigin::Pooled => None,
        }
    }
}

/// Channel mutation run once on the next play
pub type ChannelOverride = Box<dyn FnOnce(&mut dyn PlaybackChannel) + Send>;

/// Pending per-play override
pub enum VoiceOverride {
    ClipIndex(usize),
    Volume(f32),
    Pitch(f32),
    Spatial(SpatialParams),
    /// Arbitrary device mutation, run after routing and just before the trigger
    Custom(ChannelOverride),
}

impl fmt::Debug for VoiceOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceOverride::ClipIndex(i) => f.debug_tuple("ClipIndex").field(i).finish(),
            VoiceOverride::Volume(v) => f.debug_tuple("Volume").field(v).finish(),
            VoiceOverride::Pitch(p) => f.debug_tuple("Pitch").field(p).finish(),
            VoiceOverride::Spatial(s) => f.debug_tuple("Spatial").field(s).finish(),
            VoiceOverride::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Parameters pushed to the channel by the last successful play
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    pub clip_index: usize,
    pub clip: ClipHandle,
    pub looping: bool,
    pub volume: f32,
    pub pitch: f32,
    pub priority: u16,
    pub spatial: SpatialParams,
}

// ═══════════════════════════════════════════════════════════════════════════════
// VOICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime playback object bound to at most one effect definition
pub struct Voice {
    id: VoiceId,
    origin: VoiceOrigin,
    definition: Option<Arc<EffectDefinition>>,
    clip_index: usize,
    overrides: Vec<VoiceOverride>,
    enabled: bool,
    channel: Option<Box<dyn PlaybackChannel>>,
    rng: StdRng,
    /// Bumped every time a pooled voice is leased
    lease: u64,
    last_params: Option<PlaybackParams>,
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("key", &self.key())
            .field("clip_index", &self.clip_index)
            .field("overrides", &self.overrides)
            .field("enabled", &self.enabled)
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}

impl Voice {
    /// Create an idle, disabled voice around a channel
    pub fn new(
        id: VoiceId,
        origin: VoiceOrigin,
        mut channel: Box<dyn PlaybackChannel>,
        seed: u64,
    ) -> Self {
        channel.set_enabled(false);
        Self {
            id,
            origin,
            definition: None,
            clip_index: 0,
            overrides: Vec::new(),
            enabled: false,
            channel: Some(channel),
            rng: StdRng::seed_from_u64(seed),
            lease: 0,
            last_params: None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Bind a definition and enable the voice
    pub fn init(&mut self, definition: Arc<EffectDefinition>) {
        self.clip_index = definition.initial_clip_index();
        self.definition = Some(definition);
        self.overrides.clear();
        self.last_params = None;
        self.enabled = true;
        if let Some(channel) = &mut self.channel {
            channel.set_enabled(true);
        }
    }

    /// Unbind and disable. Safe to call repeatedly.
    pub fn deinit(&mut self) {
        if self.definition.is_none() && !self.enabled {
            return;
        }
        if let Some(channel) = &mut self.channel {
            channel.stop();
            channel.set_enabled(false);
        }
        self.definition = None;
        self.overrides.clear();
        self.enabled = false;
    }

    /// Tear down and hand the channel back to the device
    pub fn destroy(mut self, device: &mut dyn PlaybackDevice) {
        self.deinit();
        if let Some(channel) = self.channel.take() {
            device.destroy_channel(channel);
        }
        log::trace!("Voice {} destroyed", self.id);
    }

    pub fn lease(&self) -> u64 {
        self.lease
    }

    pub(crate) fn bump_lease(&mut self) -> u64 {
        self.lease = self.lease.wrapping_add(1);
        self.lease
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PLAYBACK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Trigger playback of the bound definition
    ///
    /// Errors are logged and returned; pending overrides are consumed either
    /// way.
    pub fn play(&mut self) -> Result<&mut Self, VoiceError> {
        match self.trigger() {
            Ok(()) => Ok(self),
            Err(e) => {
                log::error!("{}", e);
                Err(e)
            }
        }
    }

    fn trigger(&mut self) -> Result<(), VoiceError> {
        let overrides = std::mem::take(&mut self.overrides);
        self.last_params = None;

        let definition = self
            .definition
            .clone()
            .ok_or(VoiceError::Unbound(self.id))?;
        let channel = self.channel.as_mut().ok_or(VoiceError::NoChannel(self.id))?;
        if definition.clips.is_empty() {
            return Err(VoiceError::EmptyClips {
                voice: self.id,
                key: definition.key.clone(),
            });
        }

        // Ambient parameters
        let mut clip_index = match definition.clip_selection {
            ClipSelection::Random if definition.clips.len() >= 2 => {
                self.rng.random_range(0..definition.clips.len())
            }
            _ => self.clip_index,
        };
        let mut volume = definition.volume;
        let mut pitch = definition.sample_pitch(&mut self.rng);
        let mut spatial = definition.spatial;

        // Overrides, last write wins
        let mut custom = Vec::new();
        for o in overrides {
            match o {
                VoiceOverride::ClipIndex(i) => clip_index = i,
                VoiceOverride::Volume(v) => volume = v,
                VoiceOverride::Pitch(p) => pitch = p,
                VoiceOverride::Spatial(s) => spatial = s,
                VoiceOverride::Custom(f) => custom.push(f),
            }
        }

        if clip_index >= definition.clips.len() {
            clip_index = 0;
        }
        let clip = definition.clips[clip_index];

        channel.set_loop(definition.looping);
        channel.set_volume(volume);
        channel.set_pitch(pitch);
        channel.set_priority(definition.priority);
        channel.set_spatial(&spatial);
        if let Some(group) = definition.mixer_group() {
            channel.set_output_group(&group);
        }
        for f in custom {
            f(&mut **channel);
        }

        let played = if definition.is_virtual {
            channel.play_one_shot(clip)
        } else {
            channel.bind_and_play(clip)
        };
        played.map_err(|source| VoiceError::Device {
            voice: self.id,
            source,
        })?;

        self.last_params = Some(PlaybackParams {
            clip_index,
            clip,
            looping: definition.looping,
            volume,
            pitch,
            priority: definition.priority,
            spatial,
        });
        Ok(())
    }

    /// Halt playback immediately. Safe while idle.
    pub fn stop(&mut self) {
        if let Some(channel) = &mut self.channel {
            channel.stop();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OVERRIDES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Use this clip on the next play; out of range falls back to clip 0
    pub fn set_clip_index(&mut self, index: usize) -> &mut Self {
        let count = self.definition.as_ref().map_or(0, |d| d.clips.len());
        let index = if index < count {
            index
        } else {
            log::warn!(
                "Clip index {} out of range for voice {} ('{}', {} clips), using 0",
                index,
                self.id,
                self.key().map(|k| k.to_string()).unwrap_or_default(),
                count
            );
            0
        };
        self.overrides.push(VoiceOverride::ClipIndex(index));
        self
    }

    /// Volume for the next play, clamped to [0, 1]
    pub fn set_volume(&mut self, volume: f32) -> &mut Self {
        self.overrides.push(VoiceOverride::Volume(volume.clamp(0.0, 1.0)));
        self
    }

    /// Pitch for the next play, clamped to [-3, 3]
    pub fn set_pitch(&mut self, pitch: f32) -> &mut Self {
        self.overrides
            .push(VoiceOverride::Pitch(pitch.clamp(MIN_PITCH, MAX_PITCH)));
        self
    }

    pub fn set_spatial(&mut self, spatial: SpatialParams) -> &mut Self {
        self.overrides.push(VoiceOverride::Spatial(spatial));
        self
    }

    /// Move the channel (applied immediately)
    pub fn set_position(&mut self, position: [f32; 3]) -> &mut Self {
        if let Some(channel) = &mut self.channel {
            channel.set_position(position);
        }
        self
    }

    /// Queue an arbitrary channel mutation for the next play
    pub fn override_channel(
        &mut self,
        f: impl FnOnce(&mut dyn PlaybackChannel) + Send + 'static,
    ) -> &mut Self {
        self.overrides.push(VoiceOverride::Custom(Box::new(f)));
        self
    }

    pub fn pending_overrides(&self) -> &[VoiceOverride] {
        &self.overrides
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLIP DATA
    // ═══════════════════════════════════════════════════════════════════════════

    /// Load the bound definition's clips. False if unbound.
    pub fn load(&self, loader: &mut dyn ClipLoader) -> bool {
        match &self.definition {
            Some(definition) => {
                definition.load(loader);
                true
            }
            None => false,
        }
    }

    /// Unload the bound definition's clips. False if unbound.
    pub fn unload(&self, loader: &mut dyn ClipLoader) -> bool {
        match &self.definition {
            Some(definition) => {
                definition.unload(loader);
                true
            }
            None => false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn origin(&self) -> VoiceOrigin {
        self.origin
    }

    pub fn state(&self) -> VoiceState {
        if self.definition.is_none() {
            VoiceState::Idle
        } else if self.is_playing() {
            VoiceState::Playing
        } else {
            VoiceState::Ready
        }
    }

    /// Enabled and eligible for reuse
    pub fn is_active(&self) -> bool {
        self.enabled
    }

    pub fn is_playing(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_playing())
    }

    pub fn is_virtual(&self) -> bool {
        self.definition.as_ref().is_some_and(|d| d.is_virtual)
    }

    pub fn key(&self) -> Option<&Key> {
        self.definition.as_ref().map(|d| &d.key)
    }

    pub fn definition(&self) -> Option<&Arc<EffectDefinition>> {
        self.definition.as_ref()
    }

    /// Clip selected by the last play
    pub fn active_clip(&self) -> Option<ClipHandle> {
        self.last_params.map(|p| p.clip)
    }

    /// Pitch selected by the last play
    pub fn active_pitch(&self) -> Option<f32> {
        self.last_params.map(|p| p.pitch)
    }

    pub fn last_params(&self) -> Option<&PlaybackParams> {
        self.last_params.as_ref()
    }

    pub fn channel(&self) -> Option<&dyn PlaybackChannel> {
        self.channel.as_deref()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
