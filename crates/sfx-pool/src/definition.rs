//! Effect Definition
//!
//! An [`EffectDefinition`] is the authored, read-only description of one
//! sound: its clips, how a clip is chosen, pitch/volume variance,
//! spatialization and mixer routing. At runtime only two things happen to
//! it: clip data is loaded/unloaded, and an owning set may backfill its
//! mixer group.

use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sfx_core::{ClipHandle, ClipLoader, ClipStatus, Key, LoadState, MixerGroup};

use crate::device::VoiceTemplate;
use crate::error::{PoolError, PoolResult};

/// Default playback priority (0 = highest, 256 = lowest)
pub const DEFAULT_PRIORITY: u16 = 128;

/// Pitch limits accepted by the device
pub const MIN_PITCH: f32 = -3.0;
pub const MAX_PITCH: f32 = 3.0;

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// How a voice picks its clip on each play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipSelection {
    /// Always the clip at this index
    Fixed(usize),
    /// Uniformly random among clips (only with two or more clips)
    Random,
}

impl Default for ClipSelection {
    fn default() -> Self {
        ClipSelection::Fixed(0)
    }
}

/// How a voice picks its pitch on each play
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PitchMode {
    Fixed(f32),
    Random { min: f32, max: f32 },
}

impl Default for PitchMode {
    fn default() -> Self {
        PitchMode::Fixed(1.0)
    }
}

/// Spatial parameters passed through to the device untouched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialParams {
    /// 0 = 2D, 1 = fully 3D
    pub blend: f32,
    pub doppler: f32,
    /// Spread angle in degrees
    pub spread: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub reverb_zone_mix: f32,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            blend: 0.0,
            doppler: 1.0,
            spread: 0.0,
            min_distance: 1.0,
            max_distance: 500.0,
            reverb_zone_mix: 1.0,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECT DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Authored configuration for one sound
///
/// ## Example
///
/// ```rust
/// use sfx_core::ClipHandle;
/// use sfx_pool::EffectDefinition;
///
/// let footstep = EffectDefinition::new("player.footstep", "Footstep")
///     .with_clips([ClipHandle::new(1, 0.3), ClipHandle::new(2, 0.32)])
///     .with_random_clip()
///     .with_pitch_range(0.9, 1.1)
///     .with_volume(0.8);
///
/// assert!(footstep.is_virtual);
/// assert_eq!(footstep.clips.len(), 2);
/// ```
#[derive(Debug)]
pub struct EffectDefinition {
    /// Identity, unique within a pool
    pub key: Key,
    /// Authoring name (for diagnostics)
    pub name: String,
    pub clips: Vec<ClipHandle>,
    pub clip_selection: ClipSelection,
    pub pitch: PitchMode,
    /// Linear volume [0, 1]
    pub volume: f32,
    pub priority: u16,
    pub looping: bool,
    /// Virtual effects are one-shots that may overlap; non-virtual effects
    /// own their voice's channel exclusively
    pub is_virtual: bool,
    pub spatial: SpatialParams,
    /// Voice template to instantiate instead of the pool default
    pub template_override: Option<VoiceTemplate>,
    mixer_group: RwLock<Option<MixerGroup>>,
}

impl EffectDefinition {
    pub fn new(key: impl Into<Key>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            clips: Vec::new(),
            clip_selection: ClipSelection::default(),
            pitch: PitchMode::default(),
            volume: 1.0,
            priority: DEFAULT_PRIORITY,
            looping: false,
            is_virtual: true,
            spatial: SpatialParams::default(),
            template_override: None,
            mixer_group: RwLock::new(None),
        }
    }

    // === Builder methods ===

    pub fn with_clip(mut self, clip: ClipHandle) -> Self {
        self.clips.push(clip);
        self
    }

    pub fn with_clips(mut self, clips: impl IntoIterator<Item = ClipHandle>) -> Self {
        self.clips.extend(clips);
        self
    }

    pub fn with_fixed_clip(mut self, index: usize) -> Self {
        self.clip_selection = ClipSelection::Fixed(index);
        self
    }

    pub fn with_random_clip(mut self) -> Self {
        self.clip_selection = ClipSelection::Random;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = PitchMode::Fixed(pitch.clamp(MIN_PITCH, MAX_PITCH));
        self
    }

    pub fn with_pitch_range(mut self, min: f32, max: f32) -> Self {
        self.pitch = PitchMode::Random { min, max };
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority.min(256);
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_virtual(mut self, is_virtual: bool) -> Self {
        self.is_virtual = is_virtual;
        self
    }

    pub fn with_spatial(mut self, spatial: SpatialParams) -> Self {
        self.spatial = spatial;
        self
    }

    pub fn with_mixer_group(self, group: MixerGroup) -> Self {
        *self.mixer_group.write() = Some(group);
        self
    }

    pub fn with_template(mut self, template: VoiceTemplate) -> Self {
        self.template_override = Some(template);
        self
    }

    // === Mixer routing ===

    pub fn mixer_group(&self) -> Option<MixerGroup> {
        self.mixer_group.read().clone()
    }

    pub fn set_mixer_group(&self, group: Option<MixerGroup>) {
        *self.mixer_group.write() = group;
    }

    /// Assign `group` only if no group is set. Returns true if assigned.
    pub fn backfill_mixer_group(&self, group: &MixerGroup) -> bool {
        let mut slot = self.mixer_group.write();
        if slot.is_none() {
            *slot = Some(group.clone());
            true
        } else {
            false
        }
    }

    // === Clip data ===

    /// Request loading of every clip that is still unloaded
    ///
    /// Clips already loading or loaded are skipped, so repeated calls never
    /// queue duplicate loads.
    pub fn load(&self, loader: &mut dyn ClipLoader) {
        for clip in &self.clips {
            if loader.load_state(*clip) == ClipStatus::Unloaded {
                loader.request_load(*clip);
            }
        }
    }

    /// Request unloading of every clip that is not already unloaded
    pub fn unload(&self, loader: &mut dyn ClipLoader) {
        for clip in &self.clips {
            if loader.load_state(*clip) != ClipStatus::Unloaded {
                loader.request_unload(*clip);
            }
        }
    }

    /// True if any clip is not preloaded with its asset
    pub fn requires_loading(&self, loader: &dyn ClipLoader) -> bool {
        self.clips.iter().any(|clip| !loader.preload_flag(*clip))
    }

    /// OR of every clip's load state
    pub fn load_state(&self, loader: &dyn ClipLoader) -> LoadState {
        LoadState::reduce(
            self.clips
                .iter()
                .map(|clip| LoadState::from(loader.load_state(*clip))),
        )
    }

    // === Query methods ===

    /// Length of the longest clip
    pub fn max_duration_secs(&self) -> f32 {
        self.clips
            .iter()
            .map(|c| c.length_secs)
            .fold(0.0, f32::max)
    }

    /// Clip index a freshly bound voice starts from
    pub fn initial_clip_index(&self) -> usize {
        match self.clip_selection {
            ClipSelection::Fixed(index) if index < self.clips.len() => index,
            _ => 0,
        }
    }

    /// Pitch for one play: random in range, or the fixed value
    pub fn sample_pitch(&self, rng: &mut impl Rng) -> f32 {
        match self.pitch {
            PitchMode::Fixed(pitch) => pitch,
            PitchMode::Random { min, max } => {
                let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
                if !(lo.is_finite() && hi.is_finite()) || lo == hi {
                    return lo.clamp(MIN_PITCH, MAX_PITCH);
                }
                rng.random_range(lo..=hi).clamp(MIN_PITCH, MAX_PITCH)
            }
        }
    }

    /// Check the definition can be registered
    pub fn validate(&self) -> PoolResult<()> {
        if self.key.is_none() {
            return Err(PoolError::ReservedKey {
                name: self.name.clone(),
            });
        }
        if self.clips.is_empty() {
            return Err(PoolError::EmptyClips {
                key: self.key.clone(),
            });
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
