//! Headless backend
//!
//! In-memory [`PlaybackDevice`] and [`ClipLoader`] for hosts without audio
//! output (dedicated servers, tools, tests). Channels record every call and
//! simulate playback time, so clip completion can be driven with
//! [`HeadlessDevice::advance`]. Handles are cheap to clone and share state.

use parking_lot::Mutex;
use sfx_core::{ClipHandle, ClipId, ClipLoader, ClipStatus, MixerGroup};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::definition::SpatialParams;
use crate::device::{PlaybackChannel, PlaybackDevice, VoiceTemplate};
use crate::error::DeviceError;
use crate::scheduler::clock_secs;

/// Headless channel identifier
pub type ChannelId = u64;

// ═══════════════════════════════════════════════════════════════════════════════
// CALL LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// One recorded channel call
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Enabled(bool),
    Loop(bool),
    Volume(f32),
    Pitch(f32),
    Priority(u16),
    Spatial(SpatialParams),
    OutputGroup(MixerGroup),
    Position([f32; 3]),
    PlayOneShot(ClipHandle),
    BindAndPlay(ClipHandle),
    Stop,
}

impl ChannelCall {
    #[inline]
    pub fn is_trigger(&self) -> bool {
        matches!(self, ChannelCall::PlayOneShot(_) | ChannelCall::BindAndPlay(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEVICE STATE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct Stream {
    clip: ClipHandle,
    /// `None` while looping
    ends_at: Option<f64>,
}

#[derive(Debug)]
struct ChannelState {
    template: String,
    enabled: bool,
    looping: bool,
    pitch: f32,
    one_shots: Vec<f64>,
    stream: Option<Stream>,
    calls: Vec<ChannelCall>,
}

impl ChannelState {
    fn new(template: &VoiceTemplate) -> Self {
        Self {
            template: template.name.clone(),
            enabled: false,
            looping: false,
            pitch: 1.0,
            one_shots: Vec::new(),
            stream: None,
            calls: Vec::new(),
        }
    }

    fn play_time(&self, clip: ClipHandle) -> f64 {
        let rate = self.pitch.abs();
        if rate > 1e-3 {
            clock_secs(clip.length_secs / rate)
        } else {
            clock_secs(clip.length_secs)
        }
    }

    fn is_playing(&self, now: f64) -> bool {
        if !self.enabled {
            return false;
        }
        let stream_playing = self
            .stream
            .as_ref()
            .is_some_and(|s| s.ends_at.is_none_or(|end| end > now));
        stream_playing || self.one_shots.iter().any(|&end| end > now)
    }

    fn stop(&mut self) {
        self.one_shots.clear();
        if let Some(stream) = &mut self.stream {
            stream.ends_at = Some(f64::NEG_INFINITY);
        }
    }
}

#[derive(Debug, Default)]
struct DeviceState {
    now: f64,
    next_channel: ChannelId,
    channels: HashMap<ChannelId, ChannelState>,
    created: usize,
    destroyed: usize,
    mixer: HashMap<String, f32>,
    failing_templates: HashSet<String>,
    exposed_parameters: Option<HashSet<String>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEADLESS DEVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Simulated playback device
#[derive(Debug, Clone, Default)]
pub struct HeadlessDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated time, letting clips finish
    pub fn advance(&self, dt: f64) {
        let mut state = self.state.lock();
        state.now += dt.max(0.0);
        let now = state.now;
        for channel in state.channels.values_mut() {
            channel.one_shots.retain(|&end| end > now);
        }
    }

    pub fn now(&self) -> f64 {
        self.state.lock().now
    }

    /// Make channel creation fail for a template
    pub fn fail_template(&self, name: impl Into<String>) {
        self.state.lock().failing_templates.insert(name.into());
    }

    /// Restrict accepted mixer parameters (all names accepted by default)
    pub fn expose_parameters<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().exposed_parameters = Some(names.into_iter().map(Into::into).collect());
    }

    pub fn mixer_parameter(&self, name: &str) -> Option<f32> {
        self.state.lock().mixer.get(name).copied()
    }

    pub fn channels_created(&self) -> usize {
        self.state.lock().created
    }

    pub fn channels_destroyed(&self) -> usize {
        self.state.lock().destroyed
    }

    pub fn channels_alive(&self) -> usize {
        self.state.lock().channels.len()
    }

    /// Template names of live channels
    pub fn live_templates(&self) -> Vec<String> {
        self.state
            .lock()
            .channels
            .values()
            .map(|c| c.template.clone())
            .collect()
    }

    /// Calls recorded on one channel
    pub fn calls(&self, channel: ChannelId) -> Vec<ChannelCall> {
        self.state
            .lock()
            .channels
            .get(&channel)
            .map(|c| c.calls.clone())
            .unwrap_or_default()
    }

    /// Count matching calls across all live channels
    pub fn count_calls(&self, predicate: impl Fn(&ChannelCall) -> bool) -> usize {
        self.state
            .lock()
            .channels
            .values()
            .flat_map(|c| c.calls.iter())
            .filter(|call| predicate(call))
            .count()
    }

    /// Channels currently producing audio
    pub fn playing_channels(&self) -> usize {
        let state = self.state.lock();
        let now = state.now;
        state
            .channels
            .values()
            .filter(|c| c.is_playing(now))
            .count()
    }
}

impl PlaybackDevice for HeadlessDevice {
    fn create_channel(
        &mut self,
        template: &VoiceTemplate,
    ) -> Result<Box<dyn PlaybackChannel>, DeviceError> {
        let mut state = self.state.lock();
        if state.failing_templates.contains(&template.name) {
            return Err(DeviceError::ChannelCreation(template.name.clone()));
        }

        let id = state.next_channel;
        state.next_channel += 1;
        state.created += 1;
        state.channels.insert(id, ChannelState::new(template));
        log::trace!("Headless channel {} created from '{}'", id, template);

        Ok(Box::new(HeadlessChannel {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    fn destroy_channel(&mut self, channel: Box<dyn PlaybackChannel>) {
        // Dropping the box removes the channel state
        drop(channel);
        self.state.lock().destroyed += 1;
    }

    fn set_mixer_parameter(&mut self, name: &str, value_db: f32) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if let Some(exposed) = &state.exposed_parameters {
            if !exposed.contains(name) {
                return Err(DeviceError::UnknownParameter(name.to_string()));
            }
        }
        state.mixer.insert(name.to_string(), value_db);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEADLESS CHANNEL
// ═══════════════════════════════════════════════════════════════════════════════

/// Channel handed out by [`HeadlessDevice`]
pub struct HeadlessChannel {
    id: ChannelId,
    state: Arc<Mutex<DeviceState>>,
}

impl HeadlessChannel {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn with<R>(&self, f: impl FnOnce(&mut ChannelState, f64) -> R) -> Option<R> {
        let mut state = self.state.lock();
        let now = state.now;
        state.channels.get_mut(&self.id).map(|c| f(c, now))
    }

    fn record(&self, call: ChannelCall, f: impl FnOnce(&mut ChannelState)) {
        self.with(|c, _| {
            c.calls.push(call);
            f(c);
        });
    }
}

impl Drop for HeadlessChannel {
    fn drop(&mut self) {
        self.state.lock().channels.remove(&self.id);
    }
}

impl PlaybackChannel for HeadlessChannel {
    fn set_enabled(&mut self, enabled: bool) {
        self.record(ChannelCall::Enabled(enabled), |c| {
            c.enabled = enabled;
            if !enabled {
                c.stop();
            }
        });
    }

    fn set_loop(&mut self, looping: bool) {
        self.record(ChannelCall::Loop(looping), |c| c.looping = looping);
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(ChannelCall::Volume(volume), |_| {});
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.record(ChannelCall::Pitch(pitch), |c| c.pitch = pitch);
    }

    fn set_priority(&mut self, priority: u16) {
        self.record(ChannelCall::Priority(priority), |_| {});
    }

    fn set_spatial(&mut self, spatial: &SpatialParams) {
        self.record(ChannelCall::Spatial(*spatial), |_| {});
    }

    fn set_output_group(&mut self, group: &MixerGroup) {
        self.record(ChannelCall::OutputGroup(group.clone()), |_| {});
    }

    fn set_position(&mut self, position: [f32; 3]) {
        self.record(ChannelCall::Position(position), |_| {});
    }

    fn play_one_shot(&mut self, clip: ClipHandle) -> Result<(), DeviceError> {
        self.with(|c, now| {
            c.calls.push(ChannelCall::PlayOneShot(clip));
            if !c.enabled {
                return Err(DeviceError::Backend("channel is disabled".into()));
            }
            let end = now + c.play_time(clip);
            c.one_shots.push(end);
            Ok(())
        })
        .unwrap_or_else(|| Err(DeviceError::Backend("channel was destroyed".into())))
    }

    fn bind_and_play(&mut self, clip: ClipHandle) -> Result<(), DeviceError> {
        self.with(|c, now| {
            c.calls.push(ChannelCall::BindAndPlay(clip));
            if !c.enabled {
                return Err(DeviceError::Backend("channel is disabled".into()));
            }
            let ends_at = if c.looping {
                None
            } else {
                Some(now + c.play_time(clip))
            };
            c.stream = Some(Stream { clip, ends_at });
            Ok(())
        })
        .unwrap_or_else(|| Err(DeviceError::Backend("channel was destroyed".into())))
    }

    fn stop(&mut self) {
        self.record(ChannelCall::Stop, |c| c.stop());
    }

    fn is_playing(&self) -> bool {
        self.with(|c, now| c.is_playing(now)).unwrap_or(false)
    }

    fn current_clip(&self) -> Option<ClipHandle> {
        self.with(|c, _| c.stream.as_ref().map(|s| s.clip)).flatten()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEADLESS LOADER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct LoaderState {
    status: HashMap<ClipId, ClipStatus>,
    preload: HashSet<ClipId>,
    failing: HashSet<ClipId>,
    load_requests: usize,
    unload_requests: usize,
}

/// Simulated background clip loader
///
/// Requested loads stay `Loading` until [`finish_loads`](Self::finish_loads).
#[derive(Debug, Clone, Default)]
pub struct HeadlessLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl HeadlessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every pending load (or fail it for clips marked failing)
    pub fn finish_loads(&self) {
        let mut state = self.state.lock();
        let LoaderState {
            status, failing, ..
        } = &mut *state;
        for (id, s) in status.iter_mut() {
            if *s == ClipStatus::Loading {
                *s = if failing.contains(id) {
                    ClipStatus::Failed
                } else {
                    ClipStatus::Loaded
                };
            }
        }
    }

    pub fn set_status(&self, clip: ClipHandle, status: ClipStatus) {
        self.state.lock().status.insert(clip.id, status);
    }

    pub fn set_preload(&self, clip: ClipHandle, preload: bool) {
        let mut state = self.state.lock();
        if preload {
            state.preload.insert(clip.id);
        } else {
            state.preload.remove(&clip.id);
        }
    }

    /// Loads of this clip will fail
    pub fn fail_clip(&self, clip: ClipHandle) {
        self.state.lock().failing.insert(clip.id);
    }

    pub fn load_requests(&self) -> usize {
        self.state.lock().load_requests
    }

    pub fn unload_requests(&self) -> usize {
        self.state.lock().unload_requests
    }
}

impl ClipLoader for HeadlessLoader {
    fn load_state(&self, clip: ClipHandle) -> ClipStatus {
        self.state
            .lock()
            .status
            .get(&clip.id)
            .copied()
            .unwrap_or_default()
    }

    fn request_load(&mut self, clip: ClipHandle) {
        let mut state = self.state.lock();
        state.load_requests += 1;
        state.status.insert(clip.id, ClipStatus::Loading);
    }

    fn request_unload(&mut self, clip: ClipHandle) {
        let mut state = self.state.lock();
        state.unload_requests += 1;
        state.status.insert(clip.id, ClipStatus::Unloaded);
    }

    fn preload_flag(&self, clip: ClipHandle) -> bool {
        self.state.lock().preload.contains(&clip.id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_finishes_after_clip_length() {
        let mut device = HeadlessDevice::new();
        let mut channel = device.create_channel(&VoiceTemplate::new("default")).unwrap();
        channel.set_enabled(true);
        channel.play_one_shot(ClipHandle::new(1, 2.0)).unwrap();

        assert!(channel.is_playing());
        device.advance(1.0);
        assert!(channel.is_playing());
        device.advance(1.5);
        assert!(!channel.is_playing());
        // One-shots never bind the stream clip
        assert_eq!(channel.current_clip(), None);
    }

    #[test]
    fn test_looping_stream_plays_until_stopped() {
        let mut device = HeadlessDevice::new();
        let mut channel = device.create_channel(&VoiceTemplate::new("default")).unwrap();
        channel.set_enabled(true);
        channel.set_loop(true);
        channel.bind_and_play(ClipHandle::new(4, 0.5)).unwrap();

        device.advance(100.0);
        assert!(channel.is_playing());
        assert_eq!(channel.current_clip(), Some(ClipHandle::new(4, 0.5)));

        channel.stop();
        assert!(!channel.is_playing());
    }

    #[test]
    fn test_disabled_channel_rejects_playback() {
        let mut device = HeadlessDevice::new();
        let mut channel = device.create_channel(&VoiceTemplate::new("default")).unwrap();
        assert!(channel.play_one_shot(ClipHandle::new(1, 1.0)).is_err());
    }

    #[test]
    fn test_destroy_removes_channel() {
        let mut device = HeadlessDevice::new();
        let channel = device.create_channel(&VoiceTemplate::new("default")).unwrap();
        assert_eq!(device.channels_alive(), 1);

        device.destroy_channel(channel);
        assert_eq!(device.channels_alive(), 0);
        assert_eq!(device.channels_destroyed(), 1);
    }

    #[test]
    fn test_failing_template() {
        let mut device = HeadlessDevice::new();
        device.fail_template("broken");
        assert!(matches!(
            device.create_channel(&VoiceTemplate::new("broken")),
            Err(DeviceError::ChannelCreation(_))
        ));
    }

    #[test]
    fn test_mixer_parameters() {
        let mut device = HeadlessDevice::new();
        device.set_mixer_parameter("music", -6.0).unwrap();
        assert_eq!(device.mixer_parameter("music"), Some(-6.0));

        device.expose_parameters(["sfx"]);
        assert!(device.set_mixer_parameter("music", 0.0).is_err());
    }

    #[test]
    fn test_loader_failures() {
        let mut loader = HeadlessLoader::new();
        let clip = ClipHandle::new(9, 1.0);
        loader.fail_clip(clip);
        loader.request_load(clip);
        assert_eq!(loader.load_state(clip), ClipStatus::Loading);

        loader.finish_loads();
        assert_eq!(loader.load_state(clip), ClipStatus::Failed);
    }
}
