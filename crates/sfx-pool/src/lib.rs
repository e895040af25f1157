//! sfx-pool: Tag-keyed audio effect pool
//!
//! Resolves effect keys to playable voices for game code:
//! - Effect definitions and sets with bulk clip load/unload
//! - Key → voice resolution with a reuse rule for virtual/exclusive voices
//! - Transient definition-driven voices with a bounded recycler
//! - Lease-stamped auto-return through a lock-free queue
//! - Mixer volume in dB from a linear level
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        EFFECT POOL                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   Game code                 EffectPool                          │
//! │   ┌──────────────┐          ┌───────────────────────────────┐   │
//! │   │ play(key)    │─────────▶│ set_link    key → EffectSet   │   │
//! │   │ play_def()   │          │ prefab_link key → definition  │   │
//! │   │ load_set()   │          │ effect_link key → [Voice]     │   │
//! │   └──────────────┘          │ recycler    transient voices  │   │
//! │                             └──────┬────────────────┬───────┘   │
//! │                                    │                │           │
//! │                    PlaybackDevice  ▼   ClipLoader   ▼           │
//! │                   ┌─────────────────┐ ┌─────────────────┐       │
//! │                   │ channels, mixer │ │ async clip data │       │
//! │                   └─────────────────┘ └─────────────────┘       │
//! │                                                                 │
//! │   DelayScheduler ──ticket──▶ return queue ──▶ process_returns() │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use sfx_core::ClipHandle;
//! use sfx_pool::{EffectDefinition, EffectPool, EffectSet, PoolBackend, PoolConfig};
//!
//! let (backend, _device, _loader, scheduler) = PoolBackend::headless();
//! let mut pool = EffectPool::new(PoolConfig::default(), backend);
//!
//! let coin = Arc::new(
//!     EffectDefinition::new("ui.coin", "Coin").with_clip(ClipHandle::new(1, 2.0)),
//! );
//! pool.init([Arc::new(EffectSet::new("ui").with_definition(Arc::clone(&coin)))], []);
//!
//! // Keyed playback
//! pool.play(&"ui.coin".into());
//!
//! // Transient playback, returned to the pool after the clip
//! pool.play_definition(&coin, true);
//! scheduler.advance(2.0);
//! assert_eq!(pool.process_returns(), 1);
//! ```

#![allow(clippy::new_without_default)]

mod bulk;
pub mod config;
pub mod definition;
pub mod device;
pub mod error;
pub mod headless;
pub mod pool;
pub mod recycler;
pub mod scheduler;
pub mod set;
mod transient;
pub mod voice;

// Re-exports
pub use config::PoolConfig;
pub use definition::{
    ClipSelection, DEFAULT_PRIORITY, EffectDefinition, MAX_PITCH, MIN_PITCH, PitchMode,
    SpatialParams,
};
pub use device::{PlaybackChannel, PlaybackDevice, VoiceTemplate};
pub use error::{DeviceError, PoolError, PoolResult, VoiceError};
pub use headless::{ChannelCall, ChannelId, HeadlessChannel, HeadlessDevice, HeadlessLoader};
pub use pool::{EffectPool, PoolBackend, RegistrationReport};
pub use recycler::{Recycler, Release};
pub use scheduler::{
    DelayScheduler, DelayedCallback, ReturnReceiver, ReturnSender, ReturnTicket, TickScheduler,
    return_queue,
};
pub use set::EffectSet;
pub use voice::{
    ChannelOverride, PlaybackParams, Voice, VoiceId, VoiceOrigin, VoiceOverride, VoiceState,
};
