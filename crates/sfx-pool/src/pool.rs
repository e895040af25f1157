//! Effect Pool
//!
//! The resolver mapping keys to voices. One instance is constructed by the
//! host's composition root and passed to whoever triggers sounds; there is
//! no global pool.
//!
//! Registries:
//! - `set_link`: set key → [`EffectSet`]
//! - `prefab_link`: effect key → definition + voice template
//! - `effect_link`: effect key → live voices, pre-warmed voice first
//!
//! Transient (definition-driven) voices live in a bounded recycler instead,
//! see [`peek_definition`](EffectPool::peek_definition).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sfx_core::{ClipLoader, Key, KeyId, KeyRegistry, LoadState, percent_to_decibels};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::definition::EffectDefinition;
use crate::device::{PlaybackDevice, VoiceTemplate};
use crate::error::{DeviceError, PoolError, PoolResult};
use crate::headless::{HeadlessDevice, HeadlessLoader};
use crate::recycler::Recycler;
use crate::scheduler::{DelayScheduler, ReturnReceiver, ReturnSender, TickScheduler, return_queue};
use crate::set::EffectSet;
use crate::voice::{Voice, VoiceId, VoiceOrigin};

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// Host services the pool drives
pub struct PoolBackend {
    pub device: Box<dyn PlaybackDevice>,
    pub loader: Box<dyn ClipLoader>,
    pub scheduler: Box<dyn DelayScheduler>,
}

impl PoolBackend {
    pub fn new(
        device: impl PlaybackDevice + 'static,
        loader: impl ClipLoader + 'static,
        scheduler: impl DelayScheduler + 'static,
    ) -> Self {
        Self {
            device: Box::new(device),
            loader: Box::new(loader),
            scheduler: Box::new(scheduler),
        }
    }

    /// In-memory backend, plus handles for driving and inspecting it
    pub fn headless() -> (Self, HeadlessDevice, HeadlessLoader, TickScheduler) {
        let device = HeadlessDevice::new();
        let loader = HeadlessLoader::new();
        let scheduler = TickScheduler::new();
        (
            Self::new(device.clone(), loader.clone(), scheduler.clone()),
            device,
            loader,
            scheduler,
        )
    }
}

/// Outcome of a registration pass
#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Effect keys that were linked
    pub accepted: Vec<KeyId>,
    /// Registrations skipped, with the reason
    pub rejected: Vec<PoolError>,
}

impl RegistrationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    fn reject(&mut self, error: PoolError) {
        if error.is_duplicate() {
            log::warn!("{}", error);
        } else {
            log::error!("{}", error);
        }
        self.rejected.push(error);
    }
}

/// Registered effect: its definition and the template its voices come from
#[derive(Debug)]
pub(crate) struct Prefab {
    pub(crate) definition: Arc<EffectDefinition>,
    pub(crate) template: VoiceTemplate,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECT POOL
// ═══════════════════════════════════════════════════════════════════════════════

/// Key → voice resolver with a transient voice pool
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use sfx_core::ClipHandle;
/// use sfx_pool::{EffectDefinition, EffectPool, EffectSet, PoolBackend, PoolConfig};
///
/// let (backend, _device, _loader, _scheduler) = PoolBackend::headless();
/// let mut pool = EffectPool::new(PoolConfig::deterministic(1), backend);
///
/// let jump = Arc::new(EffectDefinition::new("player.jump", "Jump").with_clip(ClipHandle::new(1, 0.4)));
/// let report = pool.init([Arc::new(EffectSet::new("player").with_definition(jump))], []);
/// assert!(report.is_clean());
///
/// assert!(pool.play(&"player.jump".into()).is_some());
/// assert!(pool.play(&"player.land".into()).is_none());
/// ```
pub struct EffectPool {
    pub(crate) config: PoolConfig,
    pub(crate) device: Box<dyn PlaybackDevice>,
    pub(crate) loader: Box<dyn ClipLoader>,
    pub(crate) scheduler: Box<dyn DelayScheduler>,

    pub(crate) keys: KeyRegistry,
    pub(crate) set_link: HashMap<KeyId, Arc<EffectSet>>,
    pub(crate) prefab_link: HashMap<KeyId, Prefab>,
    pub(crate) effect_link: HashMap<KeyId, Vec<VoiceId>>,

    pub(crate) voices: HashMap<VoiceId, Voice>,
    pub(crate) recycler: Recycler<VoiceId>,
    pub(crate) returns_tx: ReturnSender,
    pub(crate) returns_rx: ReturnReceiver,

    rng: StdRng,
    next_voice_id: u64,

    /// Catalog the registries are rebuilt from
    pub(crate) sets: Vec<Arc<EffectSet>>,
    definitions: Vec<Arc<EffectDefinition>>,
}

impl EffectPool {
    pub fn new(mut config: PoolConfig, backend: PoolBackend) -> Self {
        config.validate();

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (returns_tx, returns_rx) = return_queue(config.return_queue_capacity);
        let recycler = Recycler::new(
            config.default_capacity,
            config.max_size,
            config.collection_checks,
        );

        Self {
            config,
            device: backend.device,
            loader: backend.loader,
            scheduler: backend.scheduler,
            keys: KeyRegistry::new(),
            set_link: HashMap::new(),
            prefab_link: HashMap::new(),
            effect_link: HashMap::new(),
            voices: HashMap::new(),
            recycler,
            returns_tx,
            returns_rx,
            rng,
            next_voice_id: 1,
            sets: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn loader(&self) -> &dyn ClipLoader {
        self.loader.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Build the registries from sets and standalone definitions
    ///
    /// Sets flagged `load_on_launch` are loaded first. Set members register
    /// before standalone definitions; on duplicate keys the first wins.
    /// Any previous registration is torn down.
    pub fn init(
        &mut self,
        sets: impl IntoIterator<Item = Arc<EffectSet>>,
        definitions: impl IntoIterator<Item = Arc<EffectDefinition>>,
    ) -> RegistrationReport {
        self.sets = sets.into_iter().collect();
        self.definitions = definitions.into_iter().collect();
        self.rebuild()
    }

    /// Tear down every voice and re-register the current catalog
    pub fn rebuild(&mut self) -> RegistrationReport {
        self.teardown();

        let sets = self.sets.clone();
        let definitions = self.definitions.clone();
        let mut report = RegistrationReport::default();

        for set in sets.iter().filter(|s| s.load_on_launch) {
            set.load(self.loader.as_mut());
        }
        for set in &sets {
            self.link_set(set, &mut report);
        }
        for definition in &definitions {
            self.link_definition(definition, &mut report);
        }

        log::info!(
            "Effect pool ready: {} effects in {} sets ({} rejected)",
            self.prefab_link.len(),
            self.set_link.len(),
            report.rejected.len()
        );
        report
    }

    /// Register one standalone definition
    pub fn register_definition(&mut self, definition: Arc<EffectDefinition>) -> PoolResult<KeyId> {
        let mut report = RegistrationReport::default();
        self.link_definition(&definition, &mut report);
        match report.rejected.pop() {
            Some(error) => Err(error),
            None => {
                self.definitions.push(definition);
                report
                    .accepted
                    .pop()
                    .ok_or_else(|| PoolError::Config("definition was not linked".into()))
            }
        }
    }

    /// Link a set and its members. False if the set itself was rejected.
    pub(crate) fn link_set(&mut self, set: &Arc<EffectSet>, report: &mut RegistrationReport) -> bool {
        if set.key.is_none() {
            report.reject(PoolError::ReservedKey {
                name: format!("effect set of {} definitions", set.len()),
            });
            return false;
        }
        let set_id = match self.keys.intern(&set.key) {
            Ok(id) => id,
            Err(e) => {
                report.reject(e.into());
                return false;
            }
        };
        if self.set_link.contains_key(&set_id) {
            report.reject(PoolError::DuplicateSet(set.key.clone()));
            return false;
        }

        self.set_link.insert(set_id, Arc::clone(set));
        for definition in &set.definitions {
            self.link_definition(definition, report);
        }
        log::debug!("Linked effect set '{}' ({} definitions)", set.key, set.len());
        true
    }

    pub(crate) fn link_definition(
        &mut self,
        definition: &Arc<EffectDefinition>,
        report: &mut RegistrationReport,
    ) {
        if let Err(e) = definition.validate() {
            report.reject(e);
            return;
        }
        let key_id = match self.keys.intern(&definition.key) {
            Ok(id) => id,
            Err(e) => {
                report.reject(e.into());
                return;
            }
        };
        if self.prefab_link.contains_key(&key_id) {
            report.reject(PoolError::DuplicateKey {
                key: definition.key.clone(),
                name: definition.name.clone(),
            });
            return;
        }

        let Some(template) = definition
            .template_override
            .clone()
            .or_else(|| self.config.default_template.clone())
        else {
            report.reject(PoolError::MissingTemplate {
                key: definition.key.clone(),
            });
            return;
        };

        // Pre-warm one voice so the first peek never instantiates
        let voice_id = match self.spawn_voice(&template, VoiceOrigin::Template(key_id)) {
            Ok(id) => id,
            Err(e) => {
                report.reject(e.into());
                return;
            }
        };
        if let Some(voice) = self.voices.get_mut(&voice_id) {
            voice.init(Arc::clone(definition));
        }

        self.prefab_link.insert(
            key_id,
            Prefab {
                definition: Arc::clone(definition),
                template,
            },
        );
        self.effect_link.insert(key_id, vec![voice_id]);
        report.accepted.push(key_id);
        log::trace!("Linked effect '{}' as {}", definition.key, key_id);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // KEY MODE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Voice ready to play `key`, or `None` if the key is not registered
    ///
    /// Reuses the first live voice that is active and either stopped or
    /// virtual; otherwise instantiates a new one from the key's template.
    pub fn peek(&mut self, key: &Key) -> Option<&mut Voice> {
        let key_id = self.resolve_key(key)?;

        let reusable = self.effect_link.get(&key_id).and_then(|live| {
            live.iter().copied().find(|id| {
                self.voices
                    .get(id)
                    .is_some_and(|v| v.is_active() && (!v.is_playing() || v.is_virtual()))
            })
        });

        let voice_id = match reusable {
            Some(id) => id,
            None => self.instantiate(key_id)?,
        };
        self.voices.get_mut(&voice_id)
    }

    /// Peek and play. Playback errors are logged; the voice is still returned.
    pub fn play(&mut self, key: &Key) -> Option<&mut Voice> {
        let voice = self.peek(key)?;
        if let Err(e) = voice.play() {
            log::debug!("Keyed play of '{}' returned {}", key, e);
        }
        Some(voice)
    }

    /// True if `key` resolves to a registered effect (no logging)
    pub fn contains_key(&self, key: &Key) -> bool {
        self.keys
            .lookup(key)
            .is_some_and(|id| self.prefab_link.contains_key(&id))
    }

    /// Number of live voices linked to `key`
    pub fn live_voice_count(&self, key: &Key) -> usize {
        self.keys
            .lookup(key)
            .and_then(|id| self.effect_link.get(&id))
            .map_or(0, Vec::len)
    }

    /// Registered definition for `key`
    pub fn definition(&self, key: &Key) -> Option<&Arc<EffectDefinition>> {
        let id = self.keys.lookup(key)?;
        self.prefab_link.get(&id).map(|p| &p.definition)
    }

    pub fn key_id(&self, key: &Key) -> Option<KeyId> {
        self.keys.lookup(key)
    }

    /// Reverse key lookup for diagnostics
    pub fn key_name(&self, id: KeyId) -> Option<&str> {
        self.keys.name(id)
    }

    /// Keys of every registered effect
    pub fn registered_keys(&self) -> impl Iterator<Item = &Key> {
        self.prefab_link.values().map(|p| &p.definition.key)
    }

    pub fn effect_count(&self) -> usize {
        self.prefab_link.len()
    }

    pub fn set_count(&self) -> usize {
        self.set_link.len()
    }

    /// Registered set for `key`
    pub fn set(&self, key: &Key) -> Option<&Arc<EffectSet>> {
        let id = self.keys.lookup(key)?;
        self.set_link.get(&id)
    }

    /// Aggregate load state of a registered set
    pub fn set_load_state(&self, key: &Key) -> Option<LoadState> {
        self.set(key).map(|s| s.load_state(self.loader.as_ref()))
    }

    fn resolve_key(&self, key: &Key) -> Option<KeyId> {
        if key.is_none() {
            log::warn!("Attempted to resolve the reserved empty key");
            return None;
        }
        let found = self
            .keys
            .lookup(key)
            .filter(|id| self.prefab_link.contains_key(id));
        if found.is_none() {
            self.log_miss(format_args!("No effect registered for key '{}'", key));
        }
        found
    }

    pub(crate) fn log_miss(&self, message: std::fmt::Arguments<'_>) {
        if self.config.warn_on_miss {
            log::warn!("{}", message);
        } else {
            log::debug!("{}", message);
        }
    }

    fn instantiate(&mut self, key_id: KeyId) -> Option<VoiceId> {
        let prefab = self.prefab_link.get(&key_id)?;
        let template = prefab.template.clone();
        let definition = Arc::clone(&prefab.definition);

        match self.spawn_voice(&template, VoiceOrigin::Linked(key_id)) {
            Ok(voice_id) => {
                if let Some(voice) = self.voices.get_mut(&voice_id) {
                    voice.init(definition);
                }
                self.effect_link.entry(key_id).or_default().push(voice_id);
                Some(voice_id)
            }
            Err(e) => {
                log::error!("Failed to instantiate a voice for '{}': {}", definition.key, e);
                None
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VOICES
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn spawn_voice(
        &mut self,
        template: &VoiceTemplate,
        origin: VoiceOrigin,
    ) -> Result<VoiceId, DeviceError> {
        let channel = self.device.create_channel(template)?;
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;

        let seed = self.rng.random::<u64>();
        self.voices.insert(id, Voice::new(id, origin, channel, seed));
        Ok(id)
    }

    pub(crate) fn destroy_voice(&mut self, id: VoiceId) {
        if let Some(voice) = self.voices.remove(&id) {
            voice.destroy(self.device.as_mut());
        }
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(&id)
    }

    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.voices.get_mut(&id)
    }

    /// Every live voice, key-linked and transient
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MIXER
    // ═══════════════════════════════════════════════════════════════════════════

    /// Set a mixer parameter from a linear [0, 1] level. Returns the gain in dB.
    pub fn set_mixer_volume(&mut self, name: &str, percent: f32) -> PoolResult<f32> {
        let db = percent_to_decibels(percent);
        if let Err(e) = self.device.set_mixer_parameter(name, db) {
            log::warn!("Failed to set mixer volume '{}': {}", name, e);
            return Err(e.into());
        }
        Ok(db)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TEARDOWN
    // ═══════════════════════════════════════════════════════════════════════════

    /// Destroy every voice and forget all registrations and catalogs
    pub fn shutdown(&mut self) {
        self.teardown();
        self.sets.clear();
        self.definitions.clear();
        log::debug!("Effect pool shut down");
    }

    fn teardown(&mut self) {
        // Stale tickets must not outlive the voices they point at
        self.returns_rx.drain();
        self.recycler.drain();

        let ids: Vec<VoiceId> = self.voices.keys().copied().collect();
        for id in ids {
            self.destroy_voice(id);
        }
        self.set_link.clear();
        self.prefab_link.clear();
        self.effect_link.clear();
        self.keys.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
