//! Set management and clip data
//!
//! Incremental add/remove of effect sets, and load/unload of clip data by
//! set key or by voice.

use sfx_core::{Key, KeyId};
use std::sync::Arc;

use crate::pool::{EffectPool, RegistrationReport};
use crate::set::EffectSet;
use crate::voice::VoiceId;

impl EffectPool {
    /// Register a set and its members
    ///
    /// A set whose key is reserved or already registered is rejected whole.
    /// Members follow the usual duplicate rule: first registration wins.
    pub fn add_set(&mut self, set: Arc<EffectSet>) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        if self.link_set(&set, &mut report) {
            self.sets.push(set);
        }
        report
    }

    /// Unregister the set with `set`'s key and tear down its members
    ///
    /// The set is resolved by key, so any instance with the same key removes
    /// the registered one. Members are taken from the registered set; a member
    /// whose key now belongs to another definition is skipped.
    pub fn remove_set(&mut self, set: &EffectSet) {
        let Some(set_id) = self.keys.lookup(&set.key) else {
            log::debug!("Effect set '{}' is not registered", set.key);
            return;
        };
        let Some(registered) = self.set_link.remove(&set_id) else {
            log::debug!("Effect set '{}' is not registered", set.key);
            return;
        };

        for definition in &registered.definitions {
            let Some(key_id) = self.keys.lookup(&definition.key) else {
                continue;
            };
            let owned = self
                .prefab_link
                .get(&key_id)
                .is_some_and(|p| Arc::ptr_eq(&p.definition, definition));
            if owned {
                self.unlink_effect(key_id);
            }
        }

        self.sets.retain(|s| s.key != registered.key);
        log::debug!("Removed effect set '{}'", registered.key);
    }

    fn unlink_effect(&mut self, key_id: KeyId) {
        if let Some(live) = self.effect_link.remove(&key_id) {
            for id in live {
                self.destroy_voice(id);
            }
        }
        self.prefab_link.remove(&key_id);
    }

    /// Load every member of a registered set
    pub fn load_set(&mut self, key: &Key) -> Option<Arc<EffectSet>> {
        let set = self.find_set(key)?;
        set.load(self.loader.as_mut());
        Some(set)
    }

    /// Unload every member of a registered set. False if not registered.
    pub fn unload_set(&mut self, key: &Key) -> bool {
        match self.find_set(key) {
            Some(set) => {
                set.unload(self.loader.as_mut());
                true
            }
            None => false,
        }
    }

    fn find_set(&self, key: &Key) -> Option<Arc<EffectSet>> {
        if key.is_none() {
            log::warn!("Attempted to look up a set with the reserved empty key");
            return None;
        }
        let found = self
            .keys
            .lookup(key)
            .and_then(|id| self.set_link.get(&id))
            .cloned();
        if found.is_none() {
            self.log_miss(format_args!("No effect set registered for key '{}'", key));
        }
        found
    }

    /// Load the clips of the voice's bound definition
    pub fn load_voice(&mut self, id: VoiceId) -> bool {
        match self.voices.get(&id) {
            Some(voice) => voice.load(self.loader.as_mut()),
            None => {
                log::warn!("Attempted to load unknown voice {}", id);
                false
            }
        }
    }

    /// Unload the clips of the voice's bound definition, optionally
    /// returning the voice to the transient pool
    pub fn unload_voice(&mut self, id: VoiceId, return_to_pool: bool) -> bool {
        let unloaded = match self.voices.get(&id) {
            Some(voice) => voice.unload(self.loader.as_mut()),
            None => {
                log::warn!("Attempted to unload unknown voice {}", id);
                return false;
            }
        };
        if return_to_pool {
            if let Err(e) = self.return_voice(id) {
                log::warn!("{}", e);
            }
        }
        unloaded
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
