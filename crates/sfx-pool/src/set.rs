//! Effect Set
//!
//! A named group of effect definitions that share a default mixer group and
//! are loaded/unloaded together.

use sfx_core::{ClipLoader, Key, LoadState, MixerGroup};
use std::sync::Arc;

use crate::definition::EffectDefinition;

/// Group of effect definitions with bulk load/unload
#[derive(Debug)]
pub struct EffectSet {
    pub key: Key,
    /// Load every member when the pool starts
    pub load_on_launch: bool,
    /// Default routing for members that have none
    pub mixer_group: Option<MixerGroup>,
    pub definitions: Vec<Arc<EffectDefinition>>,
}

impl EffectSet {
    pub fn new(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            load_on_launch: false,
            mixer_group: None,
            definitions: Vec::new(),
        }
    }

    pub fn with_load_on_launch(mut self, load_on_launch: bool) -> Self {
        self.load_on_launch = load_on_launch;
        self
    }

    pub fn with_mixer_group(mut self, group: MixerGroup) -> Self {
        self.mixer_group = Some(group);
        self
    }

    pub fn with_definition(mut self, definition: Arc<EffectDefinition>) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_definitions(
        mut self,
        definitions: impl IntoIterator<Item = Arc<EffectDefinition>>,
    ) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Load every member, backfilling the set's mixer group on members
    /// without one. Authored per-effect groups always win.
    pub fn load(&self, loader: &mut dyn ClipLoader) {
        log::debug!("Loading effect set '{}'", self.key);
        for definition in &self.definitions {
            definition.load(loader);
            if let Some(group) = &self.mixer_group {
                definition.backfill_mixer_group(group);
            }
        }
    }

    pub fn unload(&self, loader: &mut dyn ClipLoader) {
        log::debug!("Unloading effect set '{}'", self.key);
        for definition in &self.definitions {
            definition.unload(loader);
        }
    }

    pub fn requires_loading(&self, loader: &dyn ClipLoader) -> bool {
        self.definitions.iter().any(|d| d.requires_loading(loader))
    }

    /// OR of every member's load state
    pub fn load_state(&self, loader: &dyn ClipLoader) -> LoadState {
        LoadState::reduce(self.definitions.iter().map(|d| d.load_state(loader)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.definitions.iter().map(|d| &d.key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
