//! Effect Keys
//!
//! A [`Key`] names an effect or a set. It is either a literal string or an
//! indirection through a shared, authored [`KeyReference`]. Equality and
//! hashing only look at the *effective* key, so a literal `"ui.click"` and a
//! reference whose key is `"ui.click"` are the same key.
//!
//! At runtime keys are interned into [`KeyId`]s by a [`KeyRegistry`]. Ids are
//! handed out sequentially, so two different names can never alias; a host
//! that pins ids explicitly gets a [`SfxError::KeyCollision`] instead of
//! silent sharing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{SfxError, SfxResult};

// ═══════════════════════════════════════════════════════════════════════════════
// KEY REFERENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Authored key object shared between several definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyReference {
    key: String,
}

impl KeyReference {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// Name of an effect or set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Key {
    /// Inline string value
    Literal(String),
    /// Indirection to a shared authored reference
    Reference(Arc<KeyReference>),
}

impl Key {
    pub fn from_literal(value: impl Into<String>) -> Self {
        Key::Literal(value.into())
    }

    pub fn from_reference(reference: Arc<KeyReference>) -> Self {
        Key::Reference(reference)
    }

    /// The reserved "no effect" key
    pub fn none() -> Self {
        Key::Literal(String::new())
    }

    /// Effective key: the reference's key if present, the literal otherwise
    #[inline]
    pub fn resolve(&self) -> &str {
        match self {
            Key::Literal(value) => value,
            Key::Reference(reference) => reference.key(),
        }
    }

    /// True for the reserved empty key
    #[inline]
    pub fn is_none(&self) -> bool {
        self.resolve().is_empty()
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.resolve() == other.resolve()
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resolve().hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            f.write_str(self.resolve())
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Literal(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Literal(value)
    }
}

impl From<Arc<KeyReference>> for Key {
    fn from(reference: Arc<KeyReference>) -> Self {
        Key::Reference(reference)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.resolve().to_string()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Interned runtime form of a [`Key`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct KeyId(pub u32);

impl KeyId {
    /// Reserved id of the empty key, never registered
    pub const NONE: Self = Self(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Bidirectional key ↔ id table
#[derive(Debug, Default)]
pub struct KeyRegistry {
    ids: HashMap<Arc<str>, KeyId>,
    names: HashMap<KeyId, Arc<str>>,
    next_id: u32,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            names: HashMap::new(),
            next_id: 1,
        }
    }

    /// Intern a key, returning its existing id or allocating the next free one
    pub fn intern(&mut self, key: &Key) -> SfxResult<KeyId> {
        if key.is_none() {
            return Err(SfxError::ReservedKey);
        }
        if let Some(id) = self.ids.get(key.resolve()) {
            return Ok(*id);
        }

        // Skip ids pinned through `bind`
        while self.next_id == 0 || self.names.contains_key(&KeyId(self.next_id)) {
            self.next_id = self
                .next_id
                .checked_add(1)
                .ok_or(SfxError::RegistryFull(self.names.len()))?;
        }

        let id = KeyId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.insert(id, key.resolve());
        log::trace!("Interned key '{}' as {}", key, id);
        Ok(id)
    }

    /// Pin a key to an externally chosen id
    ///
    /// Binding the same pair twice is a no-op; binding an id that already
    /// names a different key is a configuration defect.
    pub fn bind(&mut self, id: KeyId, key: &Key) -> SfxResult<()> {
        if key.is_none() || id.is_none() {
            return Err(SfxError::ReservedKey);
        }
        if let Some(existing) = self.names.get(&id) {
            if existing.as_ref() == key.resolve() {
                return Ok(());
            }
            log::error!(
                "Key id {} already names '{}', cannot bind '{}'",
                id,
                existing,
                key
            );
            return Err(SfxError::KeyCollision {
                id,
                existing: existing.to_string(),
                requested: key.resolve().to_string(),
            });
        }
        if let Some(other) = self.ids.get(key.resolve()) {
            return Err(SfxError::KeyCollision {
                id: *other,
                existing: key.resolve().to_string(),
                requested: key.resolve().to_string(),
            });
        }
        self.insert(id, key.resolve());
        Ok(())
    }

    fn insert(&mut self, id: KeyId, name: &str) {
        let name: Arc<str> = Arc::from(name);
        self.ids.insert(Arc::clone(&name), id);
        self.names.insert(id, name);
    }

    /// Look up a key without registering it
    #[inline]
    pub fn lookup(&self, key: &Key) -> Option<KeyId> {
        if key.is_none() {
            return None;
        }
        self.ids.get(key.resolve()).copied()
    }

    /// Reverse lookup for diagnostics
    pub fn name(&self, id: KeyId) -> Option<&str> {
        self.names.get(&id).map(|n| n.as_ref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.names.clear();
        self.next_id = 1;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
