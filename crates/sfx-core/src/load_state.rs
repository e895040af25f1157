//! Clip load state
//!
//! [`LoadState`] is a set of flags rather than a single value so that an
//! aggregate over several clips can report a *mixed* state
//! (e.g. `Loaded|Loading`). Only a pure `LOADED` state is ready to play.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

// ═══════════════════════════════════════════════════════════════════════════════
// CLIP STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Load status of a single clip, as reported by the clip loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClipStatus {
    #[default]
    Unloaded = 0,
    Loading = 1,
    Loaded = 2,
    Failed = 3,
}

impl ClipStatus {
    #[inline]
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => ClipStatus::Unloaded,
            1 => ClipStatus::Loading,
            2 => ClipStatus::Loaded,
            3 => ClipStatus::Failed,
            _ => ClipStatus::Unloaded,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOAD STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Aggregate load state flags
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadState(u8);

impl LoadState {
    /// Identity of the OR reduction
    pub const NONE: Self = Self(0);
    pub const UNLOADED: Self = Self(1 << 0);
    pub const LOADING: Self = Self(1 << 1);
    pub const LOADED: Self = Self(1 << 2);
    pub const FAILED: Self = Self(1 << 3);

    const ALL: [(Self, &'static str); 4] = [
        (Self::UNLOADED, "Unloaded"),
        (Self::LOADING, "Loading"),
        (Self::LOADED, "Loaded"),
        (Self::FAILED, "Failed"),
    ];

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Exactly one flag set
    #[inline]
    pub const fn is_uniform(self) -> bool {
        self.0.count_ones() == 1
    }

    /// Everything loaded and nothing else
    #[inline]
    pub const fn is_ready(self) -> bool {
        self.0 == Self::LOADED.0
    }

    /// OR-reduce a sequence of states
    pub fn reduce(states: impl IntoIterator<Item = LoadState>) -> Self {
        states.into_iter().fold(Self::NONE, |acc, s| acc | s)
    }
}

impl From<ClipStatus> for LoadState {
    #[inline]
    fn from(status: ClipStatus) -> Self {
        Self(1 << status as u8)
    }
}

impl BitOr for LoadState {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for LoadState {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let mut first = true;
        for (flag, name) in Self::ALL {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadState({self})")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_single_flag() {
        assert_eq!(LoadState::from(ClipStatus::Unloaded), LoadState::UNLOADED);
        assert_eq!(LoadState::from(ClipStatus::Loading), LoadState::LOADING);
        assert_eq!(LoadState::from(ClipStatus::Loaded), LoadState::LOADED);
        assert_eq!(LoadState::from(ClipStatus::Failed), LoadState::FAILED);
    }

    #[test]
    fn test_reduce_identity() {
        assert_eq!(LoadState::reduce([]), LoadState::NONE);
        assert!(!LoadState::NONE.is_ready());
    }

    #[test]
    fn test_mixed_state_is_not_ready() {
        let mixed = LoadState::reduce([LoadState::LOADED, LoadState::LOADING]);

        assert_eq!(mixed, LoadState::LOADED | LoadState::LOADING);
        assert_ne!(mixed, LoadState::LOADED);
        assert!(!mixed.is_uniform());
        assert!(!mixed.is_ready());
        assert!(mixed.contains(LoadState::LOADING));
        assert_eq!(mixed.to_string(), "Loading|Loaded");
    }

    #[test]
    fn test_uniform_loaded_is_ready() {
        let state = LoadState::reduce([LoadState::LOADED, LoadState::LOADED]);
        assert!(state.is_uniform());
        assert!(state.is_ready());
    }

    #[test]
    fn test_from_bits_masks_unknown() {
        assert_eq!(LoadState::from_bits(0xFF).bits(), 0b1111);
        assert_eq!(ClipStatus::from_index(9), ClipStatus::Unloaded);
    }
}
