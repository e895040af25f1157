//! Mixer routing handles and gain conversion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Practical silence floor of the mixer, in dB
pub const SILENCE_FLOOR_DB: f32 = -80.0;

/// Named mixer output group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MixerGroup(String);

impl MixerGroup {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_string())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MixerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MixerGroup {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Gain in decibels
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Decibels(pub f32);

impl Decibels {
    pub const ZERO: Self = Self(0.0);
    pub const SILENCE: Self = Self(SILENCE_FLOOR_DB);

    /// Linear percent [0, 1] to mixer gain
    ///
    /// `log10(0)` is undefined, so zero (and anything not strictly positive)
    /// maps to the silence floor instead of negative infinity.
    #[inline]
    pub fn from_percent(percent: f32) -> Self {
        if percent > 0.0 {
            Self(20.0 * percent.log10())
        } else {
            Self::SILENCE
        }
    }

    #[inline]
    pub fn to_percent(self) -> f32 {
        if self.0 <= SILENCE_FLOOR_DB {
            0.0
        } else {
            10.0_f32.powf(self.0 / 20.0)
        }
    }
}

impl Default for Decibels {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Linear percent to decibels, clamped to the silence floor
#[inline]
pub fn percent_to_decibels(percent: f32) -> f32 {
    Decibels::from_percent(percent).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_percent_is_silence_floor() {
        assert_eq!(percent_to_decibels(0.0), -80.0);
        assert_eq!(percent_to_decibels(-0.5), -80.0);
        assert_eq!(percent_to_decibels(f32::NAN), -80.0);
    }

    #[test]
    fn test_unity_is_zero_db() {
        assert_relative_eq!(percent_to_decibels(1.0), 0.0);
    }

    #[test]
    fn test_half_is_minus_six_db() {
        assert_relative_eq!(percent_to_decibels(0.5), -6.0206, epsilon = 1e-3);
    }

    #[test]
    fn test_round_trip_percent() {
        assert_relative_eq!(Decibels::from_percent(0.25).to_percent(), 0.25, epsilon = 1e-5);
        assert_eq!(Decibels::SILENCE.to_percent(), 0.0);
    }

    #[test]
    fn test_mixer_group_name() {
        let group = MixerGroup::from("sfx");
        assert_eq!(group.name(), "sfx");
        assert_eq!(group.to_string(), "sfx");
    }
}
