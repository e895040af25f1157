//! sfx-core: Shared types for the tag-keyed effect pool
//!
//! This crate provides the foundational types used by `sfx-pool`:
//! - [`Key`] / [`KeyRegistry`]: effect and set names and their interned runtime ids
//! - [`LoadState`]: bit-flag aggregate of clip load status
//! - [`ClipHandle`] / [`ClipLoader`]: opaque clip handles and the loader contract
//! - [`MixerGroup`] / [`Decibels`]: output routing and gain conversion

mod clip;
mod error;
mod key;
mod load_state;
mod mixer;

pub use clip::*;
pub use error::*;
pub use key::*;
pub use load_state::*;
pub use mixer::*;
