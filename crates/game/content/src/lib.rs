//! Data-driven content definitions and loaders.
//!
//! This crate provides loaders for the arena's RON/TOML data files:
//! - Weapon catalog (data-driven via RON)
//! - Hero and minion templates (data-driven via RON)
//! - Gameplay tunables (data-driven via TOML)
//!
//! Server and clients must load identical content, otherwise predicted
//! ability grants and movement diverge. All loaders use arena-core types
//! directly with serde for RON/TOML deserialization.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ConfigLoader, Content, ContentFactory, LoadResult, TemplateLoader, WeaponLoader,
};
