//! Content loaders for reading game data from files.
//!
//! Weapons and entity templates are RON, tunables are TOML. Every loader
//! deserializes straight into arena-core types.

pub mod config;
pub mod factory;
pub mod templates;
pub mod weapons;

pub use config::ConfigLoader;
pub use factory::{Content, ContentFactory};
pub use templates::TemplateLoader;
pub use weapons::WeaponLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
