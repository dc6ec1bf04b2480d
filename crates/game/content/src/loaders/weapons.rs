//! Weapon catalog loader.

use std::collections::BTreeSet;
use std::path::Path;

use arena_core::{WeaponCatalog, WeaponDef};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Weapon catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponCatalogFile {
    pub weapons: Vec<WeaponDef>,
}

/// Loader for the weapon catalog from RON files.
pub struct WeaponLoader;

impl WeaponLoader {
    pub fn load(path: &Path) -> LoadResult<WeaponCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Parses a catalog, rejecting duplicate kinds.
    pub fn parse(content: &str) -> LoadResult<WeaponCatalog> {
        let file: WeaponCatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse weapon catalog RON: {}", e))?;

        let mut kinds = BTreeSet::new();
        for def in &file.weapons {
            anyhow::ensure!(
                kinds.insert(def.kind),
                "weapon kind {:?} (`{}`) is defined twice",
                def.kind,
                def.name
            );
        }
        Ok(file.weapons.into_iter().collect())
    }
}
