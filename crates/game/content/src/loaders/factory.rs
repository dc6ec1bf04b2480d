//! Content factory for building worlds from data files.

use std::path::{Path, PathBuf};

use arena_core::{ControllerId, EntityTemplate, GameConfig, NetMode, World, WeaponCatalog};
use tracing::info;

use crate::loaders::{ConfigLoader, LoadResult, TemplateLoader, WeaponLoader};

/// Content factory that loads all game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── weapons.ron
/// └── templates.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Factory over the data shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    /// Load gameplay tunables from `config.toml`.
    pub fn load_config(&self) -> LoadResult<GameConfig> {
        ConfigLoader::load(&self.data_dir.join("config.toml"))
    }

    /// Load the weapon catalog from `weapons.ron`.
    pub fn load_weapons(&self) -> LoadResult<WeaponCatalog> {
        WeaponLoader::load(&self.data_dir.join("weapons.ron"))
    }

    /// Load entity templates from `templates.ron`.
    pub fn load_templates(&self, catalog: &WeaponCatalog) -> LoadResult<Vec<EntityTemplate>> {
        TemplateLoader::load(&self.data_dir.join("templates.ron"), catalog)
    }

    /// Loads and cross-checks every content file.
    pub fn load_all(&self) -> LoadResult<Content> {
        let config = self.load_config()?;
        let catalog = self.load_weapons()?;
        let templates = self.load_templates(&catalog)?;
        info!(
            target: "arena::content",
            data_dir = %self.data_dir.display(),
            weapons = catalog.len(),
            templates = templates.len(),
            "content loaded"
        );
        Ok(Content {
            config,
            catalog,
            templates,
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Everything a world needs from content, shared by server and clients.
#[derive(Clone, Debug)]
pub struct Content {
    pub config: GameConfig,
    pub catalog: WeaponCatalog,
    pub templates: Vec<EntityTemplate>,
}

impl Content {
    /// Builds a world of the given mode with every template registered.
    pub fn build_world(&self, mode: NetMode) -> World {
        let mut world = World::new(mode, self.config.clone(), self.catalog.clone());
        for template in &self.templates {
            world.register_template(template.clone());
        }
        world
    }

    pub fn server_world(&self) -> World {
        self.build_world(NetMode::Server)
    }

    pub fn client_world(&self, local: ControllerId) -> World {
        self.build_world(NetMode::Client { local })
    }
}
