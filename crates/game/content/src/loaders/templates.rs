//! Entity template loader.

use std::path::Path;

use arena_core::{EntityTemplate, WeaponCatalog};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Template list structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    pub templates: Vec<EntityTemplate>,
}

/// Loader for hero and minion templates from RON files.
pub struct TemplateLoader;

impl TemplateLoader {
    /// Load templates, checking their default weapons against `catalog`.
    pub fn load(path: &Path, catalog: &WeaponCatalog) -> LoadResult<Vec<EntityTemplate>> {
        let content = read_file(path)?;
        Self::parse(&content, catalog)
    }

    pub fn parse(content: &str, catalog: &WeaponCatalog) -> LoadResult<Vec<EntityTemplate>> {
        let file: TemplateFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse template RON: {}", e))?;

        for template in &file.templates {
            for kind in &template.default_weapons {
                anyhow::ensure!(
                    catalog.get(*kind).is_some(),
                    "template `{}` starts with unknown weapon kind {:?}",
                    template.name,
                    kind
                );
            }
        }
        Ok(file.templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{AbilityKind, Attribute, EntityKind};

    #[test]
    fn omitted_fields_use_the_hero_defaults() {
        let ron = r#"(templates: [(name: "Scout", kind: Hero, attributes: { MaxHealth: 80.0, Health: 80.0 })])"#;
        let templates = TemplateLoader::parse(ron, &WeaponCatalog::new()).unwrap();
        let scout = &templates[0];
        assert_eq!(scout.kind, EntityKind::Hero);
        assert_eq!(scout.attributes.get(Attribute::Health), Some(80.0));
        assert!(scout.abilities.iter().any(|a| a.kind == AbilityKind::Revive));
        assert!(!scout.start_in_first_person);
    }

    #[test]
    fn unknown_default_weapons_are_rejected() {
        let ron = r#"(templates: [(name: "Scout", kind: Hero, attributes: {}, default_weapons: [(9)])])"#;
        let err = TemplateLoader::parse(ron, &WeaponCatalog::new()).unwrap_err();
        assert!(err.to_string().contains("unknown weapon kind"));
    }
}
