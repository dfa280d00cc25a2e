//! Upgrade definitions and their declared prerequisites.
//!
//! A [`Catalog`] bundles the two read-only input sources the layout
//! consumes: the node definitions (`id`, camp ordinal, display name) and
//! the requirement table (prerequisite ids, blueprint gate).

use crate::types::UpgradeId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse input: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpgradeDefinition {
    pub id: UpgradeId,
    pub camp_ordinal: u32,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Requirements {
    pub prerequisite_upgrade_ids: Vec<UpgradeId>,
    /// The upgrade can only be researched once its blueprint is found.
    pub requires_blueprint: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub upgrades: Vec<UpgradeDefinition>,
    pub requirements: BTreeMap<UpgradeId, Requirements>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition together with its prerequisite ids.
    ///
    /// The requirement entry is only recorded when `prerequisites` is
    /// non-empty, matching catalogs where most upgrades declare nothing.
    pub fn with_upgrade(mut self, id: &str, camp_ordinal: u32, prerequisites: &[&str]) -> Self {
        self.upgrades.push(UpgradeDefinition {
            id: id.to_string(),
            camp_ordinal,
            display_name: id.replace('_', " "),
        });
        if !prerequisites.is_empty() {
            self.requirements.insert(
                id.to_string(),
                Requirements {
                    prerequisite_upgrade_ids: prerequisites.iter().map(|p| p.to_string()).collect(),
                    requires_blueprint: false,
                },
            );
        }
        self
    }

    /// Marks an already added upgrade as gated behind a blueprint.
    pub fn with_blueprint(mut self, id: &str) -> Self {
        self.requirements.entry(id.to_string()).or_default().requires_blueprint = true;
        self
    }

    pub fn requirements_for(&self, id: &str) -> Option<&Requirements> {
        self.requirements.get(id)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Generates an acyclic catalog of `count` upgrades.
    ///
    /// Camp ordinals never decrease with the index, and every prerequisite
    /// points at an earlier upgrade, so the result is always a DAG.
    /// Roughly one upgrade in eight is blueprint-gated.
    pub fn random(count: usize, max_prerequisites: usize, rng: &mut impl Rng) -> Self {
        let mut catalog = Self::new();
        let mut ordinal = 0u32;

        for i in 0..count {
            ordinal += rng.random_range(0..=1);
            let id = format!("upgrade_{i:03}");

            let mut prerequisites: Vec<UpgradeId> = Vec::new();
            if i > 0 && rng.random_bool(0.85) {
                let wanted = rng.random_range(1..=max_prerequisites.max(1));
                for _ in 0..wanted {
                    let candidate = format!("upgrade_{:03}", rng.random_range(0..i));
                    if !prerequisites.contains(&candidate) {
                        prerequisites.push(candidate);
                    }
                }
            }

            catalog.upgrades.push(UpgradeDefinition {
                id: id.clone(),
                camp_ordinal: ordinal,
                display_name: format!("Upgrade {i}"),
            });
            let requires_blueprint = rng.random_bool(0.125);
            if !prerequisites.is_empty() || requires_blueprint {
                catalog.requirements.insert(
                    id,
                    Requirements {
                        prerequisite_upgrade_ids: prerequisites,
                        requires_blueprint,
                    },
                );
            }
        }

        catalog
    }

    /// A small hand-written catalog used by the viewer when no file is given.
    pub fn demo() -> Self {
        Self::new()
            .with_upgrade("tools", 0, &[])
            .with_upgrade("campfire", 0, &[])
            .with_upgrade("shelter", 1, &["campfire"])
            .with_upgrade("weaving", 2, &["tools"])
            .with_upgrade("hunting", 2, &["tools"])
            .with_upgrade("smoking", 3, &["campfire", "hunting"])
            .with_upgrade("storage", 3, &["shelter"])
            .with_upgrade("lanterns", 4, &["tools", "campfire"])
            .with_upgrade("bridges", 5, &["tools"])
            .with_upgrade("maps", 5, &["lanterns"])
            .with_upgrade("medicine", 6, &["smoking"])
            .with_upgrade("markets", 7, &["storage", "maps"])
            .with_upgrade("scouting", 7, &["maps"])
            .with_upgrade("water_filters", 8, &["medicine"])
            .with_upgrade("radio", 9, &["lanterns", "markets"])
            .with_blueprint("radio")
            .with_upgrade("elevators", 10, &["ancient_machinery"])
    }
}
