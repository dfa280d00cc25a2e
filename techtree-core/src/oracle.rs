//! Read-only views of the player's progress.
//!
//! The pruner and the scene builder never own unlock state; they query it
//! through [`UnlockOracle`] and [`AvailabilityOracle`]. Any `Err` from an
//! oracle is treated as "not unlocked / not available".

use crate::catalog::{Catalog, CatalogError};
use crate::types::UpgradeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("unknown upgrade {0}")]
    UnknownUpgrade(UpgradeId),
    #[error("progress source unavailable: {0}")]
    Unavailable(String),
}

/// Why an upgrade cannot be obtained right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    #[default]
    None,
    /// Some prerequisite upgrade is not researched yet.
    Requirements,
    /// The blueprint for this upgrade has not been found.
    MissingBlueprint,
    /// The player cannot pay for it.
    Costs,
    /// Already researched.
    Completed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCheck {
    /// `> 0` means the upgrade can be obtained now.
    pub satisfied_level: u32,
    pub block_reason: BlockReason,
}

impl RequirementCheck {
    pub fn is_available(&self) -> bool {
        self.satisfied_level > 0
    }
}

pub trait UnlockOracle {
    fn has_upgrade(&self, id: &str) -> Result<bool, OracleError>;
    fn has_available_blueprint(&self, id: &str) -> Result<bool, OracleError>;
}

pub trait AvailabilityOracle {
    fn check_requirements(&self, id: &str) -> Result<RequirementCheck, OracleError>;
}

/// A static progress snapshot implementing both oracles.
///
/// Ids not mentioned anywhere are locked, unavailable and have no
/// blueprint, so the snapshot never fails a query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    pub unlocked: BTreeSet<UpgradeId>,
    pub available: BTreeSet<UpgradeId>,
    pub blueprints: BTreeSet<UpgradeId>,
    pub blocked: BTreeMap<UpgradeId, BlockReason>,
}

impl ProgressSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlock(mut self, id: &str) -> Self {
        self.unlocked.insert(id.to_string());
        self
    }

    pub fn make_available(mut self, id: &str) -> Self {
        self.available.insert(id.to_string());
        self
    }

    pub fn with_blueprint(mut self, id: &str) -> Self {
        self.blueprints.insert(id.to_string());
        self
    }

    pub fn block(mut self, id: &str, reason: BlockReason) -> Self {
        self.blocked.insert(id.to_string(), reason);
        self
    }

    /// Flips the unlocked state of `id`; returns the new state.
    pub fn toggle_unlocked(&mut self, id: &str) -> bool {
        if self.unlocked.remove(id) {
            false
        } else {
            self.unlocked.insert(id.to_string());
            true
        }
    }

    /// Recomputes `available` from the catalog.
    ///
    /// An upgrade that is not unlocked becomes available once every
    /// prerequisite is unlocked and, if gated, its blueprint was found.
    /// Prerequisite ids the catalog does not define are ignored.
    pub fn derive_available(&mut self, catalog: &Catalog) {
        let known: HashSet<&str> = catalog.upgrades.iter().map(|d| d.id.as_str()).collect();
        let available: BTreeSet<UpgradeId> = catalog
            .upgrades
            .iter()
            .filter(|def| !self.unlocked.contains(&def.id))
            .filter(|def| match catalog.requirements_for(&def.id) {
                None => true,
                Some(reqs) => {
                    (!reqs.requires_blueprint || self.blueprints.contains(&def.id))
                        && reqs
                            .prerequisite_upgrade_ids
                            .iter()
                            .filter(|p| known.contains(p.as_str()))
                            .all(|p| self.unlocked.contains(p.as_str()))
                }
            })
            .map(|def| def.id.clone())
            .collect();
        self.available = available;
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl UnlockOracle for ProgressSnapshot {
    fn has_upgrade(&self, id: &str) -> Result<bool, OracleError> {
        Ok(self.unlocked.contains(id))
    }

    fn has_available_blueprint(&self, id: &str) -> Result<bool, OracleError> {
        Ok(self.blueprints.contains(id))
    }
}

impl AvailabilityOracle for ProgressSnapshot {
    fn check_requirements(&self, id: &str) -> Result<RequirementCheck, OracleError> {
        let available = self.available.contains(id);
        let block_reason = match self.blocked.get(id) {
            Some(reason) => *reason,
            None if self.unlocked.contains(id) => BlockReason::Completed,
            None if available => BlockReason::None,
            None => BlockReason::Requirements,
        };
        Ok(RequirementCheck {
            satisfied_level: u32::from(available),
            block_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_are_locked_and_unavailable() {
        let progress = ProgressSnapshot::new();

        assert_eq!(progress.has_upgrade("nope"), Ok(false));
        assert_eq!(progress.has_available_blueprint("nope"), Ok(false));
        let check = progress.check_requirements("nope").unwrap();
        assert!(!check.is_available());
        assert_eq!(check.block_reason, BlockReason::Requirements);
    }

    #[test]
    fn available_ids_report_positive_level() {
        let progress = ProgressSnapshot::new()
            .make_available("a")
            .unlock("b")
            .block("c", BlockReason::MissingBlueprint);

        let a = progress.check_requirements("a").unwrap();
        assert_eq!(a.satisfied_level, 1);
        assert_eq!(a.block_reason, BlockReason::None);

        let b = progress.check_requirements("b").unwrap();
        assert!(!b.is_available());
        assert_eq!(b.block_reason, BlockReason::Completed);

        let c = progress.check_requirements("c").unwrap();
        assert_eq!(c.block_reason, BlockReason::MissingBlueprint);
    }

    #[test]
    fn toggle_unlocked_flips_state() {
        let mut progress = ProgressSnapshot::new();
        assert!(progress.toggle_unlocked("a"));
        assert_eq!(progress.has_upgrade("a"), Ok(true));
        assert!(!progress.toggle_unlocked("a"));
        assert_eq!(progress.has_upgrade("a"), Ok(false));
    }

    #[test]
    fn derived_availability_follows_unlocks() {
        let catalog = Catalog::new()
            .with_upgrade("a", 0, &[])
            .with_upgrade("b", 3, &["a", "ghost"])
            .with_upgrade("c", 3, &["a"])
            .with_blueprint("c");
        let mut progress = ProgressSnapshot::new();

        progress.derive_available(&catalog);
        assert_eq!(progress.available, BTreeSet::from(["a".to_string()]));

        progress.toggle_unlocked("a");
        progress.derive_available(&catalog);
        assert_eq!(progress.available, BTreeSet::from(["b".to_string()]));

        progress.blueprints.insert("c".into());
        progress.derive_available(&catalog);
        assert!(progress.available.contains("c"));
    }

    #[test]
    fn snapshot_parses_from_json() {
        let json = r#"{ "unlocked": ["a"], "available": ["b"], "blocked": { "c": "Costs" } }"#;
        let progress = ProgressSnapshot::from_json_str(json).unwrap();

        assert_eq!(progress.has_upgrade("a"), Ok(true));
        assert!(progress.check_requirements("b").unwrap().is_available());
        assert_eq!(
            progress.check_requirements("c").unwrap().block_reason,
            BlockReason::Costs
        );
        assert!(progress.blueprints.is_empty());
    }
}
