//! High-level phases of one tech-tree layout.
//!
//! A layout request runs, in order:
//! 1. [`build_phase`]: sort the definitions, create the nodes and wire
//!    every resolvable prerequisite edge.
//! 2. [`prune_phase`]: drop nodes the player should not see yet.
//! 3. [`layout_phase`]: give every surviving node a grid position.
//!
//! Pixel geometry is derived afterwards by [`crate::geometry`]. All phases
//! share one [`LayoutContext`] and none of them can fail.

use crate::{
    catalog::{Catalog, UpgradeDefinition},
    config::OrphanPolicy,
    context::{Extent, LayoutContext},
    diagnostics::{Diagnostics, LayoutWarning},
    oracle::{AvailabilityOracle, UnlockOracle},
    placement::place_root,
    tree::{TechNode, TechTree},
    types::{NodeId, UpgradeId},
};
use std::collections::HashMap;
use tracing::debug;

/// Builds the dependency forest from a catalog.
///
/// Definitions are stable-sorted by camp ordinal before insertion, so
/// equal ordinals keep their catalog order. A repeated id keeps the first
/// definition and raises [`LayoutWarning::DuplicateDefinition`];
/// unresolvable prerequisite ids raise
/// [`LayoutWarning::MissingPrerequisite`] and produce no edge.
pub fn build_phase(catalog: &Catalog, ctx: &mut LayoutContext) -> TechTree {
    let mut defs: Vec<&UpgradeDefinition> = catalog.upgrades.iter().collect();
    defs.sort_by_key(|d| d.camp_ordinal);

    let mut tree = TechTree::new();
    for def in defs {
        let node = TechNode::new(def, catalog.requirements_for(&def.id));
        if tree.add_node(node).is_none() {
            ctx.diagnostics
                .warn(LayoutWarning::DuplicateDefinition { id: def.id.clone() });
        }
    }
    tree.connect_nodes(&mut ctx.diagnostics);

    debug!(nodes = tree.len(), roots = tree.roots().len(), "built tech tree");
    tree
}

/// Removes every node that is neither unlocked, available, nor visible.
///
/// A node is visible when one of its direct prerequisites is available
/// and it is not waiting on a missing blueprint. All decisions are taken
/// against the unpruned tree before anything is removed, so the result
/// does not depend on iteration order and removal never cascades into a
/// second visibility check.
///
/// Survivors that lose every prerequisite are handled according to
/// [`OrphanPolicy`].
///
/// ### Returns
/// The ids of the removed nodes, in removal order.
pub fn prune_phase(
    tree: &mut TechTree,
    unlocks: &impl UnlockOracle,
    availability: &impl AvailabilityOracle,
    ctx: &mut LayoutContext,
) -> Vec<UpgradeId> {
    let diag = &mut ctx.diagnostics;

    let available: HashMap<NodeId, bool> = tree
        .iter()
        .map(|(id, n)| (id, is_available(availability, &n.upgrade_id, diag)))
        .collect();

    let mut doomed: Vec<NodeId> = Vec::new();
    for (id, node) in tree.iter() {
        if is_unlocked(unlocks, &node.upgrade_id, diag) || available[&id] {
            continue;
        }

        let missing_blueprint =
            node.requires_blueprint && !has_blueprint(unlocks, &node.upgrade_id, diag);
        let visible = !missing_blueprint
            && node
                .requires
                .iter()
                .any(|p| available.get(p).copied().unwrap_or(false));
        if visible {
            continue;
        }
        doomed.push(id);
    }

    let mut removed: Vec<UpgradeId> = Vec::with_capacity(doomed.len());
    let mut orphans: Vec<NodeId> = Vec::new();
    for id in doomed {
        if let Some(node) = tree.node(id) {
            removed.push(node.upgrade_id.clone());
        }
        orphans.extend(tree.remove_node(id));
    }

    loop {
        orphans.sort_unstable();
        orphans.dedup();
        orphans.retain(|&o| tree.node(o).is_some_and(|n| n.requires.is_empty()));
        if orphans.is_empty() {
            break;
        }

        for orphan in std::mem::take(&mut orphans) {
            let Some(name) = tree.node(orphan).map(|n| n.upgrade_id.clone()) else {
                continue;
            };
            ctx.diagnostics
                .warn(LayoutWarning::OrphanedNode { id: name.clone() });
            match ctx.cfg.orphan_policy {
                OrphanPolicy::Promote => tree.insert_root(orphan),
                OrphanPolicy::Cascade => {
                    removed.push(name);
                    orphans.extend(tree.remove_node(orphan));
                }
            }
        }
    }

    debug!(removed = removed.len(), remaining = tree.len(), "pruned tech tree");
    removed
}

/// Places every root in order, each below the span of the previous ones.
///
/// Nodes left without a position afterwards (only possible when the
/// input contains a cycle) are placed as extra roots below everything
/// else with an [`LayoutWarning::UnplacedNode`] warning.
///
/// ### Returns
/// The largest grid coordinates used.
pub fn layout_phase(tree: &mut TechTree, ctx: &mut LayoutContext) -> Extent {
    let mut y = 0.0;
    for root in tree.roots().to_vec() {
        y += place_root(tree, ctx, root, y);
    }

    let unplaced: Vec<NodeId> = tree
        .iter()
        .filter(|(_, n)| !n.is_placed())
        .map(|(id, _)| id)
        .collect();
    for id in unplaced {
        let Some(node) = tree.node(id) else {
            continue;
        };
        if node.is_placed() {
            continue;
        }
        ctx.diagnostics.warn(LayoutWarning::UnplacedNode {
            id: node.upgrade_id.clone(),
        });
        y += place_root(tree, ctx, id, y);
    }

    debug!(max_x = ctx.extent.max_x, max_y = ctx.extent.max_y, "laid out tech tree");
    ctx.extent
}

fn is_unlocked(unlocks: &impl UnlockOracle, id: &str, diag: &mut Diagnostics) -> bool {
    unlocks.has_upgrade(id).unwrap_or_else(|e| {
        diag.warn(LayoutWarning::OracleFailure {
            id: id.to_string(),
            reason: e.to_string(),
        });
        false
    })
}

fn is_available(
    availability: &impl AvailabilityOracle,
    id: &str,
    diag: &mut Diagnostics,
) -> bool {
    match availability.check_requirements(id) {
        Ok(check) => check.is_available(),
        Err(e) => {
            diag.warn(LayoutWarning::OracleFailure {
                id: id.to_string(),
                reason: e.to_string(),
            });
            false
        }
    }
}

fn has_blueprint(unlocks: &impl UnlockOracle, id: &str, diag: &mut Diagnostics) -> bool {
    unlocks.has_available_blueprint(id).unwrap_or_else(|e| {
        diag.warn(LayoutWarning::OracleFailure {
            id: id.to_string(),
            reason: e.to_string(),
        });
        false
    })
}
