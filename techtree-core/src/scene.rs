//! Renderer-facing result of a layout run.
//!
//! [`layout_tech_tree`] is the single entry point: it runs every phase
//! on a fresh [`LayoutContext`] and returns a [`TechTreeScene`] holding
//! plain geometry. Nothing in the scene refers back into the tree.

use crate::{
    catalog::Catalog,
    config::Config,
    context::{Extent, LayoutContext},
    diagnostics::LayoutWarning,
    geometry::{Dimensions, EdgeGeometry, GeometryMapper},
    oracle::{AvailabilityOracle, BlockReason, UnlockOracle},
    phases::{build_phase, layout_phase, prune_phase},
    tree::TechTree,
    types::{NodeId, UpgradeId},
};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: UpgradeId,
    pub display_name: String,
    pub camp_ordinal: u32,
    pub level: u32,
    /// Grid position.
    pub grid: Vec2,
    /// Top-left pixel corner.
    pub pixel: Vec2,
    pub unlocked: bool,
    pub available: bool,
    pub block_reason: BlockReason,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeView {
    /// The prerequisite.
    pub from: UpgradeId,
    /// The dependent.
    pub to: UpgradeId,
    pub geometry: EdgeGeometry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechTreeScene {
    /// Root ids, ascending by camp ordinal.
    pub roots: Vec<UpgradeId>,
    /// Nodes in draw order: a depth-first walk from the roots, then any
    /// node the walk could not reach.
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub extent: Extent,
    pub dimensions: Dimensions,
    pub cell_size: Vec2,
    pub arrow_head_len: f32,
    pub warnings: Vec<LayoutWarning>,
}

/// Runs build, prune and layout on fresh state and maps the result to
/// pixels.
///
/// Every call starts from scratch; nothing is cached between calls.
pub fn layout_tech_tree(
    catalog: &Catalog,
    unlocks: &impl UnlockOracle,
    availability: &impl AvailabilityOracle,
    cfg: &Config,
) -> TechTreeScene {
    let mut ctx = LayoutContext::new(cfg.clone());
    let mut tree = build_phase(catalog, &mut ctx);
    prune_phase(&mut tree, unlocks, availability, &mut ctx);
    layout_phase(&mut tree, &mut ctx);
    TechTreeScene::from_tree(&tree, ctx, unlocks, availability)
}

impl TechTreeScene {
    /// Maps a laid-out tree to pixels.
    ///
    /// The unlocked / available flags are styling hints only; an oracle
    /// error just leaves them `false`.
    pub fn from_tree(
        tree: &TechTree,
        ctx: LayoutContext,
        unlocks: &impl UnlockOracle,
        availability: &impl AvailabilityOracle,
    ) -> Self {
        let mapper = GeometryMapper::new(&ctx.cfg);

        let mut order = tree.walk();
        let walked: HashSet<NodeId> = order.iter().copied().collect();
        order.extend(tree.ids().into_iter().filter(|id| !walked.contains(id)));

        let mut nodes = Vec::with_capacity(order.len());
        let mut edges = Vec::new();
        for &id in &order {
            let Some(node) = tree.node(id) else {
                continue;
            };
            let Some(grid) = node.pos else {
                continue;
            };

            let check = availability
                .check_requirements(&node.upgrade_id)
                .unwrap_or_default();
            nodes.push(NodeView {
                id: node.upgrade_id.clone(),
                display_name: node.display_name.clone(),
                camp_ordinal: node.camp_ordinal,
                level: node.level,
                grid,
                pixel: mapper.pixel_pos(grid),
                unlocked: unlocks.has_upgrade(&node.upgrade_id).unwrap_or(false),
                available: check.is_available(),
                block_reason: check.block_reason,
            });

            for &dependent in &node.required_by {
                let Some(target) = tree.node(dependent) else {
                    continue;
                };
                let Some(to) = target.pos else {
                    continue;
                };
                if let Some(geometry) = mapper.edge(grid, to) {
                    edges.push(EdgeView {
                        from: node.upgrade_id.clone(),
                        to: target.upgrade_id.clone(),
                        geometry,
                    });
                }
            }
        }

        Self {
            roots: tree
                .roots()
                .iter()
                .filter_map(|&r| tree.node(r).map(|n| n.upgrade_id.clone()))
                .collect(),
            nodes,
            edges,
            extent: ctx.extent,
            dimensions: mapper.dimensions(ctx.extent, 0.0),
            cell_size: mapper.cell_size(),
            arrow_head_len: ctx.cfg.arrow_head_len,
            warnings: ctx.diagnostics.into_warnings(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeView> + 'a {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// Canvas size for a container of the given width.
    pub fn canvas_size(&self, container_width: f32) -> Vec2 {
        Vec2::new(
            self.dimensions.canvas_width.max(container_width),
            self.dimensions.canvas_height,
        )
    }

    /// The node whose cell contains the pixel position `p`.
    pub fn hit_test(&self, p: Vec2) -> Option<&NodeView> {
        self.nodes.iter().find(|n| {
            let max = n.pixel + self.cell_size;
            p.cmpge(n.pixel).all() && p.cmple(max).all()
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
