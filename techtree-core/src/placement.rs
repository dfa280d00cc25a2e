//! Recursive greedy placement of nodes on the layout grid.
//!
//! A root is dropped at its column and the next free vertical offset;
//! its dependents are then stacked to its right, one `child_spacing`
//! apart, nudged up to sit centred on the parent when there is room and
//! pushed down while they collide with anything already placed. Every
//! placement claims a cell in the shared [`OccupancyGrid`].
//!
//! [`OccupancyGrid`]: crate::occupancy::OccupancyGrid

use crate::{
    context::LayoutContext,
    diagnostics::LayoutWarning,
    tree::TechTree,
    types::NodeId,
};
use glam::Vec2;

/// Assigns `id` the grid position `(x, y)`.
///
/// The stored position is rounded to the configured precision, the
/// extent grows to include it and the occupancy cell of the unrounded
/// position is claimed. A cell that is already claimed is overwritten
/// with an [`LayoutWarning::OccupiedCell`] warning.
///
/// A node that already has a position keeps it; the existing position
/// is returned and nothing else changes.
///
/// ### Returns
/// The node's position, or `None` if `id` is not in the tree.
pub fn position_node(
    tree: &mut TechTree,
    ctx: &mut LayoutContext,
    id: NodeId,
    x: f32,
    y: f32,
) -> Option<Vec2> {
    let pos = Vec2::new(ctx.cfg.round_position(x), ctx.cfg.round_position(y));
    let node = tree.node_mut(id)?;
    if let Some(existing) = node.pos {
        return Some(existing);
    }
    node.pos = Some(pos);
    let name = node.upgrade_id.clone();

    ctx.extent.include(pos.x, pos.y);
    if let Some(previous) = ctx.grid.mark(x, y, id) {
        let (gx, gy) = ctx.grid.quantize(x, y);
        let previous = tree
            .node(previous)
            .map(|n| n.upgrade_id.clone())
            .unwrap_or_default();
        ctx.diagnostics.warn(LayoutWarning::OccupiedCell {
            x: gx,
            y: gy,
            previous,
            node: name,
        });
    }
    Some(pos)
}

/// Places a root and everything that hangs off it.
///
/// The root goes to column `max(0, level - 1)` at vertical offset `y`.
///
/// ### Returns
/// The vertical span consumed by the root's subtree, at least `1`. A
/// root that was already placed consumes nothing.
pub fn place_root(tree: &mut TechTree, ctx: &mut LayoutContext, root: NodeId, y: f32) -> f32 {
    let Some(node) = tree.node(root) else {
        return 0.0;
    };
    if node.is_placed() {
        return 0.0;
    }
    let x = (node.level as f32 - 1.0).max(0.0);

    if position_node(tree, ctx, root, x, y).is_none() {
        return 0.0;
    }
    place_children(tree, ctx, root, 1.0, y)
}

/// Places the dependents of `parent`, whose row is `y`, and recursively
/// their own dependents.
///
/// Each child's column comes from its placed prerequisites, not from
/// `parent` alone.
///
/// `span` is the vertical span inherited from the caller. It grows to
/// `count * child_spacing` when the parent has more children than the
/// span covers, and to the largest span any child subtree reports.
///
/// ### Returns
/// `max(1, span)` after all children are placed.
pub fn place_children(
    tree: &mut TechTree,
    ctx: &mut LayoutContext,
    parent: NodeId,
    span: f32,
    y: f32,
) -> f32 {
    let children = placeable_children(tree, parent);
    let spacing = ctx.cfg.child_spacing;
    let count = children.len() as f32;

    let mut span = span;
    if count > span {
        span = count * spacing;
    }

    // Pull small families up so they straddle the parent's row.
    let mut lift = match children.len() {
        0 | 1 => 0.0,
        2 => spacing / 2.0,
        _ => spacing,
    };

    for (i, child) in children.into_iter().enumerate() {
        if tree.node(child).is_none_or(|n| n.is_placed()) {
            continue;
        }
        let child_x = column_for(tree, child);
        let offset = i as f32 * spacing;
        let mut child_y = y + offset;

        if lift > 0.0 {
            let radius = if i == 0 {
                ctx.cfg.lift_probe_radius_first
            } else {
                ctx.cfg.lift_probe_radius_rest
            };
            if ctx.grid.is_area_occupied(child_x, child_y - lift, radius) {
                lift = 0.0;
            } else {
                child_y -= lift;
            }
        }

        let ceiling = y + offset + count * spacing;
        child_y = resolve_collision(tree, ctx, child, child_x, child_y, ceiling);

        let Some(pos) = position_node(tree, ctx, child, child_x, child_y) else {
            continue;
        };
        let child_span = place_children(tree, ctx, child, span, pos.y);
        span = span.max(child_span);
    }

    span.max(1.0)
}

/// Dependents of `parent` that are still unplaced and whose every
/// prerequisite already has a position, in per-level order.
///
/// A node with several prerequisites is thus placed once, by whichever
/// prerequisite is placed last.
fn placeable_children(tree: &TechTree, parent: NodeId) -> Vec<NodeId> {
    let Some(node) = tree.node(parent) else {
        return Vec::new();
    };
    node.dependents()
        .filter(|&c| {
            tree.node(c).is_some_and(|child| {
                !child.is_placed()
                    && child
                        .requires
                        .iter()
                        .all(|&p| tree.node(p).is_some_and(|n| n.is_placed()))
            })
        })
        .collect()
}

/// Column for a node about to be placed: one right of its rightmost
/// placed prerequisite, or its own level if that is further right.
fn column_for(tree: &TechTree, id: NodeId) -> f32 {
    let Some(node) = tree.node(id) else {
        return 0.0;
    };
    node.requires
        .iter()
        .filter_map(|&p| tree.node(p).and_then(|n| n.pos))
        .map(|pos| pos.x + 1.0)
        .fold(node.level as f32, f32::max)
}

/// Pushes a candidate down in `probe_step` increments while its
/// neighbourhood is occupied.
///
/// Gives up once `y` is negative or below `ceiling`, keeping the last
/// candidate; the caller then places the node on top of whatever is
/// there.
fn resolve_collision(
    tree: &TechTree,
    ctx: &mut LayoutContext,
    id: NodeId,
    x: f32,
    mut y: f32,
    ceiling: f32,
) -> f32 {
    let step = ctx.cfg.probe_step;
    if step <= 0.0 {
        return y;
    }
    while ctx.grid.is_area_occupied(x, y, ctx.cfg.probe_radius) {
        if y < 0.0 || y > ceiling {
            let name = tree.node(id).map(|n| n.upgrade_id.clone()).unwrap_or_default();
            ctx.diagnostics
                .warn(LayoutWarning::CollisionBoundExceeded { id: name, y });
            break;
        }
        y += step;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::Diagnostics,
        phases::layout_phase,
        tree::{TechTree, tests::tree_from},
    };

    fn laid_out(nodes: &[(&str, u32, &[&str])]) -> (TechTree, LayoutContext) {
        let mut ctx = LayoutContext::default();
        let mut tree = tree_from(nodes, &mut ctx.diagnostics);
        layout_phase(&mut tree, &mut ctx);
        (tree, ctx)
    }

    fn pos(tree: &TechTree, id: &str) -> Vec2 {
        tree.get(id).and_then(|n| n.pos).unwrap()
    }

    #[test]
    fn simple_chain_places_children_right_and_stacked() {
        let (tree, ctx) = laid_out(&[
            ("a", 1, &[]),
            ("b", 4, &["a"]),
            ("c", 4, &["a"]),
            ("d", 7, &["b", "c"]),
        ]);
        let (a, b, c, d) = (pos(&tree, "a"), pos(&tree, "b"), pos(&tree, "c"), pos(&tree, "d"));

        assert_eq!(a, Vec2::new(0.0, 0.0));
        assert!(b.x >= 1.0 && c.x >= 1.0);
        assert_ne!(b.y, c.y);
        assert!(((c.y - b.y).abs() - ctx.cfg.child_spacing).abs() < 0.05);
        assert!(d.x > b.x.max(c.x));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn first_root_children_stay_unshifted() {
        // Lifting the first child of a root at y = 0 would leave the grid.
        let (tree, _) = laid_out(&[("a", 1, &[]), ("b", 4, &["a"]), ("c", 4, &["a"])]);
        assert_eq!(pos(&tree, "b"), Vec2::new(1.0, 0.0));
        assert_eq!(pos(&tree, "c"), Vec2::new(1.0, 0.8));
    }

    #[test]
    fn two_children_are_centred_when_there_is_room() {
        let (tree, _) = laid_out(&[
            ("p", 0, &[]),
            ("r", 1, &[]),
            ("x", 3, &["r"]),
            ("y", 3, &["r"]),
        ]);
        let (r, x, y) = (pos(&tree, "r"), pos(&tree, "x"), pos(&tree, "y"));

        assert_eq!(r, Vec2::new(0.0, 1.0));
        assert_eq!(x, Vec2::new(1.0, 0.6));
        assert_eq!(y, Vec2::new(1.0, 1.4));
    }

    #[test]
    fn three_children_are_lifted_by_a_full_spacing() {
        let (tree, ctx) = laid_out(&[
            ("p", 0, &[]),
            ("q", 0, &[]),
            ("r", 1, &[]),
            ("x", 3, &["r"]),
            ("y", 3, &["r"]),
            ("z", 3, &["r"]),
        ]);

        assert_eq!(pos(&tree, "r"), Vec2::new(0.0, 2.0));
        assert_eq!(pos(&tree, "x"), Vec2::new(1.0, 1.2));
        assert_eq!(pos(&tree, "y"), Vec2::new(1.0, 2.0));
        assert_eq!(pos(&tree, "z"), Vec2::new(1.0, 2.8));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn blocked_lift_is_dropped_for_the_remaining_children() {
        let mut ctx = LayoutContext::default();
        let mut tree = tree_from(
            &[
                ("p", 0, &[]),
                ("q", 0, &[]),
                ("r", 1, &[]),
                ("x", 3, &["r"]),
                ("y", 3, &["r"]),
                ("z", 3, &["r"]),
            ],
            &mut ctx.diagnostics,
        );
        // The lifted target of the second child.
        ctx.grid.mark(1.0, 2.0, 99);

        layout_phase(&mut tree, &mut ctx);

        let spacing = ctx.cfg.child_spacing;
        assert_eq!(pos(&tree, "x"), Vec2::new(1.0, 1.2), "first child keeps its lift");
        assert_eq!(pos(&tree, "y"), Vec2::new(1.0, 2.8));
        let z = pos(&tree, "z");
        assert_eq!(z.x, 1.0);
        assert!((z.y - (2.0 + 2.0 * spacing)).abs() < 0.06, "z at {z:?}");
        assert_eq!(ctx.grid.occupant(1.0, 2.0), Some(99));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn child_column_respects_its_own_level() {
        let (tree, _) = laid_out(&[("a", 0, &[]), ("far", 12, &["a"])]);
        assert_eq!(pos(&tree, "far").x, 4.0);
    }

    #[test]
    fn root_column_is_one_left_of_its_level() {
        let (tree, _) = laid_out(&[("late_root", 9, &[])]);
        assert_eq!(pos(&tree, "late_root"), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn independent_roots_stack_vertically() {
        let (tree, ctx) = laid_out(&[("a", 0, &[]), ("b", 0, &[]), ("c", 1, &[])]);
        assert_eq!(pos(&tree, "a").y, 0.0);
        assert_eq!(pos(&tree, "b").y, 1.0);
        assert_eq!(pos(&tree, "c").y, 2.0);
        assert_eq!(ctx.extent.max_y, 2.0);
        assert_eq!(ctx.extent.max_x, 0.0);
    }

    #[test]
    fn collision_pushes_child_down() {
        let mut ctx = LayoutContext::default();
        let mut tree = tree_from(&[("x", 0, &[]), ("y", 3, &["x"])], &mut ctx.diagnostics);
        ctx.grid.mark(1.0, 0.0, 99);

        layout_phase(&mut tree, &mut ctx);

        assert_eq!(pos(&tree, "y"), Vec2::new(1.0, 0.8));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn collision_loop_gives_up_past_the_ceiling() {
        let mut ctx = LayoutContext::default();
        let mut tree = tree_from(&[("x", 0, &[]), ("y", 3, &["x"])], &mut ctx.diagnostics);
        for k in 0..12 {
            ctx.grid.mark(1.0, k as f32 * 0.25, 99);
        }

        layout_phase(&mut tree, &mut ctx);

        assert_eq!(pos(&tree, "y"), Vec2::new(1.0, 1.2));
        let warnings = ctx.diagnostics.warnings();
        assert!(warnings
            .iter()
            .any(|w| matches!(w, LayoutWarning::CollisionBoundExceeded { id, .. } if id == "y")));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, LayoutWarning::OccupiedCell { node, .. } if node == "y")));
    }

    #[test]
    fn occupied_cell_warns_but_still_places() {
        let mut ctx = LayoutContext::default();
        let mut tree = tree_from(&[("solo", 0, &[])], &mut ctx.diagnostics);
        ctx.grid.mark(0.0, 0.0, 42);

        layout_phase(&mut tree, &mut ctx);

        assert_eq!(pos(&tree, "solo"), Vec2::ZERO);
        assert_eq!(ctx.grid.occupant(0.0, 0.0), tree.lookup("solo"));
        assert!(matches!(
            ctx.diagnostics.warnings(),
            [LayoutWarning::OccupiedCell { .. }]
        ));
    }

    #[test]
    fn positions_are_never_reassigned() {
        let (mut tree, mut ctx) = laid_out(&[("a", 1, &[]), ("b", 4, &["a"])]);
        let b = tree.lookup("b").unwrap();
        let before = pos(&tree, "b");

        assert_eq!(position_node(&mut tree, &mut ctx, b, 5.0, 5.0), Some(before));
        assert_eq!(pos(&tree, "b"), before);
        assert_eq!(ctx.grid.occupant(5.0, 5.0), None);
    }

    #[test]
    fn leaf_subtree_height_is_one() {
        let mut ctx = LayoutContext::default();
        let mut diag = Diagnostics::new();
        let mut tree = tree_from(&[("leaf", 0, &[])], &mut diag);
        let leaf = tree.lookup("leaf").unwrap();

        assert_eq!(place_root(&mut tree, &mut ctx, leaf, 0.0), 1.0);
        assert_eq!(place_children(&mut tree, &mut ctx, leaf, 1.0, 0.0), 1.0);
    }

    #[test]
    fn wide_family_grows_the_span() {
        let (tree, ctx) = laid_out(&[
            ("a", 0, &[]),
            ("c1", 3, &["a"]),
            ("c2", 3, &["a"]),
            ("c3", 3, &["a"]),
            ("next", 0, &[]),
        ]);
        // Three children need 3 * 0.825 rows, so the next root starts lower.
        assert!(pos(&tree, "next").y >= 2.4);
        assert!(ctx.extent.max_y >= pos(&tree, "c3").y);
    }
}
