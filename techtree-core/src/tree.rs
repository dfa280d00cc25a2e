use crate::{
    catalog::{Requirements, UpgradeDefinition},
    diagnostics::{Diagnostics, LayoutWarning},
    types::{NodeId, UpgradeId},
};
use glam::Vec2;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Number of consecutive camp ordinals sharing one horizontal column.
pub const ORDINALS_PER_LEVEL: u32 = 3;

#[derive(Debug, Clone)]
pub struct TechNode {
    pub upgrade_id: UpgradeId,
    pub display_name: String,
    pub camp_ordinal: u32,
    /// `camp_ordinal / 3`, the column bucket used for horizontal placement.
    pub level: u32,
    pub requires_blueprint: bool,
    /// Prerequisite ids as declared, including ones that never resolve.
    pub requires_ids: Vec<UpgradeId>,
    pub requires: Vec<NodeId>,
    pub required_by: Vec<NodeId>,
    pub required_by_by_level: BTreeMap<u32, Vec<NodeId>>,
    /// Grid position, `None` until placed.
    pub pos: Option<Vec2>,
}

/// Arena of [`TechNode`]s plus the ordered root list.
///
/// Pruned nodes leave an empty slot behind so that every [`NodeId`]
/// handed out stays valid for the lifetime of the tree.
#[derive(Debug, Default)]
pub struct TechTree {
    nodes: Vec<Option<TechNode>>,
    nodes_by_id: HashMap<UpgradeId, NodeId>,
    roots: Vec<NodeId>,
}

impl TechNode {
    pub fn new(def: &UpgradeDefinition, reqs: Option<&Requirements>) -> Self {
        let mut requires_ids: Vec<UpgradeId> = Vec::new();
        if let Some(reqs) = reqs {
            for id in &reqs.prerequisite_upgrade_ids {
                if !requires_ids.contains(id) {
                    requires_ids.push(id.clone());
                }
            }
        }

        Self {
            upgrade_id: def.id.clone(),
            display_name: def.display_name.clone(),
            camp_ordinal: def.camp_ordinal,
            level: def.camp_ordinal / ORDINALS_PER_LEVEL,
            requires_blueprint: reqs.is_some_and(|r| r.requires_blueprint),
            requires_ids,
            requires: Vec::new(),
            required_by: Vec::with_capacity(4),
            required_by_by_level: BTreeMap::new(),
            pos: None,
        }
    }

    #[inline]
    pub fn is_placed(&self) -> bool {
        self.pos.is_some()
    }

    /// Dependents ordered by level, then by insertion within a level.
    pub fn dependents(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.required_by_by_level.values().flatten().copied()
    }
}

impl TechTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the arena. Returns `None` if the id is already taken.
    pub fn add_node(&mut self, node: TechNode) -> Option<NodeId> {
        if self.nodes_by_id.contains_key(&node.upgrade_id) {
            return None;
        }
        let id: usize = self.nodes.len();
        self.nodes_by_id.insert(node.upgrade_id.clone(), id);
        self.nodes.push(Some(node));
        Some(id)
    }

    /// Inserts `id` into the roots, before the first root with a strictly
    /// greater camp ordinal, so equal ordinals keep insertion order.
    pub fn insert_root(&mut self, id: NodeId) {
        let Some(ordinal) = self.node(id).map(|n| n.camp_ordinal) else {
            return;
        };
        if self.roots.contains(&id) {
            return;
        }
        let mut i = 0;
        while i < self.roots.len() {
            let other = self.nodes[self.roots[i]].as_ref().map_or(0, |n| n.camp_ordinal);
            if other > ordinal {
                break;
            }
            i += 1;
        }
        self.roots.insert(i, id);
    }

    /// Resolves every declared prerequisite id into a two-sided edge and
    /// identifies the roots.
    ///
    /// Ids that do not resolve are skipped with a
    /// [`LayoutWarning::MissingPrerequisite`]; a node whose prerequisites
    /// all fail to resolve becomes a root.
    pub fn connect_nodes(&mut self, diag: &mut Diagnostics) {
        let mut edges: Vec<(NodeId, NodeId)> = Vec::new();
        for (id, node) in self.iter() {
            for required_id in &node.requires_ids {
                match self.nodes_by_id.get(required_id) {
                    Some(&required) => edges.push((required, id)),
                    None => diag.warn(LayoutWarning::MissingPrerequisite {
                        node: node.upgrade_id.clone(),
                        missing: required_id.clone(),
                    }),
                }
            }
        }

        for (required, dependent) in edges {
            self.link(required, dependent);
        }

        let roots: Vec<NodeId> = self
            .iter()
            .filter(|(_, n)| n.requires.is_empty())
            .map(|(id, _)| id)
            .collect();
        for id in roots {
            self.insert_root(id);
        }
    }

    fn link(&mut self, required: NodeId, dependent: NodeId) {
        let Some(level) = self.node(dependent).map(|n| n.level) else {
            return;
        };
        if let Some(node) = self.node_mut(dependent) {
            node.requires.push(required);
        }
        if let Some(node) = self.node_mut(required) {
            node.required_by.push(dependent);
            node.required_by_by_level.entry(level).or_default().push(dependent);
        }
    }

    /// Removes a node and both sides of every edge touching it.
    ///
    /// Returns the surviving dependents whose resolved prerequisites
    /// became empty because of this removal.
    pub fn remove_node(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return Vec::new();
        };
        self.nodes_by_id.remove(&node.upgrade_id);
        self.roots.retain(|&r| r != id);

        for &required in &node.requires {
            if let Some(parent) = self.node_mut(required) {
                parent.required_by.retain(|&c| c != id);
                if let Some(bucket) = parent.required_by_by_level.get_mut(&node.level) {
                    bucket.retain(|&c| c != id);
                    if bucket.is_empty() {
                        parent.required_by_by_level.remove(&node.level);
                    }
                }
            }
        }

        let mut orphans = Vec::new();
        for &dependent in &node.required_by {
            if let Some(child) = self.node_mut(dependent) {
                child.requires.retain(|&p| p != id);
                if child.requires.is_empty() {
                    orphans.push(dependent);
                }
            }
        }
        orphans
    }

    pub fn node(&self, id: NodeId) -> Option<&TechNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TechNode> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    pub fn lookup(&self, upgrade_id: &str) -> Option<NodeId> {
        self.nodes_by_id.get(upgrade_id).copied()
    }

    pub fn get(&self, upgrade_id: &str) -> Option<&TechNode> {
        self.lookup(upgrade_id).and_then(|id| self.node(id))
    }

    pub fn contains(&self, upgrade_id: &str) -> bool {
        self.nodes_by_id.contains_key(upgrade_id)
    }

    pub fn len(&self) -> usize {
        self.nodes_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_by_id.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Live nodes in arena (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TechNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|n| (id, n)))
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Every `required -> dependent` edge, in arena then `required_by` order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.iter()
            .flat_map(|(id, n)| n.required_by.iter().map(move |&c| (id, c)))
            .collect()
    }

    /// Depth-first pre-order walk from the roots through the per-level
    /// dependent lists. Each node is visited once.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };
            order.push(id);
            let children: Vec<NodeId> = node.dependents().collect();
            stack.extend(children.into_iter().rev());
        }
        order
    }

    /// Longest dependency chain.
    ///
    /// From the forest (`from = None`) each root contributes its own level
    /// plus the chain below it; from a node, every edge counts as one.
    pub fn depth(&self, from: Option<NodeId>) -> u32 {
        let mut visiting = HashSet::new();
        self.depth_inner(from, &mut visiting)
    }

    fn depth_inner(&self, from: Option<NodeId>, visiting: &mut HashSet<NodeId>) -> u32 {
        let search: &[NodeId] = match from {
            Some(id) => match self.node(id) {
                Some(n) => &n.required_by,
                None => return 0,
            },
            None => &self.roots,
        };

        let mut max_d = 0;
        for &next in search {
            if !visiting.insert(next) {
                continue;
            }
            let step = match from {
                Some(_) => 1,
                None => self.node(next).map_or(0, |n| n.level),
            };
            let d = step + self.depth_inner(Some(next), visiting);
            visiting.remove(&next);
            max_d = max_d.max(d);
        }
        max_d
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds and connects a tree from `(id, camp_ordinal, prerequisites)`.
    pub(crate) fn tree_from(nodes: &[(&str, u32, &[&str])], diag: &mut Diagnostics) -> TechTree {
        let mut tree = TechTree::new();
        for (id, ordinal, reqs) in nodes {
            let def = UpgradeDefinition {
                id: id.to_string(),
                camp_ordinal: *ordinal,
                display_name: id.to_string(),
            };
            let reqs = Requirements {
                prerequisite_upgrade_ids: reqs.iter().map(|r| r.to_string()).collect(),
                requires_blueprint: false,
            };
            tree.add_node(TechNode::new(&def, Some(&reqs)));
        }
        tree.connect_nodes(diag);
        tree
    }

    fn id(tree: &TechTree, upgrade_id: &str) -> NodeId {
        tree.lookup(upgrade_id).unwrap()
    }

    #[test]
    fn level_buckets_three_ordinals() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(&[("a", 2, &[]), ("b", 3, &[]), ("c", 7, &[])], &mut diag);

        assert_eq!(tree.get("a").unwrap().level, 0);
        assert_eq!(tree.get("b").unwrap().level, 1);
        assert_eq!(tree.get("c").unwrap().level, 2);
    }

    #[test]
    fn connect_wires_both_directions() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(&[("a", 1, &[]), ("b", 4, &["a"]), ("c", 8, &["a"])], &mut diag);
        let (a, b, c) = (id(&tree, "a"), id(&tree, "b"), id(&tree, "c"));

        assert_eq!(tree.node(a).unwrap().required_by, vec![b, c]);
        assert_eq!(tree.node(b).unwrap().requires, vec![a]);
        assert_eq!(tree.node(a).unwrap().required_by_by_level[&1], vec![b]);
        assert_eq!(tree.node(a).unwrap().required_by_by_level[&2], vec![c]);
        assert_eq!(tree.roots(), &[a]);
        assert!(diag.is_empty());
    }

    #[test]
    fn unresolved_prerequisite_is_dropped_with_warning() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(&[("e", 2, &["ghost"])], &mut diag);
        let e = id(&tree, "e");

        assert!(tree.node(e).unwrap().requires.is_empty());
        assert_eq!(tree.node(e).unwrap().requires_ids, vec!["ghost".to_string()]);
        assert_eq!(tree.roots(), &[e]);
        assert!(diag.mentions_missing("ghost"));
    }

    #[test]
    fn duplicate_prerequisite_ids_make_one_edge() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(&[("a", 0, &[]), ("b", 1, &["a", "a"])], &mut diag);
        assert_eq!(tree.get("a").unwrap().required_by.len(), 1);
    }

    #[test]
    fn add_node_rejects_duplicate_ids() {
        let mut diag = Diagnostics::new();
        let mut tree = tree_from(&[("a", 0, &[])], &mut diag);
        let def = UpgradeDefinition {
            id: "a".into(),
            camp_ordinal: 5,
            display_name: String::new(),
        };
        assert!(tree.add_node(TechNode::new(&def, None)).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn roots_stay_sorted_and_ties_keep_insertion_order() {
        let mut diag = Diagnostics::new();
        let mut tree = tree_from(&[("x", 3, &[]), ("y", 3, &[])], &mut diag);
        let def = |id: &str, ordinal| UpgradeDefinition {
            id: id.into(),
            camp_ordinal: ordinal,
            display_name: String::new(),
        };
        let early = tree.add_node(TechNode::new(&def("early", 1), None)).unwrap();
        let tie = tree.add_node(TechNode::new(&def("tie", 3), None)).unwrap();
        tree.insert_root(early);
        tree.insert_root(tie);

        let order: Vec<&str> = tree
            .roots()
            .iter()
            .map(|&r| tree.node(r).unwrap().upgrade_id.as_str())
            .collect();
        assert_eq!(order, vec!["early", "x", "y", "tie"]);
    }

    #[test]
    fn remove_node_clears_both_sides() {
        let mut diag = Diagnostics::new();
        let mut tree = tree_from(
            &[("a", 0, &[]), ("b", 3, &["a"]), ("c", 6, &["b"]), ("d", 6, &["a", "b"])],
            &mut diag,
        );
        let (a, b, c, d) = (id(&tree, "a"), id(&tree, "b"), id(&tree, "c"), id(&tree, "d"));

        let orphans = tree.remove_node(b);

        assert_eq!(orphans, vec![c]);
        assert!(!tree.contains("b"));
        assert!(tree.node(b).is_none());
        assert_eq!(tree.node(a).unwrap().required_by, vec![d]);
        assert!(!tree.node(a).unwrap().required_by_by_level.contains_key(&1));
        assert!(tree.node(c).unwrap().requires.is_empty());
        assert_eq!(tree.node(d).unwrap().requires, vec![a]);
        assert!(tree.edges().iter().all(|&(p, q)| p != b && q != b));
    }

    #[test]
    fn remove_root_drops_it_from_roots() {
        let mut diag = Diagnostics::new();
        let mut tree = tree_from(&[("a", 0, &[]), ("b", 1, &[])], &mut diag);
        let a = id(&tree, "a");
        tree.remove_node(a);
        assert_eq!(tree.roots(), &[id(&tree, "b")]);
        assert!(tree.remove_node(a).is_empty());
    }

    #[test]
    fn walk_visits_shared_dependents_once_in_level_order() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(
            &[
                ("a", 1, &[]),
                ("late", 9, &["a"]),
                ("b", 4, &["a"]),
                ("c", 4, &["a"]),
                ("d", 7, &["b", "c"]),
            ],
            &mut diag,
        );
        let names: Vec<&str> = tree
            .walk()
            .into_iter()
            .map(|i| tree.node(i).unwrap().upgrade_id.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "d", "c", "late"]);
    }

    #[test]
    fn depth_counts_levels_and_edges() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(
            &[("a", 3, &[]), ("b", 4, &["a"]), ("c", 7, &["b"]), ("solo", 0, &[])],
            &mut diag,
        );
        assert_eq!(tree.depth(Some(id(&tree, "a"))), 2);
        assert_eq!(tree.depth(Some(id(&tree, "c"))), 0);
        // root "a" sits on level 1 and has a chain of two edges below it
        assert_eq!(tree.depth(None), 3);
    }

    #[test]
    fn depth_survives_cycles() {
        let mut diag = Diagnostics::new();
        let tree = tree_from(&[("a", 0, &["b"]), ("b", 0, &["a"])], &mut diag);
        assert!(tree.roots().is_empty());
        assert_eq!(tree.depth(Some(id(&tree, "a"))), 2);
    }
}
