/// Identifier for a node in a [`crate::tree::TechTree`].
///
/// This is an index into the tree's node arena, and is only meaningful
/// within the lifetime of a given `TechTree` instance.
pub type NodeId = usize;

/// Stable identifier of an upgrade definition, shared with the game data.
pub type UpgradeId = String;
