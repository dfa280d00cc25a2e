//! Tunable constants for placement and pixel mapping.

use crate::catalog::CatalogError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What the pruner does with a surviving node whose every prerequisite
/// was pruned in the same pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrphanPolicy {
    /// Keep the node and insert it into the roots.
    #[default]
    Promote,
    /// Remove orphans too, repeating until no new orphan appears.
    Cascade,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vertical distance between stacked siblings, in grid units.
    pub child_spacing: f32,
    /// Radius probed around a candidate cell by the collision loop.
    pub probe_radius: f32,
    /// How far the collision loop pushes a candidate down per iteration.
    pub probe_step: f32,
    /// Probe radius used when lifting the first child of a parent.
    pub lift_probe_radius_first: f32,
    /// Probe radius used when lifting the remaining children.
    pub lift_probe_radius_rest: f32,
    /// Occupancy cells per grid unit (4 = quarter units).
    pub grid_quantum: f32,
    /// Stored positions are rounded to `1 / position_precision`.
    pub position_precision: f32,

    pub cell_width: f32,
    pub cell_height: f32,
    pub cell_pad_x: f32,
    pub cell_pad_y: f32,
    pub tree_pad_x: f32,
    pub tree_pad_y: f32,
    pub arrow_head_len: f32,
    pub min_canvas_height: f32,

    pub orphan_policy: OrphanPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            child_spacing: 0.825,
            probe_radius: 0.4,
            probe_step: 0.4,
            lift_probe_radius_first: 0.5,
            lift_probe_radius_rest: 0.35,
            grid_quantum: 4.0,
            position_precision: 10.0,

            cell_width: 85.0,
            cell_height: 22.0,
            cell_pad_x: 20.0,
            cell_pad_y: 15.0,
            tree_pad_x: 20.0,
            tree_pad_y: 20.0,
            arrow_head_len: 8.0,
            min_canvas_height: 100.0,

            orphan_policy: OrphanPolicy::Promote,
        }
    }
}

impl Config {
    /// Parses a (possibly partial) JSON config; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rounds a grid coordinate to the stored position precision.
    #[inline]
    pub fn round_position(&self, v: f32) -> f32 {
        (v * self.position_precision).round() / self.position_precision
    }
}
