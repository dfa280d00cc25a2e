use crate::types::NodeId;
use std::collections::HashMap;

/// Sparse occupancy map over quantized grid cells.
///
/// Positions are snapped to the nearest `1 / quantum` of a grid unit
/// (quarter units by default) and each snapped cell remembers the node
/// that claimed it. The grid is only consulted for collision queries; it
/// plays no part in rendering.
///
/// Cells with a negative coordinate are reported as occupied, which keeps
/// placement inside the positive quadrant.
#[derive(Debug)]
pub struct OccupancyGrid {
    quantum: f32,
    cells: HashMap<(i64, i64), NodeId>,
}

impl OccupancyGrid {
    /// Creates an empty grid snapping to `1 / quantum` grid units.
    pub fn new(quantum: f32) -> Self {
        Self {
            quantum,
            cells: HashMap::new(),
        }
    }

    /// Snaps a grid position to its cell key.
    ///
    /// Halves round away from zero, so `-0.5` of a cell lands on `-1`.
    #[inline]
    pub fn cell_key(&self, x: f32, y: f32) -> (i64, i64) {
        (
            (x * self.quantum).round() as i64,
            (y * self.quantum).round() as i64,
        )
    }

    /// Snaps a grid position to the quantized coordinate it lands on.
    #[inline]
    pub fn quantize(&self, x: f32, y: f32) -> (f32, f32) {
        let (kx, ky) = self.cell_key(x, y);
        (kx as f32 / self.quantum, ky as f32 / self.quantum)
    }

    /// Returns `true` if the cell containing `(x, y)` is taken or negative.
    pub fn is_occupied(&self, x: f32, y: f32) -> bool {
        let key = self.cell_key(x, y);
        if key.0 < 0 || key.1 < 0 {
            return true;
        }
        self.cells.contains_key(&key)
    }

    /// Probes `(x, y)` and its four von Neumann neighbours at distance `p`.
    ///
    /// The left and upper neighbours are clamped at zero so a probe near
    /// the top or left edge does not trip the negative-cell rule.
    pub fn is_area_occupied(&self, x: f32, y: f32, p: f32) -> bool {
        self.is_occupied(x, y)
            || self.is_occupied(x + p, y)
            || self.is_occupied((x - p).max(0.0), y)
            || self.is_occupied(x, y + p)
            || self.is_occupied(x, (y - p).max(0.0))
    }

    /// Claims the cell containing `(x, y)` for `node`.
    ///
    /// Returns the node that previously held the cell, if any; the new
    /// node replaces it either way.
    pub fn mark(&mut self, x: f32, y: f32, node: NodeId) -> Option<NodeId> {
        let key = self.cell_key(x, y);
        self.cells.insert(key, node)
    }

    pub fn occupant(&self, x: f32, y: f32) -> Option<NodeId> {
        self.cells.get(&self.cell_key(x, y)).copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
