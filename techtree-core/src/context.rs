use crate::{config::Config, diagnostics::Diagnostics, occupancy::OccupancyGrid};
use serde::{Deserialize, Serialize};

/// Largest grid coordinates handed out so far; `-1` before any placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub max_x: f32,
    pub max_y: f32,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            max_x: -1.0,
            max_y: -1.0,
        }
    }
}

impl Extent {
    pub fn include(&mut self, x: f32, y: f32) {
        if x > self.max_x {
            self.max_x = x;
        }
        if y > self.max_y {
            self.max_y = y;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_x < 0.0 || self.max_y < 0.0
    }
}

/// State owned by a single layout invocation.
///
/// Built fresh for every request and threaded through all phases, so two
/// layouts never share a grid, an extent or a warning list.
#[derive(Debug)]
pub struct LayoutContext {
    pub cfg: Config,
    pub grid: OccupancyGrid,
    pub extent: Extent,
    pub diagnostics: Diagnostics,
}

impl LayoutContext {
    pub fn new(cfg: Config) -> Self {
        let grid = OccupancyGrid::new(cfg.grid_quantum);
        Self {
            cfg,
            grid,
            extent: Extent::default(),
            diagnostics: Diagnostics::new(),
        }
    }
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
