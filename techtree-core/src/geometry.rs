//! Grid-to-pixel mapping and connector geometry.
//!
//! Nothing here draws; renderers take the [`EdgeGeometry`] and
//! [`Dimensions`] values and paint them with whatever backend they use.

use crate::{config::Config, context::Extent};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_6;

/// Pixel size of the whole diagram.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub tree_width: f32,
    pub tree_height: f32,
    pub canvas_width: f32,
    pub canvas_height: f32,
}

/// A connector from a node to one of its dependents, in pixels.
///
/// `control` is the quadratic control point, or `None` for a straight
/// segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeGeometry {
    pub start: Vec2,
    pub end: Vec2,
    pub control: Option<Vec2>,
    /// Direction of the arrowhead at `end`, in radians.
    pub arrow_angle: f32,
}

impl EdgeGeometry {
    /// Point on the connector at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f32) -> Vec2 {
        match self.control {
            None => self.start.lerp(self.end, t),
            Some(c) => {
                let u = 1.0 - t;
                self.start * (u * u) + c * (2.0 * u * t) + self.end * (t * t)
            }
        }
    }

    /// `segments + 1` points along the connector, start and end included.
    pub fn sample(&self, segments: usize) -> Vec<Vec2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    /// Tip and the two wing points of the arrowhead.
    pub fn arrowhead(&self, len: f32) -> [Vec2; 3] {
        let tip = self.end;
        let wing = |a: f32| tip - len * Vec2::new(a.cos(), a.sin());
        [
            tip,
            wing(self.arrow_angle - FRAC_PI_6),
            wing(self.arrow_angle + FRAC_PI_6),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryMapper {
    cell_width: f32,
    cell_height: f32,
    cell_pad_x: f32,
    cell_pad_y: f32,
    tree_pad_x: f32,
    tree_pad_y: f32,
    min_canvas_height: f32,
}

impl GeometryMapper {
    pub fn new(cfg: &Config) -> Self {
        Self {
            cell_width: cfg.cell_width,
            cell_height: cfg.cell_height,
            cell_pad_x: cfg.cell_pad_x,
            cell_pad_y: cfg.cell_pad_y,
            tree_pad_x: cfg.tree_pad_x,
            tree_pad_y: cfg.tree_pad_y,
            min_canvas_height: cfg.min_canvas_height,
        }
    }

    #[inline]
    pub fn pixel_x(&self, x: f32) -> f32 {
        self.tree_pad_x + x * self.cell_width + x * self.cell_pad_x
    }

    #[inline]
    pub fn pixel_y(&self, y: f32) -> f32 {
        self.tree_pad_y + y * self.cell_height + y * self.cell_pad_y
    }

    /// Top-left pixel corner of the cell at grid position `grid`.
    pub fn pixel_pos(&self, grid: Vec2) -> Vec2 {
        Vec2::new(self.pixel_x(grid.x), self.pixel_y(grid.y))
    }

    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(self.cell_width, self.cell_height)
    }

    /// Connector from the node at grid position `from` to its dependent
    /// at `to`.
    ///
    /// The line leaves the source's right edge, pulled left a little the
    /// further away the target row is, and ends just short of the
    /// target's left edge, both at mid height.
    ///
    /// ### Returns
    /// `None` when an endpoint falls at a negative pixel coordinate.
    pub fn edge(&self, from: Vec2, to: Vec2) -> Option<EdgeGeometry> {
        let from_px = self.pixel_pos(from);
        let to_px = self.pixel_pos(to);
        let start_offset = -(from.y - to.y).abs() * self.cell_width / 16.0;

        let start = Vec2::new(
            from_px.x + self.cell_width + start_offset,
            from_px.y + self.cell_height / 2.0,
        );
        let end = Vec2::new(
            to_px.x - self.cell_pad_x / 5.0,
            to_px.y + self.cell_height / 2.0,
        );
        if start.min_element() < 0.0 || end.min_element() < 0.0 {
            return None;
        }
        Some(self.connector(start, end))
    }

    /// Straight segment or quadratic curve between two pixel points.
    ///
    /// Aligned endpoints, and endpoints closer than one cell in both
    /// directions, get a straight segment.
    pub fn connector(&self, start: Vec2, end: Vec2) -> EdgeGeometry {
        let d = end - start;
        let straight_angle = d.y.atan2(d.x);

        let aligned = start.y == end.y || start.x == end.x;
        let close = d.y.abs() < self.cell_height && d.x.abs() < self.cell_width;
        if aligned || close {
            return EdgeGeometry {
                start,
                end,
                control: None,
                arrow_angle: straight_angle,
            };
        }

        let control = Vec2::new(
            self.curve_control_x(start, end),
            self.curve_control_y(start, end),
        );
        let arrow_angle = if d.x.abs() > d.y.abs() {
            0.0
        } else {
            straight_angle / 2.0
        };
        EdgeGeometry {
            start,
            end,
            control: Some(control),
            arrow_angle,
        }
    }

    /// Control x sits near the source; the further right the target, the
    /// closer to the source (steeper curve), never past the midpoint.
    pub fn curve_control_x(&self, from: Vec2, to: Vec2) -> f32 {
        let result = from.x + self.cell_width / 4.0 * 3.0 - (to.x - from.x);
        result.max(from.x).min((from.x + to.x) / 2.0)
    }

    /// Control y is the target row; long edges overshoot it by one row
    /// padding, away from the source, so parallel long edges separate.
    pub fn curve_control_y(&self, from: Vec2, to: Vec2) -> f32 {
        if from.y == to.y {
            return from.y;
        }
        let xdist = (from.x - to.x).abs();
        if xdist > self.cell_width + self.cell_pad_x * 2.0 {
            if from.y < to.y {
                to.y + self.cell_pad_y
            } else {
                to.y - self.cell_pad_y
            }
        } else {
            to.y
        }
    }

    /// Pixel size of a tree whose largest coordinates are `extent`.
    ///
    /// The canvas is at least `container_width` wide and at least
    /// `min_canvas_height` tall. An empty extent counts as a single cell.
    pub fn dimensions(&self, extent: Extent, container_width: f32) -> Dimensions {
        let max_x = extent.max_x.max(0.0);
        let max_y = extent.max_y.max(0.0);
        let tree_width =
            (max_x + 1.0) * self.cell_width + max_x * self.cell_pad_x + 2.0 * self.tree_pad_x;
        let tree_height =
            (max_y + 1.0) * self.cell_height + max_y * self.cell_pad_y + 2.0 * self.tree_pad_y;
        Dimensions {
            tree_width,
            tree_height,
            canvas_width: tree_width.max(container_width),
            canvas_height: tree_height.max(self.min_canvas_height),
        }
    }
}

impl Default for GeometryMapper {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn pixel_position_includes_padding() {
        let m = GeometryMapper::default();
        assert_eq!(m.pixel_pos(Vec2::ZERO), Vec2::new(20.0, 20.0));
        assert!(approx(m.pixel_x(1.0), 125.0));
        assert!(approx(m.pixel_y(0.8), 49.6));
    }

    #[test]
    fn same_row_edge_is_straight() {
        let m = GeometryMapper::default();
        let e = m.edge(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)).unwrap();

        assert_eq!(e.start, Vec2::new(105.0, 31.0));
        assert_eq!(e.end, Vec2::new(121.0, 31.0));
        assert_eq!(e.control, None);
        assert_eq!(e.arrow_angle, 0.0);
        assert_eq!(e.point_at(0.5), Vec2::new(113.0, 31.0));
    }

    #[test]
    fn nearby_offset_edge_is_straight() {
        let m = GeometryMapper::default();
        let e = m.edge(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.5)).unwrap();
        assert!(e.control.is_none());
        assert!(e.arrow_angle > 0.0);
    }

    #[test]
    fn long_edge_curves_past_the_target_row() {
        let m = GeometryMapper::default();
        let e = m.edge(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)).unwrap();
        let c = e.control.unwrap();

        assert!(approx(e.start.x, 94.375));
        assert!(approx(e.end.x, 226.0));
        assert!(approx(e.end.y, 105.0));
        // Control x is clamped up to the source.
        assert!(approx(c.x, e.start.x));
        assert!(approx(c.y, 105.0 + 15.0));
        assert_eq!(e.arrow_angle, 0.0);
    }

    #[test]
    fn upward_long_edge_overshoots_upwards() {
        let m = GeometryMapper::default();
        let from = Vec2::new(50.0, 200.0);
        let to = Vec2::new(300.0, 100.0);
        assert_eq!(m.curve_control_y(from, to), 85.0);
        assert_eq!(m.curve_control_y(to, to), to.y);
    }

    #[test]
    fn short_edge_curve_is_capped_at_midpoint() {
        let m = GeometryMapper::default();
        let e = m.edge(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)).unwrap();
        let c = e.control.unwrap();

        assert!(approx(c.x, (e.start.x + e.end.x) / 2.0));
        assert!(approx(c.y, e.end.y));
        let d = e.end - e.start;
        assert!(approx(e.arrow_angle, d.y.atan2(d.x) / 2.0));
    }

    #[test]
    fn curve_passes_through_its_endpoints() {
        let m = GeometryMapper::default();
        let e = m.edge(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)).unwrap();
        let pts = e.sample(10);

        assert_eq!(pts.len(), 11);
        assert!(pts[0].distance(e.start) < 1e-3);
        assert!(pts[10].distance(e.end) < 1e-3);
    }

    #[test]
    fn edge_with_negative_endpoint_is_skipped() {
        let m = GeometryMapper::default();
        assert!(m.edge(Vec2::new(0.0, 0.0), Vec2::new(1.0, -1.0)).is_none());
    }

    #[test]
    fn arrowhead_wings_trail_the_tip() {
        let e = EdgeGeometry {
            start: Vec2::ZERO,
            end: Vec2::new(10.0, 0.0),
            control: None,
            arrow_angle: 0.0,
        };
        let [tip, a, b] = e.arrowhead(8.0);

        assert_eq!(tip, e.end);
        assert!(a.x < tip.x && b.x < tip.x);
        assert!(approx(a.y, -b.y));
        assert!(approx(tip.distance(a), 8.0));
    }

    #[test]
    fn dimensions_follow_extent_and_minimums() {
        let m = GeometryMapper::default();
        let d = m.dimensions(Extent { max_x: 2.0, max_y: 0.8 }, 300.0);

        assert!(approx(d.tree_width, 335.0));
        assert!(approx(d.tree_height, 91.6));
        assert!(approx(d.canvas_width, 335.0));
        assert_eq!(d.canvas_height, 100.0);

        let wide = m.dimensions(Extent { max_x: 2.0, max_y: 0.8 }, 1000.0);
        assert_eq!(wide.canvas_width, 1000.0);
    }

    #[test]
    fn empty_extent_is_one_cell() {
        let m = GeometryMapper::default();
        let d = m.dimensions(Extent::default(), 0.0);
        assert!(approx(d.tree_width, 125.0));
        assert!(approx(d.tree_height, 62.0));
    }
}
