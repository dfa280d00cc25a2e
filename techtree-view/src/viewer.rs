//! Interactive tech-tree viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns the catalog, the progress
//! snapshot and the last computed [`TechTreeScene`], and implements
//! [`eframe::App`] to draw the scene and toggle research by clicking.

use eframe::App;
use glam::Vec2;
use techtree_core::{
    catalog::Catalog,
    config::{Config, OrphanPolicy},
    geometry::EdgeGeometry,
    layout_tech_tree,
    oracle::{BlockReason, ProgressSnapshot},
    scene::{NodeView, TechTreeScene},
};
use tracing::{info, warn};

/// Number of segments used when drawing a curved connector.
const CURVE_SEGMENTS: usize = 20;

/// Main application state for the interactive viewer.
///
/// The scene is only recomputed when the inputs change (a node is
/// clicked, the orphan policy or the catalog is switched), never per
/// frame.
///
/// ### Fields
/// - `catalog` - Upgrade definitions and requirements being shown.
/// - `progress` - Player progress; also serves as both oracles.
/// - `cfg` - Layout configuration.
/// - `scene` - Result of the last layout run.
///
/// - `zoom` - Zoom factor for scene-to-screen mapping.
/// - `pan` - Screen-space pan offset in pixels.
///
/// - `random_count` - Size of catalogs generated by the "Random" button.
/// - `recomputes` - Number of layout runs so far (shown in the status bar).
/// - `last_layout_ms` - Wall time of the last layout run.
pub struct Viewer {
    catalog: Catalog,
    progress: ProgressSnapshot,
    cfg: Config,
    scene: TechTreeScene,

    zoom: f32,
    pan: egui::Vec2,

    random_count: usize,
    recomputes: usize,
    last_layout_ms: f64,
}

impl Viewer {
    /// Creates a viewer and runs the first layout.
    pub fn new(catalog: Catalog, progress: ProgressSnapshot, cfg: Config) -> Self {
        let start = std::time::Instant::now();
        let scene = layout_tech_tree(&catalog, &progress, &progress, &cfg);
        Self {
            catalog,
            progress,
            cfg,
            scene,
            zoom: 1.0,
            pan: egui::vec2(0.0, 0.0),
            random_count: 60,
            recomputes: 1,
            last_layout_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Runs the whole layout pipeline again from the current inputs.
    fn recompute(&mut self) {
        let start = std::time::Instant::now();
        self.scene = layout_tech_tree(&self.catalog, &self.progress, &self.progress, &self.cfg);
        self.last_layout_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.recomputes += 1;

        info!(
            nodes = self.scene.nodes.len(),
            edges = self.scene.edges.len(),
            warnings = self.scene.warnings.len(),
            "recomputed layout"
        );
    }

    /// Flips the researched state of `id`, re-derives what is obtainable
    /// and recomputes the layout once.
    fn toggle_node(&mut self, id: &str) {
        let unlocked = self.progress.toggle_unlocked(id);
        info!(id, unlocked, "toggled upgrade");
        self.progress.derive_available(&self.catalog);
        self.recompute();
    }

    fn set_orphan_policy(&mut self, policy: OrphanPolicy) {
        if self.cfg.orphan_policy == policy {
            return;
        }
        self.cfg.orphan_policy = policy;
        self.recompute();
    }

    /// Replaces the catalog and starts over with nothing researched.
    fn load_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.progress = ProgressSnapshot::new();
        self.progress.derive_available(&self.catalog);
        self.reset_view();
        self.recompute();
    }

    fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = egui::vec2(0.0, 0.0);
    }

    /// Converts a scene pixel position to screen-space.
    ///
    /// Scene coordinates grow right and down from the canvas origin, which
    /// sits at the top-left of `rect`, offset by `pan` and scaled by `zoom`.
    fn world_to_screen(&self, p: Vec2, rect: egui::Rect) -> egui::Pos2 {
        egui::pos2(
            rect.min.x + p.x * self.zoom + self.pan.x,
            rect.min.y + p.y * self.zoom + self.pan.y,
        )
    }

    /// Inverse of [`Viewer::world_to_screen`] (up to floating point rounding).
    fn screen_to_world(&self, p: egui::Pos2, rect: egui::Rect) -> Vec2 {
        Vec2::new(
            (p.x - rect.min.x - self.pan.x) / self.zoom,
            (p.y - rect.min.y - self.pan.y) / self.zoom,
        )
    }

    fn node_colors(node: &NodeView) -> (egui::Color32, egui::Color32) {
        if node.unlocked {
            (egui::Color32::from_rgb(46, 110, 60), egui::Color32::LIGHT_GREEN)
        } else if node.available {
            (egui::Color32::from_rgb(120, 100, 30), egui::Color32::YELLOW)
        } else {
            match node.block_reason {
                BlockReason::MissingBlueprint => {
                    (egui::Color32::from_rgb(70, 50, 90), egui::Color32::LIGHT_BLUE)
                }
                _ => (egui::Color32::from_gray(55), egui::Color32::GRAY),
            }
        }
    }

    /// Builds the top panel UI (catalog switching, view reset, zoom).
    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Demo").clicked() {
                    self.load_catalog(Catalog::demo());
                }

                if ui.button("Random").clicked() {
                    self.load_catalog(Catalog::random(self.random_count, 3, &mut rand::rng()));
                }
                ui.add(
                    egui::DragValue::new(&mut self.random_count)
                        .prefix("upgrades = ")
                        .range(1..=500)
                        .speed(1.0),
                );

                if ui.button("Reset research").clicked() {
                    self.progress = ProgressSnapshot::new();
                    self.progress.derive_available(&self.catalog);
                    self.recompute();
                }

                if ui.button("Copy JSON").clicked() {
                    match self.scene.to_json() {
                        Ok(json) => ctx.copy_text(json),
                        Err(e) => warn!(error = %e, "failed to serialize scene"),
                    }
                }

                ui.separator();
                if ui.button("Reset view").clicked() {
                    self.reset_view();
                }
                ui.add(egui::Slider::new(&mut self.zoom, 0.2..=4.0).text("Zoom"));
            });
        });
    }

    /// Builds the bottom status bar (counts and layout timing).
    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("layout = {:.2} ms", self.last_layout_ms));
                ui.label(format!("runs = {}", self.recomputes));
                ui.separator();
                ui.label(format!("nodes = {}", self.scene.nodes.len()));
                ui.label(format!("edges = {}", self.scene.edges.len()));
                ui.label(format!("roots = {}", self.scene.roots.len()));
                ui.label(format!("unlocked = {}", self.progress.unlocked.len()));
            });
        });
    }

    /// Builds the right-hand panel with the orphan policy and warnings.
    fn ui_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("side_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Layout");

                ui.separator();
                ui.label("Orphaned nodes");
                let mut policy = self.cfg.orphan_policy;
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut policy, OrphanPolicy::Promote, "Promote");
                    ui.selectable_value(&mut policy, OrphanPolicy::Cascade, "Cascade");
                });
                self.set_orphan_policy(policy);

                ui.separator();
                ui.label(format!("Warnings ({})", self.scene.warnings.len()));
                egui::ScrollArea::vertical().show(ui, |ui| {
                    for warning in &self.scene.warnings {
                        ui.label(
                            egui::RichText::new(warning.to_string())
                                .small()
                                .color(egui::Color32::LIGHT_RED),
                        );
                    }
                });
            });
    }

    fn draw_edge(&self, painter: &egui::Painter, rect: egui::Rect, edge: &EdgeGeometry) {
        let color = egui::Color32::from_gray(170);
        let points: Vec<egui::Pos2> = edge
            .sample(CURVE_SEGMENTS)
            .into_iter()
            .map(|p| self.world_to_screen(p, rect))
            .collect();
        painter.add(egui::Shape::line(points, egui::Stroke::new(1.2, color)));

        let head: Vec<egui::Pos2> = edge
            .arrowhead(self.scene.arrow_head_len)
            .into_iter()
            .map(|p| self.world_to_screen(p, rect))
            .collect();
        painter.add(egui::Shape::convex_polygon(head, color, egui::Stroke::NONE));
    }

    fn draw_node(&self, painter: &egui::Painter, rect: egui::Rect, node: &NodeView, hovered: bool) {
        let min = self.world_to_screen(node.pixel, rect);
        let max = self.world_to_screen(node.pixel + self.scene.cell_size, rect);
        let r = egui::Rect::from_min_max(min, max);
        let (fill, outline) = Self::node_colors(node);

        painter.rect_filled(r, 3.0, fill);
        let width = if hovered { 2.0 } else { 1.0 };
        painter.rect_stroke(r, 3.0, egui::Stroke::new(width, outline), egui::StrokeKind::Inside);

        let label = if node.display_name.is_empty() {
            node.id.as_str()
        } else {
            node.display_name.as_str()
        };
        painter.text(
            r.center(),
            egui::Align2::CENTER_CENTER,
            label,
            egui::FontId::proportional((10.0 * self.zoom).max(4.0)),
            egui::Color32::WHITE,
        );
    }

    /// Builds the central panel where the scene is drawn and clicked.
    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::click_and_drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            // Pan with drag.
            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Zoom around the mouse cursor.
            let scroll = ui.ctx().input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let pointer_screen = response.hover_pos().unwrap_or(rect.center());
                let world_before = self.screen_to_world(pointer_screen, rect);

                let factor = (1.0 + scroll * 0.001).clamp(0.5, 2.0);
                self.zoom = (self.zoom * factor).clamp(0.2, 4.0);

                let screen_after = self.world_to_screen(world_before, rect);
                self.pan += pointer_screen - screen_after;
            }

            let hover_world = response.hover_pos().map(|p| self.screen_to_world(p, rect));
            let hovered = hover_world
                .and_then(|p| self.scene.hit_test(p))
                .map(|n| n.id.clone());

            for edge in &self.scene.edges {
                self.draw_edge(&painter, rect, &edge.geometry);
            }
            for node in &self.scene.nodes {
                self.draw_node(&painter, rect, node, hovered.as_deref() == Some(node.id.as_str()));
            }

            if let Some(id) = &hovered
                && let Some(node) = self.scene.node(id)
            {
                response.clone().on_hover_text(format!(
                    "{} (ordinal {}, level {})\n{:?}",
                    node.id, node.camp_ordinal, node.level, node.block_reason
                ));
            }

            if response.clicked()
                && let Some(id) = hovered
            {
                self.toggle_node(&id);
            }
        });
    }
}

impl App for Viewer {
    /// eframe callback that builds all UI panels for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_side_panel(ctx);
        self.ui_central_panel(ctx);
    }
}
