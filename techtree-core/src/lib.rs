//! Core tech-tree graph building and grid layout library.
//!
//! Main components:
//! - [`catalog`]: upgrade definitions and declared prerequisites.
//! - [`oracle`]: read-only unlock / availability queries.
//! - [`tree`]: the dependency forest (arena of nodes, roots, edges).
//! - [`phases`]: build, prune and layout phases of one request.
//! - [`placement`]: recursive greedy placement used by the layout phase.
//! - [`occupancy`]: quantized grid of claimed cells.
//! - [`geometry`]: grid-to-pixel mapping, connectors and arrowheads.
//! - [`scene`]: renderer-facing output and the [`layout_tech_tree`] entry point.
//! - [`config`]: layout and pixel constants.
//! - [`context`]: per-request layout state.
//! - [`diagnostics`]: non-fatal warnings.
//! - [`types`]: shared type aliases and IDs.

pub mod catalog;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod geometry;
pub mod occupancy;
pub mod oracle;
pub mod phases;
pub mod placement;
pub mod scene;
pub mod tree;
pub mod types;

pub use scene::{TechTreeScene, layout_tech_tree};
