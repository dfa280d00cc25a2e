//! Non-fatal conditions raised while building and laying out a tree.
//!
//! Nothing in the layout pipeline aborts. Every problem becomes a
//! [`LayoutWarning`], which is both emitted as a `tracing` event and kept
//! in a [`Diagnostics`] collector so callers (and tests) can inspect it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum LayoutWarning {
    #[error("missing required node: {missing} (required by {node})")]
    MissingPrerequisite { node: String, missing: String },

    #[error("duplicate upgrade definition {id}; keeping the first one")]
    DuplicateDefinition { id: String },

    #[error("overriding position {x},{y} (held by {previous}) with {node}")]
    OccupiedCell {
        x: f32,
        y: f32,
        previous: String,
        node: String,
    },

    #[error("oracle failed for {id}: {reason}")]
    OracleFailure { id: String, reason: String },

    #[error("{id} lost all of its prerequisites while pruning")]
    OrphanedNode { id: String },

    #[error("{id} was not reachable from any root; placed separately")]
    UnplacedNode { id: String },

    #[error("gave up resolving collision for {id} at y = {y}")]
    CollisionBoundExceeded { id: String, y: f32 },
}

/// Ordered list of warnings collected during one layout invocation.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<LayoutWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and forwards it to the `tracing` subscriber.
    pub fn warn(&mut self, warning: LayoutWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[LayoutWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<LayoutWarning> {
        self.warnings
    }

    /// Returns `true` if a `MissingPrerequisite` warning names `missing`.
    pub fn mentions_missing(&self, missing: &str) -> bool {
        self.warnings.iter().any(|w| {
            matches!(w, LayoutWarning::MissingPrerequisite { missing: m, .. } if m == missing)
        })
    }
}
