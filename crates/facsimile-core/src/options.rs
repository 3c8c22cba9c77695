//! # Clone Options
//!
//! Caller-tunable behavior of a single clone invocation.

use crate::Shape;
use serde::{Deserialize, Serialize};

/// What happens when the depth budget runs out on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Return the original node (truncation aliasing).
    #[default]
    Alias,
    /// Fail with `FacsimileError::DepthExceeded`.
    Fail,
}

/// Options of a clone invocation. Every field has a default.
///
/// # Hazard
///
/// With `circular` disabled, cyclic input recurses without bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneOptions {
    /// Track visited nodes so cycles and shared nodes are copied once.
    pub circular: bool,
    /// Levels to copy; `None` copies everything.
    pub depth: Option<usize>,
    /// Shape given to every record copy instead of the original's.
    #[serde(skip)]
    pub shape_override: Option<Shape>,
    /// Also copy non-enumerable properties.
    pub include_hidden: bool,
    /// Behavior below the depth limit.
    pub on_depth_exhausted: DepthPolicy,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            circular: true,
            depth: None,
            shape_override: None,
            include_hidden: false,
            on_depth_exhausted: DepthPolicy::Alias,
        }
    }
}

impl CloneOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_circular(mut self, circular: bool) -> Self {
        self.circular = circular;
        self
    }

    #[must_use]
    pub fn with_shape_override(mut self, shape: Shape) -> Self {
        self.shape_override = Some(shape);
        self
    }

    #[must_use]
    pub fn including_hidden(mut self) -> Self {
        self.include_hidden = true;
        self
    }

    #[must_use]
    pub fn with_depth_policy(mut self, policy: DepthPolicy) -> Self {
        self.on_depth_exhausted = policy;
        self
    }
}
