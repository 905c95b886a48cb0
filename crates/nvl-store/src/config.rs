use serde::{Deserialize, Serialize};

/// Bounds applied when reconstructing a store from untrusted bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpackLimits {
    /// Deepest accepted nesting of lists inside lists. The root is depth 0.
    pub max_depth: usize,
    /// Largest accepted packed size in bytes, header included.
    pub max_size: usize,
}

impl Default for UnpackLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_size: 64 * 1024 * 1024,
        }
    }
}
