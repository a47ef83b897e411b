//! Windowing descriptors carried by every logical collection.
//!
//! Batch translation never assigns windows to elements; the descriptor exists
//! so multi-input transforms can refuse to mix incompatible windowing.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindowFn {
    /// The singleton window spanning all of event time.
    #[default]
    Global,
    /// Half-open intervals `[k * size_ms, (k + 1) * size_ms)`.
    Fixed { size_ms: u64 },
}

impl fmt::Display for WindowFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowFn::Global => f.write_str("[*]"),
            WindowFn::Fixed { size_ms } => write!(f, "fixed({size_ms}ms)"),
        }
    }
}
