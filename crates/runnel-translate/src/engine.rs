//! The boundary to whatever executes a physical plan.

use crate::physical::PhysicalPlan;

/// An engine that accepts a complete physical plan.
///
/// `execute` returns once the engine has accepted (and, for synchronous
/// engines, finished) the run. Errors are engine-specific; the translation
/// layer passes them through without interpreting them.
pub trait ExecutionEngine {
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Human-readable engine name (stable).
    fn name(&self) -> &'static str;

    fn execute(&mut self, plan: &PhysicalPlan) -> Result<Self::Output, Self::Error>;
}
