//! Built-in transform translators.
//!
//! `flatten` is the reference multi-input translator; the others are unary or
//! root transforms that exist so pipelines have something to merge.

pub mod create;
pub mod elementwise;
pub mod flatten;

pub use create::CreateTranslator;
pub use elementwise::{FilterTranslator, MapTranslator, WindowIntoTranslator};
pub use flatten::FlattenTranslator;
