//! Recipe Store: loads, indexes, and resolves recipe
//! documents by package name, and exposes a dependency graph.

pub mod model;
pub mod store;

pub use model::{BuildSpec, Hooks, Recipe, SourceEntry};
pub use store::RecipeStore;
