//! Extractor: materializes a workspace from cached
//! artifacts; dispatches on archive type; applies ordered patches.

pub mod archive;
pub mod patch;

pub use archive::extract;
pub use patch::apply_patches;
