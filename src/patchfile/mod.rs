//! Patchfile module - The patch specification: shared labels, per-application
//! groups and the JSON Patch operations they apply.

mod loader;
mod model;

pub use loader::*;
pub use model::*;
