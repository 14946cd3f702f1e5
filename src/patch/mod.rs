//! Patch module - Label injection plus conditional JSON Patch application over
//! a list of manifests.

mod engine;


pub use engine::*;
