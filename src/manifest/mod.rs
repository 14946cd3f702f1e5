//! Manifest module - Kubernetes objects as generic trees.
//!
//! Provides identity accessors (`kind`, `apiVersion`, `metadata.name`) and the
//! stream decoder that turns YAML/JSON input into manifests. Rendered YAML is
//! quoted for YAML 1.1 readers.

mod decode;
mod manifest;
mod render;

pub use decode::*;
pub use manifest::*;
pub use render::*;
