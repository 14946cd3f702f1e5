//! # kubepatch
//!
//! Renders Kubernetes manifests by overlaying a declarative patch file.
//!
//! A run substitutes allowed environment variables in the raw patch-file text,
//! injects common labels and selectors at kind-aware locations, and applies
//! RFC 6902 JSON Patch operations to targeted resources, optionally gated by
//! simple `when` conditions. The result is a `---`-separated YAML stream.
//!
//! ## Modules
//!
//! - [`value`] - Schema-less in-memory representation of YAML/JSON objects
//! - [`manifest`] - Kubernetes objects, identity accessors and stream decoding
//! - [`envsubst`] - Guarded `$VAR` substitution
//! - [`labels`] - The field-spec table and label injection
//! - [`patchfile`] - Patch-file model and loader
//! - [`condition`] - `when` expression evaluation
//! - [`patch`] - Patch application and rendering
//! - [`resolve`] - Expansion of file, directory and glob inputs
//! - [`pipeline`] - One end-to-end run

pub mod condition;
pub mod envsubst;
pub mod error;
pub mod labels;
pub mod manifest;
pub mod patch;
pub mod patchfile;
pub mod pipeline;
pub mod resolve;
pub mod value;

pub use envsubst::{Envsubst, SubstitutionError};
pub use error::{Error, Result};
pub use manifest::Manifest;
pub use patch::{apply, patch_manifests, render_stream};
pub use patchfile::PatchFile;
pub use value::Value;
