//! Value module - In-memory representation of YAML/JSON objects.
//!
//! Manifests are held as schema-less trees of these values.

mod value;

pub use value::*;
