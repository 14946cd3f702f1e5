//! Envsubst module - Guarded environment-variable substitution.
//!
//! Runs once over the raw patch-file text, before it is parsed.

mod envsubst;


pub use envsubst::*;
