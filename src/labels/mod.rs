//! Labels module - Common label and selector injection.
//!
//! Where labels live differs per resource kind. That knowledge is kept as data
//! in [`LABEL_FIELD_SPECS`], and a single traversal in [`set_nested_labels`]
//! interprets it.

mod fieldspec;
mod inject;


pub use fieldspec::*;
pub use inject::*;
