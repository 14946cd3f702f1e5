//! Label injection driven by the field-spec table.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use super::fieldspec::{FieldSpec, Segment, LABEL_FIELD_SPECS};
use crate::manifest::Manifest;
use crate::value::{Map, Value};

/// InjectError is a per-spec failure. It is logged and never aborts injection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectError {
    #[error("expected {expected} at {key:?}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl InjectError {
    fn type_mismatch(key: &str, expected: &'static str, found: &Value) -> Self {
        InjectError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }
}

/// Injects `labels` into every location of the table that applies to the
/// manifest. Existing keys are overwritten.
pub fn inject_labels(manifest: &mut Manifest, labels: &BTreeMap<String, String>) {
    inject_labels_with(manifest, labels, LABEL_FIELD_SPECS);
}

/// Same as [`inject_labels`], with a caller-supplied table.
pub fn inject_labels_with(
    manifest: &mut Manifest,
    labels: &BTreeMap<String, String>,
    specs: &[FieldSpec],
) {
    if labels.is_empty() {
        return;
    }

    let kind = manifest.kind().to_string();
    let gv = manifest.group_version();

    for spec in specs.iter().filter(|spec| spec.matches(&kind, &gv)) {
        let segments = spec.segments();
        if let Err(err) = set_nested_labels(manifest.object_mut(), &segments, labels, spec.create) {
            warn!(
                kind = %kind,
                name = manifest.name(),
                path = spec.path,
                error = %err,
                "label injection failed"
            );
        }
    }
}

/// Walks `segments` from `object` and merges `labels` into the map at the end
/// of the path.
///
/// Missing containers are created only when `create` is set; otherwise the
/// path is skipped. A key holding `null` counts as missing.
pub fn set_nested_labels(
    object: &mut Map,
    segments: &[Segment<'_>],
    labels: &BTreeMap<String, String>,
    create: bool,
) -> Result<(), InjectError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(());
    };
    let key = segment.key();
    let missing = matches!(object.get(key), None | Some(Value::Null));

    match segment {
        Segment::Each(_) => {
            if missing {
                if create {
                    object.set(key, Value::List(Vec::new()));
                }
                return Ok(());
            }
            match object.get_mut(key) {
                Some(Value::List(items)) => {
                    for item in items.iter_mut() {
                        if let Value::Map(item) = item {
                            set_nested_labels(item, rest, labels, create)?;
                        }
                    }
                    Ok(())
                }
                Some(other) => Err(InjectError::type_mismatch(key, "list", other)),
                None => Ok(()),
            }
        }
        Segment::Field(_) => {
            if missing {
                if !create {
                    return Ok(());
                }
                object.set(key, Value::Map(Map::new()));
            }
            match object.get_mut(key) {
                Some(Value::Map(child)) if rest.is_empty() => {
                    for (k, v) in labels {
                        child.set(k.clone(), Value::String(v.clone()));
                    }
                    Ok(())
                }
                Some(Value::Map(child)) => set_nested_labels(child, rest, labels, create),
                Some(other) => Err(InjectError::type_mismatch(key, "map", other)),
                None => Ok(()),
            }
        }
    }
}
