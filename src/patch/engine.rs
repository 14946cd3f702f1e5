//! Applying a patch file to a list of manifests.

use tracing::debug;

use crate::condition::{evaluate, EnvContext};
use crate::error::{Error, Result};
use crate::labels::inject_labels;
use crate::manifest::Manifest;
use crate::patchfile::{AppPatchGroup, Operation, PatchFile, ResourcePatch};

/// Applies `spec` to `manifests` and renders the result as a YAML stream.
///
/// Any error aborts the whole run; no partial output is returned.
pub fn apply(manifests: Vec<Manifest>, spec: &PatchFile, ctx: &EnvContext) -> Result<String> {
    let patched = patch_manifests(manifests, spec, ctx)?;
    render_stream(&patched)
}

/// Injects labels and applies every active resource patch.
///
/// Documents keep their input order. Targets are matched against each
/// document's kind and name as they were on input, so a rename by one group
/// never hides a document from another.
pub fn patch_manifests(
    mut manifests: Vec<Manifest>,
    spec: &PatchFile,
    ctx: &EnvContext,
) -> Result<Vec<Manifest>> {
    for manifest in &mut manifests {
        inject_labels(manifest, &spec.labels);
        for group in &spec.patches {
            inject_labels(manifest, &group.labels);
        }
    }

    let identities: Vec<(String, String)> = manifests.iter().map(Manifest::identity).collect();

    for group in &spec.patches {
        for resource in &group.resources {
            if !is_active(resource, ctx) {
                debug!(
                    kind = %resource.target.kind,
                    name = %resource.target.name,
                    "condition is false, skipping patch"
                );
                continue;
            }

            for (manifest, (kind, name)) in manifests.iter_mut().zip(&identities) {
                if !resource.target.matches(kind, name) {
                    continue;
                }
                let operations = build_operations(group, resource, ctx);
                if operations.is_empty() {
                    continue;
                }
                debug!(kind = %kind, name = %name, operations = operations.len(), "applying patch");
                *manifest = apply_operations(manifest, kind, name, operations)?;
            }
        }
    }

    Ok(manifests)
}

fn is_active(resource: &ResourcePatch, ctx: &EnvContext) -> bool {
    resource.when.as_deref().map_or(true, |expr| evaluate(expr, ctx))
}

/// Per-operation `when` that is not a string never holds.
fn operation_is_active(op: &Operation, ctx: &EnvContext) -> bool {
    match op.when() {
        None => true,
        Some(serde_json::Value::String(expr)) => evaluate(expr, ctx),
        Some(_) => false,
    }
}

/// Returns the JSON Patch document for one target: the active operations with
/// `when` stripped, then the group rename.
fn build_operations(
    group: &AppPatchGroup,
    resource: &ResourcePatch,
    ctx: &EnvContext,
) -> Vec<serde_json::Value> {
    let mut operations: Vec<serde_json::Value> = resource
        .patches
        .iter()
        .filter(|op| operation_is_active(op, ctx))
        .map(Operation::to_patch_value)
        .collect();

    if let Some(name) = group.rename_to() {
        operations.push(Operation::rename(name).to_patch_value());
    }
    operations
}

/// Applies `operations` to a JSON snapshot of `manifest` and returns the
/// rebuilt manifest.
fn apply_operations(
    manifest: &Manifest,
    kind: &str,
    name: &str,
    operations: Vec<serde_json::Value>,
) -> Result<Manifest> {
    let patch: json_patch::Patch = serde_json::from_value(serde_json::Value::Array(operations))
        .map_err(|e| Error::InvalidPatch {
            kind: kind.to_string(),
            name: name.to_string(),
            source: e,
        })?;

    let mut doc = manifest.to_json()?;
    json_patch::patch(&mut doc, &patch).map_err(|e| Error::Apply {
        kind: kind.to_string(),
        name: name.to_string(),
        source: e,
    })?;

    Manifest::from_json(doc).map_err(|e| manifest.snapshot_error(e))
}

/// Renders manifests as a stream of `---`-separated YAML documents.
pub fn render_stream(manifests: &[Manifest]) -> Result<String> {
    let mut out = String::new();
    for manifest in manifests {
        out.push_str("---\n");
        out.push_str(&manifest.to_yaml()?);
    }
    Ok(out)
}
