//! Decoding of multi-document YAML/JSON streams into manifests.

use serde::Deserialize;
use tracing::debug;

use super::Manifest;
use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Decodes every Kubernetes object in a YAML or JSON stream.
///
/// Empty documents are skipped, `*List` documents are flattened into their
/// items, and documents that are not Kubernetes objects (no apiVersion, kind
/// or name) or are kustomize configuration are dropped. `what` names the
/// input in error messages.
pub fn read_objects(text: &str, what: &str) -> Result<Vec<Manifest>> {
    let mut objects = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document).map_err(|e| Error::parse(what, e))?;
        let object = match value {
            Value::Null => continue,
            Value::Map(object) => object,
            _ => {
                return Err(Error::NotAnObject {
                    what: what.to_string(),
                    index,
                })
            }
        };

        if is_list(&object) {
            for item in list_items(object) {
                push_object(&mut objects, item);
            }
            continue;
        }
        push_object(&mut objects, object);
    }

    Ok(objects)
}

fn push_object(objects: &mut Vec<Manifest>, object: Map) {
    let manifest = Manifest::new(object);
    if !is_kubernetes_object(&manifest) {
        debug!(
            kind = manifest.kind(),
            name = manifest.name(),
            "skipping non-kubernetes document"
        );
        return;
    }
    if is_kustomization(&manifest) {
        debug!(name = manifest.name(), "skipping kustomization");
        return;
    }
    objects.push(manifest);
}

fn is_list(object: &Map) -> bool {
    object
        .lookup_str(&["kind"])
        .is_some_and(|kind| kind.ends_with("List"))
        && object.get("items").is_some_and(Value::is_list)
}

fn list_items(mut object: Map) -> impl Iterator<Item = Map> {
    let items = match object.delete("items") {
        Some(Value::List(items)) => items,
        _ => Vec::new(),
    };
    items.into_iter().filter_map(|item| match item {
        Value::Map(m) => Some(m),
        _ => None,
    })
}

/// Reports whether the object carries apiVersion, kind and metadata.name.
pub fn is_kubernetes_object(manifest: &Manifest) -> bool {
    !manifest.api_version().is_empty()
        && !manifest.kind().is_empty()
        && !manifest.name().is_empty()
}

pub fn is_kustomization(manifest: &Manifest) -> bool {
    manifest.kind().eq_ignore_ascii_case("kustomization")
        && manifest.api_version().starts_with("kustomize.config.k8s.io/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_documents() {
        let text = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: first
---
---
apiVersion: v1
kind: Service
metadata:
  name: second
"#;
        let objects = read_objects(text, "test").unwrap();
        let names: Vec<_> = objects.iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["ConfigMap/first", "Service/second"]);
    }

    #[test]
    fn test_json_document() {
        let text = r#"{"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "token"}}"#;
        let objects = read_objects(text, "test").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].kind(), "Secret");
    }

    #[test]
    fn test_list_is_flattened() {
        let text = r#"
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: a
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: b
"#;
        let objects = read_objects(text, "test").unwrap();
        let names: Vec<_> = objects.iter().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_skips_non_objects_and_kustomizations() {
        let text = r#"
apiVersion: kustomize.config.k8s.io/v1beta1
kind: Kustomization
metadata:
  name: ignored
---
kind: ConfigMap
metadata:
  name: no-api-version
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: kept
"#;
        let objects = read_objects(text, "test").unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name(), "kept");
    }

    #[test]
    fn test_scalar_document_is_an_error() {
        let err = read_objects("just text\n", "input.yaml").unwrap_err();
        assert!(matches!(err, Error::NotAnObject { index: 0, .. }));
        assert!(err.to_string().contains("input.yaml"));
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let err = read_objects("a: [unclosed\n", "broken.yaml").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_scalar_keys_are_read_as_strings() {
        let docs = read_objects(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\ndata:\n  1: one\n  true: yes\n",
            "keys.yaml",
        )
        .unwrap();
        let object = docs[0].object();
        assert_eq!(object.lookup_str(&["data", "1"]), Some("one"));
        assert_eq!(object.lookup_str(&["data", "true"]), Some("yes"));
    }

    #[test]
    fn test_empty_stream() {
        assert!(read_objects("", "empty").unwrap().is_empty());
    }
}
