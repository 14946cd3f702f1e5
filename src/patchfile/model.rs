//! Patch-file data model.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value of the `app.kubernetes.io/managed-by` default label.
pub const MANAGED_BY: &str = "kubepatch";

/// PatchFile is the parsed patch specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchFile {
    /// Labels injected into every document.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<AppPatchGroup>,
}

/// AppPatchGroup is one application's shared labels and resource patches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppPatchGroup {
    /// Name every matched resource is renamed to; empty disables renaming.
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<ResourcePatch>,
}

impl AppPatchGroup {
    /// Returns the trimmed group name, or None when it is blank.
    pub fn rename_to(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// ResourcePatch targets one resource with an ordered list of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePatch {
    #[serde(default)]
    pub target: Target,

    /// Condition gating the whole patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    #[serde(default)]
    pub patches: Vec<Operation>,
}

/// Target identifies a resource by kind and `metadata.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

impl Target {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Target {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Parses the `kind/name` form used by the flat patch-file layout.
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, name) = raw.split_once('/')?;
        if kind.is_empty() || name.is_empty() {
            return None;
        }
        Some(Target::new(kind, name))
    }

    pub fn matches(&self, kind: &str, name: &str) -> bool {
        self.kind == kind && self.name == name
    }
}

/// Operation is one raw JSON Patch operation, optionally carrying a `when`
/// condition of its own.
///
/// It is kept as an untyped object so that structural validation happens
/// against the whole patch document at apply time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operation(serde_json::Map<String, serde_json::Value>);

impl Operation {
    pub const WHEN: &'static str = "when";

    /// Creates an operation from its fields.
    pub fn new(op: &str, path: &str, value: Option<serde_json::Value>) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("op".into(), op.into());
        fields.insert("path".into(), path.into());
        if let Some(value) = value {
            fields.insert("value".into(), value);
        }
        Operation(fields)
    }

    /// Builds the `replace /metadata/name` operation for a named group.
    pub fn rename(name: &str) -> Self {
        Operation::new("replace", "/metadata/name", Some(name.into()))
    }

    /// Sets the per-operation condition.
    pub fn with_when(mut self, when: &str) -> Self {
        self.0.insert(Self::WHEN.into(), when.into());
        self
    }

    pub fn op(&self) -> Option<&str> {
        self.0.get("op").and_then(|v| v.as_str())
    }

    pub fn path(&self) -> Option<&str> {
        self.0.get("path").and_then(|v| v.as_str())
    }

    /// Returns the raw `when` entry, if any.
    pub fn when(&self) -> Option<&serde_json::Value> {
        self.0.get(Self::WHEN)
    }

    /// Returns the operation as a JSON Patch entry, without `when`.
    pub fn to_patch_value(&self) -> serde_json::Value {
        let mut fields = self.0.clone();
        fields.remove(Self::WHEN);
        serde_json::Value::Object(fields)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Operation {
    fn from(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Operation(fields)
    }
}

/// The flat layout: `appName -> "kind/name" -> [operations]`.
type FlatPatchFile = BTreeMap<String, BTreeMap<String, Vec<Operation>>>;

impl PatchFile {
    /// Parses a patch file in either the nested or the flat layout.
    ///
    /// A top-level mapping with a `labels` or `patches` key is nested; any
    /// other mapping is flat.
    pub fn from_yaml(yaml: &str) -> Result<PatchFile, serde_yaml::Error> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        if raw.is_null() {
            return Ok(PatchFile::default());
        }

        let nested = raw
            .as_mapping()
            .is_some_and(|m| m.contains_key("labels") || m.contains_key("patches"));
        if nested {
            serde_yaml::from_value(raw)
        } else {
            let flat: FlatPatchFile = serde_yaml::from_value(raw)?;
            PatchFile::from_flat(flat)
        }
    }

    fn from_flat(flat: FlatPatchFile) -> Result<PatchFile, serde_yaml::Error> {
        let mut patches = Vec::with_capacity(flat.len());
        for (app, targets) in flat {
            let mut resources = Vec::with_capacity(targets.len());
            for (raw_target, operations) in targets {
                let target = Target::parse(&raw_target).ok_or_else(|| {
                    serde_yaml::Error::custom(format!(
                        "invalid target {:?} in {:?}: expected kind/name",
                        raw_target, app
                    ))
                })?;
                resources.push(ResourcePatch {
                    target,
                    when: None,
                    patches: operations,
                });
            }
            patches.push(AppPatchGroup {
                name: app,
                labels: BTreeMap::new(),
                resources,
            });
        }
        Ok(PatchFile {
            labels: BTreeMap::new(),
            patches,
        })
    }

    /// Fills in the standard labels for every named group without labels.
    pub fn apply_default_labels(&mut self) {
        for group in &mut self.patches {
            if group.rename_to().is_none() || !group.labels.is_empty() {
                continue;
            }
            group.labels = default_labels(group.name.trim());
        }
    }

    /// Total number of operations across every resource patch.
    pub fn operation_count(&self) -> usize {
        self.patches
            .iter()
            .flat_map(|g| &g.resources)
            .map(|r| r.patches.len())
            .sum()
    }
}

/// Returns the labels given to a named application without explicit labels.
pub fn default_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app.kubernetes.io/name".to_string(), name.to_string()),
        ("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string()),
        ("app".to_string(), name.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_layout() {
        let yaml = r#"
labels:
  team: platform
patches:
  - name: web
    labels:
      env: dev
    resources:
      - target:
          kind: Deployment
          name: nginx
        when: ENV == "prod"
        patches:
          - op: replace
            path: /spec/replicas
            value: 2
          - op: remove
            path: /spec/paused
            when: PAUSED != "true"
"#;
        let pf = PatchFile::from_yaml(yaml).unwrap();
        assert_eq!(pf.labels["team"], "platform");
        assert_eq!(pf.patches.len(), 1);

        let group = &pf.patches[0];
        assert_eq!(group.name, "web");
        assert_eq!(group.labels["env"], "dev");

        let resource = &group.resources[0];
        assert_eq!(resource.target, Target::new("Deployment", "nginx"));
        assert_eq!(resource.when.as_deref(), Some(r#"ENV == "prod""#));
        assert_eq!(resource.patches[0].op(), Some("replace"));
        assert_eq!(resource.patches[0].to_patch_value()["value"], json!(2));
        assert_eq!(resource.patches[1].when(), Some(&json!(r#"PAUSED != "true""#)));
        assert_eq!(pf.operation_count(), 2);
    }

    #[test]
    fn test_flat_layout() {
        let yaml = r#"
web:
  Deployment/nginx:
    - op: replace
      path: /spec/replicas
      value: 3
  Service/nginx: []
"#;
        let pf = PatchFile::from_yaml(yaml).unwrap();
        assert!(pf.labels.is_empty());
        assert_eq!(pf.patches.len(), 1);
        assert_eq!(pf.patches[0].name, "web");
        let targets: Vec<_> = pf.patches[0].resources.iter().map(|r| &r.target).collect();
        assert_eq!(
            targets,
            vec![&Target::new("Deployment", "nginx"), &Target::new("Service", "nginx")]
        );
        assert_eq!(pf.operation_count(), 1);
    }

    #[test]
    fn test_flat_layout_rejects_bad_target() {
        let err = PatchFile::from_yaml("web:\n  nginx: []\n").unwrap_err();
        assert!(err.to_string().contains("expected kind/name"));
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(PatchFile::from_yaml("").unwrap(), PatchFile::default());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(PatchFile::from_yaml("patches:\n  - name: x\n    labels:\n      env: [unclosed\n").is_err());
    }

    #[test]
    fn test_to_patch_value_strips_when() {
        let op = Operation::new("add", "/data/x", Some(json!("y"))).with_when("A == \"b\"");
        assert!(op.when().is_some());
        assert_eq!(
            op.to_patch_value(),
            json!({"op": "add", "path": "/data/x", "value": "y"})
        );
        // The operation itself keeps its condition.
        assert!(op.when().is_some());
    }

    #[test]
    fn test_rename_operation() {
        let op = Operation::rename("frontend");
        assert_eq!(op.op(), Some("replace"));
        assert_eq!(op.path(), Some("/metadata/name"));
        assert_eq!(
            op.to_patch_value(),
            json!({"op": "replace", "path": "/metadata/name", "value": "frontend"})
        );
    }

    #[test]
    fn test_default_labels() {
        let mut pf = PatchFile {
            labels: BTreeMap::new(),
            patches: vec![
                AppPatchGroup {
                    name: "my-app".into(),
                    ..Default::default()
                },
                AppPatchGroup {
                    name: "custom".into(),
                    labels: BTreeMap::from([("custom-label".to_string(), "true".to_string())]),
                    ..Default::default()
                },
                AppPatchGroup::default(),
            ],
        };
        pf.apply_default_labels();

        let labels = &pf.patches[0].labels;
        assert_eq!(labels["app.kubernetes.io/name"], "my-app");
        assert_eq!(labels["app.kubernetes.io/managed-by"], "kubepatch");
        assert_eq!(labels["app"], "my-app");

        assert_eq!(pf.patches[1].labels.len(), 1);
        assert!(!pf.patches[1].labels.contains_key("app.kubernetes.io/name"));

        assert!(pf.patches[2].labels.is_empty());
    }

    #[test]
    fn test_default_labels_use_trimmed_name() {
        let mut pf = PatchFile {
            labels: BTreeMap::new(),
            patches: vec![
                AppPatchGroup {
                    name: "  web  ".into(),
                    ..Default::default()
                },
                AppPatchGroup {
                    name: "   ".into(),
                    ..Default::default()
                },
            ],
        };
        pf.apply_default_labels();

        assert_eq!(pf.patches[0].rename_to(), Some("web"));
        assert_eq!(pf.patches[0].labels["app"], "web");
        assert_eq!(pf.patches[0].labels["app.kubernetes.io/name"], "web");
        assert_eq!(pf.patches[1].rename_to(), None);
        assert!(pf.patches[1].labels.is_empty());
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("ConfigMap/cfg"), Some(Target::new("ConfigMap", "cfg")));
        assert_eq!(Target::parse("ConfigMap"), None);
        assert_eq!(Target::parse("/cfg"), None);
        assert!(Target::new("A", "b").matches("A", "b"));
        assert!(!Target::new("A", "b").matches("a", "b"));
    }
}
