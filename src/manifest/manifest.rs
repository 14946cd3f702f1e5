//! A single Kubernetes object held as a schema-less tree.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::render::quote_ambiguous_scalars;
use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// GroupVersion is the parsed form of an `apiVersion` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupVersion {
    /// API group, empty for the core group.
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    /// Splits an `apiVersion` such as `apps/v1` into group and version.
    ///
    /// A bare version with no `/` belongs to the core group.
    pub fn parse(api_version: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => GroupVersion {
                group: group.to_string(),
                version: version.to_string(),
            },
            None => GroupVersion {
                group: String::new(),
                version: api_version.to_string(),
            },
        }
    }
}

/// Manifest is one decoded Kubernetes document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    object: Map,
}

impl Manifest {
    /// Wraps an object tree.
    pub fn new(object: Map) -> Self {
        Manifest { object }
    }

    /// Parses a single YAML document into a manifest.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::parse("manifest", e))
    }

    pub fn object(&self) -> &Map {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut Map {
        &mut self.object
    }

    /// Returns `kind`, or an empty string when unset.
    pub fn kind(&self) -> &str {
        self.object.lookup_str(&["kind"]).unwrap_or_default()
    }

    /// Returns `apiVersion`, or an empty string when unset.
    pub fn api_version(&self) -> &str {
        self.object.lookup_str(&["apiVersion"]).unwrap_or_default()
    }

    /// Returns `metadata.name`, or an empty string when unset.
    pub fn name(&self) -> &str {
        self.object
            .lookup_str(&["metadata", "name"])
            .unwrap_or_default()
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::parse(self.api_version())
    }

    /// Returns the (kind, name) pair used for target matching.
    pub fn identity(&self) -> (String, String) {
        (self.kind().to_string(), self.name().to_string())
    }

    /// Builds the JSON snapshot that patches are applied to.
    ///
    /// Infinite and NaN floats have no JSON form and fail the snapshot.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let non_finite_path = self
            .object
            .fields
            .iter()
            .find_map(|(k, v)| non_finite(v, format!("/{}", k)));
        if let Some(path) = non_finite_path {
            return Err(self.snapshot_error(serde_json::Error::custom(format!(
                "non-finite number at {} cannot be represented in JSON",
                path
            ))));
        }
        serde_json::to_value(self).map_err(|e| self.snapshot_error(e))
    }

    /// Rebuilds a manifest from a patched JSON snapshot.
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }

    /// Serializes the manifest as a YAML document body (no `---` marker).
    ///
    /// Strings that YAML 1.1 readers take for booleans are quoted.
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.object).map_err(|e| Error::Render {
            kind: self.kind().to_string(),
            name: self.name().to_string(),
            source: e,
        })?;
        Ok(quote_ambiguous_scalars(&yaml))
    }

    pub(crate) fn snapshot_error(&self, source: serde_json::Error) -> Error {
        Error::Snapshot {
            kind: self.kind().to_string(),
            name: self.name().to_string(),
            source,
        }
    }
}

impl From<Map> for Manifest {
    fn from(object: Map) -> Self {
        Manifest::new(object)
    }
}

/// Returns the JSON pointer of the first infinite or NaN float under `value`.
fn non_finite(value: &Value, path: String) -> Option<String> {
    match value {
        Value::Float(f) if !f.is_finite() => Some(path),
        Value::List(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| non_finite(item, format!("{}/{}", path, i))),
        Value::Map(map) => map
            .fields
            .iter()
            .find_map(|(k, v)| non_finite(v, format!("{}/{}", path, k))),
        _ => None,
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            GroupVersion::parse("apps/v1"),
            GroupVersion {
                group: "apps".into(),
                version: "v1".into()
            }
        );
        assert_eq!(
            GroupVersion::parse("v1"),
            GroupVersion {
                group: "".into(),
                version: "v1".into()
            }
        );
        assert_eq!(GroupVersion::parse("").version, "");
    }

    #[test]
    fn test_accessors() {
        let m = Manifest::from_yaml(
            "apiVersion: networking.k8s.io/v1\nkind: NetworkPolicy\nmetadata:\n  name: deny-all\n",
        )
        .unwrap();
        assert_eq!(m.kind(), "NetworkPolicy");
        assert_eq!(m.name(), "deny-all");
        assert_eq!(m.group_version().group, "networking.k8s.io");
        assert_eq!(m.to_string(), "NetworkPolicy/deny-all");
    }

    #[test]
    fn test_missing_fields_read_as_empty() {
        let m = Manifest::from_yaml("kind: ConfigMap\nmetadata: 12\n").unwrap();
        assert_eq!(m.name(), "");
        assert_eq!(m.api_version(), "");
    }

    #[test]
    fn test_json_snapshot() {
        let m = Manifest::from_yaml(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\ndata:\n  n: 3\n",
        )
        .unwrap();
        let json = m.to_json().unwrap();
        assert_eq!(json["data"]["n"], serde_json::json!(3));
        let back = Manifest::from_json(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_from_json_rejects_scalars() {
        assert!(Manifest::from_json(serde_json::json!("text")).is_err());
    }

    #[test]
    fn test_non_finite_floats_fail_the_snapshot() {
        let m = Manifest::from_yaml(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\nspec:\n  limits:\n  - 1.5\n  - .inf\n",
        )
        .unwrap();
        let err = m.to_json().unwrap_err();
        assert!(matches!(err, Error::Snapshot { .. }));
        assert!(err.to_string().contains("/spec/limits/1"), "{}", err);

        let nan = Manifest::from_yaml("kind: ConfigMap\nratio: .nan\n").unwrap();
        assert!(nan.to_json().is_err());
    }

    #[test]
    fn test_to_yaml_quotes_yaml11_booleans() {
        let m = Manifest::from_yaml(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\ndata:\n  flag: \"on\"\n",
        )
        .unwrap();
        let yaml = m.to_yaml().unwrap();
        assert!(yaml.contains("  flag: 'on'\n"), "{}", yaml);
        assert_eq!(Manifest::from_yaml(&yaml).unwrap(), m);
    }
}
