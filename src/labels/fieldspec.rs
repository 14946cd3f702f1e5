//! The declarative table of label and selector locations.

use std::fmt;

use crate::manifest::GroupVersion;

/// Segment is one step of a field-spec path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Map key.
    Field(&'a str),
    /// Map key holding a list; the rest of the path applies to every element.
    Each(&'a str),
}

impl<'a> Segment<'a> {
    /// Parses one segment; a `[]` suffix marks a list.
    pub fn parse(raw: &'a str) -> Self {
        match raw.strip_suffix("[]") {
            Some(key) => Segment::Each(key),
            None => Segment::Field(raw),
        }
    }

    /// Returns the map key of this segment.
    pub fn key(&self) -> &'a str {
        match self {
            Segment::Field(key) | Segment::Each(key) => key,
        }
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(key) => write!(f, "{}", key),
            Segment::Each(key) => write!(f, "{}[]", key),
        }
    }
}

/// Splits a `/`-separated field-spec path into segments.
pub fn parse_path(path: &str) -> Vec<Segment<'_>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(Segment::parse)
        .collect()
}

/// FieldSpec describes one location where common labels are injected.
///
/// A spec without a kind applies to every object. Group and version, when
/// set, further restrict which objects match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub group: Option<&'static str>,
    pub kind: Option<&'static str>,
    pub version: Option<&'static str>,
    /// Create missing containers along the path.
    pub create: bool,
}

impl FieldSpec {
    /// Creates a spec that applies to every object.
    pub const fn all(path: &'static str) -> Self {
        FieldSpec {
            path,
            group: None,
            kind: None,
            version: None,
            create: false,
        }
    }

    /// Creates a spec scoped to one kind.
    pub const fn kind(kind: &'static str, path: &'static str) -> Self {
        FieldSpec {
            path,
            group: None,
            kind: Some(kind),
            version: None,
            create: false,
        }
    }

    pub const fn group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    pub const fn version(mut self, version: &'static str) -> Self {
        self.version = Some(version);
        self
    }

    pub const fn create(mut self) -> Self {
        self.create = true;
        self
    }

    /// Returns true if this spec applies to every object.
    pub fn is_wildcard(&self) -> bool {
        self.kind.is_none()
    }

    /// Reports whether this spec applies to an object of the given kind and
    /// apiVersion.
    pub fn matches(&self, kind: &str, gv: &GroupVersion) -> bool {
        let Some(spec_kind) = self.kind else {
            return true;
        };
        spec_kind == kind
            && self.group.map_or(true, |g| g == gv.group)
            && self.version.map_or(true, |v| v == gv.version)
    }

    pub fn segments(&self) -> Vec<Segment<'static>> {
        parse_path(self.path)
    }
}

const POD_AFFINITY_PREFERRED: &str = "spec/template/spec/affinity/podAffinity/preferredDuringSchedulingIgnoredDuringExecution[]/podAffinityTerm/labelSelector/matchLabels";
const POD_AFFINITY_REQUIRED: &str = "spec/template/spec/affinity/podAffinity/requiredDuringSchedulingIgnoredDuringExecution[]/labelSelector/matchLabels";
const POD_ANTI_AFFINITY_PREFERRED: &str = "spec/template/spec/affinity/podAntiAffinity/preferredDuringSchedulingIgnoredDuringExecution[]/podAffinityTerm/labelSelector/matchLabels";
const POD_ANTI_AFFINITY_REQUIRED: &str = "spec/template/spec/affinity/podAntiAffinity/requiredDuringSchedulingIgnoredDuringExecution[]/labelSelector/matchLabels";
const TOPOLOGY_SPREAD: &str = "spec/template/spec/topologySpreadConstraints[]/labelSelector/matchLabels";

/// Every location common labels are written to, in application order.
pub static LABEL_FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec::all("metadata/labels").create(),
    // Pod templates
    FieldSpec::kind("ReplicationController", "spec/template/metadata/labels")
        .version("v1")
        .create(),
    FieldSpec::kind("Deployment", "spec/template/metadata/labels").create(),
    FieldSpec::kind("ReplicaSet", "spec/template/metadata/labels").create(),
    FieldSpec::kind("DaemonSet", "spec/template/metadata/labels").create(),
    FieldSpec::kind("StatefulSet", "spec/template/metadata/labels")
        .group("apps")
        .create(),
    // Only claims that already carry labels are touched.
    FieldSpec::kind("StatefulSet", "spec/volumeClaimTemplates[]/metadata/labels").group("apps"),
    FieldSpec::kind("Job", "spec/template/metadata/labels")
        .group("batch")
        .create(),
    FieldSpec::kind("CronJob", "spec/jobTemplate/metadata/labels")
        .group("batch")
        .create(),
    FieldSpec::kind("CronJob", "spec/jobTemplate/spec/template/metadata/labels")
        .group("batch")
        .create(),
    // Selectors
    FieldSpec::kind("Service", "spec/selector").version("v1").create(),
    FieldSpec::kind("ReplicationController", "spec/selector")
        .version("v1")
        .create(),
    FieldSpec::kind("Deployment", "spec/selector/matchLabels").create(),
    FieldSpec::kind("ReplicaSet", "spec/selector/matchLabels").create(),
    FieldSpec::kind("DaemonSet", "spec/selector/matchLabels").create(),
    FieldSpec::kind("StatefulSet", "spec/selector/matchLabels")
        .group("apps")
        .create(),
    FieldSpec::kind("Job", "spec/selector/matchLabels").group("batch"),
    FieldSpec::kind("CronJob", "spec/jobTemplate/spec/selector/matchLabels").group("batch"),
    FieldSpec::kind("PodDisruptionBudget", "spec/selector/matchLabels").group("policy"),
    // Affinity and spread constraints
    FieldSpec::kind("Deployment", POD_AFFINITY_PREFERRED).group("apps"),
    FieldSpec::kind("Deployment", POD_AFFINITY_REQUIRED).group("apps"),
    FieldSpec::kind("Deployment", POD_ANTI_AFFINITY_PREFERRED).group("apps"),
    FieldSpec::kind("Deployment", POD_ANTI_AFFINITY_REQUIRED).group("apps"),
    FieldSpec::kind("Deployment", TOPOLOGY_SPREAD).group("apps"),
    FieldSpec::kind("StatefulSet", POD_AFFINITY_PREFERRED).group("apps"),
    FieldSpec::kind("StatefulSet", POD_AFFINITY_REQUIRED).group("apps"),
    FieldSpec::kind("StatefulSet", POD_ANTI_AFFINITY_PREFERRED).group("apps"),
    FieldSpec::kind("StatefulSet", POD_ANTI_AFFINITY_REQUIRED).group("apps"),
    FieldSpec::kind("StatefulSet", TOPOLOGY_SPREAD).group("apps"),
    // NetworkPolicy
    FieldSpec::kind("NetworkPolicy", "spec/podSelector/matchLabels").group("networking.k8s.io"),
    FieldSpec::kind("NetworkPolicy", "spec/ingress[]/from[]/podSelector/matchLabels")
        .group("networking.k8s.io"),
    FieldSpec::kind("NetworkPolicy", "spec/egress[]/to[]/podSelector/matchLabels")
        .group("networking.k8s.io"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_wildcard() {
        let wildcards: Vec<_> = LABEL_FIELD_SPECS
            .iter()
            .filter(|s| s.is_wildcard())
            .collect();
        assert_eq!(wildcards.len(), 1);
        assert_eq!(wildcards[0].path, "metadata/labels");
        assert!(wildcards[0].create);
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("spec/volumeClaimTemplates[]/metadata/labels"),
            vec![
                Segment::Field("spec"),
                Segment::Each("volumeClaimTemplates"),
                Segment::Field("metadata"),
                Segment::Field("labels"),
            ]
        );
        let rendered: Vec<_> = parse_path("spec/ingress[]/from[]")
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(rendered, vec!["spec", "ingress[]", "from[]"]);
    }

    #[test]
    fn test_matches() {
        let apps_v1 = GroupVersion::parse("apps/v1");
        let core_v1 = GroupVersion::parse("v1");

        let spec = FieldSpec::kind("StatefulSet", "spec/selector/matchLabels").group("apps");
        assert!(spec.matches("StatefulSet", &apps_v1));
        assert!(!spec.matches("StatefulSet", &core_v1));
        assert!(!spec.matches("statefulset", &apps_v1));

        let service = FieldSpec::kind("Service", "spec/selector").version("v1");
        assert!(service.matches("Service", &core_v1));
        assert!(!service.matches("Service", &GroupVersion::parse("v2")));

        let deployment = FieldSpec::kind("Deployment", "spec/selector/matchLabels");
        assert!(deployment.matches("Deployment", &GroupVersion::parse("extensions/v1beta1")));

        assert!(FieldSpec::all("metadata/labels").matches("Anything", &core_v1));
    }

    #[test]
    fn test_all_paths_parse() {
        for spec in LABEL_FIELD_SPECS {
            let segments = spec.segments();
            assert!(!segments.is_empty(), "{}", spec.path);
            assert!(
                matches!(segments.last(), Some(Segment::Field(_))),
                "{} must end in a map key",
                spec.path
            );
        }
    }
}
