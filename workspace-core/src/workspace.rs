//! The `ClusterWorkspace` / `ClusterWorkspaceType` data model (§3) and the
//! owner-identity stamp used by workspace admission (§4.E).

use std::collections::BTreeMap;

use k8s_openapi::api::authentication::v1::UserInfo;
use serde::{Deserialize, Serialize};

use crate::{metadata::TypeMeta, resource::Resource, scope::ClusterResourceScope, ObjectMeta};

/// The annotation key workspace admission stamps with the creator's identity.
pub const OWNER_ANNOTATION: &str = "tenancy.kcp.dev/owner";

/// A cluster-scoped declarative object describing a logical cluster (§3).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWorkspace {
    #[serde(flatten)]
    pub types: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: ClusterWorkspaceSpec,
    #[serde(default)]
    pub status: ClusterWorkspaceStatus,
}

impl Resource for ClusterWorkspace {
    type DynamicType = ();
    type Scope = ClusterResourceScope;

    fn kind(_: &()) -> std::borrow::Cow<'_, str> {
        "ClusterWorkspace".into()
    }

    fn group(_: &()) -> std::borrow::Cow<'_, str> {
        "tenancy.kcp.dev".into()
    }

    fn version(_: &()) -> std::borrow::Cow<'_, str> {
        "v1beta1".into()
    }

    fn plural(_: &()) -> std::borrow::Cow<'_, str> {
        "clusterworkspaces".into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// `spec.type`, `spec.shard` (§3): type is immutable after create; shard is
/// either a concrete name or a selector, never both.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWorkspaceSpec {
    #[serde(rename = "type")]
    pub workspace_type: ClusterWorkspaceTypeReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardConstraint>,
}

/// A reference to a [`ClusterWorkspaceType`] by `(name, path)`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterWorkspaceTypeReference {
    pub name: String,
    pub path: String,
}

/// `spec.shard`: either a concrete shard name or a label selector, never both;
/// omission means "any shard".
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ShardConstraint {
    Name(String),
    Selector(BTreeMap<String, String>),
}

/// `status.*` (§3): phase machine, pending initializers, and the
/// monotonically-filled location/baseURL fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWorkspaceStatus {
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub initializers: Vec<String>,
    #[serde(default)]
    pub location: WorkspaceLocation,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_url: String,
}

/// `status.location = { current, target }` (§3).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceLocation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
}

/// The workspace phase machine: a 3-state monotone enum, represented as a
/// tagged variant so illegal states are unrepresentable (§9 design note).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "PascalCase")]
pub enum Phase {
    #[default]
    Scheduling,
    Initializing,
    Ready,
}

impl Phase {
    /// Whether `self -> next` is a legal forward-only transition (§4.E rule 5).
    /// Equal phase is allowed; back-edges are not.
    pub fn can_transition_to(self, next: Phase) -> bool {
        next >= self
    }
}

/// A `ClusterWorkspaceType`, referenced by `(name, path)` and validated for
/// existence at admission time (§3).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterWorkspaceType {
    #[serde(flatten)]
    pub types: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: ClusterWorkspaceTypeSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClusterWorkspaceTypeSpec {
    #[serde(default)]
    pub extend: Vec<ClusterWorkspaceTypeReference>,
}

impl Resource for ClusterWorkspaceType {
    type DynamicType = ();
    type Scope = ClusterResourceScope;

    fn kind(_: &()) -> std::borrow::Cow<'_, str> {
        "ClusterWorkspaceType".into()
    }

    fn group(_: &()) -> std::borrow::Cow<'_, str> {
        "tenancy.kcp.dev".into()
    }

    fn version(_: &()) -> std::borrow::Cow<'_, str> {
        "v1beta1".into()
    }

    fn plural(_: &()) -> std::borrow::Cow<'_, str> {
        "clusterworkspacetypes".into()
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

/// The caller identity stamped into [`OWNER_ANNOTATION`] on create (§4.E,
/// S5). Field order is canonical (`username, uid, groups, extra`) and `extra`
/// keys are sorted, so the JSON encoding is reproducible across runs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerInfo {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Vec<String>>,
}

impl OwnerInfo {
    /// Canonicalize a Kubernetes `UserInfo` into the stamped owner shape. Uses
    /// a `BTreeMap` for `extra` so key order is deterministic regardless of
    /// the source map's iteration order.
    pub fn from_user_info(user: &UserInfo) -> Self {
        let extra = user
            .extra
            .clone()
            .unwrap_or_default()
            .into_iter()
            .collect::<BTreeMap<_, _>>();
        OwnerInfo {
            username: user.username.clone().unwrap_or_default(),
            uid: user.uid.clone().unwrap_or_default(),
            groups: user.groups.clone().unwrap_or_default(),
            extra,
        }
    }

    /// Serialize to the exact JSON form stamped into [`OWNER_ANNOTATION`].
    pub fn to_annotation_value(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_forward_transitions_allowed() {
        assert!(Phase::Scheduling.can_transition_to(Phase::Initializing));
        assert!(Phase::Initializing.can_transition_to(Phase::Ready));
        assert!(Phase::Scheduling.can_transition_to(Phase::Ready));
    }

    #[test]
    fn phase_equal_transition_allowed() {
        assert!(Phase::Initializing.can_transition_to(Phase::Initializing));
    }

    #[test]
    fn phase_back_edge_rejected() {
        assert!(!Phase::Ready.can_transition_to(Phase::Initializing));
        assert!(!Phase::Initializing.can_transition_to(Phase::Scheduling));
    }

    #[test]
    fn owner_info_sorts_extra_keys_and_round_trips() {
        let mut user = UserInfo::default();
        user.username = Some("someone".into());
        user.uid = Some("id".into());
        user.groups = Some(vec!["a".into(), "b".into()]);
        user.extra = Some(BTreeMap::from([("one".to_string(), vec!["1".to_string(), "01".to_string()])]));

        let owner = OwnerInfo::from_user_info(&user);
        let json = owner.to_annotation_value().unwrap();
        assert_eq!(
            json,
            r#"{"username":"someone","uid":"id","groups":["a","b"],"extra":{"one":["1","01"]}}"#
        );
    }
}
