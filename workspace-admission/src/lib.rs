//! Workspace admission (§4.E): the mutating stamp applied on create and the
//! invariant checks enforced on create and update, both scoped to
//! `ClusterWorkspace`.

use json_patch::{jsonptr::PointerBuf, AddOperation, Patch, PatchOperation};
use workspace_core::{
    admission::{AdmissionRequest, AdmissionResponse, Operation},
    response::StatusDetails,
    workspace::{ClusterWorkspace, OwnerInfo, Phase, OWNER_ANNOTATION},
    Status,
};

/// One invariant violation, reported the way Kubernetes reports field errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Mutating admission (§4.E "Admit"): on create, stamp the caller identity
/// into [`OWNER_ANNOTATION`]. A no-op on update.
pub fn admit(request: &AdmissionRequest<ClusterWorkspace>) -> AdmissionResponse {
    let response = AdmissionResponse::from(request);
    if request.operation != Operation::Create {
        return response;
    }
    let Some(object) = &request.object else {
        return response;
    };

    let owner = OwnerInfo::from_user_info(&request.user_info);
    let annotation_value = match owner.to_annotation_value() {
        Ok(value) => value,
        Err(err) => return AdmissionResponse::invalid(format!("failed to encode owner annotation: {err}")),
    };

    let mut patches = Vec::new();
    if object.metadata.annotations.is_none() {
        patches.push(PatchOperation::Add(AddOperation {
            path: PointerBuf::from_tokens(["metadata", "annotations"]),
            value: serde_json::json!({}),
        }));
    }
    patches.push(PatchOperation::Add(AddOperation {
        path: PointerBuf::from_tokens(["metadata", "annotations", OWNER_ANNOTATION]),
        value: serde_json::Value::String(annotation_value),
    }));

    match response.with_patch(Patch(patches)) {
        Ok(response) => response,
        Err(err) => AdmissionResponse::invalid(format!("failed to serialize owner annotation patch: {err}")),
    }
}

/// Validating admission (§4.E "Validate"): every numbered rule, run against
/// create and update. Returns one [`FieldError`] per violated rule.
pub fn validate(request: &AdmissionRequest<ClusterWorkspace>) -> Vec<FieldError> {
    let Some(new) = &request.object else {
        return Vec::new();
    };

    match request.operation {
        Operation::Create => validate_create(new, request),
        Operation::Update => match &request.old_object {
            Some(old) => validate_update(old, new),
            None => Vec::new(),
        },
        Operation::Delete | Operation::Connect => Vec::new(),
    }
}

fn validate_create(new: &ClusterWorkspace, request: &AdmissionRequest<ClusterWorkspace>) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let owner = OwnerInfo::from_user_info(&request.user_info);
    match owner.to_annotation_value() {
        Ok(expected) => {
            let actual = new.metadata.annotations.as_ref().and_then(|a| a.get(OWNER_ANNOTATION));
            if actual != Some(&expected) {
                errors.push(FieldError::new(
                    format!("metadata.annotations[{OWNER_ANNOTATION}]"),
                    "owner annotation must equal the stamped value exactly",
                ));
            }
        }
        Err(err) => errors.push(FieldError::new(
            "metadata.annotations",
            format!("failed to compute expected owner annotation: {err}"),
        )),
    }

    // Rule 7: direct creation in phase Ready is allowed exactly when rule 6's
    // invariants already hold.
    if new.status.phase == Phase::Ready {
        errors.extend(ready_invariants(new));
    }

    errors
}

fn validate_update(old: &ClusterWorkspace, new: &ClusterWorkspace) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if old.spec.workspace_type != new.spec.workspace_type {
        errors.push(FieldError::new("spec.type", "field is immutable"));
    }

    if !old.status.location.current.is_empty() && new.status.location.current.is_empty() {
        errors.push(FieldError::new(
            "status.location.current",
            "must not transition from non-empty to empty",
        ));
    }

    if !old.status.base_url.is_empty() && new.status.base_url.is_empty() {
        errors.push(FieldError::new("status.baseURL", "must not transition from non-empty to empty"));
    }

    if !old.status.phase.can_transition_to(new.status.phase) {
        errors.push(FieldError::new(
            "status.phase",
            format!("cannot transition from {:?} to {:?}", old.status.phase, new.status.phase),
        ));
    }

    if new.status.phase == Phase::Ready {
        errors.extend(ready_invariants(new));
    }

    errors
}

/// Rule 6: what must already hold for a workspace to sit in `Ready`.
fn ready_invariants(workspace: &ClusterWorkspace) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !workspace.status.initializers.is_empty() {
        errors.push(FieldError::new("status.initializers", "must be empty when phase is Ready"));
    }
    if workspace.status.base_url.is_empty() {
        errors.push(FieldError::new("status.baseURL", "must be non-empty when phase is Ready"));
    }
    if workspace.status.location.current.is_empty() {
        errors.push(FieldError::new("status.location.current", "must be non-empty when phase is Ready"));
    }
    errors
}

/// The full validating-webhook response: ignores requests for any resource
/// other than `clusterworkspaces`, otherwise runs [`validate`] and denies
/// with one [`StatusDetails`] cause per violated rule.
pub fn validation_response(request: &AdmissionRequest<ClusterWorkspace>) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    if request.resource.resource != "clusterworkspaces" {
        return response;
    }

    let errors = validate(request);
    if errors.is_empty() {
        return response;
    }

    response.allowed = false;
    response.result = Status::failure("ClusterWorkspace failed validation", "FieldValueInvalid").with_code(422);
    response.result.details = Some(StatusDetails {
        causes: errors
            .into_iter()
            .map(|e| workspace_core::response::StatusCause {
                field: e.field,
                message: e.message,
                reason: String::new(),
            })
            .collect(),
        ..Default::default()
    });
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::authentication::v1::UserInfo;
    use std::collections::BTreeMap;
    use workspace_core::{
        gvk::{GroupVersionKind, GroupVersionResource},
        workspace::{ClusterWorkspaceSpec, ClusterWorkspaceStatus, ClusterWorkspaceTypeReference, WorkspaceLocation},
        ObjectMeta,
    };

    fn user(name: &str) -> UserInfo {
        UserInfo {
            username: Some(name.to_owned()),
            uid: Some("uid-1".to_owned()),
            groups: Some(vec!["system:authenticated".to_owned()]),
            extra: None,
        }
    }

    fn request(
        operation: Operation,
        object: Option<ClusterWorkspace>,
        old_object: Option<ClusterWorkspace>,
    ) -> AdmissionRequest<ClusterWorkspace> {
        AdmissionRequest {
            types: Default::default(),
            uid: "req-1".to_owned(),
            kind: GroupVersionKind::gvk("tenancy.kcp.dev", "v1beta1", "ClusterWorkspace"),
            resource: GroupVersionResource::gvr("tenancy.kcp.dev", "v1beta1", "clusterworkspaces"),
            sub_resource: None,
            request_kind: None,
            request_resource: None,
            request_sub_resource: None,
            name: "foo".to_owned(),
            namespace: None,
            operation,
            user_info: user("alice"),
            object,
            old_object,
            dry_run: false,
            options: None,
        }
    }

    fn workspace(phase: Phase) -> ClusterWorkspace {
        ClusterWorkspace {
            types: Default::default(),
            metadata: ObjectMeta {
                name: Some("foo".to_owned()),
                ..Default::default()
            },
            spec: ClusterWorkspaceSpec {
                workspace_type: ClusterWorkspaceTypeReference { name: "universal".to_owned(), path: "root".to_owned() },
                shard: None,
            },
            status: ClusterWorkspaceStatus { phase, ..Default::default() },
        }
    }

    #[test]
    fn admit_stamps_owner_annotation_on_create() {
        let req = request(Operation::Create, Some(workspace(Phase::Scheduling)), None);
        let response = admit(&req);
        assert!(response.allowed);
        assert!(response.patch.is_some());
    }

    #[test]
    fn admit_is_noop_on_update() {
        let req = request(Operation::Update, Some(workspace(Phase::Scheduling)), Some(workspace(Phase::Scheduling)));
        let response = admit(&req);
        assert!(response.patch.is_none());
    }

    #[test]
    fn validate_create_requires_matching_owner_annotation() {
        let req = request(Operation::Create, Some(workspace(Phase::Scheduling)), None);
        let errors = validate(&req);
        assert!(errors.iter().any(|e| e.field.contains(OWNER_ANNOTATION)));
    }

    #[test]
    fn validate_create_passes_with_stamped_annotation() {
        let mut new = workspace(Phase::Scheduling);
        let owner = OwnerInfo::from_user_info(&user("alice"));
        let mut annotations = BTreeMap::new();
        annotations.insert(OWNER_ANNOTATION.to_owned(), owner.to_annotation_value().unwrap());
        new.metadata.annotations = Some(annotations);
        let req = request(Operation::Create, Some(new), None);
        assert!(validate(&req).is_empty());
    }

    #[test]
    fn validate_update_rejects_type_change() {
        let old = workspace(Phase::Scheduling);
        let mut new = workspace(Phase::Scheduling);
        new.spec.workspace_type.name = "other".to_owned();
        let req = request(Operation::Update, Some(new), Some(old));
        let errors = validate(&req);
        assert!(errors.iter().any(|e| e.field == "spec.type"));
    }

    #[test]
    fn validate_update_rejects_phase_back_edge() {
        let old = workspace(Phase::Ready);
        let mut new = workspace(Phase::Scheduling);
        new.status.base_url = "https://shard".to_owned();
        new.status.location.current = "shard-1".to_owned();
        let req = request(Operation::Update, Some(new), Some(old));
        let errors = validate(&req);
        assert!(errors.iter().any(|e| e.field == "status.phase"));
    }

    #[test]
    fn validate_update_rejects_base_url_regression() {
        let mut old = workspace(Phase::Ready);
        old.status.base_url = "https://shard".to_owned();
        old.status.location.current = "shard-1".to_owned();
        let mut new = old.clone();
        new.status.base_url = String::new();
        let req = request(Operation::Update, Some(new), Some(old));
        let errors = validate(&req);
        assert!(errors.iter().any(|e| e.field == "status.baseURL"));
    }

    #[test]
    fn ready_requires_no_initializers_and_nonempty_location() {
        let old = workspace(Phase::Initializing);
        let mut new = workspace(Phase::Ready);
        new.status.initializers = vec!["some.initializer".to_owned()];
        let req = request(Operation::Update, Some(new), Some(old));
        let errors = validate(&req);
        assert!(errors.iter().any(|e| e.field == "status.initializers"));
        assert!(errors.iter().any(|e| e.field == "status.baseURL"));
        assert!(errors.iter().any(|e| e.field == "status.location.current"));
    }

    #[test]
    fn direct_create_into_ready_allowed_when_invariants_hold() {
        let mut new = workspace(Phase::Ready);
        new.status.base_url = "https://shard".to_owned();
        new.status.location = WorkspaceLocation { current: "shard-1".to_owned(), target: String::new() };
        let owner = OwnerInfo::from_user_info(&user("alice"));
        let mut annotations = BTreeMap::new();
        annotations.insert(OWNER_ANNOTATION.to_owned(), owner.to_annotation_value().unwrap());
        new.metadata.annotations = Some(annotations);
        let req = request(Operation::Create, Some(new), None);
        assert!(validate(&req).is_empty());
    }

    #[test]
    fn validation_response_ignores_other_resources() {
        let mut req = request(Operation::Create, Some(workspace(Phase::Scheduling)), None);
        req.resource = GroupVersionResource::gvr("tenancy.kcp.dev", "v1beta1", "clusterworkspacetypes");
        let response = validation_response(&req);
        assert!(response.allowed);
    }

    #[test]
    fn validation_response_denies_with_causes() {
        let req = request(Operation::Create, Some(workspace(Phase::Scheduling)), None);
        let response = validation_response(&req);
        assert!(!response.allowed);
        let causes = &response.result.details.unwrap().causes;
        assert!(!causes.is_empty());
    }
}
