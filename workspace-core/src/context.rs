//! Typed, non-exported request-context carriers (component A).
//!
//! The upstream pattern this replaces is a set of ad-hoc integer-keyed
//! singletons stashed in a generic context bag. Here each piece of
//! cross-cutting state the handler chain threads through a request gets its
//! own named field on [`RequestContext`], so a typo or key collision is a
//! compile error instead of a silent `None` at runtime.
//!
//! Every getter returns a zero value when the corresponding layer hasn't run
//! yet; setters are only ever called from [`crate::cluster`]/the handler
//! chain layers that own each field, never from terminal handlers.

use std::collections::BTreeMap;

use crate::cluster::{ClusterAttachment, ResourceIdentity};

/// Per-request state threaded through the handler chain.
///
/// Constructed once per inbound request and discarded when the request
/// returns; never shared across requests.
#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    accept_header: Option<String>,
    user_agent: Option<String>,
    cluster: Option<ClusterAttachment>,
    identity: Option<ResourceIdentity>,
    audit_annotations: BTreeMap<String, String>,
}

impl RequestContext {
    /// A fresh, empty context for an incoming request.
    pub fn new() -> Self {
        Self::default()
    }

    /// The verbatim `Accept` header, if `AcceptHeader` has run.
    pub fn accept_header(&self) -> &str {
        self.accept_header.as_deref().unwrap_or("")
    }

    /// Set by the `AcceptHeader` layer.
    pub fn set_accept_header(&mut self, value: impl Into<String>) {
        self.accept_header = Some(value.into());
    }

    /// Whether the accept header requests the `PartialObjectMetadata` variant,
    /// used by `ClusterScope` to populate `partial_metadata_request`.
    pub fn wants_partial_metadata(&self) -> bool {
        self.accept_header().contains("PartialObjectMetadata")
    }

    /// The verbatim `User-Agent` header, if `UserAgent` has run.
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or("")
    }

    /// Set by the `UserAgent` layer.
    pub fn set_user_agent(&mut self, value: impl Into<String>) {
        self.user_agent = Some(value.into());
    }

    /// The resolved cluster attachment, if `ClusterScope` has run.
    pub fn cluster(&self) -> Option<&ClusterAttachment> {
        self.cluster.as_ref()
    }

    /// Set by the `ClusterScope` layer.
    pub fn set_cluster(&mut self, attachment: ClusterAttachment) {
        self.cluster = Some(attachment);
    }

    /// The resource identity qualifier, if `WildcardIdentity` has run.
    pub fn identity(&self) -> Option<&ResourceIdentity> {
        self.identity.as_ref()
    }

    /// Set by the `WildcardIdentity` layer.
    pub fn set_identity(&mut self, identity: ResourceIdentity) {
        self.identity = Some(identity);
    }

    /// The mutable audit-annotation map installed by `AuditAnnotation`.
    pub fn audit_annotations(&self) -> &BTreeMap<String, String> {
        &self.audit_annotations
    }

    /// Mutable access, used by `ClusterAnnotation` and any layer that adds
    /// provenance to the map.
    pub fn audit_annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.audit_annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters_default_to_zero_values() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.accept_header(), "");
        assert_eq!(ctx.user_agent(), "");
        assert!(ctx.cluster().is_none());
        assert!(ctx.identity().is_none());
        assert!(ctx.audit_annotations().is_empty());
    }

    #[test]
    fn partial_metadata_detected_from_accept_header() {
        let mut ctx = RequestContext::new();
        ctx.set_accept_header("application/json;as=PartialObjectMetadata;g=meta.k8s.io;v=v1");
        assert!(ctx.wants_partial_metadata());
    }
}
