//! Core-group discovery merger (§4.C): splices CRD-backed resources into the
//! native `/api/v1` discovery document.
//!
//! The native discovery handler is invoked as a direct, in-process callable
//! rather than through a looped-back HTTP request, so there is no passthrough
//! header and no recursion to guard against — the caller supplies the native
//! response (already captured into a [`ResponseBuffer`]) and this module only
//! concerns itself with decoding, merging, and re-sorting it.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};

use workspace_core::{buffer::ResponseBuffer, discovery::ApiResource};

/// Read-only view onto the CRD machinery's idea of what core-group resources
/// exist. Implemented by whatever owns the CRD informer cache; reads are
/// in-memory and non-blocking.
pub trait CrdLister: Send + Sync {
    /// CRD-derived resources to advertise for group `""`, version `v1`.
    fn list_core_v1_resources(&self) -> Vec<ApiResource>;

    /// Look up a single CRD-backed resource by its synthetic discovery name
    /// (see [`crd_name_for`]).
    fn get(&self, crd_name: &str) -> Option<ApiResource>;
}

/// The synthetic CRD name a core-group resource request dispatches through:
/// `"<resource>.core"`.
pub fn crd_name_for(resource: &str) -> String {
    format!("{resource}.core")
}

/// Where a core-group resource request for `resource` should be routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Handle via the CRD machinery; carries the resolved resource entry.
    Crd(ApiResource),
    /// No matching CRD; fall through to the native handler.
    Native,
}

/// Failure decoding or merging a captured native discovery response.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryMergeError {
    #[error("native discovery handler returned status {status}")]
    NativeHandlerFailed { status: u16, body: Vec<u8> },
    #[error("failed to decode native discovery response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Activated only for core-group requests (`APIGroup == ""`); see [`crate::discovery`] module docs.
pub struct DiscoveryMerger<L> {
    lister: L,
}

impl<L: CrdLister> DiscoveryMerger<L> {
    pub fn new(lister: L) -> Self {
        DiscoveryMerger { lister }
    }

    /// Resource-request sub-path (§4.C "Resource requests"): decide whether
    /// `resource` is backed by a CRD or should fall through natively.
    pub fn dispatch_resource(&self, resource: &str) -> Dispatch {
        match self.lister.get(&crd_name_for(resource)) {
            Some(entry) => Dispatch::Crd(entry),
            None => Dispatch::Native,
        }
    }

    /// Discovery sub-path (§4.C "Discovery (`/api/v1`)"): merge CRD-derived
    /// resources into the native discovery document captured in `native`.
    /// Returns the raw relayed body/status on a non-200 native response,
    /// exactly as the source does, rather than attempting to decode it.
    pub fn merge_discovery(&self, native: &ResponseBuffer) -> Result<APIResourceList, DiscoveryMergeError> {
        if !native.is_success() {
            return Err(DiscoveryMergeError::NativeHandlerFailed {
                status: native.status(),
                body: native.body().to_vec(),
            });
        }

        let mut list: APIResourceList = serde_json::from_slice(native.body())?;
        let native_resources = std::mem::take(&mut list.resources);

        let mut merged: Vec<APIResource> = self
            .lister
            .list_core_v1_resources()
            .into_iter()
            .map(|r| r.to_apiresource())
            .collect();
        merged.extend(native_resources);
        merged.sort_by(|a, b| a.name.cmp(&b.name));

        list.resources = merged;
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workspace_core::gvk::GroupVersionKind;

    struct FakeLister(Vec<ApiResource>);

    impl CrdLister for FakeLister {
        fn list_core_v1_resources(&self) -> Vec<ApiResource> {
            self.0.clone()
        }

        fn get(&self, crd_name: &str) -> Option<ApiResource> {
            self.0.iter().find(|r| crd_name_for(&r.plural) == crd_name).cloned()
        }
    }

    fn widget_resource() -> ApiResource {
        ApiResource::new(
            &GroupVersionKind::gvk("", "v1", "Widget"),
            "widgets",
            true,
        )
        .default_verbs()
    }

    #[test]
    fn dispatch_resource_finds_crd_backed_resource() {
        let merger = DiscoveryMerger::new(FakeLister(vec![widget_resource()]));
        assert_eq!(merger.dispatch_resource("widgets"), Dispatch::Crd(widget_resource()));
    }

    #[test]
    fn dispatch_resource_falls_through_when_absent() {
        let merger = DiscoveryMerger::new(FakeLister(vec![]));
        assert_eq!(merger.dispatch_resource("pods"), Dispatch::Native);
    }

    #[test]
    fn merge_discovery_appends_and_sorts_by_name() {
        let merger = DiscoveryMerger::new(FakeLister(vec![widget_resource()]));
        let mut native = ResponseBuffer::new();
        native.write(
            br#"{"groupVersion":"v1","resources":[{"name":"pods","singularName":"","namespaced":true,"kind":"Pod","verbs":["get","list"]}]}"#,
        );
        let merged = merger.merge_discovery(&native).unwrap();
        let names: Vec<&str> = merged.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["pods", "widgets"]);
    }

    #[test]
    fn merge_discovery_relays_non_200_native_response() {
        let merger = DiscoveryMerger::new(FakeLister(vec![]));
        let mut native = ResponseBuffer::new();
        native.write_header(500);
        native.write(b"boom");
        let err = merger.merge_discovery(&native).unwrap_err();
        assert!(matches!(err, DiscoveryMergeError::NativeHandlerFailed { status: 500, .. }));
    }
}
