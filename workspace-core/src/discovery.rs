//! Type information structs for API discovery
use crate::{gvk::GroupVersionKind, resource::Resource, resource::to_plural, scope::Scope};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;
use serde::{Deserialize, Serialize};

/// Information about a Kubernetes API resource
///
/// Used as dynamic type info for `Resource` to allow dynamic querying on `Api`
/// via constructors like `Api::all_with` and `Api::namespaced_with`.
///
/// Only instances returned by actual API discovery will have ALL the
/// extraneous data about shortnames, verbs, and resources; values built via
/// [`ApiResource::from_gvk`] only guess at a plural and cluster scope.
///
/// # Warning
///
/// Construction through
/// - [`ApiResource::erase`] (type erasing where we have trait data)
/// - [`ApiResource::new`] (proving all essential data manually)
///
/// Are **minimal** conveniences that will work with the Api, but will not have all the extraneous data.
///
/// Shorter construction methods (such as manually filling in data), or fallibly converting from GVKs,
/// may fail to query. Provide accurate `plural` and `namespaced` data to be safe.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ApiResource {
    /// Resource group, empty for core group.
    pub group: String,
    /// group version
    pub version: String,
    /// apiVersion of the resource (v1 for core group,
    /// groupName/groupVersions for other).
    pub api_version: String,
    /// Singular PascalCase name of the resource
    pub kind: String,
    /// Resource name / plural name
    pub plural: String,
    /// Whether the resource is namespaced or not
    pub namespaced: bool,

    /// Supported verbs
    ///
    /// Note: only populated when constructed through discovery or kube-derive
    pub verbs: Vec<String>,

    /// Supported shortnames
    ///
    /// Note: only populated when constructed through discovery or kube-derive.
    pub shortnames: Vec<String>,

    /// Supported subresources
    ///
    /// Note: only populated when constructed through discovery.
    pub subresources: Vec<ApiResource>,
}

impl ApiResource {
    /// Creates an ApiResource by type-erasing a Resource
    ///
    /// Note that this variant of constructing an `ApiResource` does not
    /// get you verbs and available subresources.
    /// If you need this, construct via discovery.
    pub fn erase<K: Resource>(dt: &K::DynamicType) -> Self {
        ApiResource {
            group: K::group(dt).to_string(),
            version: K::version(dt).to_string(),
            api_version: K::api_version(dt).to_string(),
            kind: K::kind(dt).to_string(),
            plural: K::plural(dt).to_string(),
            namespaced: <K as Resource>::Scope::is_namespaced(),
            // discovery/derive-only properties left blank
            verbs: vec![],
            subresources: vec![],
            shortnames: vec![],
        }
    }

    /// Creates a new ApiResource from a GVK, plural and a namespaced bool
    ///
    /// This is the **minimal** variant needed to use with the dynamic api
    /// It does not contain information abut verbs, subresources and shortnames.
    pub fn new(gvk: &GroupVersionKind, plural: &str, namespaced: bool) -> Self {
        ApiResource {
            api_version: gvk.api_version(),
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            plural: plural.to_string(),
            namespaced: namespaced,
            // non-essential properties left blank
            verbs: vec![],
            subresources: vec![],
            shortnames: vec![],
        }
    }

    /// Infer a minimal ApiResource from a GVK as cluster scoped
    ///
    /// # Warning
    /// This function will **guess** the resource plural name which can fail
    /// for CRDs with complex pluralisations it can fail. It will also assume cluster scope.
    ///
    /// Consider using [`ApiResource::new`](crate::discovery::ApiResource::new) directly
    /// to set an exact plural and scope instead of guessing.
    pub fn from_gvk(gvk: &GroupVersionKind) -> Self {
        ApiResource::new(gvk, &to_plural(&gvk.kind.to_ascii_lowercase()), false)
    }

    /// Build an `ApiResource` from a native `meta::v1::APIResource` plus the
    /// `groupVersion` string it was listed under, filling in group/version
    /// from `group_version` when the `APIResource` itself omits them (as the
    /// core `v1` group does).
    ///
    /// Used by the discovery merger to fuse CRD-advertised resources into a
    /// response shaped like the native discovery document.
    pub fn from_apiresource(ar: &APIResource, group_version: &str) -> Self {
        let gvsplit = group_version.splitn(2, '/').collect::<Vec<_>>();
        let (default_group, default_version) = match *gvsplit.as_slice() {
            [g, v] => (g, v),
            [v] => ("", v),
            _ => unreachable!(),
        };
        let group = ar.group.clone().unwrap_or_else(|| default_group.into());
        let version = ar.version.clone().unwrap_or_else(|| default_version.into());
        let api_version = if group.is_empty() {
            version.clone()
        } else {
            format!("{}/{}", group, version)
        };
        ApiResource {
            group,
            version,
            api_version,
            kind: ar.kind.clone(),
            plural: ar.name.clone(),
            namespaced: ar.namespaced,
            verbs: ar.verbs.clone(),
            shortnames: ar.short_names.clone().unwrap_or_default(),
            subresources: vec![],
        }
    }

    /// Convert back into a native `meta::v1::APIResource`, the inverse of
    /// [`ApiResource::from_apiresource`]. Used by the discovery merger to
    /// splice CRD-derived entries into a response shaped like the native
    /// discovery document.
    pub fn to_apiresource(&self) -> APIResource {
        APIResource {
            name: self.plural.clone(),
            singular_name: String::new(),
            namespaced: self.namespaced,
            group: Some(self.group.clone()),
            version: Some(self.version.clone()),
            kind: self.kind.clone(),
            verbs: self.verbs.clone(),
            short_names: if self.shortnames.is_empty() { None } else { Some(self.shortnames.clone()) },
            categories: None,
            storage_version_hash: None,
        }
    }

    /// Set the whether the resource is namsepace scoped
    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    /// Set the shortnames
    pub fn shortnames(mut self, shortnames: &[&str]) -> Self {
        self.shortnames = shortnames.iter().map(|x| x.to_string()).collect();
        self
    }

    /// Set the allowed verbs
    pub fn verbs(mut self, verbs: &[&str]) -> Self {
        self.verbs = verbs.iter().map(|x| x.to_string()).collect();
        self
    }

    /// Set the default verbs
    pub fn default_verbs(mut self) -> Self {
        self.verbs = verbs::DEFAULT_VERBS.iter().map(|x| x.to_string()).collect();
        self
    }
}

/// Rbac verbs
pub mod verbs {
    /// Create a resource
    pub const CREATE: &str = "create";
    /// Get single resource
    pub const GET: &str = "get";
    /// List objects
    pub const LIST: &str = "list";
    /// Watch for objects changes
    pub const WATCH: &str = "watch";
    /// Delete single object
    pub const DELETE: &str = "delete";
    /// Delete multiple objects at once
    pub const DELETE_COLLECTION: &str = "deletecollection";
    /// Update an object
    pub const UPDATE: &str = "update";
    /// Patch an object
    pub const PATCH: &str = "patch";

    /// All the default verbs
    pub const DEFAULT_VERBS: &[&str; 8] =
        &[CREATE, GET, LIST, WATCH, DELETE, DELETE_COLLECTION, UPDATE, PATCH];
}

impl ApiResource {
    /// Checks that given verb is supported on this resource.
    pub fn supports_operation(&self, operation: &str) -> bool {
        self.verbs.iter().any(|op| op == operation)
    }
}
