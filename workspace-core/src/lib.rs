//! Shared types for the workspace gateway: typed request-context carriers,
//! cluster naming and attachment, the `ClusterWorkspace` data model, GVK/TypeMeta
//! plumbing, discovery types, admission wire types, and the in-memory response
//! buffer used by the discovery merger.

#[cfg(feature = "admission")]
pub mod admission;

pub mod buffer;
pub mod cluster;
pub mod context;

pub mod discovery;
pub use discovery::ApiResource;

pub mod dynamic;
pub use dynamic::DynamicObject;

pub mod gvk;
pub use gvk::{GroupVersionKind, GroupVersionResource};

pub mod metadata;
pub use metadata::{ObjectMeta, TypeMeta};

pub mod object;
pub use object::ObjectList;

mod resource;
pub use resource::{Resource, ResourceExt};

pub mod response;
pub use response::Status;

pub mod scope;

pub mod workspace;
pub use workspace::{ClusterWorkspace, ClusterWorkspaceSpec, ClusterWorkspaceType, Phase};

mod error;
pub use error::{Error, ErrorResponse};

pub type Result<T, E = Error> = std::result::Result<T, E>;
