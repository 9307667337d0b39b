//! Cluster naming, attachment, and the resource-identity qualifier (§3, §4.B).

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// The reserved name denoting "every workspace on this shard".
pub const WILDCARD: &str = "*";
/// The reserved name of the root workspace.
pub const ROOT: &str = "root";

static CLUSTER_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]([a-z0-9-]{0,61}[a-z0-9])?:)*[a-z]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap()
});

/// A cluster name failed to validate against the hierarchical naming grammar.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid cluster name {0:?}")]
pub struct InvalidClusterName(pub String);

/// Validate a non-empty, non-reserved cluster name against the colon-delimited
/// hierarchical grammar in §3. Callers resolve `""` and `"*"` themselves before
/// reaching here; see [`ClusterAttachment::resolve`].
pub fn validate_cluster_name(name: &str) -> Result<(), InvalidClusterName> {
    if CLUSTER_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(InvalidClusterName(name.to_owned()))
    }
}

/// Resolved cluster attachment for one request (§3 "Cluster attachment").
///
/// Invariants enforced by construction rather than checked after the fact:
/// `wildcard` is true iff `name == "*"`, and `name` is never empty once a
/// `ClusterAttachment` exists (the empty-header case is resolved to
/// [`ClusterAttachment::local_admin`] before a value is ever built).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAttachment {
    name: String,
    wildcard: bool,
    partial_metadata_request: bool,
}

impl ClusterAttachment {
    /// The implementation-defined local-admin cluster, used when a request
    /// carries no cluster header and no `/clusters/` prefix.
    pub fn local_admin() -> Self {
        ClusterAttachment {
            name: "admin".to_owned(),
            wildcard: false,
            partial_metadata_request: false,
        }
    }

    /// The root workspace.
    pub fn root() -> Self {
        ClusterAttachment {
            name: ROOT.to_owned(),
            wildcard: false,
            partial_metadata_request: false,
        }
    }

    /// The cross-workspace wildcard attachment.
    pub fn wildcard() -> Self {
        ClusterAttachment {
            name: WILDCARD.to_owned(),
            wildcard: true,
            partial_metadata_request: false,
        }
    }

    /// A named, non-wildcard attachment. Validates `name` against the
    /// cluster-name grammar; `""` and `"*"` are rejected here since those are
    /// resolved via [`ClusterAttachment::local_admin`] / [`ClusterAttachment::wildcard`]
    /// instead.
    pub fn named(name: &str) -> Result<Self, InvalidClusterName> {
        validate_cluster_name(name)?;
        Ok(ClusterAttachment {
            name: name.to_owned(),
            wildcard: false,
            partial_metadata_request: false,
        })
    }

    /// Resolve the cluster attachment for a request, given the raw cluster
    /// token (either the `/clusters/<name>/` path segment or the cluster
    /// header value) and whether the accept header requested partial
    /// metadata. Mirrors `ClusterScope` (§4.B.4).
    pub fn resolve(raw: &str, partial_metadata_request: bool) -> Result<Self, InvalidClusterName> {
        let mut attachment = match raw {
            "" => Self::local_admin(),
            WILDCARD => Self::wildcard(),
            name => Self::named(name)?,
        };
        attachment.partial_metadata_request = partial_metadata_request;
        Ok(attachment)
    }

    /// The resolved cluster name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this attachment spans every workspace on the shard.
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether the accept header requested the `PartialObjectMetadata` list variant.
    pub fn partial_metadata_request(&self) -> bool {
        self.partial_metadata_request
    }
}

/// The `:<identity>` suffix split off a resource name on wildcard list/watch
/// requests (§3 "Resource identity qualifier", §4.B.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentity(String);

/// A `:<identity>` suffix was present but empty.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("empty resource identity after ':'")]
pub struct EmptyResourceIdentity;

impl ResourceIdentity {
    /// The opaque identity token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a `resource:identity` token into its parts. Returns `(resource,
    /// None)` when there is no colon, and errors when the colon is present
    /// but the identity half is empty (§4.B.9: "empty identity after the
    /// colon is a hard error").
    pub fn split(resource: &str) -> Result<(&str, Option<ResourceIdentity>), EmptyResourceIdentity> {
        match resource.split_once(':') {
            None => Ok((resource, None)),
            Some((_, "")) => Err(EmptyResourceIdentity),
            Some((base, identity)) => Ok((base, Some(ResourceIdentity(identity.to_owned())))),
        }
    }
}

/// Strip a `/clusters/<name>/` prefix from a decoded path and its
/// percent-encoded counterpart in lockstep (§4.B.4, design note on RawPath
/// alignment).
///
/// Both strings must name the same logical cluster segment; if `raw_path`'s
/// decoded form disagrees with `path`, that's an upstream bug and this
/// function fails loudly rather than silently using one or the other.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterPrefixError {
    /// Neither `path` nor `raw_path` starts with `/clusters/`.
    #[error("path does not start with /clusters/")]
    NotPrefixed,
    /// `path` and `raw_path` decode to different cluster segments.
    #[error("path and raw_path disagree on cluster segment: {path:?} vs {raw_path:?}")]
    Misaligned { path: String, raw_path: String },
}

/// Result of stripping the `/clusters/<name>` prefix: the cluster name plus
/// the remaining `path` and `raw_path` with the prefix removed.
pub struct StrippedClusterPrefix {
    pub cluster_name: String,
    pub path: String,
    pub raw_path: String,
}

pub fn strip_cluster_prefix(
    path: &str,
    raw_path: &str,
) -> Result<StrippedClusterPrefix, ClusterPrefixError> {
    const PREFIX: &str = "/clusters/";
    let path_rest = path.strip_prefix(PREFIX).ok_or(ClusterPrefixError::NotPrefixed)?;
    let raw_rest = raw_path.strip_prefix(PREFIX).ok_or(ClusterPrefixError::NotPrefixed)?;

    let (path_name, path_tail) = split_first_segment(path_rest);
    let (raw_name_encoded, raw_tail) = split_first_segment(raw_rest);
    let raw_name = percent_encoding::percent_decode_str(raw_name_encoded)
        .decode_utf8_lossy()
        .into_owned();

    if path_name != raw_name {
        return Err(ClusterPrefixError::Misaligned {
            path: path_name.to_owned(),
            raw_path: raw_name,
        });
    }

    Ok(StrippedClusterPrefix {
        cluster_name: path_name.to_owned(),
        path: format!("/{}", path_tail),
        raw_path: format!("/{}", raw_tail),
    })
}

fn split_first_segment(rest: &str) -> (&str, &str) {
    match rest.split_once('/') {
        Some((head, tail)) => (head, tail),
        None => (rest, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hierarchical_names() {
        assert!(validate_cluster_name("root:org:foo").is_ok());
        assert!(validate_cluster_name("root").is_ok());
        assert!(validate_cluster_name("a").is_ok());
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(validate_cluster_name("Root").is_err());
        assert!(validate_cluster_name("root:").is_err());
        assert!(validate_cluster_name(":root").is_err());
        assert!(validate_cluster_name("").is_err());
    }

    #[test]
    fn resolve_wildcard_implies_name() {
        let attachment = ClusterAttachment::resolve("*", false).unwrap();
        assert_eq!(attachment.name(), "*");
        assert!(attachment.is_wildcard());
    }

    #[test]
    fn resolve_empty_is_local_admin() {
        let attachment = ClusterAttachment::resolve("", false).unwrap();
        assert!(!attachment.is_wildcard());
        assert!(!attachment.name().is_empty());
    }

    #[test]
    fn resolve_rejects_invalid_name() {
        assert!(ClusterAttachment::resolve("Not Valid", false).is_err());
    }

    #[test]
    fn identity_split_empty_after_colon_is_error() {
        assert!(ResourceIdentity::split("widgets:").is_err());
    }

    #[test]
    fn identity_split_strips_suffix() {
        let (base, identity) = ResourceIdentity::split("widgets:idabc123").unwrap();
        assert_eq!(base, "widgets");
        assert_eq!(identity.unwrap().as_str(), "idabc123");
    }

    #[test]
    fn identity_split_without_colon_is_none() {
        let (base, identity) = ResourceIdentity::split("widgets").unwrap();
        assert_eq!(base, "widgets");
        assert!(identity.is_none());
    }

    #[test]
    fn strip_prefix_aligns_plain_paths() {
        let stripped = strip_cluster_prefix("/clusters/root:org:foo/api/v1/namespaces", "/clusters/root:org:foo/api/v1/namespaces").unwrap();
        assert_eq!(stripped.cluster_name, "root:org:foo");
        assert_eq!(stripped.path, "/api/v1/namespaces");
        assert_eq!(stripped.raw_path, "/api/v1/namespaces");
    }

    #[test]
    fn strip_prefix_decodes_percent_encoded_wildcard() {
        let stripped = strip_cluster_prefix("/clusters/*/api/v1/pods", "/clusters/%2A/api/v1/pods").unwrap();
        assert_eq!(stripped.cluster_name, "*");
        assert_eq!(stripped.path, "/api/v1/pods");
        assert_eq!(stripped.raw_path, "/api/v1/pods");
    }

    #[test]
    fn strip_prefix_rejects_misaligned_segments() {
        let err = strip_cluster_prefix("/clusters/foo/api/v1/pods", "/clusters/bar/api/v1/pods").unwrap_err();
        assert!(matches!(err, ClusterPrefixError::Misaligned { .. }));
    }
}
