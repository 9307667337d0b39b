//! The fixed-order handler chain (§4.B). Each layer is an `axum::middleware::from_fn`
//! function: a pure transformer of `(request, context)` that either forwards to
//! `next` or short-circuits with a terminal response. The chain is installed with
//! [`install_handler_chain`], which wires the nine layers in the order declared
//! in the module docs below.
//!
//! Composition is bottom-up, matching the teacher's outbound `ServiceBuilder`
//! stack in `workspace-client`: `axum::Router::layer` nests outside-in, so the
//! layer added *last* runs *first*. To get the declared order — AcceptHeader,
//! UserAgent, InClusterServiceAccountRewrite, ClusterScope, AuditAnnotation,
//! ClusterAnnotation, WorkspaceProjection, WildcardListWatchGuard,
//! WildcardIdentity — [`install_handler_chain`] adds them in reverse.

mod accept_header;
mod audit_annotation;
mod cluster_annotation;
mod cluster_scope;
mod in_cluster_service_account_rewrite;
mod user_agent;
mod wildcard_identity;
mod wildcard_list_watch_guard;
mod workspace_projection;

pub use accept_header::accept_header;
pub use audit_annotation::audit_annotation;
pub use cluster_annotation::cluster_annotation;
pub use cluster_scope::cluster_scope;
pub use in_cluster_service_account_rewrite::in_cluster_service_account_rewrite;
pub use user_agent::user_agent;
pub use wildcard_identity::wildcard_identity;
pub use wildcard_list_watch_guard::wildcard_list_watch_guard;
pub use workspace_projection::workspace_projection;

use axum::{extract::Request, Router};
use axum::middleware::from_fn;
use workspace_core::context::RequestContext;

/// The cluster-attachment header (§6 "Headers consumed").
pub(crate) const CLUSTER_HEADER: &str = "X-Kubernetes-Cluster";

/// Mutable access to the request's [`RequestContext`], inserting a fresh one
/// on first touch. Every layer below calls this instead of reaching into
/// `extensions` directly.
pub(crate) fn context_mut(req: &mut Request) -> &mut RequestContext {
    if req.extensions().get::<RequestContext>().is_none() {
        req.extensions_mut().insert(RequestContext::new());
    }
    req.extensions_mut()
        .get_mut::<RequestContext>()
        .expect("inserted above")
}

/// Read-only access to the request's [`RequestContext`], defaulting to an
/// empty one for layers that run before any context has been installed.
pub(crate) fn context(req: &Request) -> RequestContext {
    req.extensions().get::<RequestContext>().cloned().unwrap_or_default()
}

/// Install the nine-layer handler chain (§4.B) onto `router`, outermost first.
pub fn install_handler_chain(router: Router) -> Router {
    router
        .layer(from_fn(wildcard_identity))
        .layer(from_fn(wildcard_list_watch_guard))
        .layer(from_fn(workspace_projection))
        .layer(from_fn(cluster_annotation))
        .layer(from_fn(audit_annotation))
        .layer(from_fn(cluster_scope))
        .layer(from_fn(in_cluster_service_account_rewrite))
        .layer(from_fn(user_agent))
        .layer(from_fn(accept_header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Json};
    use http::{header, Request as HttpRequest, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn probe(req: Request) -> Json<Value> {
        let ctx = context(&req);
        Json(serde_json::json!({
            "cluster": ctx.cluster().map(|c| c.name().to_owned()),
            "wildcard": ctx.cluster().map(|c| c.is_wildcard()).unwrap_or(false),
            "partial_metadata": ctx.cluster().map(|c| c.partial_metadata_request()).unwrap_or(false),
        }))
    }

    fn app() -> Router {
        install_handler_chain(Router::new().route("/api/v1/pods", get(probe)))
    }

    /// §7 open question: AcceptHeader must run before ClusterScope, or wildcard
    /// partial-metadata detection silently degrades. This pins that ordering:
    /// a PartialObjectMetadata accept header on a wildcard list request must be
    /// visible in the `partial_metadata` field ClusterScope derives from it.
    #[tokio::test]
    async fn accept_header_runs_before_cluster_scope() {
        let req = HttpRequest::builder()
            .uri("/clusters/%2A/api/v1/pods")
            .header(header::ACCEPT, "application/json;as=PartialObjectMetadata;g=meta.k8s.io;v=v1")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["wildcard"], true);
        assert_eq!(json["partial_metadata"], true);
    }

    #[tokio::test]
    async fn named_cluster_prefix_is_stripped() {
        let req = HttpRequest::builder()
            .uri("/clusters/root:org:foo/api/v1/pods")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["cluster"], "root:org:foo");
    }
}
