//! 8. WildcardListWatchGuard (§4.B.8): cross-workspace wildcard requests may
//! only read, never write — any verb outside `{list, watch}` against a
//! wildcard-scoped resource is rejected before it reaches a handler.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{Method, StatusCode};

use super::context;

pub async fn wildcard_list_watch_guard(req: Request, next: Next) -> Response {
    let is_wildcard = context(&req).cluster().map(|c| c.is_wildcard()).unwrap_or(false);
    if is_wildcard && is_resource_request(req.uri().path()) {
        let verb = verb_of(&req);
        if verb != "list" && verb != "watch" {
            let message = format!("{verb} is not supported in the `*` logical cluster");
            return (StatusCode::METHOD_NOT_ALLOWED, message).into_response();
        }
    }
    next.run(req).await
}

/// Whether `path` addresses a Kubernetes-style API resource, as opposed to a
/// non-resource endpoint like `/healthz` or `/readyz`.
pub(crate) fn is_resource_request(path: &str) -> bool {
    path.starts_with("/api/") || path.starts_with("/apis/")
}

/// A minimal verb classifier mirroring Kubernetes' request-info derivation:
/// `GET` is `list` unless the query string asks to `watch`; the write verbs
/// map one-to-one onto their HTTP methods.
pub(crate) fn verb_of(req: &Request) -> &'static str {
    match *req.method() {
        Method::GET => {
            let watch = req
                .uri()
                .query()
                .map(|q| q.split('&').any(|kv| kv == "watch=true" || kv == "watch=1"))
                .unwrap_or(false);
            if watch {
                "watch"
            } else {
                "list"
            }
        }
        Method::POST => "create",
        Method::PUT => "update",
        Method::PATCH => "patch",
        Method::DELETE => "delete",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::cluster_scope;
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    async fn probe() -> &'static str {
        "ok"
    }

    fn app() -> Router {
        Router::new()
            .route("/api/v1/pods", get(probe).post(probe))
            .layer(axum::middleware::from_fn(wildcard_list_watch_guard))
            .layer(axum::middleware::from_fn(cluster_scope))
    }

    #[tokio::test]
    async fn allows_list_on_wildcard() {
        let req = HttpRequest::builder()
            .uri("/clusters/%2A/api/v1/pods")
            .method("GET")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_create_on_wildcard() {
        let req = HttpRequest::builder()
            .uri("/clusters/%2A/api/v1/pods")
            .method("POST")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("in the `*` logical cluster"));
    }

    #[tokio::test]
    async fn allows_create_on_named_cluster() {
        let req = HttpRequest::builder()
            .uri("/clusters/root:org:foo/api/v1/pods")
            .method("POST")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
