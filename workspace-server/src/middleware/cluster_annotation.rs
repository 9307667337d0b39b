//! 6. ClusterAnnotation (§4.B.6): records the resolved cluster name into the
//! audit-annotation map installed by `AuditAnnotation`.

use axum::{extract::Request, middleware::Next, response::Response};

use super::context_mut;

/// Audit-annotation key under which the resolved cluster name is recorded.
pub const CLUSTER_ANNOTATION_KEY: &str = "tenancy.kcp.dev/workspace";

pub async fn cluster_annotation(mut req: Request, next: Next) -> Response {
    let ctx = context_mut(&mut req);
    if let Some(name) = ctx.cluster().map(|c| c.name().to_owned()) {
        ctx.audit_annotations_mut().insert(CLUSTER_ANNOTATION_KEY.to_owned(), name);
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{cluster_scope, context};
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    #[tokio::test]
    async fn annotates_resolved_cluster() {
        async fn probe(req: Request) -> String {
            context(&req)
                .audit_annotations()
                .get(CLUSTER_ANNOTATION_KEY)
                .cloned()
                .unwrap_or_default()
        }
        let app = Router::new()
            .route("/api/v1/pods", get(probe))
            .layer(axum::middleware::from_fn(cluster_annotation))
            .layer(axum::middleware::from_fn(cluster_scope));
        let req = HttpRequest::builder()
            .uri("/clusters/root:org:foo/api/v1/pods")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"root:org:foo");
    }
}
