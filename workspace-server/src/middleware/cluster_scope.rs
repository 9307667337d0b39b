//! 4. ClusterScope (§4.B.4): resolves the cluster attachment for a request,
//! either from a `/clusters/<name>/` path prefix or from the cluster header,
//! and records whether the client asked for the `PartialObjectMetadata` list
//! variant (read from the context `AcceptHeader` already populated, per the
//! chain's fixed order).

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{StatusCode, Uri};
use workspace_core::cluster::{strip_cluster_prefix, ClusterAttachment};

use super::{context_mut, CLUSTER_HEADER};

pub async fn cluster_scope(mut req: Request, next: Next) -> Response {
    let raw_path = req.uri().path().to_owned();
    let decoded_path = percent_encoding::percent_decode_str(&raw_path)
        .decode_utf8_lossy()
        .into_owned();

    let raw_token = if decoded_path.starts_with("/clusters/") {
        match strip_cluster_prefix(&decoded_path, &raw_path) {
            Ok(stripped) => {
                rewrite_path(&mut req, &stripped.raw_path);
                stripped.cluster_name
            }
            Err(_) => return bad_request("malformed /clusters/ path prefix"),
        }
    } else {
        req.headers()
            .get(CLUSTER_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned()
    };

    let partial_metadata_request = context_mut(&mut req).wants_partial_metadata();

    match ClusterAttachment::resolve(&raw_token, partial_metadata_request) {
        Ok(attachment) => {
            context_mut(&mut req).set_cluster(attachment);
            next.run(req).await
        }
        Err(err) => bad_request(&err.to_string()),
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_owned()).into_response()
}

fn rewrite_path(req: &mut Request, new_path: &str) {
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path.to_owned(),
    };
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query =
        Some(http::uri::PathAndQuery::try_from(path_and_query.as_str()).expect("rewritten path is valid"));
    *req.uri_mut() = Uri::from_parts(parts).expect("rewritten uri is valid");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::context;
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    async fn probe(req: Request) -> String {
        req.uri().path().to_owned()
    }

    fn app() -> Router {
        Router::new()
            .route("/api/v1/pods", get(probe))
            .layer(axum::middleware::from_fn(cluster_scope))
    }

    #[tokio::test]
    async fn strips_named_cluster_prefix_from_path() {
        let req = HttpRequest::builder()
            .uri("/clusters/root:org:foo/api/v1/pods")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/api/v1/pods");
    }

    #[tokio::test]
    async fn empty_header_resolves_to_local_admin() {
        async fn probe_cluster(req: Request) -> String {
            context(&req).cluster().map(|c| c.name().to_owned()).unwrap_or_default()
        }
        let app = Router::new()
            .route("/api/v1/pods", get(probe_cluster))
            .layer(axum::middleware::from_fn(cluster_scope));
        let req = HttpRequest::builder()
            .uri("/api/v1/pods")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"admin");
    }

    #[tokio::test]
    async fn invalid_cluster_name_is_bad_request() {
        let req = HttpRequest::builder()
            .uri("/clusters/Root/api/v1/pods")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
