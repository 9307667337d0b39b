//! 7. WorkspaceProjection (§4.B.7): projects the virtual `ClusterWorkspace`
//! resource into every workspace's URL space by rewriting requests under
//! `/apis/tenancy.kcp.dev/v1beta1/workspaces/…` to the services path the
//! workspace-type machinery actually serves from, except for the root
//! workspace's `~` home-lookup shorthand.

use axum::{extract::Request, middleware::Next, response::Response};
use http::Uri;
use workspace_core::cluster::ROOT;

use super::context_mut;

const WORKSPACES_BASE: &str = "/apis/tenancy.kcp.dev/v1beta1/workspaces";

pub async fn workspace_projection(mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if let Some(cluster) = context_mut(&mut req).cluster().map(|c| c.name().to_owned()) {
        let prefix = format!("{WORKSPACES_BASE}/");
        let is_home_lookup = path == format!("{WORKSPACES_BASE}/~");
        if path.starts_with(&prefix) && !(cluster == ROOT && is_home_lookup) {
            let new_path = format!("/services/workspaces/{cluster}/all{path}");
            rewrite_path(&mut req, &new_path);
        }
    }
    next.run(req).await
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
    use crate::middleware::cluster_scope;
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    async fn probe(req: Request) -> String {
        req.uri().path().to_owned()
    }

    fn app() -> Router {
        Router::new()
            .route("/services/workspaces/*rest", get(probe))
            .layer(axum::middleware::from_fn(workspace_projection))
            .layer(axum::middleware::from_fn(cluster_scope))
    }

    #[tokio::test]
    async fn projects_into_services_path_for_named_cluster() {
        let req = HttpRequest::builder()
            .uri("/clusters/root:org:foo/apis/tenancy.kcp.dev/v1beta1/workspaces/foo")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::OK);
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(
            &body[..],
            b"/services/workspaces/root:org:foo/all/apis/tenancy.kcp.dev/v1beta1/workspaces/foo"
        );
    }

    #[tokio::test]
    async fn root_home_lookup_is_not_projected() {
        let req = HttpRequest::builder()
            .uri("/clusters/root/apis/tenancy.kcp.dev/v1beta1/workspaces/~")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
    }
}
