//! 9. WildcardIdentity (§4.B.9): on wildcard list/watch requests only, splits
//! a `:<identity>` suffix off the resource-type path segment, records it in
//! the context, and rewrites the path to drop the suffix. An empty identity
//! after the colon is a hard error — the chain has no sensible fallback for
//! a caller asking for "the resource qualified by nothing".

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::{StatusCode, Uri};
use workspace_core::cluster::ResourceIdentity;

use super::{
    context, context_mut,
    wildcard_list_watch_guard::{is_resource_request, verb_of},
};

pub async fn wildcard_identity(mut req: Request, next: Next) -> Response {
    let is_wildcard = context(&req).cluster().map(|c| c.is_wildcard()).unwrap_or(false);
    let verb = verb_of(&req);
    if !is_wildcard || !is_resource_request(req.uri().path()) || (verb != "list" && verb != "watch") {
        return next.run(req).await;
    }

    let path = req.uri().path().to_owned();
    let Some((index, resource)) = resource_type_segment(&path) else {
        return next.run(req).await;
    };

    match ResourceIdentity::split(resource) {
        Ok((_, None)) => next.run(req).await,
        Ok((base, Some(identity))) => {
            context_mut(&mut req).set_identity(identity);
            let new_path = replace_segment(&path, index, base);
            rewrite_path(&mut req, &new_path);
            next.run(req).await
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "empty resource identity after ':'").into_response(),
    }
}

/// Locate the resource-type segment in a core or named-group API path:
/// `/api/v1/<resource>`, `/api/v1/namespaces/<ns>/<resource>`,
/// `/apis/<group>/<version>/<resource>`, or
/// `/apis/<group>/<version>/namespaces/<ns>/<resource>`.
fn resource_type_segment(path: &str) -> Option<(usize, &str)> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let base = match segments.first() {
        Some(&"api") => 2,
        Some(&"apis") => 3,
        _ => return None,
    };
    let index = if segments.get(base) == Some(&"namespaces") {
        base + 2
    } else {
        base
    };
    segments.get(index).map(|resource| (index, *resource))
}

fn replace_segment(path: &str, index: usize, replacement: &str) -> String {
    let mut segments: Vec<String> = path.trim_start_matches('/').split('/').map(str::to_owned).collect();
    segments[index] = replacement.to_owned();
    format!("/{}", segments.join("/"))
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
            .route("/api/v1/pods", get(probe))
            .layer(axum::middleware::from_fn(wildcard_identity))
            .layer(axum::middleware::from_fn(cluster_scope))
    }

    #[tokio::test]
    async fn strips_identity_suffix_on_wildcard_list() {
        let req = HttpRequest::builder()
            .uri("/clusters/%2A/api/v1/pods:idabc123")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/api/v1/pods");
    }

    #[tokio::test]
    async fn empty_identity_after_colon_is_hard_error() {
        let req = HttpRequest::builder()
            .uri("/clusters/%2A/api/v1/pods:")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn leaves_named_cluster_resource_untouched() {
        let req = HttpRequest::builder()
            .uri("/clusters/root:org:foo/api/v1/pods:idabc123")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        // not a wildcard request: axum never sees "pods:idabc123" as matching
        // the registered "/api/v1/pods" route, so this 404s instead of 200s.
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
