//! 3. InClusterServiceAccountRewrite (§4.B.3): in-cluster service-account
//! tokens carry the cluster they were minted for in their JWT claims. When a
//! request arrives with no cluster header and no `/clusters/` prefix, this
//! layer reads that claim — without verifying the token's signature,
//! verification happens downstream — and prepends `/clusters/<name>` to the
//! path so the rest of the chain resolves the right workspace. Any failure
//! along the way (missing header, malformed token, absent claim) falls
//! through with the request unmodified.

use axum::{extract::Request, middleware::Next, response::Response};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use http::{header::AUTHORIZATION, Uri};
use serde_json::Value;

use super::CLUSTER_HEADER;

pub async fn in_cluster_service_account_rewrite(mut req: Request, next: Next) -> Response {
    if req.headers().contains_key(CLUSTER_HEADER) || req.uri().path().starts_with("/clusters/") {
        return next.run(req).await;
    }

    if let Some(cluster_name) = claimed_cluster_name(&req) {
        rewrite_path(&mut req, &cluster_name);
    }

    next.run(req).await
}

fn claimed_cluster_name(req: &Request) -> Option<String> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let claims = decode_claims(token)?;

    if let Some(name) = claims
        .get("kubernetes.io")
        .and_then(Value::as_object)
        .and_then(|ns| ns.get("clusterName"))
        .and_then(Value::as_str)
    {
        return Some(name.to_owned());
    }

    claims
        .get("kubernetes.io/serviceaccount/clusterName")
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn decode_claims(token: &str) -> Option<serde_json::Map<String, Value>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice::<Value>(&bytes).ok()?.as_object().cloned()
}

fn rewrite_path(req: &mut Request, cluster_name: &str) {
    let prefix = format!("/clusters/{cluster_name}");
    let new_path = format!("{prefix}{}", req.uri().path());
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{new_path}?{query}"),
        None => new_path,
    };
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query =
        Some(http::uri::PathAndQuery::try_from(path_and_query.as_str()).expect("rewritten path is valid"));
    if let Ok(uri) = Uri::from_parts(parts) {
        *req.uri_mut() = uri;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    fn jwt_with_cluster_name(name: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode(format!("{{\"kubernetes.io\":{{\"clusterName\":\"{name}\"}}}}"));
        format!("{header}.{payload}.sig")
    }

    #[tokio::test]
    async fn prepends_cluster_from_service_account_token() {
        async fn probe(req: Request) -> String {
            req.uri().path().to_owned()
        }
        let app = Router::new()
            .route("/api/v1/pods", get(probe))
            .layer(axum::middleware::from_fn(in_cluster_service_account_rewrite));
        let token = jwt_with_cluster_name("root:org:foo");
        let req = HttpRequest::builder()
            .uri("/api/v1/pods")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/clusters/root:org:foo/api/v1/pods");
    }

    #[tokio::test]
    async fn falls_through_unmodified_without_bearer_token() {
        async fn probe(req: Request) -> String {
            req.uri().path().to_owned()
        }
        let app = Router::new()
            .route("/api/v1/pods", get(probe))
            .layer(axum::middleware::from_fn(in_cluster_service_account_rewrite));
        let req = HttpRequest::builder().uri("/api/v1/pods").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"/api/v1/pods");
    }
}
