//! 1. AcceptHeader (§4.B.1): stores `Accept` verbatim in the request context.

use axum::{extract::Request, middleware::Next, response::Response};
use http::header::ACCEPT;

use super::context_mut;

pub async fn accept_header(mut req: Request, next: Next) -> Response {
    let value = req
        .headers()
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    context_mut(&mut req).set_accept_header(value);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    #[tokio::test]
    async fn stores_accept_header_verbatim() {
        async fn probe(req: Request) -> String {
            super::super::context(&req).accept_header().to_owned()
        }
        let app = Router::new()
            .route("/", get(probe))
            .layer(axum::middleware::from_fn(accept_header));
        let req = HttpRequest::builder()
            .uri("/")
            .header(ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"application/json");
    }
}
