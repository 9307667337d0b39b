//! 2. UserAgent (§4.B.2): stores `User-Agent` verbatim in the request context.

use axum::{extract::Request, middleware::Next, response::Response};
use http::header::USER_AGENT;

use super::context_mut;

pub async fn user_agent(mut req: Request, next: Next) -> Response {
    let value = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    context_mut(&mut req).set_user_agent(value);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use http::Request as HttpRequest;
    use tower::ServiceExt;

    #[tokio::test]
    async fn stores_user_agent_verbatim() {
        async fn probe(req: Request) -> String {
            super::super::context(&req).user_agent().to_owned()
        }
        let app = Router::new()
            .route("/", get(probe))
            .layer(axum::middleware::from_fn(user_agent));
        let req = HttpRequest::builder()
            .uri("/")
            .header(USER_AGENT, "kubectl/1.30")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let body = http_body_util::BodyExt::collect(res.into_body()).await.unwrap().to_bytes();
        assert_eq!(&body[..], b"kubectl/1.30");
    }
}
