use http::{request::Request, Uri};
use tower::{Layer, Service};

/// Layer that rewrites every request's scheme and authority to the configured cluster URL,
/// so callers can build requests with only a path and query.
#[derive(Clone)]
pub struct BaseUriLayer {
    uri: Uri,
}

impl BaseUriLayer {
    /// Create a new [`BaseUriLayer`] targeting `uri`.
    pub fn new(uri: Uri) -> Self {
        Self { uri }
    }
}

impl<S> Layer<S> for BaseUriLayer {
    type Service = BaseUri<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BaseUri {
            inner,
            uri: self.uri.clone(),
        }
    }
}

/// Service that rewrites every request's scheme and authority. See [`BaseUriLayer`].
#[derive(Clone)]
pub struct BaseUri<S> {
    inner: S,
    uri: Uri,
}

impl<S, ReqBody> Service<Request<ReqBody>> for BaseUri<S>
where
    S: Service<Request<ReqBody>>,
{
    type Error = S::Error;
    type Future = S::Future;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        let uri = &self.uri;
        let mut builder = Uri::builder();
        if let Some(scheme) = uri.scheme() {
            builder = builder.scheme(scheme.clone());
        }
        if let Some(authority) = uri.authority() {
            builder = builder.authority(authority.clone());
        }
        let path_and_query = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| "/".parse().expect("valid path"));
        parts.uri = builder
            .path_and_query(path_and_query)
            .build()
            .expect("base uri plus original path is a valid uri");
        self.inner.call(Request::from_parts(parts, body))
    }
}

#[cfg(test)]
mod tests {
    use http::Request;
    use tower::{Layer, ServiceExt};
    use tower_test::mock;

    use super::BaseUriLayer;

    #[tokio::test]
    async fn rewrites_scheme_and_authority() {
        let (service, mut handle) = mock::pair::<Request<()>, ()>();
        let mut service = BaseUriLayer::new("https://example.com:6443".parse().unwrap()).layer(service);

        let task = tokio::spawn(async move {
            service
                .ready()
                .await
                .unwrap()
                .call(Request::builder().uri("/api/v1/namespaces").body(()).unwrap())
                .await
        });

        let (req, send) = handle.next_request().await.unwrap();
        assert_eq!(req.uri(), "https://example.com:6443/api/v1/namespaces");
        send.send_response(());
        task.await.unwrap().unwrap();
    }
}
