//! A basic HTTP client for talking to a Kubernetes-shaped API server.
//!
//! [`Client`] is deliberately thin: it performs a raw request and lets callers
//! decide how to interpret the response. The workspace gateway's front proxy
//! uses it as its admin client against the root shard, and its readiness loop
//! uses it to poll `/readyz`.
use bytes::Bytes;
use either::{Either, Left, Right};
use futures::{Stream, TryStreamExt};
use http::{self, Request, Response, StatusCode};
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as k8s_meta_v1;
pub use workspace_core::Status;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::{buffer::Buffer, util::BoxService, BoxError, Layer, Service, ServiceExt};
use tower_http::map_response_body::MapResponseBodyLayer;

use crate::{error::ErrorResponse, Config, Error, Result};

mod auth;
mod body;
mod builder;
pub(crate) use body::Body;
use body::IntoBodyDataStream;
mod config_ext;
pub use auth::Error as AuthError;
pub use config_ext::ConfigExt;
pub mod middleware;
pub mod retry;
#[cfg(feature = "rustls-tls")] mod tls;

#[cfg(feature = "rustls-tls")] pub use tls::rustls_tls::Error as RustlsTlsError;

pub use builder::{ClientBuilder, DynBody};

/// Client for talking to a Kubernetes-shaped API server.
///
/// The easiest way to instantiate the client is either by inferring the
/// configuration from the environment using [`Client::try_default`] or with
/// an existing [`Config`] using [`Client::try_from`].
#[derive(Clone)]
pub struct Client {
    // - `Buffer` for cheap clone
    // - `BoxService` for dynamic response future type
    inner: Buffer<BoxService<Request<Body>, Response<Body>, BoxError>, Request<Body>>,
    default_ns: String,
}

impl Client {
    /// Create a [`Client`] using a custom `Service` stack.
    ///
    /// [`ConfigExt`] provides extensions for building a custom stack. To
    /// create with the default stack from a [`Config`], use [`Client::try_from`].
    pub fn new<S, B, T>(service: S, default_namespace: T) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        T: Into<String>,
    {
        let service = MapResponseBodyLayer::new(|b: B| Body::wrap_body(b))
            .layer(service)
            .map_err(Into::into);
        Self {
            inner: Buffer::new(BoxService::new(service), 1024),
            default_ns: default_namespace.into(),
        }
    }

    /// Create and initialize a [`Client`] using the inferred configuration.
    ///
    /// Tries an in-cluster service-account configuration first, then falls
    /// back to a kubeconfig file.
    pub async fn try_default() -> Result<Self> {
        Self::try_from(Config::infer().await?)
    }

    pub(crate) fn default_ns(&self) -> &str {
        &self.default_ns
    }

    /// Perform a raw HTTP request against the API and return the raw response.
    ///
    /// Used by the front proxy to forward requests it doesn't otherwise
    /// interpret, e.g. while building the merged discovery document.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut svc = self.inner.clone();
        svc.ready()
            .await
            .map_err(Error::Service)?
            .call(request)
            .await
            .map_err(|err| {
                err.downcast::<Error>()
                    .map(|e| *e)
                    .unwrap_or_else(Error::Service)
            })
    }

    /// Perform a raw HTTP request against the API and deserialize the response as JSON.
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!("{}, {:?}", text, e);
            Error::SerdeError(e)
        })
    }

    /// Perform a raw HTTP request against the API and get back the response as a string.
    pub async fn request_text(&self, request: Request<Vec<u8>>) -> Result<String> {
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        let body_bytes = collect_body(res.into_body()).await?;
        let text = String::from_utf8(body_bytes.to_vec()).map_err(Error::FromUtf8)?;
        handle_api_errors(&text, status)?;
        Ok(text)
    }

    /// Perform a raw HTTP request against the API and get back a stream of bytes.
    pub async fn request_text_stream(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let res = self.send(request.map(Body::from)).await?;
        Ok(res.into_body().into_stream())
    }

    /// Perform a raw HTTP request against the API and get back either an object
    /// deserialized as JSON or a [`Status`] object.
    pub async fn request_status<T>(&self, request: Request<Vec<u8>>) -> Result<Either<T, Status>>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        let v: Value = serde_json::from_str(&text).map_err(Error::SerdeError)?;
        if v["kind"] == "Status" {
            tracing::trace!("Status from {}", text);
            Ok(Right(serde_json::from_str::<Status>(&text).map_err(|e| {
                tracing::warn!("{}, {:?}", text, e);
                Error::SerdeError(e)
            })?))
        } else {
            Ok(Left(serde_json::from_str::<T>(&text).map_err(|e| {
                tracing::warn!("{}, {:?}", text, e);
                Error::SerdeError(e)
            })?))
        }
    }
}

async fn collect_body(body: Body) -> Result<Bytes> {
    use http_body_util::BodyExt;
    Ok(body.collect().await?.to_bytes())
}

/// Low-level discovery methods using `k8s_openapi` types.
impl Client {
    /// Returns apiserver version.
    pub async fn apiserver_version(&self) -> Result<k8s_openapi::apimachinery::pkg::version::Info> {
        self.request(
            Request::builder()
                .uri("/version")
                .body(vec![])
                .map_err(Error::HttpError)?,
        )
        .await
    }

    /// Lists API groups that the apiserver serves.
    pub async fn list_api_groups(&self) -> Result<k8s_meta_v1::APIGroupList> {
        self.request(
            Request::builder()
                .uri("/apis")
                .body(vec![])
                .map_err(Error::HttpError)?,
        )
        .await
    }

    /// Lists resources served in a given API group version.
    pub async fn list_api_group_resources(&self, apiversion: &str) -> Result<k8s_meta_v1::APIResourceList> {
        let url = format!("/apis/{}", apiversion);
        self.request(Request::builder().uri(url).body(vec![]).map_err(Error::HttpError)?)
            .await
    }

    /// Lists versions of the `core` a.k.a. `""` legacy API group.
    pub async fn list_core_api_versions(&self) -> Result<k8s_meta_v1::APIVersions> {
        self.request(
            Request::builder()
                .uri("/api")
                .body(vec![])
                .map_err(Error::HttpError)?,
        )
        .await
    }

    /// Lists resources served in a particular `core` group version.
    pub async fn list_core_api_resources(&self, version: &str) -> Result<k8s_meta_v1::APIResourceList> {
        let url = format!("/api/{}", version);
        self.request(Request::builder().uri(url).body(vec![]).map_err(Error::HttpError)?)
            .await
    }
}

/// Kubernetes-shaped error handling.
///
/// Either the apiserver returned an explicit `Status` struct, or it somehow
/// returned something we couldn't parse as one. In either case, present an
/// `ErrorResponse` upstream; the latter is probably a bug if encountered.
fn handle_api_errors(text: &str, s: StatusCode) -> Result<()> {
    if s.is_client_error() || s.is_server_error() {
        if let Ok(errdata) = serde_json::from_str::<ErrorResponse>(text) {
            tracing::debug!("Unsuccessful: {:?}", errdata);
            Err(Error::Api(errdata))
        } else {
            tracing::warn!("Unsuccessful data error parse: {}", text);
            let ae = ErrorResponse {
                status: s.to_string(),
                code: s.as_u16(),
                message: format!("{:?}", text),
                reason: "Failed to parse error data".into(),
            };
            tracing::debug!("Unsuccessful: {:?} (reconstruct)", ae);
            Err(Error::Api(ae))
        }
    } else {
        Ok(())
    }
}

impl TryFrom<Config> for Client {
    type Error = Error;

    /// Builds a default [`Client`] from a [`Config`]; see [`ClientBuilder`] if more customization is required.
    fn try_from(config: Config) -> Result<Self> {
        Ok(ClientBuilder::try_from(config)?.build())
    }
}

#[cfg(test)]
mod tests {
    use futures::pin_mut;
    use http::{Request, Response};
    use tower_test::mock;

    use super::{body::Body, Client};

    #[tokio::test]
    async fn test_mock_roundtrip() {
        let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
        let spawned = tokio::spawn(async move {
            pin_mut!(handle);
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), http::Method::GET);
            assert_eq!(request.uri().to_string(), "/version");
            let info = k8s_openapi::apimachinery::pkg::version::Info {
                major: "1".into(),
                minor: "31".into(),
                ..Default::default()
            };
            send.send_response(
                Response::builder()
                    .body(Body::from(serde_json::to_vec(&info).unwrap()))
                    .unwrap(),
            );
        });

        let client = Client::new(mock_service, "default");
        let info = client.apiserver_version().await.unwrap();
        assert_eq!(info.major, "1");
        spawned.await.unwrap();
    }
}
