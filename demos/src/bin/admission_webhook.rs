use axum::{response::IntoResponse, routing::post, Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::*;
use workspace_core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    workspace::ClusterWorkspace,
    ResourceExt,
};

/// Stands up the `ClusterWorkspace` admission webhook described in §4.E,
/// terminating TLS with the cert/key pair supplied by the cluster's
/// `MutatingWebhookConfiguration`/`ValidatingWebhookConfiguration`.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .route("/mutate", post(mutate_handler))
        .route("/validate", post(validate_handler))
        .layer(TraceLayer::new_for_http().make_span_with(tower_http::trace::DefaultMakeSpan::new().level(Level::INFO)));

    let addr = std::env::var("WEBHOOK_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8443".to_string());
    let tls_cert = std::env::var("WEBHOOK_TLS_CERT").unwrap_or_else(|_| "webhook-tls.crt".to_string());
    let tls_key = std::env::var("WEBHOOK_TLS_KEY").unwrap_or_else(|_| "webhook-tls.key".to_string());

    axum_server::bind_rustls(
        addr.parse::<SocketAddr>().expect("WEBHOOK_BIND_ADDR must be a socket address"),
        RustlsConfig::from_pem_file(&tls_cert, &tls_key)
            .await
            .expect("failed to load webhook TLS material"),
    )
    .serve(app.into_make_service())
    .await
    .expect("webhook server exited");
}

/// Mutating webhook endpoint: stamps the owner annotation on create.
async fn mutate_handler(
    Json(body): Json<AdmissionReview<ClusterWorkspace>>,
) -> impl IntoResponse {
    let req: AdmissionRequest<_> = match body.try_into() {
        Ok(req) => req,
        Err(err) => {
            error!("invalid admission request: {err}");
            return Json(AdmissionResponse::invalid(err.to_string()).into_review());
        }
    };

    let name = req.object.as_ref().map(|obj| obj.name()).unwrap_or_default();
    let res = workspace_admission::admit(&req);
    info!("mutate {:?} on clusterworkspace/{name}", req.operation);
    Json(res.into_review())
}

/// Validating webhook endpoint: runs every invariant rule and denies on the
/// first violation, per §4.E "Validate".
async fn validate_handler(
    Json(body): Json<AdmissionReview<ClusterWorkspace>>,
) -> impl IntoResponse {
    let req: AdmissionRequest<_> = match body.try_into() {
        Ok(req) => req,
        Err(err) => {
            error!("invalid admission request: {err}");
            return Json(AdmissionResponse::invalid(err.to_string()).into_review());
        }
    };

    let name = req.object.as_ref().map(|obj| obj.name()).unwrap_or_default();
    let res = workspace_admission::validation_response(&req);
    if res.allowed {
        info!("allowed {:?} on clusterworkspace/{name}", req.operation);
    } else {
        warn!("denied {:?} on clusterworkspace/{name}", req.operation);
    }
    Json(res.into_review())
}
