//! The front proxy's readiness loop (§4.F): poll `/readyz` on a 1 s cadence,
//! rebuilding the admin client from `admin.kubeconfig` every iteration since
//! the file can change while the child is still starting up.

use std::path::{Path, PathBuf};
use std::time::Duration;

use http::Request;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use workspace_client::config::{Config, KubeConfigOptions, Kubeconfig};
use workspace_client::Client;

use crate::process::ProxyProcess;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("readiness wait was canceled")]
    Canceled,
    #[error("proxy child exited before becoming ready: {0}")]
    ChildExited(std::process::ExitStatus),
    #[error("failed to check child exit status: {0}")]
    ChildStatus(#[source] std::io::Error),
    #[error("failed to read admin kubeconfig {path:?}: {source}")]
    ReadKubeconfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build admin client: {0}")]
    BuildClient(#[source] workspace_client::Error),
}

/// Poll `GET /readyz` on the client built from `admin_kubeconfig_path` every
/// second until it answers 200, the child exits, or `cancel` fires. The
/// kubeconfig is re-read from disk on each iteration since it can change
/// while the child is still starting up.
pub async fn wait_until_ready(
    child: &mut ProxyProcess,
    admin_kubeconfig_path: &Path,
    cancel: &CancellationToken,
) -> Result<(), ReadinessError> {
    loop {
        if cancel.is_cancelled() {
            return Err(ReadinessError::Canceled);
        }
        if let Some(status) = child.try_wait().map_err(ReadinessError::ChildStatus)? {
            return Err(ReadinessError::ChildExited(status));
        }

        match probe_once(admin_kubeconfig_path).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => tracing::debug!("readiness probe failed, retrying: {err}"),
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(ReadinessError::Canceled),
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }
    }
}

async fn probe_once(admin_kubeconfig_path: &Path) -> Result<bool, ReadinessError> {
    let raw = tokio::fs::read_to_string(admin_kubeconfig_path)
        .await
        .map_err(|source| ReadinessError::ReadKubeconfig {
            path: admin_kubeconfig_path.to_owned(),
            source,
        })?;
    let kubeconfig = Kubeconfig::from_yaml(&raw).map_err(|source| ReadinessError::BuildClient(source.into()))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(ReadinessError::BuildClient)?;
    let client = Client::try_from(config).map_err(ReadinessError::BuildClient)?;

    let request = Request::builder()
        .uri("/readyz")
        .body(Vec::new())
        .map_err(|e| ReadinessError::BuildClient(e.into()))?;

    match client.request_text(request).await {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}
