//! Exercises scenario S8 end to end: a stubbed `/readyz` answering 503 twice
//! then 200 must make the readiness loop succeed after the third poll, at
//! least 2 seconds after it started (the loop's 1 s cadence).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio_util::sync::CancellationToken;
use workspace_client::config::{AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext};
use workspace_proxy::process::{ProxyArgs, ProxyProcess};
use workspace_proxy::readiness;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let calls = Arc::new(AtomicUsize::new(0));
    let app_calls = calls.clone();
    let app = Router::new().route(
        "/readyz",
        get(move || {
            let calls = app_calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    axum::http::StatusCode::SERVICE_UNAVAILABLE
                } else {
                    axum::http::StatusCode::OK
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub readyz server crashed");
    });

    let kubeconfig_dir = tempfile::tempdir()?;
    let kubeconfig_path = kubeconfig_dir.path().join("readiness.kubeconfig");
    let kubeconfig = Kubeconfig {
        preferences: None,
        clusters: vec![NamedCluster {
            name: "stub".to_owned(),
            cluster: Some(Cluster {
                server: Some(format!("http://{addr}")),
                insecure_skip_tls_verify: Some(true),
                ..Default::default()
            }),
        }],
        auth_infos: vec![NamedAuthInfo {
            name: "stub".to_owned(),
            auth_info: Some(AuthInfo::default()),
        }],
        contexts: vec![NamedContext {
            name: "stub".to_owned(),
            context: Some(Context {
                cluster: "stub".to_owned(),
                user: "stub".to_owned(),
                namespace: None,
                extensions: None,
            }),
        }],
        current_context: Some("stub".to_owned()),
        extensions: None,
        kind: Some("Config".to_owned()),
        api_version: Some("v1".to_owned()),
    };
    std::fs::write(&kubeconfig_path, serde_yaml_string(&kubeconfig)?)?;

    let stub_child_binary = std::env::current_exe()?
        .parent()
        .expect("binary has a parent directory")
        .join("stub-child");
    let dummy = kubeconfig_path.clone();
    let mut child = ProxyProcess::spawn(
        ProxyArgs {
            binary: &stub_child_binary,
            mapping_file: &dummy,
            root_kubeconfig: &dummy,
            client_ca_file: &dummy,
            tls_cert_file: &dummy,
            tls_private_key_file: &dummy,
            secure_port: addr.port(),
            pass_through: &[],
        },
        &kubeconfig_dir.path().join("proxy.log"),
    )
    .await?;

    let cancel = CancellationToken::new();
    let started = std::time::Instant::now();
    readiness::wait_until_ready(&mut child, &kubeconfig_path, &cancel).await?;
    let elapsed = started.elapsed();

    child.kill().await?;

    let total_calls = calls.load(Ordering::SeqCst);
    assert!(total_calls >= 3, "expected at least 3 polls, got {total_calls}");
    assert!(
        elapsed >= std::time::Duration::from_secs(2),
        "expected readiness after >= 2s of 1s-cadence polling, took {elapsed:?}"
    );

    tracing::info!(?elapsed, total_calls, "readiness smoke test passed");
    Ok(())
}

fn serde_yaml_string(kubeconfig: &Kubeconfig) -> anyhow::Result<String> {
    Ok(serde_yaml::to_string(kubeconfig)?)
}
