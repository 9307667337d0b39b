//! Orchestrates the front proxy's "on start" sequence (§4.F): write the
//! mapping file, derive the root shard's admin client, generate a serving
//! certificate, spawn the child process, tee its output, and wait for it to
//! report ready — then emit the end-user kubeconfig.

use std::path::{Path, PathBuf};

use base64::Engine;
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use workspace_client::config::Kubeconfig;

use crate::admin_client::{self, AdminConfigError};
use crate::cert::{self, CertError, ServingCa};
use crate::cli::Opts;
use crate::kubeconfig::{self, EmitterInput};
use crate::mapping::{Mapping, MappingEntry};
use crate::process::{ProcessError, ProxyArgs, ProxyProcess};
use crate::readiness::{self, ReadinessError};

#[derive(Debug, Error)]
pub enum BootError {
    #[error("deriving admin client for shard {0:?}: {1}")]
    AdminClient(String, #[source] AdminConfigError),
    #[error("minified kubeconfig for shard {shard:?} is missing its cluster or user entry")]
    IncompleteShardConfig { shard: String },
    #[error("generating serving certificate: {0}")]
    Cert(#[from] CertError),
    #[error("discovering local host IP: {0}")]
    HostIp(#[source] std::io::Error),
    #[error("writing mapping file: {0}")]
    WriteMapping(#[source] std::io::Error),
    #[error("writing file {path:?}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("spawning proxy process: {0}")]
    Spawn(#[from] ProcessError),
    #[error("waiting for proxy readiness: {0}")]
    Readiness(#[from] ReadinessError),
    #[error("writing end-user kubeconfig: {0}")]
    WriteKubeconfig(#[source] std::io::Error),
    #[error("serializing end-user kubeconfig: {0}")]
    SerializeKubeconfig(#[source] serde_yaml::Error),
}

/// Run the boot sequence to completion: success means the child is ready.
pub async fn run(opts: &Opts, cancel: CancellationToken) -> Result<(), BootError> {
    std::fs::create_dir_all(&opts.state_dir).map_err(|source| BootError::WriteFile {
        path: opts.state_dir.clone(),
        source,
    })?;

    let root = load_shard(&opts.shard_name, &opts.root_kubeconfig)?;
    let mut entries = vec![mapping_entry(&opts.shard_name, &root)?];
    for (name, path) in &opts.shards {
        let shard = load_shard(name, path)?;
        entries.push(mapping_entry(name, &shard)?);
    }
    let mapping = Mapping(entries);
    let mapping_path = opts.state_dir.join(&opts.mapping_file);
    mapping.write_to(&mapping_path).map_err(BootError::WriteMapping)?;

    let admin_kubeconfig_path = opts.state_dir.join("admin.kubeconfig");
    let admin_yaml = serde_yaml::to_string(&root).map_err(BootError::SerializeKubeconfig)?;
    std::fs::write(&admin_kubeconfig_path, admin_yaml).map_err(|source| BootError::WriteFile {
        path: admin_kubeconfig_path.clone(),
        source,
    })?;

    let host_ip = cert::local_host_ip().map_err(BootError::HostIp)?;
    let serving_ca = ServingCa::generate(&opts.serving_ca_subject)?;
    let serving_pair = serving_ca.sign_leaf("CN=workspace-proxy", &cert::serving_sans(host_ip))?;
    let cert_path = opts.state_dir.join(&opts.tls_cert_file);
    let key_path = opts.state_dir.join(&opts.tls_private_key_file);
    write_file(&cert_path, &serving_pair.cert_pem)?;
    write_file(&key_path, &serving_pair.key_pem)?;

    let tee_path = opts.state_dir.join("proxy.log");
    let mut child = ProxyProcess::spawn(
        ProxyArgs {
            binary: &opts.proxy_binary,
            mapping_file: &mapping_path,
            root_kubeconfig: &admin_kubeconfig_path,
            client_ca_file: &opts.client_ca_file,
            tls_cert_file: &cert_path,
            tls_private_key_file: &key_path,
            secure_port: opts.secure_port,
            pass_through: &opts.pass_through,
        },
        &tee_path,
    )
    .await?;

    let base_url: http::Uri = format!("https://localhost:{}/", opts.secure_port)
        .parse()
        .expect("constructed from a valid port is always a valid URI");

    let result = readiness::wait_until_ready(&mut child, &admin_kubeconfig_path, &cancel).await;

    if cancel.is_cancelled() {
        let _ = child.kill().await;
        return Err(BootError::Readiness(ReadinessError::Canceled));
    }
    result?;

    if !opts.verbose {
        child.stop_foreground_tee();
    }
    tracing::info!("workspace-proxy is ready on port {}", opts.secure_port);

    let (admin_cert_pem, admin_key_pem) = shard_admin_identity(&root, &opts.shard_name)?;
    let emitted = kubeconfig::emit(EmitterInput {
        server: base_url.to_string(),
        serving_ca_pem: serving_ca.cert_pem()?,
        admin_cert_pem,
        admin_key_pem,
    });
    let emitted_yaml = serde_yaml::to_string(&emitted).map_err(BootError::SerializeKubeconfig)?;
    std::fs::write(&opts.out_kubeconfig, emitted_yaml).map_err(BootError::WriteKubeconfig)?;

    Ok(())
}

fn load_shard(name: &str, path: &Path) -> Result<Kubeconfig, BootError> {
    admin_client::load_and_minify(name, path).map_err(|source| BootError::AdminClient(name.to_owned(), source))
}

fn mapping_entry(name: &str, minified: &Kubeconfig) -> Result<MappingEntry, BootError> {
    let cluster = minified
        .clusters
        .first()
        .and_then(|c| c.cluster.as_ref())
        .ok_or_else(|| BootError::IncompleteShardConfig { shard: name.to_owned() })?;
    let user = minified
        .auth_infos
        .first()
        .and_then(|u| u.auth_info.as_ref())
        .ok_or_else(|| BootError::IncompleteShardConfig { shard: name.to_owned() })?;

    let b64 = base64::engine::general_purpose::STANDARD;
    let decode = |data: &str| -> Result<String, BootError> {
        let bytes = b64
            .decode(data)
            .map_err(|_| BootError::IncompleteShardConfig { shard: name.to_owned() })?;
        String::from_utf8(bytes).map_err(|_| BootError::IncompleteShardConfig { shard: name.to_owned() })
    };

    let backend = cluster
        .server
        .clone()
        .ok_or_else(|| BootError::IncompleteShardConfig { shard: name.to_owned() })?;
    let backend_server_ca = decode(
        cluster
            .certificate_authority_data
            .as_deref()
            .ok_or_else(|| BootError::IncompleteShardConfig { shard: name.to_owned() })?,
    )?;
    let proxy_client_cert = decode(
        user.client_certificate_data
            .as_deref()
            .ok_or_else(|| BootError::IncompleteShardConfig { shard: name.to_owned() })?,
    )?;
    let proxy_client_key = decode(
        user.client_key_data
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or_else(|| BootError::IncompleteShardConfig { shard: name.to_owned() })?,
    )?;

    Ok(MappingEntry {
        path: format!("/clusters/{name}"),
        backend,
        backend_server_ca,
        proxy_client_cert,
        proxy_client_key,
    })
}

fn shard_admin_identity(minified: &Kubeconfig, shard: &str) -> Result<(String, String), BootError> {
    let entry = mapping_entry(shard, minified)?;
    Ok((entry.proxy_client_cert, entry.proxy_client_key))
}

fn write_file(path: &Path, contents: &str) -> Result<(), BootError> {
    std::fs::write(path, contents).map_err(|source| BootError::WriteFile {
        path: path.to_owned(),
        source,
    })
}
