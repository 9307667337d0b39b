//! Command-line surface for `workspace-proxy` (§6: front-proxy CLI).

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "workspace-proxy", about = "Boots the workspace gateway's front proxy")]
pub struct Opts {
    /// Path to write the generated mapping file to.
    #[arg(long, default_value = "mapping.yaml")]
    pub mapping_file: PathBuf,

    /// Path to the root shard's admin kubeconfig.
    #[arg(long)]
    pub root_kubeconfig: PathBuf,

    /// Name of the root shard, used when deriving and minifying its admin client config.
    #[arg(long, default_value = "root")]
    pub shard_name: String,

    /// Additional shard to route to, as `name=path/to/admin.kubeconfig`. Repeatable;
    /// each becomes a `/clusters/<name>` mapping entry alongside the root shard.
    #[arg(long = "shard", value_parser = parse_shard)]
    pub shards: Vec<(String, PathBuf)>,

    /// Path to the client CA bundle the spawned proxy process verifies inbound mTLS against.
    #[arg(long)]
    pub client_ca_file: PathBuf,

    /// Path the generated serving certificate is written to.
    #[arg(long, default_value = "proxy.crt")]
    pub tls_cert_file: PathBuf,

    /// Path the generated serving private key is written to.
    #[arg(long, default_value = "proxy.key")]
    pub tls_private_key_file: PathBuf,

    /// Port the proxy process listens on.
    #[arg(long, default_value_t = 6443)]
    pub secure_port: u16,

    /// Path to the front-proxy binary to spawn.
    #[arg(long, default_value = "workspace-proxy-server")]
    pub proxy_binary: PathBuf,

    /// Directory the tee log, mapping file, and kubeconfig are written under.
    #[arg(long, default_value = ".")]
    pub state_dir: PathBuf,

    /// Kubeconfig written on readiness for end users to connect through the proxy.
    #[arg(long, default_value = "workspace.kubeconfig")]
    pub out_kubeconfig: PathBuf,

    /// Subject for the self-signed serving CA, when one isn't supplied externally.
    #[arg(long, default_value = "CN=workspace-gateway-ca")]
    pub serving_ca_subject: String,

    /// Additional arguments forwarded to the spawned proxy process unmodified.
    #[arg(last = true)]
    pub pass_through: Vec<String>,

    /// Keep tee'ing child stdout/stderr to the foreground even after readiness.
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_shard(raw: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got {raw:?}"))?;
    Ok((name.to_owned(), PathBuf::from(path)))
}
