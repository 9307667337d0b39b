//! `workspace-proxy`: boots the workspace gateway's front proxy (§4.F).

use clap::Parser;
use tokio_util::sync::CancellationToken;
use workspace_proxy::{boot, cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = cli::Opts::parse();
    let cancel = CancellationToken::new();

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            ctrl_c_cancel.cancel();
        }
    });

    boot::run(&opts, cancel).await?;

    Ok(())
}
