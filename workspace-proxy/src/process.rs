//! Spawns the front-proxy child process (§4.F step 4) and tees its merged
//! stdout/stderr through a *head writer*: a sink that forwards lines to the
//! foreground log and, independently, to a tee file on disk.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {binary:?}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("child process has no stdout/stderr pipe")]
    MissingPipe,
    #[error("failed to open tee file {path:?}: {source}")]
    OpenTeeFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("child process exited with {0}")]
    ExitStatus(std::process::ExitStatus),
}

/// Arguments the front proxy is always launched with, per §4.F step 4.
pub struct ProxyArgs<'a> {
    pub binary: &'a Path,
    pub mapping_file: &'a Path,
    pub root_kubeconfig: &'a Path,
    pub client_ca_file: &'a Path,
    pub tls_cert_file: &'a Path,
    pub tls_private_key_file: &'a Path,
    pub secure_port: u16,
    pub pass_through: &'a [String],
}

/// A spawned front-proxy child, with its stdout/stderr tee task already running.
pub struct ProxyProcess {
    child: Child,
    tee_handle: tokio::task::JoinHandle<()>,
    foreground: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl ProxyProcess {
    /// Spawn the proxy binary and start tee'ing its merged stdout/stderr.
    ///
    /// `tee_path` receives every line unconditionally. `foreground` also
    /// receives every line until `stop_foreground_tee` is called, matching
    /// the "stop tee'ing to the foreground on readiness" rule in §4.F.
    pub async fn spawn(args: ProxyArgs<'_>, tee_path: &Path) -> Result<Self, ProcessError> {
        let mut command = Command::new(args.binary);
        command
            .arg("--mapping-file")
            .arg(args.mapping_file)
            .arg("--root-kubeconfig")
            .arg(args.root_kubeconfig)
            .arg("--client-ca-file")
            .arg(args.client_ca_file)
            .arg("--tls-cert-file")
            .arg(args.tls_cert_file)
            .arg("--tls-private-key-file")
            .arg(args.tls_private_key_file)
            .arg(format!("--secure-port={}", args.secure_port))
            .args(args.pass_through)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            binary: args.binary.display().to_string(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or(ProcessError::MissingPipe)?;
        let stderr = child.stderr.take().ok_or(ProcessError::MissingPipe)?;
        let tee_file = tokio::fs::File::create(tee_path)
            .await
            .map_err(|source| ProcessError::OpenTeeFile {
                path: tee_path.to_owned(),
                source,
            })?;
        let foreground = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));

        let tee_handle = tokio::spawn(tee_merged(stdout, stderr, tee_file, foreground.clone()));

        Ok(ProxyProcess {
            child,
            tee_handle,
            foreground,
        })
    }

    /// Stop forwarding child output to the foreground log; the tee file keeps
    /// receiving every line regardless. Called once the readiness loop succeeds.
    pub fn stop_foreground_tee(&self) {
        self.foreground.store(false, std::sync::atomic::Ordering::Relaxed);
    }

    /// Block until the child exits, returning an error for a nonzero status.
    pub async fn wait(&mut self) -> Result<(), ProcessError> {
        let status = self.child.wait().await.map_err(|source| ProcessError::Spawn {
            binary: "<child>".to_owned(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::ExitStatus(status))
        }
    }

    /// Non-blocking check for exit, used by the readiness loop each iteration.
    pub fn try_wait(&mut self) -> std::io::Result<Option<std::process::ExitStatus>> {
        self.child.try_wait()
    }

    /// Kill the child immediately, matching §5's "kill-on-cancel is mandatory".
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()?;
        let _ = self.child.wait().await;
        self.tee_handle.abort();
        Ok(())
    }
}

async fn tee_merged(
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
    mut tee_file: tokio::fs::File,
    foreground: std::sync::Arc<std::sync::atomic::AtomicBool>,
) {
    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    loop {
        tokio::select! {
            line = stdout_lines.next_line() => {
                match line {
                    Ok(Some(line)) => emit(&mut tee_file, &foreground, &line).await,
                    _ => break,
                }
            }
            line = stderr_lines.next_line() => {
                match line {
                    Ok(Some(line)) => emit(&mut tee_file, &foreground, &line).await,
                    _ => break,
                }
            }
            else => break,
        }
    }
}

async fn emit(tee_file: &mut tokio::fs::File, foreground: &std::sync::atomic::AtomicBool, line: &str) {
    if foreground.load(std::sync::atomic::Ordering::Relaxed) {
        tracing::info!(target: "workspace_proxy::child", "{line}");
    }
    let _ = tee_file.write_all(line.as_bytes()).await;
    let _ = tee_file.write_all(b"\n").await;
}
