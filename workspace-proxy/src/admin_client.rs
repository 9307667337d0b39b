//! Derives a minified admin kubeconfig for a named shard (§4.F step 2): load
//! the shard's full admin config, then drop every context/cluster/user but
//! the one the current context actually points at.

use thiserror::Error;
use workspace_client::config::{Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext};

#[derive(Debug, Error)]
pub enum AdminConfigError {
    #[error("admin kubeconfig for shard {shard:?} has no current-context")]
    NoCurrentContext { shard: String },
    #[error("admin kubeconfig for shard {shard:?} current-context {context:?} is not defined")]
    DanglingContext { shard: String, context: String },
    #[error("reading admin kubeconfig for shard {shard:?}: {source}")]
    Read {
        shard: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing admin kubeconfig for shard {shard:?}: {source}")]
    Parse {
        shard: String,
        #[source]
        source: workspace_client::config::ConfigError,
    },
}

/// Load `shard`'s admin kubeconfig and minify it: keep only the
/// current-context's cluster and user entry, dropping everything else.
pub fn load_and_minify(shard: &str, admin_kubeconfig_path: &std::path::Path) -> Result<Kubeconfig, AdminConfigError> {
    let raw = std::fs::read_to_string(admin_kubeconfig_path).map_err(|source| AdminConfigError::Read {
        shard: shard.to_owned(),
        source,
    })?;
    let kubeconfig = Kubeconfig::from_yaml(&raw).map_err(|source| AdminConfigError::Parse {
        shard: shard.to_owned(),
        source,
    })?;
    minify(shard, kubeconfig)
}

pub fn minify(shard: &str, kubeconfig: Kubeconfig) -> Result<Kubeconfig, AdminConfigError> {
    let current = kubeconfig
        .current_context
        .clone()
        .ok_or_else(|| AdminConfigError::NoCurrentContext { shard: shard.to_owned() })?;

    let named_context = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == current)
        .cloned()
        .ok_or_else(|| AdminConfigError::DanglingContext {
            shard: shard.to_owned(),
            context: current.clone(),
        })?;
    let context: &Context = named_context
        .context
        .as_ref()
        .ok_or_else(|| AdminConfigError::DanglingContext {
            shard: shard.to_owned(),
            context: current.clone(),
        })?;

    let cluster: Vec<NamedCluster> = kubeconfig
        .clusters
        .into_iter()
        .filter(|c| c.name == context.cluster)
        .collect();
    let auth_info: Vec<NamedAuthInfo> = kubeconfig
        .auth_infos
        .into_iter()
        .filter(|u| u.name == context.user)
        .collect();
    let contexts: Vec<NamedContext> = vec![named_context.clone()];

    Ok(Kubeconfig {
        preferences: None,
        clusters: cluster,
        auth_infos: auth_info,
        contexts,
        current_context: Some(current),
        extensions: None,
        kind: kubeconfig.kind,
        api_version: kubeconfig.api_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_kubeconfig() -> Kubeconfig {
        Kubeconfig::from_yaml(
            r#"
apiVersion: v1
kind: Config
current-context: root
clusters:
- name: root
  cluster:
    server: https://root-shard:6443
- name: org-a
  cluster:
    server: https://org-a-shard:6443
contexts:
- name: root
  context:
    cluster: root
    user: root-admin
- name: org-a
  context:
    cluster: org-a
    user: org-a-admin
users:
- name: root-admin
  user:
    token: root-token
- name: org-a-admin
  user:
    token: org-a-token
"#,
        )
        .unwrap()
    }

    #[test]
    fn minify_keeps_only_current_context_triple() {
        let minified = minify("root", full_kubeconfig()).unwrap();
        assert_eq!(minified.clusters.len(), 1);
        assert_eq!(minified.clusters[0].name, "root");
        assert_eq!(minified.auth_infos.len(), 1);
        assert_eq!(minified.auth_infos[0].name, "root-admin");
        assert_eq!(minified.contexts.len(), 1);
        assert_eq!(minified.current_context.as_deref(), Some("root"));
    }

    #[test]
    fn minify_rejects_missing_current_context() {
        let mut kubeconfig = full_kubeconfig();
        kubeconfig.current_context = None;
        let err = minify("root", kubeconfig).unwrap_err();
        assert!(matches!(err, AdminConfigError::NoCurrentContext { .. }));
    }
}
