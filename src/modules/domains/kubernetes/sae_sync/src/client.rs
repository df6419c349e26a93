/* Copyright (C) 2025 Pedro Henrique / phkaiser13
* File: src/modules/domains/kubernetes/sae_sync/src/client.rs
*
* Builds the Kubernetes client from the global connection flags: an explicit
* kubeconfig file and context when given, otherwise the usual inference
* (KUBECONFIG, ~/.kube/config, in-cluster service account).
*
* SPDX-License-Identifier: Apache-2.0 */

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    /// Overrides the namespace of the selected context.
    pub namespace: Option<String>,
}

/// A client plus the namespace commands fall back to.
#[derive(Clone)]
pub struct ClusterConnection {
    pub client: Client,
    pub default_namespace: String,
}

fn kubeconfig_options(options: &ConnectOptions) -> KubeConfigOptions {
    KubeConfigOptions {
        context: options.context.clone(),
        ..KubeConfigOptions::default()
    }
}

async fn load_config(options: &ConnectOptions) -> Result<Config> {
    let kc_options = kubeconfig_options(options);
    match &options.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &kc_options)
                .await
                .context("Failed to load Kubernetes config")
        }
        None if options.context.is_some() => Config::from_kubeconfig(&kc_options)
            .await
            .context("Failed to load Kubernetes config"),
        None => Config::infer().await.context("Failed to load Kubernetes config"),
    }
}

/// Connects to the cluster described by `options`.
pub async fn connect(options: &ConnectOptions) -> Result<ClusterConnection> {
    let config = load_config(options).await?;
    let default_namespace = options
        .namespace
        .clone()
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| config.default_namespace.clone());
    debug!("Connecting to {} (namespace {})", config.cluster_url, default_namespace);

    let client = Client::try_from(config).context("Failed to create Kubernetes client from config")?;
    Ok(ClusterConnection {
        client,
        default_namespace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: dev
  cluster:
    server: https://127.0.0.1:6443
- name: prod
  cluster:
    server: https://10.0.0.1:6443
contexts:
- name: dev
  context:
    cluster: dev
    user: admin
    namespace: sandbox
- name: prod
  context:
    cluster: prod
    user: admin
current-context: dev
users:
- name: admin
  user:
    token: secret
"#;

    fn write_kubeconfig() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), KUBECONFIG).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_config_uses_current_context() {
        let file = write_kubeconfig();
        let options = ConnectOptions {
            kubeconfig: Some(file.path().to_path_buf()),
            ..ConnectOptions::default()
        };
        let config = load_config(&options).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("127.0.0.1"));
        assert_eq!(config.default_namespace, "sandbox");
    }

    #[tokio::test]
    async fn test_load_config_honors_context_flag() {
        let file = write_kubeconfig();
        let options = ConnectOptions {
            kubeconfig: Some(file.path().to_path_buf()),
            context: Some("prod".to_string()),
            ..ConnectOptions::default()
        };
        let config = load_config(&options).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.1"));
        assert_eq!(config.default_namespace, "default");
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let options = ConnectOptions {
            kubeconfig: Some(PathBuf::from("/definitely/not/a/kubeconfig")),
            ..ConnectOptions::default()
        };
        assert!(load_config(&options).await.is_err());
    }
}
