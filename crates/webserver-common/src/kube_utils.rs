//! Kubernetes client construction and small metadata helpers

use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource, ResourceExt};

use crate::Error;

/// Connect and read timeouts applied to every operator client
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientTimeouts {
    /// TCP connect timeout
    pub connect: Duration,
    /// Per-response read timeout. Watch timeouts must stay below it or idle
    /// watches fail with "body read timed out".
    pub read: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            read: Duration::from_secs(30),
        }
    }
}

/// Client for the cluster at `kubeconfig`, or the inferred cluster when `None`
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeouts(kubeconfig, ClientTimeouts::default()).await
}

/// Like [`create_client`] with explicit timeouts
pub async fn create_client_with_timeouts(
    kubeconfig: Option<&Path>,
    timeouts: ClientTimeouts,
) -> Result<Client, Error> {
    let mut config = load_config(kubeconfig).await?;
    config.connect_timeout = Some(timeouts.connect);
    config.read_timeout = Some(timeouts.read);

    Client::try_from(config).map_err(|e| Error::client(format!("failed to create client: {e}")))
}

/// Explicit file first; otherwise in-cluster, then `KUBECONFIG` / `~/.kube/config`
async fn load_config(kubeconfig: Option<&Path>) -> Result<Config, Error> {
    let Some(path) = kubeconfig else {
        return Config::infer()
            .await
            .map_err(|e| Error::client(format!("failed to infer config: {e}")));
    };

    let file = Kubeconfig::read_from(path).map_err(|e| {
        Error::client(format!(
            "failed to read kubeconfig {}: {e}",
            path.display()
        ))
    })?;
    Config::from_custom_kubeconfig(file, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::client(format!("failed to load kubeconfig {}: {e}", path.display())))
}

/// `namespace/name` of an object, for log fields
pub fn namespaced_name<K: Resource>(obj: &K) -> String {
    format!("{}/{}", obj.namespace().unwrap_or_default(), obj.name_any())
}
