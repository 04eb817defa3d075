//! CRD rendering and installation
//!
//! The operator can install its own CRD on startup using server-side apply,
//! so the schema in the cluster always matches the operator version.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use webserver_common::crd::WebServer;
use webserver_common::OPERATOR_NAME;

/// The WebServer CRD as a YAML manifest
pub fn crd_yaml() -> anyhow::Result<String> {
    serde_yaml::to_string(&WebServer::crd())
        .map_err(|e| anyhow::anyhow!("failed to serialize WebServer CRD: {}", e))
}

/// Ensure the WebServer CRD is installed and current
pub async fn ensure_crd_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(OPERATOR_NAME).force();
    let name = WebServer::crd_name();

    tracing::info!(crd = name, "Installing WebServer CRD...");
    crds.patch(name, &params, &Patch::Apply(&WebServer::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", name, e))?;
    tracing::info!(crd = name, "WebServer CRD installed/updated");

    Ok(())
}
