//! Kubernetes API seam for the WebServer controller
//!
//! Everything the reconcile pass reads or writes goes through
//! [`WebServerKubeClient`], so tests can swap in a mock or an in-memory cluster.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};
#[cfg(test)]
use mockall::automock;

use webserver_common::crd::WebServer;
use webserver_common::Error;

/// Trait abstracting Kubernetes client operations for WebServer reconciliation
///
/// Lookups return `Ok(None)` when the object does not exist. Updates replace
/// the whole object and carry its `resourceVersion`, so a concurrent write
/// fails with a 409 conflict instead of being overwritten.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebServerKubeClient: Send + Sync {
    /// Get a WebServer by name and namespace
    async fn get_webserver(&self, name: &str, namespace: &str)
        -> Result<Option<WebServer>, Error>;

    /// Get a Deployment by name and namespace
    async fn get_deployment(&self, name: &str, namespace: &str)
        -> Result<Option<Deployment>, Error>;

    /// Create a Deployment in the namespace named by its metadata
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, Error>;

    /// Replace a Deployment, guarded by its `resourceVersion`
    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, Error>;

    /// Get a Service by name and namespace
    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error>;

    /// Create a Service in the namespace named by its metadata
    async fn create_service(&self, service: &Service) -> Result<Service, Error>;

    /// Replace a Service, guarded by its `resourceVersion`
    async fn update_service(&self, service: &Service) -> Result<Service, Error>;
}

/// Real Kubernetes client implementation
pub struct WebServerKubeClientImpl {
    client: Client,
}

impl WebServerKubeClientImpl {
    /// Create a new WebServerKubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Namespaced Api for an object about to be written, plus its name
    fn api_for<K>(&self, obj: &K, kind: &str) -> Result<(Api<K>, String), Error>
    where
        K: Resource<Scope = kube::core::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        let meta = obj.meta();
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::missing_metadata(kind, "name"))?;
        let namespace = meta
            .namespace
            .as_deref()
            .ok_or_else(|| Error::missing_metadata(kind, "namespace"))?;
        Ok((Api::namespaced(self.client.clone(), namespace), name))
    }
}

#[async_trait]
impl WebServerKubeClient for WebServerKubeClientImpl {
    async fn get_webserver(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<WebServer>, Error> {
        let api: Api<WebServer> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, Error> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, Error> {
        let (api, _) = self.api_for(deployment, "Deployment")?;
        Ok(api.create(&PostParams::default(), deployment).await?)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment, Error> {
        let (api, name) = self.api_for(deployment, "Deployment")?;
        Ok(api.replace(&name, &PostParams::default(), deployment).await?)
    }

    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_service(&self, service: &Service) -> Result<Service, Error> {
        let (api, _) = self.api_for(service, "Service")?;
        Ok(api.create(&PostParams::default(), service).await?)
    }

    async fn update_service(&self, service: &Service) -> Result<Service, Error> {
        let (api, name) = self.api_for(service, "Service")?;
        Ok(api.replace(&name, &PostParams::default(), service).await?)
    }
}
