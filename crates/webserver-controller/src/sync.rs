//! Resource synchronizer
//!
//! Brings one dependent resource to its desired state:
//!
//! 1. Fetch the live object by its deterministic name
//! 2. Absent: stamp the owner link, create, emit `Created`
//! 3. Present with drift in owned fields: converge them into the live object,
//!    replace it, emit `Updated`
//! 4. Present without drift: nothing is written and no Event is emitted
//!
//! Fetch, create and update failures are returned as-is.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::core::NamespaceResourceScope;
use kube::Resource;
use tracing::{debug, info, instrument};

use webserver_common::crd::WebServer;
use webserver_common::{Error, EventPublisher};

use crate::client::WebServerKubeClient;
use crate::drift;
use crate::ownership::{record_change, stamp_owner};

/// What a sync did to one dependent resource
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The resource did not exist and was created
    Created,
    /// Owned fields had drifted and were written back
    Updated,
    /// Owned fields already matched, nothing was written
    Unchanged,
}

impl SyncOutcome {
    /// Whether the cluster was written to
    pub fn is_changed(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged)
    }
}

/// A namespaced child kind the WebServer controller owns
///
/// Binds a kind to its client calls and to its owned-field comparison.
#[async_trait]
pub trait DependentResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Send + Sync + 'static
{
    /// Look the live object up; `None` when it does not exist
    async fn fetch(
        kube: &dyn WebServerKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error>;

    /// Create the object
    async fn create(kube: &dyn WebServerKubeClient, obj: &Self) -> Result<Self, Error>;

    /// Replace the object, guarded by its `resourceVersion`
    async fn update(kube: &dyn WebServerKubeClient, obj: &Self) -> Result<Self, Error>;

    /// Whether `live` differs from `self` in any owned field
    fn has_drifted(&self, live: &Self) -> bool;

    /// Copy owned fields from `self` into `live`
    fn apply_owned_fields(&self, live: &mut Self);
}

#[async_trait]
impl DependentResource for Deployment {
    async fn fetch(
        kube: &dyn WebServerKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error> {
        kube.get_deployment(name, namespace).await
    }

    async fn create(kube: &dyn WebServerKubeClient, obj: &Self) -> Result<Self, Error> {
        kube.create_deployment(obj).await
    }

    async fn update(kube: &dyn WebServerKubeClient, obj: &Self) -> Result<Self, Error> {
        kube.update_deployment(obj).await
    }

    fn has_drifted(&self, live: &Self) -> bool {
        drift::deployment_drifted(self, live)
    }

    fn apply_owned_fields(&self, live: &mut Self) {
        drift::converge_deployment(self, live)
    }
}

#[async_trait]
impl DependentResource for Service {
    async fn fetch(
        kube: &dyn WebServerKubeClient,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Self>, Error> {
        kube.get_service(name, namespace).await
    }

    async fn create(kube: &dyn WebServerKubeClient, obj: &Self) -> Result<Self, Error> {
        kube.create_service(obj).await
    }

    async fn update(kube: &dyn WebServerKubeClient, obj: &Self) -> Result<Self, Error> {
        kube.update_service(obj).await
    }

    fn has_drifted(&self, live: &Self) -> bool {
        drift::service_drifted(self, live)
    }

    fn apply_owned_fields(&self, live: &mut Self) {
        drift::converge_service(self, live)
    }
}

/// Syncs the dependent resources of a single WebServer
pub struct ResourceSynchronizer<'a> {
    kube: &'a dyn WebServerKubeClient,
    events: &'a dyn EventPublisher,
    owner: &'a WebServer,
}

impl<'a> ResourceSynchronizer<'a> {
    /// Create a synchronizer writing children owned by `owner`
    pub fn new(
        kube: &'a dyn WebServerKubeClient,
        events: &'a dyn EventPublisher,
        owner: &'a WebServer,
    ) -> Self {
        Self {
            kube,
            events,
            owner,
        }
    }

    /// Bring the live counterpart of `desired` in line with it
    #[instrument(
        skip_all,
        fields(
            kind = %K::kind(&()),
            resource = desired.meta().name.as_deref().unwrap_or_default()
        )
    )]
    pub async fn sync<K: DependentResource>(&self, mut desired: K) -> Result<SyncOutcome, Error> {
        let meta = desired.meta();
        let name = meta
            .name
            .clone()
            .ok_or_else(|| Error::missing_metadata(K::kind(&()), "name"))?;
        let namespace = meta
            .namespace
            .clone()
            .ok_or_else(|| Error::missing_metadata(K::kind(&()), "namespace"))?;

        let Some(mut live) = K::fetch(self.kube, &name, &namespace).await? else {
            stamp_owner(desired.meta_mut(), self.owner)?;
            info!(%namespace, %name, "creating dependent resource");
            let created = K::create(self.kube, &desired).await?;
            record_change(self.events, self.owner, SyncOutcome::Created, &created).await;
            return Ok(SyncOutcome::Created);
        };

        if !desired.has_drifted(&live) {
            debug!(%namespace, %name, "dependent resource in sync");
            return Ok(SyncOutcome::Unchanged);
        }

        desired.apply_owned_fields(&mut live);
        info!(%namespace, %name, "updating drifted dependent resource");
        let updated = K::update(self.kube, &live).await?;
        record_change(self.events, self.owner, SyncOutcome::Updated, &updated).await;
        Ok(SyncOutcome::Updated)
    }
}
