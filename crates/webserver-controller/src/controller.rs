//! WebServer reconcile orchestrator
//!
//! One pass: fetch the WebServer, compile its desired children, sync the
//! Deployment, then the Service. Nothing is carried between passes; every
//! decision is made from what the API server returns in that pass.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info_span, Instrument, Span};

use webserver_common::crd::WebServer;
use webserver_common::kube_utils::namespaced_name;
use webserver_common::{Error, EventPublisher, KubeEventPublisher, OPERATOR_NAME};

use crate::client::{WebServerKubeClient, WebServerKubeClientImpl};
use crate::compiler::compile;
use crate::sync::{ResourceSynchronizer, SyncOutcome};

/// Identity of the WebServer a reconcile pass is for
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NamespacedName {
    /// Namespace of the WebServer
    pub namespace: String,
    /// Name of the WebServer
    pub name: String,
}

impl NamespacedName {
    /// Create a request for `namespace/name`
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl From<&WebServer> for NamespacedName {
    fn from(webserver: &WebServer) -> Self {
        Self::new(webserver.namespace().unwrap_or_default(), webserver.name_any())
    }
}

/// Result of a successful reconcile pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The WebServer no longer exists; its children are left to the garbage collector
    InstanceGone,
    /// The WebServer is being deleted; nothing is created or corrected
    Terminating,
    /// Both children were brought to their desired state
    Synced {
        /// What happened to the Deployment
        deployment: SyncOutcome,
        /// What happened to the Service
        service: SyncOutcome,
    },
}

impl ReconcileOutcome {
    /// Whether the pass wrote anything to the cluster
    pub fn is_changed(&self) -> bool {
        match self {
            ReconcileOutcome::InstanceGone | ReconcileOutcome::Terminating => false,
            ReconcileOutcome::Synced {
                deployment,
                service,
            } => deployment.is_changed() || service.is_changed(),
        }
    }
}

/// A single-operation reconciler for one kind of request
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Drive the named instance toward its desired state.
    ///
    /// Errors are retryable; the caller decides when to try again.
    async fn reconcile(&self, request: &NamespacedName) -> Result<ReconcileOutcome, Error>;
}

/// Requeue delays applied by [`error_policy`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequeueConfig {
    /// Delay after any failure other than a conflict
    pub error_requeue: Duration,
    /// Delay after a resourceVersion conflict
    pub conflict_requeue: Duration,
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            error_requeue: Duration::from_secs(15),
            conflict_requeue: Duration::from_secs(1),
        }
    }
}

/// Shared state handed to every reconcile pass
pub struct WebServerContext {
    /// Cluster access
    pub kube: Arc<dyn WebServerKubeClient>,
    /// Event sink for changes to dependent resources
    pub events: Arc<dyn EventPublisher>,
    /// Requeue delays for failed passes
    pub requeue: RequeueConfig,
    /// Parent span for every reconcile pass
    pub span: Span,
}

impl WebServerContext {
    /// Create a new context with explicit dependencies
    pub fn new(
        kube: Arc<dyn WebServerKubeClient>,
        events: Arc<dyn EventPublisher>,
        requeue: RequeueConfig,
        span: Span,
    ) -> Self {
        Self {
            kube,
            events,
            requeue,
            span,
        }
    }

    /// Create a context backed by the API server
    pub fn from_client(client: Client, requeue: RequeueConfig, span: Span) -> Self {
        let events = Arc::new(KubeEventPublisher::new(client.clone(), OPERATOR_NAME));
        Self::new(
            Arc::new(WebServerKubeClientImpl::new(client)),
            events,
            requeue,
            span,
        )
    }

    /// Create a context for testing with the given cluster and event sink
    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn WebServerKubeClient>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::new(kube, events, RequeueConfig::default(), Span::none())
    }

    /// Reconciler sharing this context's dependencies
    pub fn reconciler(&self) -> WebServerReconciler {
        WebServerReconciler::new(self.kube.clone(), self.events.clone(), self.span.clone())
    }
}

/// Reconciles a WebServer into its Deployment and Service
pub struct WebServerReconciler {
    kube: Arc<dyn WebServerKubeClient>,
    events: Arc<dyn EventPublisher>,
    span: Span,
}

impl WebServerReconciler {
    /// Create a reconciler; each pass is logged under a child of `span`
    pub fn new(
        kube: Arc<dyn WebServerKubeClient>,
        events: Arc<dyn EventPublisher>,
        span: Span,
    ) -> Self {
        Self { kube, events, span }
    }

    async fn reconcile_pass(&self, request: &NamespacedName) -> Result<ReconcileOutcome, Error> {
        let Some(webserver) = self
            .kube
            .get_webserver(&request.name, &request.namespace)
            .await?
        else {
            debug!("webserver not found, nothing to do");
            return Ok(ReconcileOutcome::InstanceGone);
        };

        // Children of a terminating WebServer belong to the garbage collector
        if webserver.metadata.deletion_timestamp.is_some() {
            debug!("webserver is being deleted, leaving children to the garbage collector");
            return Ok(ReconcileOutcome::Terminating);
        }

        let desired = compile(&request.name, &request.namespace, &webserver.spec);
        let synchronizer =
            ResourceSynchronizer::new(self.kube.as_ref(), self.events.as_ref(), &webserver);

        // Deployment strictly first; a failure here leaves the Service untouched
        let deployment = synchronizer.sync(desired.deployment).await?;
        let service = synchronizer.sync(desired.service).await?;

        Ok(ReconcileOutcome::Synced {
            deployment,
            service,
        })
    }
}

#[async_trait]
impl Reconciler for WebServerReconciler {
    async fn reconcile(&self, request: &NamespacedName) -> Result<ReconcileOutcome, Error> {
        let span = info_span!(
            parent: &self.span,
            "reconcile",
            namespace = %request.namespace,
            name = %request.name
        );
        self.reconcile_pass(request).instrument(span).await
    }
}

// =============================================================================
// kube-runtime adapter
// =============================================================================

/// Reconcile a WebServer delivered by the controller runtime
///
/// Success waits for the next watch event; there is no periodic requeue.
pub async fn reconcile(
    webserver: Arc<WebServer>,
    ctx: Arc<WebServerContext>,
) -> Result<Action, Error> {
    let request = NamespacedName::from(webserver.as_ref());
    let outcome = ctx.reconciler().reconcile(&request).await?;
    debug!(
        parent: &ctx.span,
        webserver = %request,
        ?outcome,
        changed = outcome.is_changed(),
        "reconcile complete"
    );
    Ok(Action::await_change())
}

/// Decide when a failed WebServer is reconciled again
///
/// Every failure is retried. Conflicts mean another writer got in between
/// our read and write, so they come back quickly and quietly.
pub fn error_policy(webserver: Arc<WebServer>, error: &Error, ctx: Arc<WebServerContext>) -> Action {
    if error.is_conflict() {
        debug!(
            parent: &ctx.span,
            webserver = %namespaced_name(webserver.as_ref()),
            %error,
            "conflict during reconcile, requeueing"
        );
        return Action::requeue(ctx.requeue.conflict_requeue);
    }

    error!(
        parent: &ctx.span,
        webserver = %namespaced_name(webserver.as_ref()),
        ?error,
        "reconciliation failed"
    );
    Action::requeue(ctx.requeue.error_requeue)
}
