//! Kubernetes Events about WebServers
//!
//! The controller reports each change it makes to a dependent resource as an
//! Event on the owning WebServer, so `kubectl describe webserver <name>` shows
//! what was created or corrected and when.
//!
//! Publishing never fails from the caller's point of view. An Event is an
//! audit trail, not part of the desired state, so a rejected Event is logged
//! and the reconcile pass carries on.

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
#[cfg(any(test, feature = "testing"))]
use kube::runtime::events::EventType;
use kube::runtime::events::{Event, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Sink for Events regarding a Kubernetes object
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish `event` regarding the object `regarding` points at.
    ///
    /// `event.secondary` names the object the action was taken on, if any.
    async fn publish(&self, regarding: &ObjectReference, event: Event);
}

/// Publishes through the API server with kube-runtime's `Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Publisher reporting as `controller_name`.
    ///
    /// The reporting instance is the pod name from the downward API, when set.
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, regarding: &ObjectReference, event: Event) {
        let reason = event.reason.clone();
        if let Err(e) = self.recorder.publish(&event, regarding).await {
            warn!(
                %reason,
                regarding = regarding.name.as_deref().unwrap_or_default(),
                error = %e,
                "Failed to publish Kubernetes event"
            );
        }
    }
}

/// Drops every Event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _regarding: &ObjectReference, _event: Event) {}
}

/// Flattened view of an Event kept by [`RecordingEventPublisher`]
#[cfg(any(test, feature = "testing"))]
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent {
    /// Name of the object the event is about
    pub regarding: Option<String>,
    /// Kind of the object the event is about
    pub regarding_kind: Option<String>,
    /// Normal or Warning
    pub type_: EventType,
    /// Machine-readable reason
    pub reason: String,
    /// Action taken
    pub action: String,
    /// Human-readable message
    pub note: Option<String>,
    /// Kind of the object acted on, if any
    pub related_kind: Option<String>,
    /// Name of the object acted on, if any
    pub related_name: Option<String>,
}

/// Keeps every Event in memory, oldest first
#[cfg(any(test, feature = "testing"))]
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

#[cfg(any(test, feature = "testing"))]
impl RecordingEventPublisher {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordedEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of all events published so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    /// Events with the given reason
    pub fn with_reason(&self, reason: &str) -> Vec<RecordedEvent> {
        self.lock()
            .iter()
            .filter(|e| e.reason == reason)
            .cloned()
            .collect()
    }

    /// Forget all recorded events
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, regarding: &ObjectReference, event: Event) {
        let related = event.secondary.as_ref();
        let recorded = RecordedEvent {
            regarding: regarding.name.clone(),
            regarding_kind: regarding.kind.clone(),
            type_: event.type_,
            reason: event.reason,
            action: event.action,
            note: event.note,
            related_kind: related.and_then(|r| r.kind.clone()),
            related_name: related.and_then(|r| r.name.clone()),
        };
        self.lock().push(recorded);
    }
}

/// Reasons shown in the REASON column of `kubectl get events`
pub mod reasons {
    /// A dependent resource was created
    pub const CREATED: &str = "Created";
    /// A dependent resource's owned fields were brought back to the desired values
    pub const UPDATED: &str = "Updated";
}

/// Actions recorded on Events
pub mod actions {
    /// Creating a dependent resource
    pub const CREATE: &str = "Create";
    /// Updating a dependent resource
    pub const UPDATE: &str = "Update";
}
