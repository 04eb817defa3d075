//! WebServer reconciliation core
//!
//! Drives each `WebServer` toward its declared state by owning one nginx
//! Deployment and one LoadBalancer Service:
//! - [`compiler`] derives the desired Deployment and Service from the spec
//! - [`drift`] compares and converges only the fields this controller owns
//! - [`sync`] fetches, creates or updates each dependent resource
//! - [`ownership`] links children to their WebServer and emits Events
//! - [`controller`] sequences a reconcile pass and adapts it to kube-runtime

#![deny(missing_docs)]

pub mod client;
pub mod compiler;
pub mod controller;
pub mod drift;
pub mod ownership;
pub mod sync;


pub use client::{WebServerKubeClient, WebServerKubeClientImpl};
pub use compiler::{compile, DesiredState};
pub use controller::{
    error_policy, reconcile, NamespacedName, ReconcileOutcome, Reconciler, RequeueConfig,
    WebServerContext, WebServerReconciler,
};
pub use sync::{DependentResource, ResourceSynchronizer, SyncOutcome};
