//! Controller runner - builds the WebServer controller future
//!
//! The controller watches WebServers and the Deployments and Services they
//! own, so edits to a child re-trigger its WebServer.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::core::NamespaceResourceScope;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};

use webserver_common::crd::WebServer;
use webserver_controller::{error_policy, reconcile, WebServerContext};

use crate::config::OperatorConfig;

/// Api scoped to one namespace, or to all of them
fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Build the WebServer controller future
///
/// Runs until a shutdown signal is received.
pub fn build_webserver_controller(
    client: Client,
    config: &OperatorConfig,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let namespace = config.namespace.as_deref();
    let span = tracing::info_span!(
        "webserver_controller",
        namespace = namespace.unwrap_or("*")
    );
    let ctx = Arc::new(WebServerContext::from_client(
        client.clone(),
        config.requeue,
        span,
    ));

    let webservers: Api<WebServer> = scoped_api(client.clone(), namespace);
    let deployments: Api<Deployment> = scoped_api(client.clone(), namespace);
    let services: Api<Service> = scoped_api(client, namespace);
    let watcher = WatcherConfig::default().timeout(config.watch_timeout_secs);

    tracing::info!("- WebServer controller");

    Box::pin(
        Controller::new(webservers, watcher.clone())
            .owns(deployments, watcher.clone())
            .owns(services, watcher)
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("WebServer")),
    )
}

fn log_reconcile_result<T: Debug, E: Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(object) => tracing::debug!(?object, "{} reconciliation completed", controller_name),
            Err(e) => tracing::warn!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
