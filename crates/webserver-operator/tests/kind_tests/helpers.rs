//! Shared setup for cluster-backed tests

use std::future::Future;
use std::time::{Duration, Instant};

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::Client;

use webserver_common::crd::{WebServer, WebServerPort, WebServerSpec};
use webserver_common::kube_utils::create_client;
use webserver_operator::config::{Cli, OperatorConfig};
use webserver_operator::controller_runner::build_webserver_controller;
use webserver_operator::startup::ensure_crd_installed;

use clap::Parser;

/// How long to wait for the controller to converge
pub const CONVERGE_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A namespace with the controller running against it
pub struct TestEnv {
    pub client: Client,
    pub namespace: String,
    controller: tokio::task::JoinHandle<()>,
}

impl TestEnv {
    /// Install the CRD, create `namespace` and start a controller scoped to it
    pub async fn start(namespace: &str) -> TestEnv {
        let client = create_client(None)
            .await
            .expect("failed to connect to test cluster");
        ensure_crd_installed(&client)
            .await
            .expect("failed to install CRD");

        let namespaces: Api<Namespace> = Api::all(client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let _ = namespaces.create(&PostParams::default(), &ns).await;

        let cli = Cli::parse_from(["webserver-operator", "--namespace", namespace]);
        let config = OperatorConfig::from(&cli);
        let controller = tokio::spawn(build_webserver_controller(client.clone(), &config));

        TestEnv {
            client,
            namespace: namespace.to_string(),
            controller,
        }
    }

    pub fn webservers(&self) -> Api<WebServer> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    pub fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Stop the controller and delete the namespace
    pub async fn teardown(self) {
        self.controller.abort();
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let _ = namespaces
            .delete(&self.namespace, &DeleteParams::default())
            .await;
    }
}

/// A WebServer fixture
pub fn webserver(name: &str, replicas: i32, port: i32, content: &str) -> WebServer {
    WebServer::new(
        name,
        WebServerSpec {
            replicas,
            content: content.to_string(),
            port: WebServerPort { http: port },
        },
    )
}

/// Poll until `check` yields a value or [`CONVERGE_TIMEOUT`] passes
pub async fn eventually<T, F, Fut>(description: &str, mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    loop {
        if let Some(value) = check().await {
            return value;
        }
        if start.elapsed() > CONVERGE_TIMEOUT {
            panic!("timed out after {:?} waiting for {}", CONVERGE_TIMEOUT, description);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
