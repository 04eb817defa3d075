//! WebServer CRD for declaring a static-content web server
//!
//! A WebServer is compiled by the operator into a Deployment running nginx and
//! a LoadBalancer Service exposing it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// WebServer declares a replicated nginx serving a single page of content.
///
/// Example:
/// ```yaml
/// apiVersion: servers.cloudnativejp/v1beta1
/// kind: WebServer
/// metadata:
///   name: hello
///   namespace: default
/// spec:
///   replicas: 2
///   content: "Hello, world"
///   port:
///     http: 8080
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "servers.cloudnativejp",
    version = "v1beta1",
    kind = "WebServer",
    namespaced,
    shortname = "ws",
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Port","type":"integer","jsonPath":".spec.port.http"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WebServerSpec {
    /// Number of nginx pods to run
    #[schemars(range(min = 0))]
    pub replicas: i32,

    /// Page content written into index.html at container start
    #[serde(default)]
    pub content: String,

    /// Externally reachable port declaration
    pub port: WebServerPort,
}

/// Ports exposed by the WebServer's Service
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebServerPort {
    /// Service port forwarded to nginx's port 80
    #[schemars(range(min = 1, max = 65535))]
    pub http: i32,
}
