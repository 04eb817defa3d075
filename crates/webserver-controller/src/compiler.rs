//! Desired-state compiler
//!
//! Maps a [`WebServerSpec`] to the Deployment and Service that should exist for
//! it. Pure and deterministic: no I/O, no validation, the same input always
//! yields the same objects.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

use webserver_common::crd::WebServerSpec;
use webserver_common::{LABEL_MANAGED_BY, LABEL_MANAGED_BY_OPERATOR};

/// Label key shared by the Deployment selector, its pod template and the Service selector
pub const SELECTOR_LABEL: &str = "deployment";
/// Name of the nginx container in the pod template
pub const CONTAINER_NAME: &str = "nginx";
/// Image run by the nginx container
pub const CONTAINER_IMAGE: &str = "nginx";
/// Name of the single Service port
pub const HTTP_PORT_NAME: &str = "http-port";
/// Port nginx listens on inside the pod
pub const CONTAINER_HTTP_PORT: i32 = 80;
/// Service type used to expose the WebServer outside the cluster
pub const SERVICE_TYPE: &str = "LoadBalancer";

/// The dependent resources a WebServer should own
#[derive(Clone, Debug, PartialEq)]
pub struct DesiredState {
    /// nginx Deployment named `<name>-deployment`
    pub deployment: Deployment,
    /// LoadBalancer Service named `<name>-service`
    pub service: Service,
}

/// Name of the Deployment owned by the WebServer `name`
pub fn deployment_name(name: &str) -> String {
    format!("{}-deployment", name)
}

/// Name of the Service owned by the WebServer `name`
pub fn service_name(name: &str) -> String {
    format!("{}-service", name)
}

/// Compile the desired Deployment and Service for a WebServer.
///
/// Values are propagated as given; replica and port bounds are enforced by
/// the CRD schema, not here.
pub fn compile(name: &str, namespace: &str, spec: &WebServerSpec) -> DesiredState {
    let selector = selector_labels(name);
    DesiredState {
        deployment: compile_deployment(name, namespace, spec, &selector),
        service: compile_service(name, namespace, spec, &selector),
    }
}

/// Labels tying the pods to their Deployment and Service.
///
/// Built once per compile so selector and template can never disagree.
fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(SELECTOR_LABEL.to_string(), deployment_name(name))])
}

fn child_metadata(name: String, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        labels: Some(BTreeMap::from([(
            LABEL_MANAGED_BY.to_string(),
            LABEL_MANAGED_BY_OPERATOR.to_string(),
        )])),
        ..Default::default()
    }
}

fn compile_deployment(
    name: &str,
    namespace: &str,
    spec: &WebServerSpec,
    selector: &BTreeMap<String, String>,
) -> Deployment {
    Deployment {
        metadata: child_metadata(deployment_name(name), namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(CONTAINER_IMAGE.to_string()),
                        command: Some(startup_command(&spec.content)),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Shell command that writes the page and runs nginx in the foreground.
///
/// KNOWN LIMITATION: `content` is interpolated into the `sh -c` script without
/// escaping, so shell metacharacters in the spec are executed inside the pod.
/// Kept as-is until sanitization vs. a mounted ConfigMap is decided.
fn startup_command(content: &str) -> Vec<String> {
    vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        format!(
            "echo {} > /usr/share/nginx/html/index.html; nginx -g 'daemon off;'",
            content
        ),
    ]
}

fn compile_service(
    name: &str,
    namespace: &str,
    spec: &WebServerSpec,
    selector: &BTreeMap<String, String>,
) -> Service {
    Service {
        metadata: child_metadata(service_name(name), namespace),
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some(HTTP_PORT_NAME.to_string()),
                port: spec.port.http,
                target_port: Some(IntOrString::Int(CONTAINER_HTTP_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            selector: Some(selector.clone()),
            type_: Some(SERVICE_TYPE.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
