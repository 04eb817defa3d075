//! Drift detection and convergence over owned fields
//!
//! The API server fills in defaults (`imagePullPolicy`, `clusterIP`,
//! `nodePort`, ...) and status, so whole-object equality would report drift on
//! every pass. Each dependent kind instead has an explicit owned subset:
//!
//! | Kind | Owned fields |
//! |------|--------------|
//! | Deployment | `spec.replicas`, `spec.selector.matchLabels`, our pod-template labels, our container's `image` and `command` |
//! | Service | `spec.selector`, `spec.type`, first port's `name`/`port`/`targetPort`/`protocol` |
//!
//! `*_drifted` reads only those fields. `converge_*` writes only those fields
//! into the live object and leaves everything else as the server returned it.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, Service, ServicePort, ServiceSpec};

/// Whether the live Deployment's owned fields differ from the desired ones
pub fn deployment_drifted(desired: &Deployment, live: &Deployment) -> bool {
    let Some(want) = desired.spec.as_ref() else {
        return false;
    };
    let Some(have) = live.spec.as_ref() else {
        return true;
    };

    want.replicas != have.replicas
        || want.selector.match_labels != have.selector.match_labels
        || !labels_contained(template_labels(want), template_labels(have))
        || containers_drifted(containers(want), containers(have))
}

/// Copy the desired Deployment's owned fields into the live object
pub fn converge_deployment(desired: &Deployment, live: &mut Deployment) {
    let Some(want) = desired.spec.as_ref() else {
        return;
    };
    let Some(have) = live.spec.as_mut() else {
        live.spec = Some(want.clone());
        return;
    };

    have.replicas = want.replicas;
    have.selector.match_labels = want.selector.match_labels.clone();

    if let Some(labels) = template_labels(want) {
        let meta = have.template.metadata.get_or_insert_with(Default::default);
        let live_labels = meta.labels.get_or_insert_with(BTreeMap::new);
        for (key, value) in labels {
            live_labels.insert(key.clone(), value.clone());
        }
    }

    let Some(want_pod) = want.template.spec.as_ref() else {
        return;
    };
    let have_pod = have
        .template
        .spec
        .get_or_insert_with(|| want_pod.clone());
    for container in &want_pod.containers {
        match have_pod
            .containers
            .iter_mut()
            .find(|c| c.name == container.name)
        {
            Some(live_container) => {
                live_container.image = container.image.clone();
                live_container.command = container.command.clone();
            }
            None => have_pod.containers.push(container.clone()),
        }
    }
}

/// Whether the live Service's owned fields differ from the desired ones
///
/// Only the first port is compared, positionally.
pub fn service_drifted(desired: &Service, live: &Service) -> bool {
    let Some(want) = desired.spec.as_ref() else {
        return false;
    };
    let Some(have) = live.spec.as_ref() else {
        return true;
    };

    want.selector != have.selector
        || want.type_ != have.type_
        || match (first_port(want), first_port(have)) {
            (Some(w), Some(h)) => port_drifted(w, h),
            (Some(_), None) => true,
            (None, _) => false,
        }
}

/// Copy the desired Service's owned fields into the live object
///
/// The first live port is overwritten in place so its server-assigned
/// `nodePort` survives. Additional live ports are left alone.
pub fn converge_service(desired: &Service, live: &mut Service) {
    let Some(want) = desired.spec.as_ref() else {
        return;
    };
    let Some(have) = live.spec.as_mut() else {
        live.spec = Some(want.clone());
        return;
    };

    have.selector = want.selector.clone();
    have.type_ = want.type_.clone();

    let Some(want_port) = first_port(want) else {
        return;
    };
    let ports = have.ports.get_or_insert_with(Vec::new);
    match ports.first_mut() {
        Some(live_port) => {
            live_port.name = want_port.name.clone();
            live_port.port = want_port.port;
            live_port.target_port = want_port.target_port.clone();
            live_port.protocol = want_port.protocol.clone();
        }
        None => ports.push(want_port.clone()),
    }
}

fn template_labels(spec: &DeploymentSpec) -> Option<&BTreeMap<String, String>> {
    spec.template.metadata.as_ref()?.labels.as_ref()
}

fn containers(spec: &DeploymentSpec) -> &[Container] {
    spec.template
        .spec
        .as_ref()
        .map(|pod| pod.containers.as_slice())
        .unwrap_or_default()
}

/// Every desired label is present on the live object with the same value.
///
/// Extra live labels are tolerated.
fn labels_contained(
    want: Option<&BTreeMap<String, String>>,
    have: Option<&BTreeMap<String, String>>,
) -> bool {
    let Some(want) = want else {
        return true;
    };
    want.iter()
        .all(|(key, value)| have.and_then(|h| h.get(key)) == Some(value))
}

/// Each desired container exists by name with the desired image and command
fn containers_drifted(want: &[Container], have: &[Container]) -> bool {
    want.iter().any(|w| {
        match have.iter().find(|h| h.name == w.name) {
            Some(h) => h.image != w.image || h.command != w.command,
            None => true,
        }
    })
}

fn first_port(spec: &ServiceSpec) -> Option<&ServicePort> {
    spec.ports.as_ref()?.first()
}

fn port_drifted(want: &ServicePort, have: &ServicePort) -> bool {
    want.name != have.name
        || want.port != have.port
        || want.target_port != have.target_port
        || want.protocol != have.protocol
}
