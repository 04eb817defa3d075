//! Stories about the life of a WebServer and the children it owns

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Service};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use serde_json::json;

use super::helpers::{eventually, webserver, TestEnv};

/// Story: A user creates a WebServer and gets an nginx Deployment and a Service
///
/// Expected behavior:
/// - `<name>-deployment` runs the requested replicas with the page content
/// - `<name>-service` exposes the requested port as a LoadBalancer
/// - both children are controlled by the WebServer
/// - one `Created` Event per child is recorded on the WebServer
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test -p webserver-operator --test kind -- --ignored"]
async fn story_user_creates_webserver() {
    let env = TestEnv::start("ws-e2e-create").await;
    env.webservers()
        .create(&PostParams::default(), &webserver("hello", 2, 8080, "hello"))
        .await
        .expect("failed to create WebServer");

    let deployments = env.api::<Deployment>();
    let deployment = eventually("Deployment to be created", || async {
        deployments.get_opt("hello-deployment").await.ok().flatten()
    })
    .await;
    let spec = deployment.spec.expect("deployment spec");
    assert_eq!(spec.replicas, Some(2));
    let nginx = &spec.template.spec.expect("pod spec").containers[0];
    assert_eq!(nginx.image.as_deref(), Some("nginx"));
    assert!(nginx.command.as_ref().expect("command")[2].starts_with("echo hello > "));
    let owner = &deployment.metadata.owner_references.expect("owner")[0];
    assert_eq!(owner.kind, "WebServer");
    assert_eq!(owner.controller, Some(true));

    let services = env.api::<Service>();
    let service = eventually("Service to be created", || async {
        services.get_opt("hello-service").await.ok().flatten()
    })
    .await;
    let svc_spec = service.spec.expect("service spec");
    assert_eq!(svc_spec.type_.as_deref(), Some("LoadBalancer"));
    assert_eq!(svc_spec.ports.expect("ports")[0].port, 8080);

    let events = env.api::<Event>();
    let created = eventually("Created events for both children", || async {
        let list = events.list(&ListParams::default()).await.ok()?;
        let notes: Vec<String> = list
            .items
            .into_iter()
            .filter(|e| e.reason.as_deref() == Some("Created"))
            .filter_map(|e| e.message)
            .collect();
        (notes.len() >= 2).then_some(notes)
    })
    .await;
    assert!(created
        .iter()
        .any(|n| n == "Created Deployment ws-e2e-create/hello-deployment"));
    assert!(created
        .iter()
        .any(|n| n == "Created Service ws-e2e-create/hello-service"));

    env.teardown().await;
}

/// Story: A user scales a WebServer and changes its port
///
/// Expected behavior:
/// - the Deployment's replicas follow the spec
/// - the Service's port follows the spec while its nodePort is kept
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test -p webserver-operator --test kind -- --ignored"]
async fn story_user_updates_webserver() {
    let env = TestEnv::start("ws-e2e-update").await;
    let webservers = env.webservers();
    webservers
        .create(&PostParams::default(), &webserver("hello", 1, 8080, "v1"))
        .await
        .expect("failed to create WebServer");

    let services = env.api::<Service>();
    let node_port = eventually("Service nodePort", || async {
        let svc = services.get_opt("hello-service").await.ok().flatten()?;
        svc.spec?.ports?.into_iter().next()?.node_port
    })
    .await;

    webservers
        .patch(
            "hello",
            &PatchParams::default(),
            &Patch::Merge(json!({ "spec": { "replicas": 3, "port": { "http": 9090 } } })),
        )
        .await
        .expect("failed to patch WebServer");

    let deployments = env.api::<Deployment>();
    eventually("Deployment to scale to 3", || async {
        let d = deployments.get_opt("hello-deployment").await.ok().flatten()?;
        (d.spec?.replicas == Some(3)).then_some(())
    })
    .await;

    let port = eventually("Service port 9090", || async {
        let svc = services.get_opt("hello-service").await.ok().flatten()?;
        let port = svc.spec?.ports?.into_iter().next()?;
        (port.port == 9090).then_some(port)
    })
    .await;
    assert_eq!(port.node_port, Some(node_port));

    env.teardown().await;
}

/// Story: Someone edits the Deployment by hand and the operator puts it back
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test -p webserver-operator --test kind -- --ignored"]
async fn story_manual_edit_is_reverted() {
    let env = TestEnv::start("ws-e2e-drift").await;
    env.webservers()
        .create(&PostParams::default(), &webserver("hello", 2, 8080, "hi"))
        .await
        .expect("failed to create WebServer");

    let deployments = env.api::<Deployment>();
    eventually("Deployment to be created", || async {
        deployments.get_opt("hello-deployment").await.ok().flatten()
    })
    .await;

    deployments
        .patch(
            "hello-deployment",
            &PatchParams::default(),
            &Patch::Merge(json!({ "spec": { "replicas": 5 } })),
        )
        .await
        .expect("failed to patch Deployment");

    eventually("Deployment replicas to return to 2", || async {
        let d = deployments.get_opt("hello-deployment").await.ok().flatten()?;
        (d.spec?.replicas == Some(2)).then_some(())
    })
    .await;

    env.teardown().await;
}

/// Story: Deleting a WebServer garbage-collects its children
#[tokio::test]
#[ignore = "requires a cluster - run with: cargo test -p webserver-operator --test kind -- --ignored"]
async fn story_user_deletes_webserver() {
    let env = TestEnv::start("ws-e2e-delete").await;
    let webservers = env.webservers();
    webservers
        .create(&PostParams::default(), &webserver("hello", 1, 8080, "bye"))
        .await
        .expect("failed to create WebServer");

    let services = env.api::<Service>();
    eventually("Service to be created", || async {
        services.get_opt("hello-service").await.ok().flatten()
    })
    .await;

    webservers
        .delete("hello", &DeleteParams::foreground())
        .await
        .expect("failed to delete WebServer");

    let deployments = env.api::<Deployment>();
    eventually("children to be garbage collected", || async {
        let deployment = deployments.get_opt("hello-deployment").await.ok()?;
        let service = services.get_opt("hello-service").await.ok()?;
        (deployment.is_none() && service.is_none()).then_some(())
    })
    .await;

    env.teardown().await;
}
