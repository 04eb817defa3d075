//! Ownership links and change Events
//!
//! Every dependent resource carries exactly one controller owner reference to
//! its WebServer, so the garbage collector removes it when the WebServer is
//! deleted and changes to it re-trigger reconciliation.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::ObjectMeta;
use kube::runtime::events::{Event, EventType};
use kube::Resource;

use webserver_common::crd::WebServer;
use webserver_common::events::{actions, reasons};
use webserver_common::{Error, EventPublisher};

use crate::sync::SyncOutcome;

/// Stamp `owner` as the controlling owner of a child about to be created.
///
/// Replaces any existing owner references. The reference blocks owner
/// deletion, so foreground deletion of the WebServer waits for the child.
/// Fails when the owner has no `uid` or `name`, which only happens for objects
/// that never came from the API server.
pub fn stamp_owner(child: &mut ObjectMeta, owner: &WebServer) -> Result<(), Error> {
    let mut owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        Error::owner_reference(
            format!(
                "{}/{}",
                child.namespace.as_deref().unwrap_or_default(),
                child.name.as_deref().unwrap_or_default()
            ),
            "owner WebServer has no uid or name",
        )
    })?;
    owner_ref.block_owner_deletion = Some(true);
    child.owner_references = Some(vec![owner_ref]);
    Ok(())
}

/// Publish one Normal Event on the WebServer describing a change to a child.
///
/// `Unchanged` emits nothing.
pub async fn record_change<K>(
    events: &dyn EventPublisher,
    owner: &WebServer,
    outcome: SyncOutcome,
    child: &K,
) where
    K: Resource<DynamicType = ()>,
{
    let (reason, action) = match outcome {
        SyncOutcome::Created => (reasons::CREATED, actions::CREATE),
        SyncOutcome::Updated => (reasons::UPDATED, actions::UPDATE),
        SyncOutcome::Unchanged => return,
    };

    let related: ObjectReference = child.object_ref(&());
    let note = format!(
        "{} {} {}/{}",
        reason,
        K::kind(&()),
        related.namespace.as_deref().unwrap_or_default(),
        related.name.as_deref().unwrap_or_default()
    );

    let event = Event {
        type_: EventType::Normal,
        reason: reason.to_string(),
        note: Some(note),
        action: action.to_string(),
        secondary: Some(related),
    };
    events.publish(&owner.object_ref(&()), event).await;
}
