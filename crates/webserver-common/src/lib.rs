//! Common types for the WebServer operator: CRDs, errors, events and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;
pub mod telemetry;

pub use error::Error;
pub use events::{EventPublisher, KubeEventPublisher, NoopEventPublisher};
#[cfg(any(test, feature = "testing"))]
pub use events::{RecordedEvent, RecordingEventPublisher};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name reported as the component on Events and used as the field manager
pub const OPERATOR_NAME: &str = "webserver-operator";

/// Standard label marking resources created by this operator
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] on resources created by this operator
pub const LABEL_MANAGED_BY_OPERATOR: &str = OPERATOR_NAME;
