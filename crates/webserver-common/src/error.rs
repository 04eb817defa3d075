//! Error types for the WebServer operator
//!
//! Not-found is never an error here: lookups return `Ok(None)` so callers can
//! branch on absence. Every variant below is a reconcile failure that the
//! controller runtime retries.

use thiserror::Error;

/// HTTP status returned by the API server on a resourceVersion conflict
const CONFLICT_STATUS: u16 = 409;

/// Failures of a reconcile pass or of operator startup
#[derive(Debug, Error)]
pub enum Error {
    /// The API server rejected a call or could not be reached
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The owner reference for a dependent resource could not be formed
    #[error("owner reference error for {resource}: {message}")]
    OwnerReference {
        /// Dependent resource the link was being stamped on (namespace/name)
        resource: String,
        /// What's missing on the owner
        message: String,
    },

    /// An object is missing metadata the API call needs
    #[error("{kind} is missing metadata.{field}")]
    MissingMetadata {
        /// Resource kind (e.g. "Deployment")
        kind: String,
        /// Missing metadata field (e.g. "namespace")
        field: String,
    },

    /// No client could be built from the kubeconfig or in-cluster config
    #[error("cannot connect to cluster: {message}")]
    Client {
        /// What went wrong while loading the config
        message: String,
    },

    /// A state the operator should never reach
    #[error("internal error: {message}")]
    Internal {
        /// What was unexpected
        message: String,
    },
}

impl Error {
    /// Owner reference error for the dependent resource `resource`
    pub fn owner_reference(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::OwnerReference {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Missing metadata error for `kind`
    pub fn missing_metadata(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingMetadata {
            kind: kind.into(),
            field: field.into(),
        }
    }

    /// Client construction error
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client {
            message: msg.into(),
        }
    }

    /// Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }

    /// Whether another writer changed the object between our read and our write
    ///
    /// The next pass re-reads and reconverges, so callers retry these quickly.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Kube {
                source: kube::Error::Api(ae)
            } if ae.code == CONFLICT_STATUS
        )
    }
}
