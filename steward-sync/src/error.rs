//! Error types for steward-sync.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use steward_core::{CoreError, ResourceIdentity};

use crate::client::{ClientError, Operation};

/// All errors that can arise from reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A remote call failed with anything other than not-found.
    #[error("{operation} failed for {identity}: {source}")]
    RemoteCallFailed {
        operation: Operation,
        identity: ResourceIdentity,
        #[source]
        source: ClientError,
    },

    /// The user disappeared while an operation needed it to exist.
    #[error("user {identity} no longer exists")]
    ResourceNotFound { identity: ResourceIdentity },

    /// `CreateUser` succeeded but a later group or password call failed.
    /// The user exists with `groups_added` and nothing was rolled back.
    #[error("{identity} was created but left incomplete: {source}")]
    PartialCreate {
        identity: ResourceIdentity,
        groups_added: HashSet<String>,
        #[source]
        source: Box<SyncError>,
    },

    /// A create-only field changed; the user must be destroyed and recreated.
    #[error("changing {from} to {to} requires replacing the user")]
    ReplacementRequired {
        from: ResourceIdentity,
        to: ResourceIdentity,
    },

    /// No state is stored under this name.
    #[error("'{name}' is not tracked; apply a manifest or import the user first")]
    Untracked { name: String },

    /// The name, or the identity under another name, is already tracked.
    #[error("'{name}' is already tracked as {identity}; destroy it first")]
    AlreadyTracked {
        name: String,
        identity: ResourceIdentity,
    },

    /// An error from manifest, identity or config handling.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (state store).
    #[error("state store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Map a client failure to the engine error.
///
/// Not-found only means "the user is gone" for calls that target the user
/// itself; for group calls it may name the group, so it stays a call failure.
pub(crate) fn remote_err(
    operation: Operation,
    identity: &ResourceIdentity,
    source: ClientError,
) -> SyncError {
    let targets_user = !matches!(
        operation,
        Operation::CreateUser | Operation::AddToGroup | Operation::RemoveFromGroup
    );
    if targets_user && source.is_not_found() {
        SyncError::ResourceNotFound {
            identity: identity.clone(),
        }
    } else {
        SyncError::RemoteCallFailed {
            operation,
            identity: identity.clone(),
            source,
        }
    }
}
