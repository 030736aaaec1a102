//! # steward-sync
//!
//! Reconciliation engine for one managed directory user.
//!
//! [`lifecycle::Lifecycle`] drives create / read / update / delete / import
//! against any [`DirectoryClient`]. The [`pipeline`] functions wrap it with
//! the local state store and are what the CLI calls.

pub mod client;
pub mod diff;
pub mod error;
pub mod lifecycle;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod status;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{ClientError, CreateUserRequest, DirectoryClient, Operation, RemoteUser};
pub use error::SyncError;
pub use lifecycle::{Lifecycle, ResourceState};
pub use pipeline::{apply, destroy, import, plan_for, refresh, ApplyOutcome, RefreshOutcome};
pub use plan::{Plan, PlannedCall};
pub use status::StatusSignal;
pub use store::StateDocument;
