//! Steward core library: identity codec, desired/observed state models,
//! manifest loading and validation, tool configuration, errors.
//!
//! - [`identity`]: [`ResourceIdentity`] and the `<pool_id>/<username>` codec
//! - [`types`]: newtypes, enums, [`DesiredState`], [`ObservedState`]
//! - [`manifest`]: YAML declarations and their validation
//! - [`config`]: `~/.steward/config.yaml`
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod types;

pub use config::StewardConfig;
pub use error::CoreError;
pub use identity::ResourceIdentity;
pub use manifest::UserManifest;
pub use types::{
    Attribute, DeliveryMedium, DesiredState, MessageAction, ObservedState, PasswordPolicy, PoolId,
    UserStatus, Username,
};
