//! Error types for steward-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from manifest, identity, and configuration handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.steward/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The manifest file did not exist at the given path.
    #[error("manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// A resource identifier that is not exactly `<pool_id>/<username>`.
    #[error("invalid resource identifier '{input}': expected <pool_id>/<username>")]
    Format { input: String },

    /// Two mutually exclusive fields were both supplied.
    #[error("'{first}' and '{second}' are mutually exclusive; set at most one")]
    ConflictingFields {
        first: &'static str,
        second: &'static str,
    },

    /// A declared field failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl CoreError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
