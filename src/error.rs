//! Error types shared by the purification pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience result alias used across the crate.
pub type Result<T, E = PurifyError> = std::result::Result<T, E>;

/// Failures raised while configuring or running the plugin.
#[derive(Debug, Error)]
pub enum PurifyError {
    /// The supplied options did not satisfy the option schema.
    #[error("invalid purify options: {0}")]
    ConfigurationInvalid(String),

    /// A configured content path is missing from disk.
    #[error("Path {} does not exist.", .0.display())]
    PathNotFound(PathBuf),

    /// The purification routine failed for an asset.
    #[error("failed to purify {asset}")]
    Purification {
        /// Asset name that was being purified.
        asset: String,
        /// Error returned by the purifier.
        #[source]
        source: anyhow::Error,
    },

    /// Failed to read a configuration file.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that caused the error.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// Path that caused the error.
        path: PathBuf,
        /// Parser error message.
        message: String,
    },
}
