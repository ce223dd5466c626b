//! Error types for the cleaning pipeline

use thiserror::Error;

/// Result alias used by the cleaning layer.
pub type Result<T> = std::result::Result<T, CleanError>;

/// Errors surfaced by the cleaning layer.
///
/// Sensor noise never produces one of these: a bad reading degrades to the
/// last known good value or to `null`. These are upstream contract violations.
#[derive(Debug, Error)]
pub enum CleanError {
    /// A segment marked as the box-of-record lacks one of its coordinates
    #[error("segment for field `{field}` is marked as crop but has no `{coordinate}` coordinate")]
    MissingCropBox {
        field: String,
        coordinate: &'static str,
    },

    /// A composite field pattern failed to compile
    #[error("invalid pattern for field `{field}`: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// Device type name not known to the built-in catalogs
    #[error("unknown device type: {0}")]
    UnknownDevice(String),
}
