//! Error types for the binding layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::native::resolver::Platform;

/// Errors surfaced by the binding layer.
///
/// Native runtime failures that a call documents as part of its normal
/// contract (e.g. "word not present in dictionary") are reported through the
/// call's return value, not through this enum.
#[derive(Debug, Error)]
pub enum NlpirError {
    /// The current operating system has no entry in the library naming table.
    #[error("platform '{0}' is not supported")]
    UnsupportedPlatform(String),

    /// No library file exists at the path the naming table produced.
    #[error("native library '{name}' not found at '{}' ({platform})", .path.display())]
    LibraryNotFound {
        name: String,
        platform: Platform,
        path: PathBuf,
    },

    /// The dynamic loader rejected the library file.
    #[error("failed to load native library '{}' on {platform}: {source}", .path.display())]
    Load {
        platform: Platform,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// The loaded library does not export the requested function.
    #[error("symbol '{symbol}' not found in library '{library}': {source}")]
    MissingSymbol {
        symbol: &'static str,
        library: String,
        #[source]
        source: libloading::Error,
    },

    /// A component was reconfigured after its instance was already built.
    #[error("component '{0}' is already initialized; settings can no longer be changed")]
    AlreadyInitialized(&'static str),

    /// A component was accessed after its process-wide teardown.
    #[error("component '{0}' has been shut down")]
    ShutDown(&'static str),

    /// The native init entry point reported failure.
    #[error("failed to initialize component '{component}': {detail}")]
    InitFailed {
        component: &'static str,
        detail: String,
    },

    /// A native call failed where its contract treats failure as exceptional.
    #[error("native call '{operation}' failed: {detail}")]
    NativeFailure {
        operation: &'static str,
        detail: String,
    },

    /// Text cannot be marshaled into the component's native encoding.
    #[error("cannot pass text to the native library: {0}")]
    Encoding(String),

    /// A structured result returned by a native call could not be parsed.
    #[error("failed to parse native {what} result: {detail}")]
    Parse {
        what: &'static str,
        detail: String,
    },

    /// A dictionary or blacklist file operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for binding-layer operations.
pub type Result<T, E = NlpirError> = std::result::Result<T, E>;
