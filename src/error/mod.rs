//! Error types and handling for Jumpstart
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! The taxonomy mirrors the bootstrap pipeline stages:
//! - Manifest errors (unreadable / malformed input, before any network I/O)
//! - Resolution errors (cycles, unresolvable coordinates)
//! - Fetch errors (unavailable artifacts, integrity violations, exhausted transports)
//! - Load errors (version clashes, activation failures)
//!
//! Transient transport failures are retried inside the repository client and
//! fetch coordinator; only `TransportExhausted` ever reaches the top level.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Jumpstart operations
#[derive(Error, Diagnostic, Debug)]
pub enum JumpstartError {
    // Manifest errors
    #[error("Failed to read manifest: {path}")]
    #[diagnostic(
        code(jumpstart::manifest::unreadable),
        help("Check that the manifest file exists and is readable")
    )]
    ManifestUnreadable { path: String, reason: String },

    #[error("Malformed manifest: {path}: {reason}")]
    #[diagnostic(
        code(jumpstart::manifest::malformed),
        help(
            "The manifest must contain a 'dependencies' list of group:artifact:version \
             strings and a 'repositories' list of {{id, url}} objects"
        )
    )]
    ManifestMalformed { path: String, reason: String },

    #[error("Invalid coordinate: {input}")]
    #[diagnostic(
        code(jumpstart::manifest::invalid_coordinate),
        help("Coordinates use the form group:artifact:version")
    )]
    InvalidCoordinate { input: String },

    // Resolution errors
    #[error("Dependency cycle detected: {path}")]
    #[diagnostic(
        code(jumpstart::resolve::cycle),
        help("Remove the cyclic declaration; cycles are an error, never silently broken")
    )]
    DependencyCycle { path: String },

    #[error("Unresolvable dependency: {coordinate}")]
    #[diagnostic(
        code(jumpstart::resolve::unresolvable),
        help("No configured repository served a descriptor for this coordinate")
    )]
    Unresolvable {
        coordinate: String,
        attempted: String,
    },

    // Fetch errors
    #[error("Artifact unavailable: {coordinate}")]
    #[diagnostic(
        code(jumpstart::fetch::unavailable),
        help("Every repository returned not-found or exhausted its retries")
    )]
    ArtifactUnavailable { coordinate: String },

    #[error("Integrity violation for {coordinate}: expected {expected}, got {actual}")]
    #[diagnostic(
        code(jumpstart::fetch::integrity),
        help(
            "The downloaded bytes do not match the trusted checksum. \
             The partial file was discarded and never cached."
        )
    )]
    IntegrityViolation {
        coordinate: String,
        expected: String,
        actual: String,
    },

    #[error("Transport failed after {attempts} attempts: {url}")]
    #[diagnostic(code(jumpstart::fetch::transport_exhausted))]
    TransportExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Single-attempt transport failure. Retried by callers; never surfaces
    /// to the top level (it becomes `TransportExhausted` at the ceiling).
    #[error("Transport error: {url}: {reason}")]
    #[diagnostic(code(jumpstart::fetch::transport))]
    Transport { url: String, reason: String },

    // Load errors
    #[error("Version clash: {coordinate} conflicts with already active {active}")]
    #[diagnostic(
        code(jumpstart::load::version_clash),
        help("The resolver guarantees one version per group:artifact; this is a defensive check")
    )]
    VersionClash { coordinate: String, active: String },

    #[error("Failed to activate {coordinate}: {reason}")]
    #[diagnostic(code(jumpstart::load::activation_failed))]
    ActivationFailure { coordinate: String, reason: String },

    // Cache errors
    #[error("Cache operation failed: {message}")]
    #[diagnostic(code(jumpstart::cache::operation_failed))]
    CacheOperationFailed { message: String },

    #[error("Cache entry corrupted for {coordinate}: {reason}")]
    #[diagnostic(
        code(jumpstart::cache::corrupted),
        help("Run 'jumpstart cache clear' or invalidate the coordinate to force a re-download")
    )]
    CacheCorrupted { coordinate: String, reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(jumpstart::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(jumpstart::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(jumpstart::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(jumpstart::fs::io_error))]
    IoError { message: String },
}

impl JumpstartError {
    /// Process exit status for the top-level bootstrap entry point.
    ///
    /// Distinguishes manifest, resolution, fetch and load failures so the
    /// host's startup sequence can tell them apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ManifestUnreadable { .. }
            | Self::ManifestMalformed { .. }
            | Self::InvalidCoordinate { .. } => 2,
            Self::DependencyCycle { .. } | Self::Unresolvable { .. } => 3,
            Self::ArtifactUnavailable { .. }
            | Self::IntegrityViolation { .. }
            | Self::TransportExhausted { .. }
            | Self::Transport { .. } => 4,
            Self::VersionClash { .. } | Self::ActivationFailure { .. } => 5,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for JumpstartError {
    fn from(err: std::io::Error) -> Self {
        JumpstartError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, JumpstartError>;
