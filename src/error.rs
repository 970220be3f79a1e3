//! Error types for the anyfile-convert library.
//!
//! Two kinds of failure exist and they travel differently:
//!
//! * Step failures inside a session (the server rejected the file, the
//!   conversion failed, the forced format is not offered) are *not* Rust
//!   errors. They move the session to [`crate::Phase::Failed`] and surface as
//!   `error_text`, because the session stays usable afterwards.
//!
//! * [`ConvertClientError`] covers everything that stops an operation before
//!   or outside the session: unreadable input files, bad configuration,
//!   unknown tools, transport failures reported by the service client, and
//!   download write failures.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the anyfile-convert library.
#[derive(Debug, Error)]
pub enum ConvertClientError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exceeds the upload limit the service enforces.
    #[error("File '{path}' is {size} bytes; the upload limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The active tool does not accept this kind of file.
    #[error("'{file_name}' is not accepted by \"{tool}\" (accepts: {accepted})")]
    FileNotAccepted {
        file_name: String,
        tool: String,
        accepted: String,
    },

    // ── Service errors ────────────────────────────────────────────────────
    /// The request never produced a response (connection refused, DNS, TLS…).
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The service answered with an `{ "error": … }` body.
    #[error("{message}")]
    Service { status: u16, message: String },

    /// The service answered with a body that matches neither response shape.
    #[error("Malformed response from '{url}' (HTTP {status}): {detail}")]
    MalformedResponse {
        url: String,
        status: u16,
        detail: String,
    },

    /// Fetching the converted file failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the downloaded file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No tool with this slug exists in the catalog.
    #[error("Unknown tool '{slug}'. Available: {available}")]
    UnknownTool { slug: String, available: String },

    /// A tool catalog is malformed (bad JSON, empty or duplicate slugs).
    #[error("Invalid tool catalog: {0}")]
    InvalidToolCatalog(String),

    /// A tool catalog file could not be read or parsed.
    #[error("Invalid tool catalog '{path}': {detail}")]
    ToolCatalog { path: PathBuf, detail: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The requested output format cannot be chosen for this upload.
    #[error("Format '{format}' is not available (choose from: {available})")]
    FormatNotOffered { format: String, available: String },

    /// The operation is not available in the current session state.
    #[error("{operation} is not available while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: String,
    },
}

impl ConvertClientError {
    /// Text shown to the user when this error ends an upload step.
    ///
    /// Messages from the service are shown verbatim; everything else is
    /// prefixed so the user knows which step broke.
    pub fn upload_message(&self) -> String {
        match self {
            ConvertClientError::Service { message, .. } => message.clone(),
            other => format!("Upload failed: {other}"),
        }
    }

    /// Text shown to the user when this error ends a conversion step.
    pub fn convert_message(&self) -> String {
        match self {
            ConvertClientError::Service { message, .. } => message.clone(),
            other => format!("Conversion failed: {other}"),
        }
    }
}
