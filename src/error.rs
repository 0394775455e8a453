//! Error types for the gapmark library.
//!
//! Every error here is terminal for the *current* submission attempt but
//! never fatal to the process: the caller (session or CLI) surfaces the
//! message and returns to an interactive state, and a manual re-submit is
//! always possible. There is no automatic retry anywhere in the crate.
//!
//! The taxonomy mirrors where in the pipeline the failure happened:
//!
//! * [`GradeError::Validation`] — caught before any remote call is made.
//! * [`GradeError::Encoding`] — the local file could not be read; the upload
//!   slot is left empty.
//! * [`GradeError::Transport`] / [`GradeError::EmptyResponse`] — the remote
//!   call failed, or succeeded transport-wise with no usable text. Both are
//!   displayed the same way.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the gapmark library.
#[derive(Debug, Error)]
pub enum GradeError {
    // ── Pre-flight errors ─────────────────────────────────────────────────
    /// A required upload or text input is missing. No remote call was made.
    #[error("Missing required input '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The local file backing an upload could not be read.
    #[error("Failed to read file '{}': {detail}", path.display())]
    Encoding { path: PathBuf, detail: String },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// Network, auth, quota, or remote-side failure. The underlying message
    /// is kept verbatim for diagnosis.
    #[error("Inference request failed: {detail}")]
    Transport { detail: String },

    /// The endpoint answered but returned no usable text.
    #[error("The model returned an empty response")]
    EmptyResponse,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the exported report file.
    #[error("Failed to write report file '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GradeError {
    /// True when the error was raised before any remote call was issued.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            GradeError::Validation { .. }
                | GradeError::Encoding { .. }
                | GradeError::InvalidConfig(_)
        )
    }
}
