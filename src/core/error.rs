//! Error taxonomy for the split/fingerprint/upload pipeline.
//!
//! Precondition and validation errors all fire before any part is written,
//! so a failed run leaves no partial output behind. The boundary in
//! `main` maps variants to exit codes; insufficient space is a safe
//! abort (exit 0), everything else exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("A support case identifier is required (-c)")]
    MissingCase,

    #[error(
        "Could not auto-detect the appliance system UUID; supply one explicitly with -u"
    )]
    MissingSystemUuid,

    #[error("Cannot read source file {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid chunk size '{0}': expected a positive size such as 512m, 1g or 1048576")]
    InvalidChunkSize(String),

    #[error(
        "Insufficient free space: {required} bytes required ({multiplier}x source size), \
         {available} bytes available. Free up space or move the dump to a larger volume."
    )]
    InsufficientSpace {
        required: u64,
        available: u64,
        multiplier: u64,
    },

    #[error(
        "Part '{name}' is not readable from the current directory: {source}. \
         Run from the directory containing the split parts."
    )]
    PartUnreadable {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{failed} of {attempted} artifact upload(s) failed")]
    UploadsFailed { failed: usize, attempted: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Insufficient space is a deliberate, safe abort rather than a fault:
    /// nothing was written and the operator just needs a bigger volume.
    pub fn is_safe_abort(&self) -> bool {
        matches!(self, PipelineError::InsufficientSpace { .. })
    }
}
