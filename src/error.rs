//! Error types for demultiplexing runs.
//!
//! Only conditions that abort a run live here. Per-record rejections are
//! tallied in [`crate::stats::RunStatistics`] and never become errors.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for demultiplexing operations
pub type Result<T> = std::result::Result<T, DemuxError>;

/// Fatal error raised while setting up or advancing a run
#[derive(Error, Debug)]
pub enum DemuxError {
    /// I/O failure with the path and the operation that failed
    #[error("I/O error during {operation} on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure on an anonymous stream (stdin, in-memory reader)
    #[error("I/O error while reading {stream} stream: {source}")]
    Stream {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A FASTQ record group did not have the expected shape
    #[error("Malformed FASTQ record {record} in {stream} stream: {reason}")]
    MalformedRecord {
        stream: &'static str,
        /// 1-based record number within the stream
        record: u64,
        reason: String,
    },

    /// The barcode and read streams are not paired record-for-record
    #[error(
        "Headers of barcode and read do not match at record {record}: \
         barcode header '{barcode_header}', read header '{read_header}'. \
         Confirm that the barcode and read FASTQ files match one another."
    )]
    HeaderMismatch {
        /// 1-based record pair number
        record: u64,
        barcode_header: String,
        read_header: String,
    },

    /// The first header, used for dialect detection, could not be interpreted
    #[error("Unrecognized FASTQ header on first read record: '{header}'")]
    UnrecognizedHeader { header: String },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    /// The barcode to sample mapping could not be built
    #[error("Invalid sample mapping (line {line}): {reason}")]
    InvalidMapping { line: usize, reason: String },

    /// No built-in barcode corrector is registered under this name
    #[error("Unknown barcode correction method '{name}' (known: {known})")]
    UnknownCorrector { name: String, known: String },
}

impl DemuxError {
    pub(crate) fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        DemuxError::InvalidParameter { parameter: parameter.to_string(), reason: reason.into() }
    }
}
