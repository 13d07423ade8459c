//! Barcode demultiplexing and quality filtering of paired FASTQ streams.
//!
//! A [`Demultiplexer`] walks a barcode FASTQ and a read FASTQ in lockstep,
//! checks that each pair of headers describes the same read, maps the barcode
//! to a sample (optionally via a [`BarcodeCorrector`]), truncates and filters
//! the read on quality and yields the accepted reads relabelled with their
//! sample and a running sequence index.

pub mod barcode;
pub mod config;
pub mod dna;
pub mod error;
pub mod fastq;
pub mod filter;
pub mod header;
pub mod pipeline;
pub mod stats;

pub use barcode::{
    corrector_by_name, BarcodeCorrector, BarcodeResolver, Correction, ResolutionResult,
    SampleRegistry,
};
pub use config::DemuxOptions;
pub use error::{DemuxError, Result};
pub use fastq::{FastqReader, RawRecord};
pub use filter::{FilterVerdict, QualityFilter};
pub use header::HeaderDialect;
pub use pipeline::{Demultiplexer, OutputRecord, UNASSIGNED_SAMPLE_ID};
pub use stats::{Rejection, RunStatistics};
