//! FASTQ header dialects and barcode/read header pairing.

use crate::error::{DemuxError, Result};

/// Pass/fail filter flags found in field 8 of CASAVA 1.8+ headers. Any
/// substring of this set (including the empty field) marks the newer dialect.
const FILTER_FLAGS: &str = "YN";

/// Header convention of an input run, detected once from the first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDialect {
    /// Pre-CASAVA 1.8 headers (`@name#0/1`), Phred+64 qualities.
    Legacy,
    /// CASAVA 1.8+ headers (`@inst:run:flowcell:lane:tile:x:y read:filter:control:index`),
    /// Phred+33 qualities.
    Casava18,
}

impl HeaderDialect {
    /// Detects the dialect of a header, with or without its leading `@`.
    pub fn detect(header: &str) -> Result<Self> {
        if header.trim_start_matches('@').trim().is_empty() {
            return Err(DemuxError::UnrecognizedHeader { header: header.to_string() });
        }
        let fields: Vec<&str> = header.split(':').collect();
        if fields.len() == 10 && FILTER_FLAGS.contains(fields[7]) {
            Ok(HeaderDialect::Casava18)
        } else {
            Ok(HeaderDialect::Legacy)
        }
    }

    /// ASCII offset of the quality encoding that goes with this dialect.
    pub fn phred_offset(self) -> u8 {
        match self {
            HeaderDialect::Legacy => 64,
            HeaderDialect::Casava18 => 33,
        }
    }

    /// True when a barcode header and a read header describe the same read.
    pub fn headers_match(self, barcode_header: &str, read_header: &str) -> bool {
        match self {
            HeaderDialect::Legacy => legacy_stem(barcode_header) == legacy_stem(read_header),
            HeaderDialect::Casava18 => barcode_header
                .split(':')
                .zip(read_header.split(':'))
                .all(|(a, b)| before_space(a) == before_space(b)),
        }
    }
}

/// Drops the quality digit (`#...`) and the read number (`/...`).
fn legacy_stem(header: &str) -> &str {
    let head = header.split('#').next().unwrap_or(header);
    head.split('/').next().unwrap_or(head)
}

fn before_space(field: &str) -> &str {
    field.split(' ').next().unwrap_or(field)
}
