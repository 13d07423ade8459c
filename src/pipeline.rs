//! Paired barcode/read demultiplexing.
//!
//! [`Demultiplexer`] pulls one record from each stream per step, checks that
//! the headers agree, resolves the barcode to a sample, quality-filters the
//! read and yields the accepted ones. Rejections only touch the statistics.

use std::io::BufRead;

use log::{info, warn};

use crate::barcode::BarcodeResolver;
use crate::config::DemuxOptions;
use crate::dna::{reverse_complement, reverse_quality};
use crate::error::{DemuxError, Result};
use crate::fastq::{FastqReader, RawRecord};
use crate::filter::{last_bad_quality_char, Filtered, QualityFilter};
use crate::header::HeaderDialect;
use crate::stats::{Rejection, RunStatistics};

/// Sample id given to unmatched reads when they are kept.
pub const UNASSIGNED_SAMPLE_ID: &str = "Unassigned";

/// An accepted, relabelled read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// `{sample}_{index} {read header} orig_bc={barcode} new_bc={corrected} bc_diffs={errors}`
    pub header: String,
    pub sequence: String,
    pub quality: String,
    pub sequence_index: u64,
}

/// Settings fixed by the first read header of the run.
#[derive(Debug, Clone, Copy)]
struct RunState {
    dialect: HeaderDialect,
    filter: QualityFilter,
}

/// Forward-only iterator of accepted records over a barcode stream and a read stream.
///
/// A fatal error is yielded once, after which the iterator is exhausted.
/// Dropping the iterator early cancels the run.
pub struct Demultiplexer<'a, B: BufRead, R: BufRead> {
    barcodes: FastqReader<B>,
    reads: FastqReader<R>,
    resolver: BarcodeResolver<'a>,
    options: DemuxOptions,
    run: Option<RunState>,
    /// First read record, held back after dialect detection.
    peeked: Option<RawRecord>,
    next_index: u64,
    stats: RunStatistics,
    done: bool,
}

impl<'a, B: BufRead, R: BufRead> Demultiplexer<'a, B, R> {
    pub fn new(
        barcodes: FastqReader<B>,
        reads: FastqReader<R>,
        resolver: BarcodeResolver<'a>,
        options: DemuxOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            barcodes,
            reads,
            resolver,
            next_index: options.start_seq_index,
            options,
            run: None,
            peeked: None,
            stats: RunStatistics::default(),
            done: false,
        })
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    /// Index the next accepted record will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Header dialect of the run, once the first read has been seen.
    pub fn dialect(&self) -> Option<HeaderDialect> {
        self.run.map(|r| r.dialect)
    }

    pub fn into_statistics(self) -> RunStatistics {
        self.stats
    }

    /// Peeks the first read to fix the header dialect and quality encoding.
    fn start(&mut self) -> Result<Option<RunState>> {
        let Some(first) = self.reads.next_record()? else {
            return Ok(None);
        };
        let dialect = HeaderDialect::detect(&first.header)?;
        let filter = QualityFilter {
            max_bad_run_length: self.options.max_bad_run_length,
            last_bad_quality_char: last_bad_quality_char(
                self.options.phred_quality_threshold,
                dialect.phred_offset(),
            )?,
            min_length: self.options.min_per_read_length,
            max_ambiguous: self.options.max_ambiguous,
            filter_platform_digit: self.options.filter_bad_illumina_qual_digit,
        };
        info!("Detected {:?} FASTQ headers (Phred+{} qualities)", dialect, dialect.phred_offset());

        let run = RunState { dialect, filter };
        self.peeked = Some(first);
        self.run = Some(run);
        Ok(Some(run))
    }

    fn next_pair(&mut self) -> Result<Option<(RawRecord, RawRecord)>> {
        let barcode = self.barcodes.next_record()?;
        let read = match self.peeked.take() {
            Some(r) => Some(r),
            None => self.reads.next_record()?,
        };
        match (barcode, read) {
            (Some(b), Some(r)) => Ok(Some((b, r))),
            (None, None) => Ok(None),
            (b, _) => {
                warn!(
                    "The {} stream ended first; stopping after {} record pairs",
                    if b.is_none() { "barcode" } else { "read" },
                    self.stats.total_input
                );
                Ok(None)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<OutputRecord>> {
        let run = match self.run {
            Some(run) => run,
            None => match self.start()? {
                Some(run) => run,
                None => return Ok(None),
            },
        };
        while let Some((barcode, read)) = self.next_pair()? {
            if let Some(out) = self.process(run, barcode, read)? {
                return Ok(Some(out));
            }
        }
        Ok(None)
    }

    fn process(
        &mut self,
        run: RunState,
        barcode: RawRecord,
        read: RawRecord,
    ) -> Result<Option<OutputRecord>> {
        self.stats.total_input += 1;
        if !run.dialect.headers_match(&barcode.header, &read.header) {
            return Err(DemuxError::HeaderMismatch {
                record: self.stats.total_input,
                barcode_header: barcode.header,
                read_header: read.header,
            });
        }

        let barcode = if self.options.rev_comp_barcode {
            reverse_complement(&barcode.sequence)
        } else {
            barcode.sequence
        };
        let resolution = self.resolver.resolve(&barcode);
        if f64::from(resolution.error_count) > self.options.max_barcode_errors {
            self.stats.record_rejection(Rejection::BarcodeErrorsExceeded);
            return Ok(None);
        }
        let sample_id = match resolution.sample_id {
            Some(id) => id,
            None if self.options.store_unassigned => UNASSIGNED_SAMPLE_ID.to_string(),
            None => {
                self.stats.record_rejection(Rejection::UnassignedBarcode);
                return Ok(None);
            }
        };

        let RawRecord { header, sequence, quality } = read;
        let Filtered { verdict, sequence, quality } = run.filter.apply(&header, sequence, quality);
        if let Some(rejection) = Rejection::from_verdict(verdict) {
            self.stats.record_rejection(rejection);
            return Ok(None);
        }
        self.stats.record_accepted(&sample_id, sequence.len());

        let (sequence, quality) = if self.options.rev_comp {
            (reverse_complement(&sequence), reverse_quality(&quality))
        } else {
            (sequence, quality)
        };
        let index = self.next_index;
        self.next_index += 1;
        let header = format!(
            "{sample_id}_{index} {header} orig_bc={barcode} new_bc={} bc_diffs={}",
            resolution.resolved_barcode, resolution.error_count
        );
        Ok(Some(OutputRecord { header, sequence, quality, sequence_index: index }))
    }
}

impl<B: BufRead, R: BufRead> Iterator for Demultiplexer<'_, B, R> {
    type Item = Result<OutputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<B: BufRead, R: BufRead> std::iter::FusedIterator for Demultiplexer<'_, B, R> {}
