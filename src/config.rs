use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::{DemuxError, Result};
use crate::fastq::SeqFormat;
use crate::filter::QUALITY_ALPHABET_SIZE;

/// Largest Phred threshold that still fits the alphabet under the smaller (+33) offset.
const MAX_PHRED_THRESHOLD: u8 = QUALITY_ALPHABET_SIZE - 1 - 33;

/// Per-run settings consumed by [`crate::pipeline::Demultiplexer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemuxOptions {
    /// Keep reads with unknown barcodes under the `Unassigned` sample.
    pub store_unassigned: bool,
    /// Longest tolerated run of bad-quality bases.
    pub max_bad_run_length: usize,
    /// Highest Phred score considered bad; `None` turns truncation off.
    pub phred_quality_threshold: Option<u8>,
    pub min_per_read_length: usize,
    /// Reverse complement reads after filtering.
    pub rev_comp: bool,
    /// Reverse complement barcodes before lookup.
    pub rev_comp_barcode: bool,
    /// Most `N` bases tolerated in a filtered read.
    pub max_ambiguous: usize,
    pub start_seq_index: u64,
    pub filter_bad_illumina_qual_digit: bool,
    pub max_barcode_errors: f64,
}

impl Default for DemuxOptions {
    fn default() -> Self {
        Self {
            store_unassigned: false,
            max_bad_run_length: 3,
            phred_quality_threshold: Some(3),
            min_per_read_length: 75,
            rev_comp: false,
            rev_comp_barcode: false,
            max_ambiguous: 0,
            start_seq_index: 0,
            filter_bad_illumina_qual_digit: false,
            max_barcode_errors: 1.5,
        }
    }
}

impl DemuxOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.max_barcode_errors.is_finite() || self.max_barcode_errors < 0.0 {
            return Err(DemuxError::invalid_parameter(
                "max-barcode-errors",
                format!("must be a non-negative number, got {}", self.max_barcode_errors),
            ));
        }
        if let Some(q) = self.phred_quality_threshold {
            if q > MAX_PHRED_THRESHOLD {
                return Err(DemuxError::invalid_parameter(
                    "phred-quality-threshold",
                    format!("must be at most {MAX_PHRED_THRESHOLD}, got {q}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Fasta,
    Fastq,
}

impl From<OutputFormat> for SeqFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Fasta => SeqFormat::Fasta,
            OutputFormat::Fastq => SeqFormat::Fastq,
        }
    }
}

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(
    name = "fastq-demux",
    version,
    about = "Demultiplex and quality filter barcoded FASTQ reads"
)]
pub struct Cli {
    /// Read FASTQ files (plain or .gz), one per lane
    #[arg(short = 'i', long = "sequence-read-fps", required = true, num_args = 1..)]
    pub sequence_read_fps: Vec<PathBuf>,
    /// Barcode FASTQ files, paired in order with the read files
    #[arg(short = 'b', long = "barcode-read-fps", required = true, num_args = 1..)]
    pub barcode_read_fps: Vec<PathBuf>,
    /// Tab-separated mapping: sample id, barcode
    #[arg(short = 'm', long = "mapping-fp")]
    pub mapping_fp: PathBuf,

    // Output
    #[arg(short = 'o', long = "output", default_value = "seqs.fna")]
    pub output: PathBuf,
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Fasta)]
    pub output_format: OutputFormat,
    #[arg(short = 'j', long = "json", default_value = "split_library_stats.json")]
    pub json: PathBuf,
    #[arg(short = 'z', long = "compression", default_value_t = 4)]
    pub compression: u32,

    // Barcodes
    #[arg(long = "store-unassigned", action = ArgAction::SetTrue)]
    pub store_unassigned: bool,
    #[arg(long = "rev-comp-barcode", action = ArgAction::SetTrue)]
    pub rev_comp_barcode: bool,
    /// Barcode correction method (e.g. "nearest"); omit for exact matching only
    #[arg(long = "barcode-correction")]
    pub barcode_correction: Option<String>,
    #[arg(long = "max-barcode-errors", default_value_t = 1.5)]
    pub max_barcode_errors: f64,

    // Quality filtering
    #[arg(short = 'r', long = "max-bad-run-length", default_value_t = 3)]
    pub max_bad_run_length: usize,
    #[arg(short = 'q', long = "phred-quality-threshold", default_value_t = 3)]
    pub phred_quality_threshold: u8,
    #[arg(long = "disable-quality-filter", action = ArgAction::SetTrue)]
    pub disable_quality_filter: bool,
    #[arg(short = 'l', long = "min-per-read-length", default_value_t = 75)]
    pub min_per_read_length: usize,
    #[arg(short = 'n', long = "sequence-max-n", default_value_t = 0)]
    pub sequence_max_n: usize,
    #[arg(long = "filter-bad-illumina-qual-digit", action = ArgAction::SetTrue)]
    pub filter_bad_illumina_qual_digit: bool,

    // Reads
    #[arg(long = "rev-comp", action = ArgAction::SetTrue)]
    pub rev_comp: bool,
    #[arg(short = 's', long = "start-seq-id", default_value_t = 0)]
    pub start_seq_id: u64,
}

impl Cli {
    pub fn validate(&self) -> Result<()> {
        if self.sequence_read_fps.len() != self.barcode_read_fps.len() {
            return Err(DemuxError::invalid_parameter(
                "barcode-read-fps",
                format!(
                    "{} read files but {} barcode files; they must pair up",
                    self.sequence_read_fps.len(),
                    self.barcode_read_fps.len()
                ),
            ));
        }
        if self.compression > 9 {
            return Err(DemuxError::invalid_parameter("compression", "must be between 0 and 9"));
        }
        self.options().validate()
    }

    /// Core options for the first input pair.
    pub fn options(&self) -> DemuxOptions {
        DemuxOptions {
            store_unassigned: self.store_unassigned,
            max_bad_run_length: self.max_bad_run_length,
            phred_quality_threshold: (!self.disable_quality_filter)
                .then_some(self.phred_quality_threshold),
            min_per_read_length: self.min_per_read_length,
            rev_comp: self.rev_comp,
            rev_comp_barcode: self.rev_comp_barcode,
            max_ambiguous: self.sequence_max_n,
            start_seq_index: self.start_seq_id,
            filter_bad_illumina_qual_digit: self.filter_bad_illumina_qual_digit,
            max_barcode_errors: self.max_barcode_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["fastq-demux"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-i", "reads.fq", "-b", "bc.fq", "-m", "map.txt"]);
        assert_eq!(cli.options(), DemuxOptions::default());
        assert_eq!(cli.output, PathBuf::from("seqs.fna"));
        assert_eq!(cli.output_format, OutputFormat::Fasta);
        assert!(cli.barcode_correction.is_none());
        cli.validate().unwrap();
    }

    #[test]
    fn test_options_mapping() {
        let cli = parse(&[
            "-i", "r1.fq", "r2.fq", "-b", "b1.fq", "b2.fq", "-m", "map.txt",
            "--store-unassigned", "--rev-comp", "--rev-comp-barcode",
            "-r", "5", "-l", "50", "-n", "2", "-s", "1000",
            "--filter-bad-illumina-qual-digit", "--disable-quality-filter",
            "--barcode-correction", "nearest", "--max-barcode-errors", "0.5",
        ]);
        let opts = cli.options();
        assert!(opts.store_unassigned && opts.rev_comp && opts.rev_comp_barcode);
        assert_eq!(opts.max_bad_run_length, 5);
        assert_eq!(opts.phred_quality_threshold, None);
        assert_eq!(opts.min_per_read_length, 50);
        assert_eq!(opts.max_ambiguous, 2);
        assert_eq!(opts.start_seq_index, 1000);
        assert!(opts.filter_bad_illumina_qual_digit);
        assert_eq!(opts.max_barcode_errors, 0.5);
        assert_eq!(cli.sequence_read_fps.len(), 2);
        assert_eq!(cli.barcode_correction.as_deref(), Some("nearest"));
        cli.validate().unwrap();
    }

    #[test]
    fn test_unpaired_inputs_rejected() {
        let cli = parse(&["-i", "r1.fq", "r2.fq", "-b", "b1.fq", "-m", "map.txt"]);
        assert!(matches!(cli.validate(), Err(DemuxError::InvalidParameter { .. })));
    }

    #[test]
    fn test_option_validation() {
        let bad_errors = DemuxOptions { max_barcode_errors: -1.0, ..DemuxOptions::default() };
        assert!(bad_errors.validate().is_err());
        let nan_errors = DemuxOptions { max_barcode_errors: f64::NAN, ..DemuxOptions::default() };
        assert!(nan_errors.validate().is_err());
        let bad_phred =
            DemuxOptions { phred_quality_threshold: Some(94), ..DemuxOptions::default() };
        assert!(bad_phred.validate().is_err());
        let ok = DemuxOptions { phred_quality_threshold: Some(93), ..DemuxOptions::default() };
        ok.validate().unwrap();
    }
}
