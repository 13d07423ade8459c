use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::filter::FilterVerdict;

/// Why a record pair was not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    UnassignedBarcode,
    BarcodeErrorsExceeded,
    TooShort,
    TooManyAmbiguous,
    BadPlatformDigit,
}

impl Rejection {
    /// Maps a non-accepting filter verdict to its rejection bucket.
    pub fn from_verdict(verdict: FilterVerdict) -> Option<Self> {
        match verdict {
            FilterVerdict::Accepted => None,
            FilterVerdict::TooShort => Some(Rejection::TooShort),
            FilterVerdict::TooManyAmbiguous => Some(Rejection::TooManyAmbiguous),
            FilterVerdict::BadPlatformDigit => Some(Rejection::BadPlatformDigit),
        }
    }
}

/// Per-run counters. Every input pair lands in exactly one bucket: one of the
/// rejection counters or the accepted lengths.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total_input: u64,
    pub unassigned_barcode: u64,
    pub barcode_errors_exceeded: u64,
    pub too_short: u64,
    pub too_many_ambiguous: u64,
    pub bad_platform_digit: u64,
    /// Lengths of accepted sequences, in emission order.
    pub sequence_lengths: Vec<usize>,
    pub seqs_per_sample: BTreeMap<String, u64>,
}

impl RunStatistics {
    pub fn record_rejection(&mut self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::UnassignedBarcode => &mut self.unassigned_barcode,
            Rejection::BarcodeErrorsExceeded => &mut self.barcode_errors_exceeded,
            Rejection::TooShort => &mut self.too_short,
            Rejection::TooManyAmbiguous => &mut self.too_many_ambiguous,
            Rejection::BadPlatformDigit => &mut self.bad_platform_digit,
        };
        *counter += 1;
    }

    pub fn record_accepted(&mut self, sample_id: &str, length: usize) {
        self.sequence_lengths.push(length);
        *self.seqs_per_sample.entry(sample_id.to_string()).or_insert(0) += 1;
    }

    pub fn accepted(&self) -> u64 {
        self.sequence_lengths.len() as u64
    }

    pub fn rejected(&self) -> u64 {
        self.unassigned_barcode
            + self.barcode_errors_exceeded
            + self.too_short
            + self.too_many_ambiguous
            + self.bad_platform_digit
    }

    pub fn min_length(&self) -> Option<usize> {
        self.sequence_lengths.iter().copied().min()
    }

    pub fn max_length(&self) -> Option<usize> {
        self.sequence_lengths.iter().copied().max()
    }

    pub fn mean_length(&self) -> Option<f64> {
        if self.sequence_lengths.is_empty() {
            return None;
        }
        let total: usize = self.sequence_lengths.iter().sum();
        Some(total as f64 / self.sequence_lengths.len() as f64)
    }

    /// Sums another run's counters into this one. Lengths are appended.
    pub fn merge(&mut self, other: &RunStatistics) {
        self.total_input += other.total_input;
        self.unassigned_barcode += other.unassigned_barcode;
        self.barcode_errors_exceeded += other.barcode_errors_exceeded;
        self.too_short += other.too_short;
        self.too_many_ambiguous += other.too_many_ambiguous;
        self.bad_platform_digit += other.bad_platform_digit;
        self.sequence_lengths.extend_from_slice(&other.sequence_lengths);
        for (sample, count) in &other.seqs_per_sample {
            *self.seqs_per_sample.entry(sample.clone()).or_insert(0) += count;
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Read {} record pairs; kept {} and rejected {}",
            self.total_input,
            self.accepted(),
            self.rejected()
        );
        info!("  barcode not in mapping: {}", self.unassigned_barcode);
        info!("  barcode errors exceed max: {}", self.barcode_errors_exceeded);
        info!("  too short after quality truncation: {}", self.too_short);
        info!("  too many N: {}", self.too_many_ambiguous);
        info!("  bad Illumina quality digit: {}", self.bad_platform_digit);
        if let (Some(min), Some(max), Some(mean)) =
            (self.min_length(), self.max_length(), self.mean_length())
        {
            info!("  accepted lengths: min {min}, max {max}, mean {mean:.2}");
        }
        info!("  samples with reads: {}", self.seqs_per_sample.len());
    }
}
