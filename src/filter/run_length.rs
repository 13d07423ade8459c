use crate::error::{DemuxError, Result};

/// Size of the ordered quality alphabet (ASCII 0..=126).
pub const QUALITY_ALPHABET_SIZE: u8 = 127;

/// Converts a Phred score into the highest quality symbol still considered bad.
///
/// `None` disables quality truncation.
pub fn last_bad_quality_char(phred: Option<u8>, offset: u8) -> Result<Option<u8>> {
    let Some(q) = phred else {
        return Ok(None);
    };
    match offset.checked_add(q) {
        Some(c) if c < QUALITY_ALPHABET_SIZE => Ok(Some(c)),
        _ => Err(DemuxError::invalid_parameter(
            "phred-quality-threshold",
            format!(
                "{q} with offset {offset} falls outside the quality alphabet (max {})",
                QUALITY_ALPHABET_SIZE - 1 - offset.min(QUALITY_ALPHABET_SIZE - 1)
            ),
        )),
    }
}

pub struct RunLengthTrimmer;

impl RunLengthTrimmer {
    /// Truncates at the first run of bad-quality bases longer than `max_run_length`.
    ///
    /// A base is bad when its quality symbol sorts at or below `last_bad`. The
    /// whole offending run and everything after it is dropped. Returns the
    /// number of bases removed.
    ///
    /// Positions are read from `qual`. A sequence shorter than its qualities
    /// is cut at the same position or left alone, and a cut never splits a
    /// multi-byte character.
    pub fn trim(
        seq: &mut String,
        qual: &mut String,
        max_run_length: usize,
        last_bad: u8,
    ) -> usize {
        let mut last_good_end = 0;
        let mut bad_run = 0;
        for (i, &q) in qual.as_bytes().iter().enumerate() {
            if q <= last_bad {
                bad_run += 1;
            } else {
                bad_run = 0;
                last_good_end = i + 1;
            }
            if bad_run > max_run_length {
                let before = seq.len();
                truncate_at_boundary(seq, last_good_end);
                truncate_at_boundary(qual, last_good_end);
                return before - seq.len();
            }
        }
        0
    }
}

fn truncate_at_boundary(s: &mut String, at: usize) {
    let mut at = at.min(s.len());
    while !s.is_char_boundary(at) {
        at -= 1;
    }
    s.truncate(at);
}
