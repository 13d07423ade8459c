mod platform;
mod run_length;

use crate::dna::count_no_calls;

pub use self::platform::PlatformDigit;
pub use self::run_length::{last_bad_quality_char, RunLengthTrimmer, QUALITY_ALPHABET_SIZE};

/// Why a read was kept or dropped by [`QualityFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accepted,
    TooShort,
    TooManyAmbiguous,
    BadPlatformDigit,
}

/// Verdict plus the sequence and quality the verdict was reached on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    pub verdict: FilterVerdict,
    pub sequence: String,
    pub quality: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityFilter {
    pub max_bad_run_length: usize,
    /// Highest quality symbol counted as bad; `None` disables truncation.
    pub last_bad_quality_char: Option<u8>,
    pub min_length: usize,
    pub max_ambiguous: usize,
    pub filter_platform_digit: bool,
}

impl QualityFilter {
    pub fn apply(&self, header: &str, mut sequence: String, mut quality: String) -> Filtered {
        if self.filter_platform_digit && PlatformDigit::is_flagged_bad(header) {
            return Filtered { verdict: FilterVerdict::BadPlatformDigit, sequence, quality };
        }

        if let Some(last_bad) = self.last_bad_quality_char {
            RunLengthTrimmer::trim(&mut sequence, &mut quality, self.max_bad_run_length, last_bad);
        }

        let verdict = if sequence.len() < self.min_length {
            FilterVerdict::TooShort
        } else if count_no_calls(&sequence) > self.max_ambiguous {
            FilterVerdict::TooManyAmbiguous
        } else {
            FilterVerdict::Accepted
        };
        Filtered { verdict, sequence, quality }
    }
}
