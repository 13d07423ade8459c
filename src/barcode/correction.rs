//! Barcode error correction capability and the built-in correctors.

use crate::error::{DemuxError, Result};

use super::SampleRegistry;

/// Names accepted by [`corrector_by_name`].
pub const BUILTIN_CORRECTORS: &[&str] = &["nearest"];

/// Outcome of correcting one barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub barcode: String,
    pub errors: u32,
}

impl Correction {
    pub fn new(barcode: impl Into<String>, errors: u32) -> Self {
        Self { barcode: barcode.into(), errors }
    }
}

/// Maps an observed barcode to a corrected barcode and the number of errors fixed.
///
/// Implementations must be stateless with respect to the run so one corrector
/// can serve several pipelines at once.
pub trait BarcodeCorrector: Send + Sync {
    fn correct(&self, barcode: &str) -> Correction;
}

impl<F> BarcodeCorrector for F
where
    F: Fn(&str) -> Correction + Send + Sync,
{
    fn correct(&self, barcode: &str) -> Correction {
        self(barcode)
    }
}

/// Looks up a built-in corrector. Correctors that need the valid codewords
/// take them from `registry`.
pub fn corrector_by_name(
    name: &str,
    registry: &SampleRegistry,
) -> Result<Box<dyn BarcodeCorrector>> {
    match name {
        "nearest" => Ok(Box::new(NearestBarcode::new(registry))),
        _ => Err(DemuxError::UnknownCorrector {
            name: name.to_string(),
            known: BUILTIN_CORRECTORS.join(", "),
        }),
    }
}

/// Counts mismatching positions, stopping early once `max_mismatches` is exceeded.
#[must_use]
pub fn count_mismatches_with_max(a: &[u8], b: &[u8], max_mismatches: usize) -> usize {
    let mut mismatches = 0;
    for (x, y) in a.iter().zip(b) {
        if x != y {
            mismatches += 1;
            if mismatches > max_mismatches {
                return mismatches;
            }
        }
    }
    mismatches + a.len().abs_diff(b.len())
}

/// Corrects to the registered barcode with the smallest Hamming distance.
///
/// The closest barcode is only chosen when it is strictly closer than the
/// runner-up; on a tie the observed barcode comes back unchanged.
pub struct NearestBarcode {
    codewords: Vec<Vec<u8>>,
    length: Option<usize>,
}

impl NearestBarcode {
    pub fn new(registry: &SampleRegistry) -> Self {
        let mut codewords: Vec<Vec<u8>> =
            registry.barcodes().map(|b| b.as_bytes().to_vec()).collect();
        codewords.sort();
        Self { codewords, length: registry.barcode_len() }
    }
}

impl BarcodeCorrector for NearestBarcode {
    fn correct(&self, barcode: &str) -> Correction {
        let observed = barcode.as_bytes();
        if self.length != Some(observed.len()) {
            return Correction::new(barcode, u32::try_from(observed.len()).unwrap_or(u32::MAX));
        }

        let mut best_index: Option<usize> = None;
        let mut best = usize::MAX;
        let mut second_best = usize::MAX;
        for (i, codeword) in self.codewords.iter().enumerate() {
            let d = count_mismatches_with_max(observed, codeword, second_best);
            if d < best {
                second_best = best;
                best = d;
                best_index = Some(i);
            } else if d < second_best {
                second_best = d;
            }
        }

        let errors = u32::try_from(best).unwrap_or(u32::MAX);
        match best_index {
            Some(i) if best < second_best => {
                Correction::new(String::from_utf8_lossy(&self.codewords[i]), errors)
            }
            _ => Correction::new(barcode, errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SampleRegistry {
        SampleRegistry::from_pairs([("AAAAAA", "S1"), ("CCCCCC", "S2"), ("GGGGTT", "S3")]).unwrap()
    }

    #[test]
    fn test_count_mismatches_with_max() {
        assert_eq!(count_mismatches_with_max(b"AAAAAA", b"AAAAAA", 10), 0);
        assert_eq!(count_mismatches_with_max(b"AAAAAA", b"AAAAAT", 10), 1);
        assert_eq!(count_mismatches_with_max(b"AAAAAA", b"CCCCCC", 2), 3);
        assert_eq!(count_mismatches_with_max(b"AAA", b"AAAAA", 10), 2);
    }

    #[test]
    fn test_nearest_corrects_single_error() {
        let corrector = NearestBarcode::new(&registry());
        assert_eq!(corrector.correct("AAATAA"), Correction::new("AAAAAA", 1));
        assert_eq!(corrector.correct("GGGGTA"), Correction::new("GGGGTT", 1));
    }

    #[test]
    fn test_nearest_exact_codeword_has_zero_errors() {
        let corrector = NearestBarcode::new(&registry());
        assert_eq!(corrector.correct("CCCCCC"), Correction::new("CCCCCC", 0));
    }

    #[test]
    fn test_nearest_tie_leaves_barcode_unchanged() {
        let registry = SampleRegistry::from_pairs([("AAAA", "S1"), ("AATT", "S2")]).unwrap();
        let corrector = NearestBarcode::new(&registry);
        assert_eq!(corrector.correct("AAAT"), Correction::new("AAAT", 1));
    }

    #[test]
    fn test_nearest_wrong_length() {
        let corrector = NearestBarcode::new(&registry());
        assert_eq!(corrector.correct("AAAA"), Correction::new("AAAA", 4));
    }

    #[test]
    fn test_corrector_by_name() {
        let registry = registry();
        let corrector = corrector_by_name("nearest", &registry).unwrap();
        assert_eq!(corrector.correct("CCCCCA").barcode, "CCCCCC");

        let err = corrector_by_name("golay_12", &registry).err().unwrap();
        let msg = format!("{err}");
        assert!(msg.contains("golay_12"));
        assert!(msg.contains("nearest"));
    }

    #[test]
    fn test_closure_is_a_corrector() {
        let fixed = |_: &str| Correction::new("AAAC", 1);
        assert_eq!(fixed.correct("AAAA"), Correction::new("AAAC", 1));
    }
}
