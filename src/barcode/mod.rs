//! Barcode to sample resolution.

mod correction;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::dna::NO_CALL_BASE;
use crate::error::{DemuxError, Result};

pub use self::correction::{
    corrector_by_name, count_mismatches_with_max, BarcodeCorrector, Correction, NearestBarcode,
    BUILTIN_CORRECTORS,
};

/// Exact barcode to sample id lookup. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SampleRegistry {
    by_barcode: HashMap<String, String>,
    barcode_len: Option<usize>,
}

impl SampleRegistry {
    /// Builds a registry from `(barcode, sample_id)` pairs.
    ///
    /// Barcodes must be unique, non-empty and all of one length.
    pub fn from_pairs<I, B, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (B, S)>,
        B: Into<String>,
        S: Into<String>,
    {
        let mut registry = SampleRegistry::default();
        for (i, (barcode, sample_id)) in pairs.into_iter().enumerate() {
            registry.insert(i + 1, barcode.into(), sample_id.into())?;
        }
        Ok(registry)
    }

    /// Parses a tab-delimited mapping: sample id in column 1, barcode in column 2.
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut registry = SampleRegistry::default();
        for (i, line) in reader.lines().enumerate() {
            let line_no = i + 1;
            let line = line.map_err(|source| DemuxError::Stream { stream: "mapping", source })?;
            let line = line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(sample_id), Some(barcode)) = (fields.next(), fields.next()) else {
                return Err(DemuxError::InvalidMapping {
                    line: line_no,
                    reason: "expected at least two tab-separated columns (sample id, barcode)"
                        .to_string(),
                });
            };
            registry.insert(line_no, barcode.trim().to_string(), sample_id.trim().to_string())?;
        }
        if registry.is_empty() {
            return Err(DemuxError::InvalidMapping {
                line: 0,
                reason: "no barcodes found".to_string(),
            });
        }
        Ok(registry)
    }

    pub fn from_mapping_file(path: &Path) -> Result<Self> {
        let f = File::open(path).map_err(|source| DemuxError::Io {
            path: path.to_path_buf(),
            operation: "open",
            source,
        })?;
        let registry = Self::from_reader(BufReader::new(f))?;
        info!(
            "Loaded {} barcodes of length {} from {}",
            registry.len(),
            registry.barcode_len().unwrap_or(0),
            path.display()
        );
        Ok(registry)
    }

    fn insert(&mut self, line: usize, barcode: String, sample_id: String) -> Result<()> {
        if barcode.is_empty() || sample_id.is_empty() {
            return Err(DemuxError::InvalidMapping {
                line,
                reason: "empty sample id or barcode".to_string(),
            });
        }
        match self.barcode_len {
            Some(len) if len != barcode.len() => {
                return Err(DemuxError::InvalidMapping {
                    line,
                    reason: format!(
                        "barcode '{barcode}' has length {}, expected {len}",
                        barcode.len()
                    ),
                });
            }
            _ => self.barcode_len = Some(barcode.len()),
        }
        if let Some(existing) = self.by_barcode.get(&barcode) {
            return Err(DemuxError::InvalidMapping {
                line,
                reason: format!("barcode '{barcode}' is already assigned to sample '{existing}'"),
            });
        }
        self.by_barcode.insert(barcode, sample_id);
        Ok(())
    }

    pub fn get(&self, barcode: &str) -> Option<&str> {
        self.by_barcode.get(barcode).map(String::as_str)
    }

    pub fn barcodes(&self) -> impl Iterator<Item = &str> {
        self.by_barcode.keys().map(String::as_str)
    }

    pub fn barcode_len(&self) -> Option<usize> {
        self.barcode_len
    }

    pub fn len(&self) -> usize {
        self.by_barcode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_barcode.is_empty()
    }
}

/// Outcome of resolving one barcode against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub error_count: u32,
    pub resolved_barcode: String,
    pub correction_attempted: bool,
    pub sample_id: Option<String>,
}

/// Resolves barcodes to samples, falling back to correction when the exact
/// lookup misses.
#[derive(Clone, Copy)]
pub struct BarcodeResolver<'a> {
    registry: &'a SampleRegistry,
    corrector: Option<&'a dyn BarcodeCorrector>,
}

impl<'a> BarcodeResolver<'a> {
    pub fn new(registry: &'a SampleRegistry, corrector: Option<&'a dyn BarcodeCorrector>) -> Self {
        Self { registry, corrector }
    }

    pub fn resolve(&self, barcode: &str) -> ResolutionResult {
        let sample_id = self.registry.get(barcode);
        let corrector = match (sample_id, self.corrector) {
            (None, Some(c)) if !barcode.as_bytes().contains(&NO_CALL_BASE) => c,
            // exact hit, no correction configured, or an N in the barcode
            _ => {
                return ResolutionResult {
                    error_count: 0,
                    resolved_barcode: barcode.to_string(),
                    correction_attempted: false,
                    sample_id: sample_id.map(str::to_string),
                };
            }
        };

        let Correction { barcode: corrected, errors } = corrector.correct(barcode);
        let sample_id = self.registry.get(&corrected).map(str::to_string);
        ResolutionResult {
            error_count: errors,
            resolved_barcode: corrected,
            correction_attempted: true,
            sample_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn registry() -> SampleRegistry {
        SampleRegistry::from_pairs([("AAAC", "S1"), ("CCCC", "S2")]).unwrap()
    }

    fn fixed_corrector(barcode: &'static str, errors: u32) -> impl BarcodeCorrector {
        move |_: &str| Correction::new(barcode, errors)
    }

    #[test]
    fn test_exact_match_never_corrects() {
        let registry = registry();
        let corrector = fixed_corrector("CCCC", 2);
        let resolvers = [
            BarcodeResolver::new(&registry, None),
            BarcodeResolver::new(&registry, Some(&corrector)),
        ];
        for resolver in resolvers {
            let r = resolver.resolve("AAAC");
            assert_eq!(r.error_count, 0);
            assert!(!r.correction_attempted);
            assert_eq!(r.sample_id.as_deref(), Some("S1"));
            assert_eq!(r.resolved_barcode, "AAAC");
        }
    }

    #[test]
    fn test_no_corrector_leaves_unassigned() {
        let registry = registry();
        let r = BarcodeResolver::new(&registry, None).resolve("AAAA");
        assert_eq!(
            r,
            ResolutionResult {
                error_count: 0,
                resolved_barcode: "AAAA".to_string(),
                correction_attempted: false,
                sample_id: None,
            }
        );
    }

    #[test]
    fn test_ambiguous_barcode_is_not_corrected() {
        let registry = registry();
        let corrector = fixed_corrector("AAAC", 1);
        let resolver = BarcodeResolver::new(&registry, Some(&corrector));
        for barcode in ["AANA", "NNNN", "CCCN"] {
            let r = resolver.resolve(barcode);
            assert!(!r.correction_attempted, "{barcode}");
            assert_eq!(r.sample_id, None);
            assert_eq!(r.resolved_barcode, barcode);
        }
    }

    #[test]
    fn test_other_ambiguity_codes_still_corrected() {
        let registry = registry();
        let corrector = fixed_corrector("AAAC", 1);
        let r = BarcodeResolver::new(&registry, Some(&corrector)).resolve("AARA");
        assert!(r.correction_attempted);
        assert_eq!(r.sample_id.as_deref(), Some("S1"));
    }

    #[test]
    fn test_correction_to_known_barcode() {
        let registry = registry();
        let corrector = fixed_corrector("AAAC", 1);
        let r = BarcodeResolver::new(&registry, Some(&corrector)).resolve("AAAA");
        assert_eq!(r.error_count, 1);
        assert_eq!(r.resolved_barcode, "AAAC");
        assert!(r.correction_attempted);
        assert_eq!(r.sample_id.as_deref(), Some("S1"));
    }

    #[test]
    fn test_correction_to_unknown_barcode() {
        let registry = registry();
        let corrector = fixed_corrector("GGGG", 3);
        let r = BarcodeResolver::new(&registry, Some(&corrector)).resolve("GGGA");
        assert_eq!(r.error_count, 3);
        assert_eq!(r.resolved_barcode, "GGGG");
        assert!(r.correction_attempted);
        assert_eq!(r.sample_id, None);
    }

    #[test]
    fn test_registry_from_reader_skips_comments() {
        let text = "#SampleID\tBarcodeSequence\tDescription\nS1\tAAAA\tfirst\n\nS2\tCCCC\r\n";
        let registry = SampleRegistry::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("AAAA"), Some("S1"));
        assert_eq!(registry.get("CCCC"), Some("S2"));
        assert_eq!(registry.get("aaaa"), None);
        assert_eq!(registry.barcode_len(), Some(4));
    }

    #[test]
    fn test_registry_rejects_duplicate_barcode() {
        let err = SampleRegistry::from_reader(Cursor::new("S1\tAAAA\nS2\tAAAA\n")).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidMapping { line: 2, .. }));
        assert!(format!("{err}").contains("S1"));
    }

    #[test]
    fn test_registry_rejects_mixed_lengths() {
        let err = SampleRegistry::from_pairs([("AAAA", "S1"), ("CCCCC", "S2")]).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidMapping { line: 2, .. }));
    }

    #[test]
    fn test_registry_rejects_short_lines_and_empty_input() {
        let err = SampleRegistry::from_reader(Cursor::new("S1 AAAA\n")).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidMapping { line: 1, .. }));
        let err = SampleRegistry::from_reader(Cursor::new("#only a header\n")).unwrap_err();
        assert!(matches!(err, DemuxError::InvalidMapping { line: 0, .. }));
    }

    #[test]
    fn test_registry_from_mapping_file() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "#SampleID\tBarcodeSequence").unwrap();
        writeln!(f, "PC.354\tAGCACGAGCCTA").unwrap();
        writeln!(f, "PC.355\tAACTCGTCGATG").unwrap();
        f.flush().unwrap();
        let registry = SampleRegistry::from_mapping_file(f.path()).unwrap();
        assert_eq!(registry.get("AACTCGTCGATG"), Some("PC.355"));
        assert_eq!(registry.barcode_len(), Some(12));
    }
}
