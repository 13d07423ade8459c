//! DNA sequence utilities.

/// Ambiguous (no-call) base symbol.
pub const NO_CALL_BASE: u8 = b'N';

/// Complements a single IUPAC base, preserving case.
///
/// Symbols outside the IUPAC alphabet are returned unchanged.
#[inline]
#[must_use]
pub const fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' | b'U' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'a' => b't',
        b't' | b'u' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        _ => base,
    }
}

/// Reverse complements a DNA string, preserving case.
///
/// # Examples
///
/// ```
/// use fastq_demux::dna::reverse_complement;
///
/// assert_eq!(reverse_complement("ACGTN"), "NACGT");
/// assert_eq!(reverse_complement("aacg"), "cgtt");
/// ```
#[must_use]
pub fn reverse_complement(seq: &str) -> String {
    seq.bytes().rev().map(|b| complement_base(b) as char).collect()
}

/// Reverses a quality string so it lines up with a reverse-complemented sequence.
#[must_use]
pub fn reverse_quality(qual: &str) -> String {
    qual.chars().rev().collect()
}

/// Counts ambiguous bases (`N`) in a sequence.
#[inline]
#[must_use]
pub fn count_no_calls(seq: &str) -> usize {
    seq.bytes().filter(|&b| b == NO_CALL_BASE).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement_basic() {
        assert_eq!(reverse_complement("AAAA"), "TTTT");
        assert_eq!(reverse_complement("ACGT"), "ACGT");
        assert_eq!(reverse_complement("GATTACA"), "TGTAATC");
        assert_eq!(reverse_complement(""), "");
    }

    #[test]
    fn test_reverse_complement_iupac_and_case() {
        assert_eq!(reverse_complement("RYKM"), "KMRY");
        assert_eq!(reverse_complement("acgtn"), "nacgt");
        assert_eq!(reverse_complement("SW"), "WS");
    }

    #[test]
    fn test_reverse_complement_is_involution() {
        let seq = "ACGTNRYKMBDHVacgt";
        assert_eq!(reverse_complement(&reverse_complement(seq)), seq);
    }

    #[test]
    fn test_reverse_quality() {
        assert_eq!(reverse_quality("ABCD"), "DCBA");
        assert_eq!(reverse_quality(""), "");
    }

    #[test]
    fn test_count_no_calls_is_uppercase_only() {
        assert_eq!(count_no_calls("ANNA"), 2);
        assert_eq!(count_no_calls("annA"), 0);
        assert_eq!(count_no_calls("ACGT"), 0);
    }
}
