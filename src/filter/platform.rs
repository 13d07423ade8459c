pub struct PlatformDigit;

impl PlatformDigit {
    /// Reads the Illumina quality digit that follows `#` in the first token of
    /// a legacy header (`@name#0/1`). Returns `None` when there is no `#` or
    /// the next character is not a decimal digit.
    pub fn parse(header: &str) -> Option<u32> {
        let header = header.trim_start();
        let token = header.split_whitespace().next()?;
        let pos = token.find('#')?;
        header[pos + 1..].chars().next()?.to_digit(10)
    }

    /// True when the header carries the platform's "known bad read" flag (digit 0).
    pub fn is_flagged_bad(header: &str) -> bool {
        Self::parse(header) == Some(0)
    }
}
