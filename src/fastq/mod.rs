use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::warn;

use crate::error::{DemuxError, Result};
use crate::pipeline::OutputRecord;

/// One FASTQ record group. The header is stored without its leading `@`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub header: String,
    pub sequence: String,
    pub quality: String,
}

impl RawRecord {
    pub fn new(
        header: impl Into<String>,
        sequence: impl Into<String>,
        quality: impl Into<String>,
    ) -> Self {
        Self { header: header.into(), sequence: sequence.into(), quality: quality.into() }
    }
}

/// Streaming 4-line FASTQ parser.
///
/// A trailing partial record group is treated as end of input.
pub struct FastqReader<R: BufRead> {
    reader: R,
    stream: &'static str,
    records: u64,
    line: String,
}

impl<R: BufRead> FastqReader<R> {
    /// `stream` names the input in error messages ("barcode", "read").
    pub fn new(reader: R, stream: &'static str) -> Self {
        Self { reader, stream, records: 0, line: String::new() }
    }

    /// Number of complete records returned so far.
    pub fn records_read(&self) -> u64 {
        self.records
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .map_err(|source| DemuxError::Stream { stream: self.stream, source })?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = self.line.trim_end_matches(['\n', '\r']);
        Ok(Some(trimmed.to_string()))
    }

    fn malformed(&self, reason: impl Into<String>) -> DemuxError {
        DemuxError::MalformedRecord {
            stream: self.stream,
            record: self.records + 1,
            reason: reason.into(),
        }
    }

    pub fn next_record(&mut self) -> Result<Option<RawRecord>> {
        // skip blank lines between records and at end of file
        let header = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(l) if l.is_empty() => continue,
                Some(l) => break l,
            }
        };
        let (Some(sequence), Some(plus), Some(quality)) =
            (self.read_line()?, self.read_line()?, self.read_line()?)
        else {
            warn!(
                "Truncated record at end of {} stream after {} records",
                self.stream, self.records
            );
            return Ok(None);
        };

        let Some(header) = header.strip_prefix('@') else {
            return Err(self.malformed(format!("header line does not start with '@': '{header}'")));
        };
        if !plus.starts_with('+') {
            return Err(self.malformed(format!("separator line does not start with '+': '{plus}'")));
        }
        if !sequence.is_ascii() || !quality.is_ascii() {
            return Err(self.malformed("sequence and quality must be ASCII"));
        }
        if sequence.len() != quality.len() {
            return Err(self.malformed(format!(
                "sequence length {} does not match quality length {}",
                sequence.len(),
                quality.len()
            )));
        }

        self.records += 1;
        Ok(Some(RawRecord { header: header.to_string(), sequence, quality }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Opens a FASTQ file, decompressing `.gz` inputs. `-` reads standard input.
pub fn open_fastq(path: &Path, stream: &'static str) -> Result<FastqReader<Box<dyn BufRead>>> {
    let reader: Box<dyn BufRead> = if path == Path::new("-") || path == Path::new("/dev/stdin") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let f = File::open(path).map_err(|source| DemuxError::Io {
            path: path.to_path_buf(),
            operation: "open",
            source,
        })?;
        if is_gzip(path) {
            Box::new(BufReader::new(MultiGzDecoder::new(f)))
        } else {
            Box::new(BufReader::new(f))
        }
    };
    Ok(FastqReader::new(reader, stream))
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Output layout for accepted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat {
    Fasta,
    Fastq,
}

/// Writes demultiplexed records as FASTA or FASTQ.
pub struct SeqWriter {
    writer: Box<dyn Write>,
    format: SeqFormat,
    path: PathBuf,
}

impl SeqWriter {
    /// Creates `path`, compressing when it ends in `.gz`. `-` writes standard output.
    pub fn create(path: &Path, format: SeqFormat, compression_level: u32) -> Result<Self> {
        let writer: Box<dyn Write> = if path == Path::new("-") || path == Path::new("/dev/stdout") {
            Box::new(BufWriter::new(io::stdout()))
        } else {
            let f = File::create(path).map_err(|source| DemuxError::Io {
                path: path.to_path_buf(),
                operation: "create",
                source,
            })?;
            if is_gzip(path) {
                Box::new(BufWriter::new(GzEncoder::new(f, Compression::new(compression_level))))
            } else {
                Box::new(BufWriter::new(f))
            }
        };
        Ok(Self { writer, format, path: path.to_path_buf() })
    }

    pub fn write_record(&mut self, rec: &OutputRecord) -> Result<()> {
        self.write_inner(rec).map_err(|source| DemuxError::Io {
            path: self.path.clone(),
            operation: "write",
            source,
        })
    }

    fn write_inner(&mut self, rec: &OutputRecord) -> io::Result<()> {
        match self.format {
            SeqFormat::Fasta => {
                writeln!(self.writer, ">{}", rec.header)?;
                writeln!(self.writer, "{}", rec.sequence)?;
            }
            SeqFormat::Fastq => {
                writeln!(self.writer, "@{}", rec.header)?;
                writeln!(self.writer, "{}", rec.sequence)?;
                self.writer.write_all(b"+\n")?;
                writeln!(self.writer, "{}", rec.quality)?;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().map_err(|source| DemuxError::Io {
            path: self.path.clone(),
            operation: "flush",
            source,
        })
    }
}
