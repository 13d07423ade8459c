use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use serde::Serialize;

use fastq_demux::config::Cli;
use fastq_demux::fastq::{open_fastq, SeqWriter};
use fastq_demux::{corrector_by_name, BarcodeResolver, Demultiplexer, RunStatistics, SampleRegistry};

#[derive(Serialize)]
struct JsonReport<'a> {
    command: &'a Cli,
    stats: &'a RunStatistics,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    cli.validate()?;
    debug!("{cli:?}");

    let registry = SampleRegistry::from_mapping_file(&cli.mapping_fp)?;
    let corrector = cli
        .barcode_correction
        .as_deref()
        .map(|name| corrector_by_name(name, &registry))
        .transpose()?;
    let resolver = BarcodeResolver::new(&registry, corrector.as_deref());

    let mut writer = SeqWriter::create(&cli.output, cli.output_format.into(), cli.compression)?;
    let mut options = cli.options();
    let mut stats = RunStatistics::default();

    // Each pair gets its own run; indices continue across runs.
    for (read_fp, barcode_fp) in cli.sequence_read_fps.iter().zip(&cli.barcode_read_fps) {
        info!("Demultiplexing {} with barcodes from {}", read_fp.display(), barcode_fp.display());
        let reads = open_fastq(read_fp, "read")?;
        let barcodes = open_fastq(barcode_fp, "barcode")?;
        let mut demux = Demultiplexer::new(barcodes, reads, resolver, options.clone())?;
        for rec in demux.by_ref() {
            let rec = rec.with_context(|| {
                format!("Failed to demultiplex {} / {}", read_fp.display(), barcode_fp.display())
            })?;
            writer.write_record(&rec)?;
        }
        options.start_seq_index = demux.next_index();
        stats.merge(demux.stats());
    }
    writer.finish()?;
    stats.log_summary();

    let f = File::create(&cli.json)
        .with_context(|| format!("Failed to create {}", cli.json.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(f), &JsonReport { command: &cli, stats: &stats })?;
    info!("Wrote {} sequences to {}", stats.accepted(), cli.output.display());

    Ok(())
}
