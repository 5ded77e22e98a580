//! pdfjobs - find PDF job boundaries in a spool file
//!
//! Reads a spool (a file or stdin) in fixed-size chunks, the way a print
//! pipeline receives it, and lists every job found: PDFs up to their
//! final `%%EOF`, truncated PDFs, and anything else.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use memmap2::Mmap;
use pdfjob_core::api::jobs::{DEFAULT_CHUNK_SIZE, JobKind, JobSpan, ScanOptions, scan_jobs};
use pdfjob_core::params::JobParams;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output format for the job list.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// One `index offset length kind` line per job (default)
    #[default]
    Text,
    /// A JSON array of job objects
    Json,
}

/// List the PDF print jobs contained in a spool.
#[derive(Parser, Debug)]
#[command(name = "pdfjobs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Spool file to scan; stdin when absent or `-`
    input: Option<PathBuf>,

    /// Bytes handed to the parser per feed
    #[arg(short = 'c', long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Ignore declared /Length values and search for every endstream
    #[arg(long = "no-trust-length", action = ArgAction::SetTrue)]
    no_trust_length: bool,

    /// Require the spool to start with `%` (no leading whitespace)
    #[arg(long = "strict-header", action = ArgAction::SetTrue)]
    strict_header: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write each job into this directory (file input only)
    #[arg(short = 's', long)]
    split: Option<PathBuf>,

    /// Log parser transitions to stderr
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

#[derive(Serialize)]
struct SpanRecord {
    index: usize,
    offset: u64,
    length: u64,
    kind: &'static str,
}

impl From<&JobSpan> for SpanRecord {
    fn from(span: &JobSpan) -> Self {
        Self {
            index: span.index,
            offset: span.offset,
            length: span.length,
            kind: span.kind.as_str(),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn scan_options(args: &Args) -> ScanOptions {
    ScanOptions {
        chunk_size: args.chunk_size.max(1),
        params: JobParams {
            trust_declared_length: !args.no_trust_length,
            skip_leading_whitespace: !args.strict_header,
            ..Default::default()
        },
    }
}

/// Map a file; empty files cannot be mapped on every platform.
fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let len = file
        .metadata()
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    if len == 0 {
        return Ok(None);
    }
    // SAFETY: the spool is only read, and only for the lifetime of the map.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to map {}", path.display()))?;
    Ok(Some(mmap))
}

fn write_spans<W: Write>(out: &mut W, spans: &[JobSpan], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for span in spans {
                writeln!(
                    out,
                    "{} {} {} {}",
                    span.index,
                    span.offset,
                    span.length,
                    span.kind.as_str()
                )?;
            }
        }
        OutputFormat::Json => {
            let records: Vec<SpanRecord> = spans.iter().map(SpanRecord::from).collect();
            serde_json::to_writer_pretty(&mut *out, &records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn split_jobs(dir: &Path, data: &[u8], spans: &[JobSpan]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for span in spans {
        let ext = match span.kind {
            JobKind::Pdf | JobKind::Truncated => "pdf",
            JobKind::Other => "bin",
        };
        let start = usize::try_from(span.offset)?;
        let end = usize::try_from(span.end())?;
        let Some(bytes) = data.get(start..end) else {
            bail!("job {} lies outside the input", span.index);
        };
        let path = dir.join(format!("job-{:03}.{ext}", span.index));
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "job written");
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let options = scan_options(args);
    let input = args.input.as_deref().filter(|p| *p != Path::new("-"));

    let spans = match input {
        Some(path) => {
            let mmap = map_file(path)?;
            let data: &[u8] = mmap.as_deref().unwrap_or(&[]);
            debug!(path = %path.display(), bytes = data.len(), "scanning");
            let spans = scan_jobs(data, &options)
                .with_context(|| format!("failed to scan {}", path.display()))?;
            if let Some(dir) = &args.split {
                split_jobs(dir, data, &spans)?;
            }
            spans
        }
        None => {
            if args.split.is_some() {
                bail!("--split needs a file input");
            }
            scan_jobs(io::stdin().lock(), &options).context("failed to scan stdin")?
        }
    };

    let mut out = BufWriter::new(io::stdout().lock());
    write_spans(&mut out, &spans, args.format)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);
    run(&args)
}
