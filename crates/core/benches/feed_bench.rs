//! Benchmarks for chunked job-boundary parsing.
//!
//! Benchmark groups:
//! - `feed_chunk_size`: throughput of a whole job at various chunk sizes
//! - `feed_stream_path`: counted skip vs. `endstream` search over binary payloads

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use pdfjob_core::{FeedStatus, JobParams, ParseSession, SpoolSink};

/// Discards everything; keeps the sink out of the measurement.
struct NullSpool;

impl SpoolSink for NullSpool {
    fn append(&mut self, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }

    fn report_pdf_length(&mut self, _length: u64) {}
}

// =============================================================================
// Data Generation
// =============================================================================

fn payload(len: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// A job with `pages` page objects, each with a content stream of
/// `stream_len` bytes. Every other stream uses an indirect length.
fn generate_job(pages: usize, stream_len: usize) -> Vec<u8> {
    let mut out = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n".to_vec();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Count 0 /Kids [] >>\nendobj\n");
    let data = payload(stream_len);
    for i in 0..pages {
        let num = 3 + i * 2;
        out.extend_from_slice(
            format!(
                "{num} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 9 0 R >> >> >>\nendobj\n",
                num + 1
            )
            .as_bytes(),
        );
        let length = if i % 2 == 0 {
            format!("/Length {stream_len}")
        } else {
            "/Length 99 0 R".to_string()
        };
        out.extend_from_slice(format!("{} 0 obj\n<< {length} >>\nstream\n", num + 1).as_bytes());
        out.extend_from_slice(&data);
        out.extend_from_slice(b"\nendstream\nendobj\n");
    }
    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \ntrailer\n<< /Size 1 /Root 1 0 R >>\nstartxref\n0\n%%EOF\n");
    out
}

fn run(job: &[u8], chunk: usize, params: &JobParams) -> Option<u64> {
    let mut session = ParseSession::with_params(NullSpool, params.clone());
    for piece in job.chunks(chunk) {
        if session.feed(piece).ok()? != FeedStatus::NeedMoreData {
            break;
        }
    }
    session.finalize().ok()?;
    session.pdf_length()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_chunk_size(c: &mut Criterion) {
    let job = generate_job(50, 16 * 1024);
    let params = JobParams::default();
    let mut group = c.benchmark_group("feed_chunk_size");
    group.throughput(Throughput::Bytes(job.len() as u64));
    for chunk in [512, 4096, 64 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| run(black_box(&job), chunk, &params))
        });
    }
    group.finish();
}

fn bench_stream_path(c: &mut Criterion) {
    let job = generate_job(10, 256 * 1024);
    let mut group = c.benchmark_group("feed_stream_path");
    group.throughput(Throughput::Bytes(job.len() as u64));
    for (name, trust) in [("counted", true), ("search", false)] {
        let params = JobParams {
            trust_declared_length: trust,
            ..Default::default()
        };
        group.bench_function(name, |b| b.iter(|| run(black_box(&job), 64 * 1024, &params)));
    }
    group.finish();
}

criterion_group!(benches, bench_chunk_size, bench_stream_path);
criterion_main!(benches);
