//! Shared PDF builders and feeding helpers for the integration tests.

#![allow(dead_code)]

use pdfjob_core::{FeedStatus, JobParams, MemorySpool, ParseSession};

/// `N 0 obj\n<body>\nendobj\n`
pub fn plain_object(num: usize, body: &str) -> Vec<u8> {
    format!("{num} 0 obj\n{body}\nendobj\n").into_bytes()
}

/// A stream object whose dictionary holds `length_entry` verbatim.
pub fn stream_object(num: usize, length_entry: &str, payload: &[u8]) -> Vec<u8> {
    let mut out = format!("{num} 0 obj\n<< {length_entry} /Filter /FlateDecode >>\nstream\n").into_bytes();
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out
}

/// A stream object with an accurate direct `/Length`.
pub fn counted_stream(num: usize, payload: &[u8]) -> Vec<u8> {
    stream_object(num, &format!("/Length {}", payload.len()), payload)
}

fn push_xref(out: &mut Vec<u8>, offsets: &[usize], first: usize) {
    out.extend_from_slice(format!("xref\n{first} {}\n", offsets.len()).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
}

/// Header, objects, xref table, trailer and `%%EOF\n`.
pub fn build_pdf(version: &str, objects: &[Vec<u8>]) -> Vec<u8> {
    let mut out = format!("%PDF-{version}\n%\u{e2}\u{e3}\u{cf}\u{d3}\n").into_bytes();
    let mut offsets = Vec::new();
    for obj in objects {
        offsets.push(out.len());
        out.extend_from_slice(obj);
    }
    let xref_pos = out.len();
    push_xref(&mut out, &offsets, 1);
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /ID [<0123ABCD> <0123ABCD>] >>\nstartxref\n{xref_pos}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

/// Append an incremental update holding `objects`, numbered from `first`.
pub fn append_update(pdf: &mut Vec<u8>, first: usize, objects: &[Vec<u8>]) {
    let mut offsets = Vec::new();
    for obj in objects {
        offsets.push(pdf.len());
        pdf.extend_from_slice(obj);
    }
    let xref_pos = pdf.len();
    push_xref(pdf, &offsets, first);
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Prev 9 >>\nstartxref\n{xref_pos}\n%%EOF\n",
            first + objects.len()
        )
        .as_bytes(),
    );
}

/// A small but varied document: nested containers, strings, names with
/// escapes, a counted stream and a stream with an indirect length.
pub fn sample_pdf() -> Vec<u8> {
    build_pdf(
        "1.7",
        &[
            plain_object(1, "<< /Type /Catalog /Pages 2 0 R /Lang (en\\)US) >>"),
            plain_object(
                2,
                "<< /Type /Pages /Kids [3 0 R] /Count 1 /Dash [[3 2] 0] /Tag /A#20B >>",
            ),
            plain_object(
                3,
                "<< /Type /Page /MediaBox [0 0 612.0 792.5] /Contents 4 0 R\n   /Res << /Font << /F1 6 0 R >> >> /Fn { 2 copy } >> % page\n",
            ),
            counted_stream(4, b"BT /F1 12 Tf (endstream) Tj ET\x00\xff>>"),
            stream_object(5, "/Length 7 0 R", b"\x89binary endstreamX (( << [\x00\x01"),
            plain_object(6, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>"),
            plain_object(7, "36"),
        ],
    )
}

/// Everything observable about one run over a job.
#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub last_feed: FeedStatus,
    pub finalized: FeedStatus,
    pub pdf_length: Option<u64>,
    pub reported: Vec<u64>,
}

/// Feed `data` split at the given offsets, then finalize.
pub fn feed_split(data: &[u8], splits: &[usize], params: &JobParams) -> Outcome {
    let mut session = ParseSession::with_params(MemorySpool::new(), params.clone());
    let mut last_feed = FeedStatus::NeedMoreData;
    let mut start = 0;
    for &end in splits.iter().chain(std::iter::once(&data.len())) {
        last_feed = session.feed(&data[start..end]).expect("feed");
        start = end;
    }
    let finalized = session.finalize().expect("finalize");
    Outcome {
        last_feed,
        finalized,
        pdf_length: session.pdf_length(),
        reported: session.sink().reported_lengths().to_vec(),
    }
}

/// Feed `data` in `chunk`-byte pieces, then finalize.
pub fn feed_chunked(data: &[u8], chunk: usize, params: &JobParams) -> Outcome {
    let splits: Vec<usize> = (chunk..data.len()).step_by(chunk.max(1)).collect();
    feed_split(data, &splits, params)
}

pub fn feed_whole(data: &[u8]) -> Outcome {
    feed_split(data, &[], &JobParams::default())
}

/// Deterministic filler bytes.
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}
