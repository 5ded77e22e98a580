mod common;

use common::*;
use pdfjob_core::parser::find_endstream;
use pdfjob_core::{FeedStatus, JobParams, MemorySpool, ParseSession, StructureState};

const HEADER: &[u8] = b"%PDF-1.4\n";

fn untrusting() -> JobParams {
    JobParams {
        trust_declared_length: false,
        ..Default::default()
    }
}

/// Offset of the first payload byte of the first stream in `pdf`.
fn payload_start(pdf: &[u8]) -> usize {
    let at = pdf
        .windows(7)
        .position(|w| w == b"stream\n")
        .expect("stream keyword");
    at + 7
}

#[test]
fn test_length_by_count_skips_fake_endstream() {
    let payload = b"endstream ";
    assert_eq!(payload.len(), 10);
    let pdf = build_pdf("1.4", &[stream_object(1, "/Length 10", payload)]);
    let mid = payload_start(&pdf) + 5;

    let mut s = ParseSession::new(MemorySpool::new());
    s.feed(&pdf[..mid]).unwrap();
    assert_eq!(s.state(), StructureState::StreamLen);
    s.feed(&pdf[mid..]).unwrap();
    assert_eq!(s.finalize().unwrap(), FeedStatus::EndOfJob);
    assert_eq!(s.pdf_length(), Some(pdf.len() as u64));
}

#[test]
fn test_length_by_count_hides_structure_in_payload() {
    let payload = b"\ntrailer\n<< >>\nstartxref\n0\n%%EOF\n";
    let pdf = build_pdf("1.4", &[counted_stream(1, payload)]);
    let outcome = feed_whole(&pdf);
    assert_eq!(outcome.reported, vec![pdf.len() as u64]);
}

#[test]
fn test_indirect_length_uses_search() {
    let payload = b"\x00endstreamX\ntrailer\n<< >>\nstartxref\n0\n%%EOF\n\x01";
    let pdf = build_pdf(
        "1.4",
        &[stream_object(1, "/Length 5 0 R", payload), plain_object(5, "42")],
    );
    let mid = payload_start(&pdf) + 3;

    let mut s = ParseSession::new(MemorySpool::new());
    s.feed(&pdf[..mid]).unwrap();
    assert_eq!(s.state(), StructureState::StreamSearch);
    s.feed(&pdf[mid..]).unwrap();
    assert_eq!(s.finalize().unwrap(), FeedStatus::EndOfJob);
    assert_eq!(s.sink().reported_lengths(), &[pdf.len() as u64]);
}

#[test]
fn test_untrusted_length_uses_search() {
    let pdf = build_pdf("1.4", &[counted_stream(1, b"0123456789")]);
    let mid = payload_start(&pdf) + 4;
    let outcome = feed_split(&pdf, &[mid], &untrusting());
    assert_eq!(outcome.pdf_length, Some(pdf.len() as u64));

    let mut s = ParseSession::with_params(MemorySpool::new(), untrusting());
    s.feed(&pdf[..mid]).unwrap();
    assert_eq!(s.state(), StructureState::StreamSearch);
}

#[test]
fn test_endstream_split_at_every_point() {
    let payload = noise(64, 3);
    assert_eq!(find_endstream(&payload), None);
    let pdf = build_pdf("1.4", &[stream_object(1, "/Length 9 0 R", &payload)]);
    let keyword = payload_start(&pdf) + payload.len() + 1;
    assert_eq!(&pdf[keyword..keyword + 9], b"endstream");

    for split in keyword..keyword + 9 {
        let mut s = ParseSession::new(MemorySpool::new());
        s.feed(&pdf[..split]).unwrap();
        assert_eq!(s.state(), StructureState::StreamSearch, "split at {split}");
        s.feed(&pdf[split..]).unwrap();
        assert_eq!(s.state(), StructureState::Incremental, "split at {split}");
        assert_eq!(s.pdf_length(), Some(pdf.len() as u64), "split at {split}");
    }
}

#[test]
fn test_endstream_in_one_byte_chunks() {
    let payload = noise(200, 4);
    let pdf = build_pdf("1.4", &[stream_object(1, "", &payload)]);
    let outcome = feed_chunked(&pdf, 1, &JobParams::default());
    assert_eq!(outcome.reported, vec![pdf.len() as u64]);
}

#[test]
fn test_spurious_endstream_at_chunk_end() {
    // The byte deciding the whitespace check arrives in the next chunk.
    let payload = b"abc endstream#def";
    let pdf = build_pdf("1.4", &[stream_object(1, "", payload)]);
    let fake_end = payload_start(&pdf) + 13;
    assert_eq!(&pdf[fake_end - 9..fake_end], b"endstream");

    let mut s = ParseSession::new(MemorySpool::new());
    s.feed(&pdf[..fake_end]).unwrap();
    assert_eq!(s.state(), StructureState::StreamCheck);
    s.feed(&pdf[fake_end..]).unwrap();
    assert_eq!(s.pdf_length(), Some(pdf.len() as u64));
}

#[test]
fn test_wrong_declared_length_falls_back_to_search() {
    // Too short: the byte after the counted payload is not 'e'.
    let pdf = build_pdf("1.4", &[stream_object(1, "/Length 3", b"0123456789")]);
    assert_eq!(feed_whole(&pdf).reported, vec![pdf.len() as u64]);

    // Lands on a keyword that starts with 'e' but is not endstream.
    let pdf = build_pdf("1.4", &[stream_object(1, "/Length 1", b"xend more")]);
    assert_eq!(feed_whole(&pdf).reported, vec![pdf.len() as u64]);
}

#[test]
fn test_crlf_after_stream_keyword() {
    let mut pdf = HEADER.to_vec();
    pdf.extend_from_slice(b"1 0 obj\n<< /Length 4 >>\nstream\r\nABCD\r\nendstream\nendobj\n");
    pdf.extend_from_slice(b"trailer\n<< >>\nstartxref\n9\n%%EOF\n");
    for split in 1..pdf.len() {
        let outcome = feed_split(&pdf, &[split], &JobParams::default());
        assert_eq!(outcome.pdf_length, Some(pdf.len() as u64), "split at {split}");
    }
}

#[test]
fn test_lone_cr_after_stream_keyword_is_payload() {
    let mut pdf = HEADER.to_vec();
    // The lone CR and the byte after it count towards /Length.
    pdf.extend_from_slice(b"1 0 obj\n<< /Length 9 >>\nstream\rABCDEFGH\nendstream\nendobj\n");
    pdf.extend_from_slice(b"trailer\n<< >>\nstartxref\n9\n%%EOF\n");
    let stream_end = pdf
        .windows(9)
        .position(|w| w == b"ABCDEFGH\n")
        .expect("payload")
        + 8;

    let mut s = ParseSession::new(MemorySpool::new());
    s.feed(&pdf[..stream_end]).unwrap();
    assert_eq!(s.state(), StructureState::StreamEnd);
    s.feed(&pdf[stream_end..]).unwrap();
    assert_eq!(s.pdf_length(), Some(pdf.len() as u64));
}

#[test]
fn test_zero_length_stream() {
    let pdf = build_pdf("1.4", &[stream_object(1, "/Length 0", b"")]);
    assert_eq!(feed_whole(&pdf).reported, vec![pdf.len() as u64]);
}

#[test]
fn test_negative_or_real_length_uses_search() {
    for entry in ["/Length -4", "/Length 4.0"] {
        let pdf = build_pdf("1.4", &[stream_object(1, entry, b"abcd")]);
        let mid = payload_start(&pdf) + 2;
        let mut s = ParseSession::new(MemorySpool::new());
        s.feed(&pdf[..mid]).unwrap();
        assert_eq!(s.state(), StructureState::StreamSearch, "{entry}");
        s.feed(&pdf[mid..]).unwrap();
        assert_eq!(s.pdf_length(), Some(pdf.len() as u64), "{entry}");
    }
}

#[test]
fn test_nested_length_is_not_stream_length() {
    let pdf = build_pdf(
        "1.4",
        &[stream_object(1, "/DecodeParms << /Length 2 >>", b"abcdef")],
    );
    let mid = payload_start(&pdf) + 1;
    let mut s = ParseSession::new(MemorySpool::new());
    s.feed(&pdf[..mid]).unwrap();
    assert_eq!(s.state(), StructureState::StreamSearch);
}

#[test]
fn test_large_payload_small_chunks() {
    let payload = noise(256 * 1024, 7);
    assert_eq!(find_endstream(&payload), None);
    let pdf = build_pdf(
        "1.6",
        &[
            counted_stream(1, &payload),
            stream_object(2, "/Length 3 0 R", &payload),
            plain_object(3, &payload.len().to_string()),
        ],
    );
    for chunk in [97, 4096] {
        for params in [JobParams::default(), untrusting()] {
            let outcome = feed_chunked(&pdf, chunk, &params);
            assert_eq!(outcome.reported, vec![pdf.len() as u64], "chunk {chunk}");
        }
    }
}
