//! Unit tests for nucleotide scanning (core/blast_nascan.rs)

use wordlookup::core::blast_nascan::{scan_subject_ag, scan_subject_exact};
use wordlookup::{
    collect_hits, NaLookupOptions, NaLookupTable, NaLookupTableBuilder, PackedNucleotides, ScanCursor,
};

use super::helpers::{brute_force_exact_pairs, random_codes, sorted_by_subject};

/// Pack 2-bit codes (0..4) four to a byte, first base in the high bits.
fn pack_codes(codes: &[u8]) -> Vec<u8> {
    let mut packed = vec![0u8; codes.len() / 4 + 1];
    for (i, &c) in codes.iter().enumerate() {
        packed[i / 4] |= c << (6 - 2 * (i % 4));
    }
    packed
}

fn build(query: &[u8], lut: usize, opts: NaLookupOptions) -> NaLookupTable {
    let opts = opts.with_word_length(opts.word_length.max(lut)).with_lut_word_length(lut);
    let mut builder = NaLookupTableBuilder::new(opts).unwrap();
    builder.index_query_exact_matches(query, 0, &[0..query.len()]).unwrap();
    builder.finalize().unwrap()
}

fn exact_options(word_length: usize) -> NaLookupOptions {
    NaLookupOptions::default().with_word_length(word_length)
}

#[test]
fn test_exact_scan_matches_brute_force() {
    let query = random_codes(300, 4, 11);
    let subject = random_codes(2_000, 4, 12);
    let packed = pack_codes(&subject);
    let view = PackedNucleotides::new(&packed, subject.len()).unwrap();
    let bases: Vec<u8> = (0..view.len()).map(|pos| view.base(pos)).collect();
    assert_eq!(bases, subject);

    for lut in [4usize, 6, 8] {
        let table = build(&query, lut, exact_options(lut));
        let hits = collect_hits(&table, view, 4096);
        assert_eq!(
            sorted_by_subject(hits),
            brute_force_exact_pairs(&query, &subject, lut),
            "lut_word_length {lut}"
        );
    }
}

#[test]
fn test_resumability_max_hits_one() {
    let query = random_codes(200, 4, 21);
    let subject = random_codes(1_500, 4, 22);
    let packed = pack_codes(&subject);
    let view = PackedNucleotides::new(&packed, subject.len()).unwrap();

    let exact = build(&query, 5, exact_options(5));
    let ag = build(&query, 5, exact_options(7).with_ag_scanning(true).with_scan_step(2));
    for table in [&exact, &ag] {
        let unbounded = collect_hits(table, view, 100_000);
        assert!(!unbounded.is_empty());
        assert_eq!(collect_hits(table, view, 1), unbounded);
        assert_eq!(collect_hits(table, view, 3), unbounded);
    }
}

#[test]
fn test_ag_step_one_equals_exact_scan() {
    let query = random_codes(400, 4, 31);
    let subject = random_codes(3_000, 4, 32);
    let packed = pack_codes(&subject);
    let view = PackedNucleotides::new(&packed, subject.len()).unwrap();

    let exact = build(&query, 6, exact_options(6));
    let ag = build(&query, 6, exact_options(6).with_ag_scanning(true).with_scan_step(1));
    assert_eq!(collect_hits(&ag, view, 7), collect_hits(&exact, view, 7));
}

#[test]
fn test_ag_larger_steps_are_subsets() {
    let query = random_codes(400, 4, 41);
    let subject = random_codes(3_000, 4, 42);
    let packed = pack_codes(&subject);
    let view = PackedNucleotides::new(&packed, subject.len()).unwrap();
    let exact = collect_hits(&build(&query, 6, exact_options(6)), view, 64);

    for step in 2..=5usize {
        let table = build(&query, 6, exact_options(10).with_ag_scanning(true).with_scan_step(step));
        let ag = collect_hits(&table, view, 64);
        let expected: Vec<(u32, u32)> = exact
            .iter()
            .copied()
            .filter(|&(_, s)| s as usize % step == 0)
            .collect();
        assert_eq!(ag, expected, "step {step}");
    }
}

#[test]
fn test_direct_scanner_entry_points() {
    let query = random_codes(64, 4, 51);
    let subject = random_codes(256, 4, 52);
    let packed = pack_codes(&subject);
    let view = PackedNucleotides::new(&packed, subject.len()).unwrap();
    let table = build(&query, 4, exact_options(4));

    let (mut q1, mut s1) = (vec![0u32; 1024], vec![0u32; 1024]);
    let (mut q2, mut s2) = (vec![0u32; 1024], vec![0u32; 1024]);
    let mut c1 = ScanCursor::new();
    let mut c2 = ScanCursor::new();
    let n1 = scan_subject_exact(&table, view, &mut c1, &mut q1, &mut s1, 1024);
    // The strided scanner with the table's step of 1 covers the same starts.
    let n2 = scan_subject_ag(&table, view, &mut c2, &mut q2, &mut s2, 1024);
    assert_eq!(n1, n2);
    assert_eq!(&q1[..n1], &q2[..n2]);
    assert_eq!(&s1[..n1], &s2[..n2]);
    assert_eq!(c1, c2);
    assert_eq!(c1.offset(), subject.len() - 3);
}

#[test]
fn test_cursor_mid_subject_start() {
    let query = [0u8, 1, 2, 3];
    let subject = [0u8, 1, 2, 3, 3, 0, 1, 2, 3];
    let packed = pack_codes(&subject);
    let view = PackedNucleotides::new(&packed, subject.len()).unwrap();
    let table = build(&query, 4, exact_options(4));

    let (mut q, mut s) = ([0u32; 4], [0u32; 4]);
    let mut cursor = ScanCursor::at(1);
    let n = scan_subject_exact(&table, view, &mut cursor, &mut q, &mut s, 4);
    assert_eq!(n, 1);
    assert_eq!((q[0], s[0]), (0, 5));
}

#[test]
fn test_byte_aligned_ag_requires_dividing_step() {
    let bad = NaLookupOptions::default()
        .with_word_length(11)
        .with_lut_word_length(8)
        .with_ag_scanning(true)
        .with_variable_wordsize(true)
        .with_scan_step(4);
    assert!(NaLookupTableBuilder::new(bad).is_err());
    let good = bad.with_word_length(12);
    assert!(NaLookupTableBuilder::new(good).is_ok());
}
