//! Unit tests for indexing and finalize (core/blast_lookup.rs)

use wordlookup::core::blast_lookup::{BackboneCell, HITS_ON_BACKBONE};
use wordlookup::utils::matrix::aa_to_ncbistdaa;
use wordlookup::{
    collect_hits, encode_blastna, pack_ncbi2na, AaLookupOptions, AaLookupTableBuilder, LookupError,
    NaLookupOptions, NaLookupTableBuilder, PackedNucleotides,
};

use super::helpers::random_codes;

#[test]
fn test_presence_vector_consistent_after_finalize() {
    let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default().with_threshold(0)).unwrap();
    let query = random_codes(500, 28, 7);
    // Skip gap (0) to keep every word valid but leave the rest random.
    let query: Vec<u8> = query.into_iter().map(|r| r.max(1)).collect();
    builder.index_query_exact_matches(&query, 0, &[0..query.len()]).unwrap();
    let table = builder.finalize().unwrap();

    let backbone = table.backbone();
    for i in 0..backbone.backbone_size() {
        assert_eq!(
            backbone.presence_vector().test(i),
            !backbone.cell(i).unwrap().is_empty(),
            "slot {i}"
        );
    }
    assert_eq!(backbone.num_hits(), query.len() - 2);
}

#[test]
fn test_insertion_order_preserved_through_overflow() {
    let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default().with_threshold(0)).unwrap();
    let word = aa_to_ncbistdaa(b"PEP");
    let offsets = [40, 3, 17, 99, 0, 58, 21];
    for &off in &offsets {
        builder.add_word_hit(&word, off).unwrap();
    }
    let table = builder.finalize().unwrap();
    let index = table.geometry().word_index(&word).unwrap();
    assert_eq!(table.backbone().hits(index).to_vec(), offsets.to_vec());

    let subject = aa_to_ncbistdaa(b"PEP");
    let q: Vec<u32> = collect_hits(&table, subject.as_slice(), 2)
        .into_iter()
        .map(|(q, _)| q)
        .collect();
    assert_eq!(q, vec![40, 3, 17, 99, 0, 58, 21]);
}

#[test]
fn test_overflow_boundary_counts() {
    let opts = NaLookupOptions::default().with_word_length(4).with_lut_word_length(4);
    let mut builder = NaLookupTableBuilder::new(opts).unwrap();
    let full = encode_blastna(b"ACGT");
    let spill = encode_blastna(b"TTGA");
    for off in 0..HITS_ON_BACKBONE as i32 {
        builder.add_word_hit(&full, off).unwrap();
    }
    for off in 0..=HITS_ON_BACKBONE as i32 {
        builder.add_word_hit(&spill, 100 + off).unwrap();
    }
    let table = builder.finalize().unwrap();

    let full_index = 0b00_01_10_11;
    let spill_index = 0b11_11_10_00;
    assert!(matches!(
        table.backbone().cell(full_index),
        Some(BackboneCell::Inline { len, .. }) if *len as usize == HITS_ON_BACKBONE
    ));
    assert!(matches!(
        table.backbone().cell(spill_index),
        Some(BackboneCell::Overflowed { .. })
    ));
    assert_eq!(table.backbone().overflow().len(), 1);

    let ascii = b"ACGTTGA";
    let packed = pack_ncbi2na(ascii);
    let subject = PackedNucleotides::new(&packed, ascii.len()).unwrap();
    let hits = collect_hits(&table, subject, 1);
    let at_zero = hits.iter().filter(|&&(_, s)| s == 0).count();
    let at_three = hits.iter().filter(|&&(_, s)| s == 3).count();
    assert_eq!(at_zero, HITS_ON_BACKBONE);
    assert_eq!(at_three, HITS_ON_BACKBONE + 1);
    assert_eq!(hits.len(), 2 * HITS_ON_BACKBONE + 1);
}

#[test]
fn test_round_trip_with_bias() {
    // Two queries share one table through the bias.
    let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default()).unwrap();
    let matrix = wordlookup::ScoreMatrix::blosum62();
    let first = aa_to_ncbistdaa(b"MKWVTFISLL");
    let second = aa_to_ncbistdaa(b"GHWCYRPKQE");
    builder.add_neighboring_words(&matrix, &first, 0, &[0..first.len()]).unwrap();
    builder
        .add_neighboring_words(&matrix, &second, first.len() as i32, &[0..second.len()])
        .unwrap();
    let table = builder.finalize().unwrap();

    // WCY (self-score 11 + 9 + 7) sits at offset 2 of the second query.
    let subject = aa_to_ncbistdaa(b"AAWCYAA");
    let hits = collect_hits(&table, subject.as_slice(), 64);
    assert!(hits.contains(&((first.len() + 2) as u32, 2)), "{hits:?}");
}

#[test]
fn test_round_trip_low_self_score_words() {
    // AXA self-scores 7 and KAX 8, both below the default threshold of 11.
    let matrix = wordlookup::ScoreMatrix::blosum62();
    let query = aa_to_ncbistdaa(b"MKAXAQL");
    let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default()).unwrap();
    builder.add_neighboring_words(&matrix, &query, 0, &[0..query.len()]).unwrap();
    let table = builder.finalize().unwrap();

    let subject = aa_to_ncbistdaa(b"GGAXAGG");
    let hits = collect_hits(&table, subject.as_slice(), 16);
    assert!(hits.contains(&(2, 2)), "{hits:?}");

    // Every query word seeds against the query itself.
    let hits = collect_hits(&table, query.as_slice(), 1);
    for start in 0..=query.len() - 3 {
        assert!(hits.contains(&(start as u32, start as u32)), "word at {start}: {hits:?}");
    }
}

#[test]
fn test_word_outside_alphabet_is_malformed() {
    let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default()).unwrap();
    assert!(matches!(
        builder.add_word_hit(&[1, 2, 40], 0),
        Err(LookupError::MalformedInput(_))
    ));
    assert!(matches!(
        builder.add_word_hit(&[1, 2], 0),
        Err(LookupError::MalformedInput(_))
    ));
    assert_eq!(builder.num_hits(), 0);
}

#[test]
fn test_negative_bias_rejected() {
    let mut builder = NaLookupTableBuilder::new(NaLookupOptions::default()).unwrap();
    let query = encode_blastna(b"ACGTACGTACGT");
    assert!(builder.index_query_exact_matches(&query, -1, &[0..12]).is_err());
}
