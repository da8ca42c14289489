//! Unit tests for neighboring-word expansion (core/blast_aalookup.rs)

use wordlookup::utils::matrix::{aa_to_ncbistdaa, BLASTAA_SIZE};
use wordlookup::{AaLookupOptions, AaLookupTable, AaLookupTableBuilder, Pssm, ScoreMatrix};

use super::helpers::random_codes;

fn two_letter_options(threshold: i32) -> AaLookupOptions {
    AaLookupOptions::default()
        .with_alphabet_size(2)
        .with_word_length(2)
        .with_threshold(threshold)
}

fn indexed_words(table: &AaLookupTable, words: &[[u8; 2]]) -> Vec<[u8; 2]> {
    words
        .iter()
        .copied()
        .filter(|w| {
            let index = table.geometry().word_index(w).unwrap();
            !table.backbone().hits(index).is_empty()
        })
        .collect()
}

const ALL_WORDS: [[u8; 2]; 4] = [[0, 0], [0, 1], [1, 0], [1, 1]];

fn check_two_letter(matrix: &ScoreMatrix, threshold: i32) {
    for query in ALL_WORDS {
        let mut builder = AaLookupTableBuilder::new(two_letter_options(threshold)).unwrap();
        builder.add_neighboring_words(matrix, &query, 0, &[0..2]).unwrap();
        let table = builder.finalize().unwrap();

        // The query word is always present; every other word only if it qualifies.
        let expected: Vec<[u8; 2]> = ALL_WORDS
            .iter()
            .copied()
            .filter(|w| {
                *w == query || matrix.score(query[0], w[0]) + matrix.score(query[1], w[1]) >= threshold
            })
            .collect();
        assert_eq!(
            indexed_words(&table, &ALL_WORDS),
            expected,
            "query {query:?} threshold {threshold}"
        );
        let index = table.geometry().word_index(&query).unwrap();
        assert_eq!(table.backbone().hits(index).to_vec(), vec![0]);

        let extra = expected.len() - 1;
        assert_eq!(table.stats().exact_matches, 1);
        assert_eq!(table.stats().neighbor_matches, extra);
    }
}

#[test]
fn test_two_letter_identity_penalty_matrix() {
    // Match +3, mismatch -1: words score 6, 2 or -2.
    let matrix = ScoreMatrix::from_fn(2, |a, b| if a == b { 3 } else { -1 });
    for threshold in 1..=7 {
        check_two_letter(&matrix, threshold);
    }
}

#[test]
fn test_two_letter_all_and_nothing_boundaries() {
    // Match +3, mismatch +1: words score 6, 4 or 2.
    let matrix = ScoreMatrix::from_fn(2, |a, b| if a == b { 3 } else { 1 });

    // Above the best possible score only the query word itself is indexed.
    let mut none = AaLookupTableBuilder::new(two_letter_options(7)).unwrap();
    assert_eq!(none.add_neighboring_words(&matrix, &[0, 1], 0, &[0..2]).unwrap(), 1);
    assert_eq!(none.stats().neighbor_matches, 0);
    assert_eq!(none.stats().exact_matches, 1);
    let table = none.finalize().unwrap();
    assert_eq!(indexed_words(&table, &ALL_WORDS), vec![[0, 1]]);

    let mut all = AaLookupTableBuilder::new(two_letter_options(2)).unwrap();
    assert_eq!(all.add_neighboring_words(&matrix, &[0, 1], 0, &[0..2]).unwrap(), 4);
    let stats = all.stats();
    assert_eq!((stats.exact_matches, stats.neighbor_matches), (1, 3));
    let table = all.finalize().unwrap();
    assert_eq!(indexed_words(&table, &ALL_WORDS), ALL_WORDS.to_vec());

    for threshold in 1..=7 {
        check_two_letter(&matrix, threshold);
    }
}

#[test]
fn test_short_ranges_contribute_nothing() {
    let matrix = ScoreMatrix::from_fn(2, |a, b| if a == b { 3 } else { 1 });
    let mut builder = AaLookupTableBuilder::new(two_letter_options(2)).unwrap();
    let added = builder
        .add_neighboring_words(&matrix, &[0, 1, 1, 0, 1], 0, &[0..1, 2..3, 4..9])
        .unwrap();
    assert_eq!(added, 0);
}

#[test]
fn test_blosum62_matches_brute_force() {
    let matrix = ScoreMatrix::blosum62();
    // AXG and CPW at 30 self-score below their thresholds.
    for (query, threshold) in [
        (&b"LVW"[..], 11),
        (&b"GSA"[..], 11),
        (&b"KRH"[..], 13),
        (&b"CPW"[..], 20),
        (&b"AXG"[..], 11),
        (&b"CPW"[..], 30),
    ] {
        let codes = aa_to_ncbistdaa(query);
        let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default().with_threshold(threshold)).unwrap();
        builder.add_neighboring_words(&matrix, &codes, 0, &[0..3]).unwrap();
        let table = builder.finalize().unwrap();

        let mut expected = 0usize;
        for a in 0..BLASTAA_SIZE as u8 {
            for b in 0..BLASTAA_SIZE as u8 {
                for c in 0..BLASTAA_SIZE as u8 {
                    let score = matrix.score(codes[0], a) + matrix.score(codes[1], b) + matrix.score(codes[2], c);
                    let index = table.geometry().word_index(&[a, b, c]).unwrap();
                    let wanted = score >= threshold || [a, b, c][..] == codes[..];
                    let present = !table.backbone().hits(index).is_empty();
                    assert_eq!(present, wanted, "{query:?} vs {:?}", [a, b, c]);
                    expected += usize::from(wanted);
                }
            }
        }
        assert_eq!(table.backbone().num_hits(), expected);
    }
}

#[test]
fn test_repeated_word_shares_neighborhood() {
    let matrix = ScoreMatrix::blosum62();
    let query = aa_to_ncbistdaa(b"WWWAWWW");
    let mut builder = AaLookupTableBuilder::new(AaLookupOptions::default()).unwrap();
    builder.add_neighboring_words(&matrix, &query, 0, &[0..query.len()]).unwrap();
    let table = builder.finalize().unwrap();
    let www = table.geometry().word_index(&query[..3]).unwrap();
    // Every word here has WWW in its neighborhood; the two exact copies stay in order.
    let hits = table.backbone().hits(www).to_vec();
    let mut sorted = hits.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    let first = hits.iter().position(|&h| h == 0).unwrap();
    let second = hits.iter().position(|&h| h == 4).unwrap();
    assert_eq!(second, first + 1);
}

#[test]
fn test_pssm_matches_brute_force() {
    let alphabet = 6usize;
    let rows: Vec<Vec<i32>> = (0..5u64)
        .map(|pos| {
            random_codes(alphabet, 9, 100 + pos)
                .into_iter()
                .map(|v| v as i32 - 3)
                .collect()
        })
        .collect();
    let pssm = Pssm::from_rows(&rows).unwrap();
    let threshold = 6;
    let opts = AaLookupOptions::default()
        .with_alphabet_size(alphabet)
        .with_threshold(threshold)
        .with_pssm(true);
    let mut builder = AaLookupTableBuilder::new(opts).unwrap();
    builder.add_pssm_neighboring_words(&pssm, 50, &[0..5]).unwrap();
    let table = builder.finalize().unwrap();

    for a in 0..alphabet as u8 {
        for b in 0..alphabet as u8 {
            for c in 0..alphabet as u8 {
                let index = table.geometry().word_index(&[a, b, c]).unwrap();
                let mut expected = Vec::new();
                for start in 0..3usize {
                    let score = pssm.column(start)[a as usize]
                        + pssm.column(start + 1)[b as usize]
                        + pssm.column(start + 2)[c as usize];
                    if score >= threshold {
                        expected.push(50 + start as i32);
                    }
                }
                assert_eq!(table.backbone().hits(index).to_vec(), expected, "{:?}", [a, b, c]);
            }
        }
    }
}
