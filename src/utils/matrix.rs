//! Scoring matrices for neighboring-word expansion
//!
//! Two encodings meet here:
//! 1. NCBISTDAA (28 characters) - sequence encoding for lookup/scan
//! 2. BLOSUM62 matrix order (25 characters) - packed scoring matrix indices
//!
//! [`ScoreMatrix`] is the dense, alphabet-indexed form the lookup builders consume;
//! [`ScoreMatrix::blosum62`] expands the packed table over the full 28-letter
//! alphabet. [`Pssm`] holds one score row per query (profile) position.
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_encoding.c
//!            ncbi-blast/c++/src/util/tables/sm_blosum62.c

use crate::error::{LookupError, Result};

/// NCBI BLASTAA_SIZE - size of amino acid alphabet for lookup tables
pub const BLASTAA_SIZE: usize = 28;

/// Size of BLOSUM62 matrix (25x25)
pub const BLOSUM62_SIZE: usize = 25;

/// Default score for unknown/sentinel residues (NCBI BLOSUM62 defscore)
/// Reference: ncbi-blast/c++/src/util/tables/sm_blosum62.c:95
///   const SNCBIPackedScoreMatrix NCBISM_Blosum62 = { ..., -4 };
pub const DEFSCORE: i32 = -4;

/// NCBISTDAA encoding (0-27)
/// Reference: blast_encoding.c NCBISTDAA_TO_AMINOACID
///   '-','A','B','C','D','E','F','G','H','I','K','L','M',
///   'N','P','Q','R','S','T','V','W','X','Y','Z','U','*','O','J'
pub mod ncbistdaa {
    pub const GAP: u8 = 0;   // '-'
    pub const A: u8 = 1;
    pub const B: u8 = 2;     // Asn or Asp
    pub const C: u8 = 3;
    pub const D: u8 = 4;
    pub const E: u8 = 5;
    pub const F: u8 = 6;
    pub const G: u8 = 7;
    pub const H: u8 = 8;
    pub const I: u8 = 9;
    pub const K: u8 = 10;
    pub const L: u8 = 11;
    pub const M: u8 = 12;
    pub const N: u8 = 13;
    pub const P: u8 = 14;
    pub const Q: u8 = 15;
    pub const R: u8 = 16;
    pub const S: u8 = 17;
    pub const T: u8 = 18;
    pub const V: u8 = 19;
    pub const W: u8 = 20;
    pub const X: u8 = 21;    // Unknown
    pub const Y: u8 = 22;
    pub const Z: u8 = 23;    // Glu or Gln
    pub const U: u8 = 24;    // Selenocysteine
    pub const STOP: u8 = 25; // '*'
    pub const O: u8 = 26;    // Pyrrolysine
    pub const J: u8 = 27;    // Leu or Ile
}

/// Convert NCBISTDAA index (0-27) to BLOSUM62 matrix index (0-24)
/// Invalid/gap characters map to X (23)
/// Reference: NCBI uses this conversion internally for scoring
#[inline(always)]
pub fn ncbistdaa_to_blosum62(ncbi: u8) -> u8 {
    const TABLE: [u8; 28] = [
        23, // 0: '-' (gap) -> X
        0,  // 1: A -> 0
        20, // 2: B -> 20
        4,  // 3: C -> 4
        3,  // 4: D -> 3
        6,  // 5: E -> 6
        13, // 6: F -> 13
        7,  // 7: G -> 7
        8,  // 8: H -> 8
        9,  // 9: I -> 9
        11, // 10: K -> 11
        10, // 11: L -> 10
        12, // 12: M -> 12
        2,  // 13: N -> 2
        14, // 14: P -> 14
        5,  // 15: Q -> 5
        1,  // 16: R -> 1
        15, // 17: S -> 15
        16, // 18: T -> 16
        19, // 19: V -> 19
        17, // 20: W -> 17
        23, // 21: X -> 23
        18, // 22: Y -> 18
        22, // 23: Z -> 22
        23, // 24: U (selenocysteine) -> X
        24, // 25: '*' (stop) -> 24
        23, // 26: O (pyrrolysine) -> X
        21, // 27: J -> 21
    ];
    if ncbi < 28 {
        TABLE[ncbi as usize]
    } else {
        23 // Unknown -> X
    }
}

/// Convert ASCII amino acid character to NCBISTDAA index (0-27)
/// Reference: blast_encoding.c AMINOACID_TO_NCBISTDAA
#[inline(always)]
pub fn aa_char_to_ncbistdaa(aa: u8) -> u8 {
    const TABLE: [u8; 128] = [
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 25, 0, 0, 0, 0, 0, // '*' = 25
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 27, 10, 11, 12, 13, 26,
        // A   B   C   D   E   F   G   H   I   J   K   L   M   N   O
        14, 15, 16, 17, 18, 24, 19, 20, 21, 22, 23, 0, 0, 0, 0, 0,
        // P   Q   R   S   T   U   V   W   X   Y   Z
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ];
    if aa < 128 {
        TABLE[aa as usize]
    } else {
        21 // Unknown -> X
    }
}

/// BLOSUM62 matrix in NCBI packed order: ARNDCQEGHILKMFPSTWYVBJZX*
/// Source: NCBI BLAST sm_blosum62.c (verbatim copy)
/// 25 symbols (0-24): A(0), R(1), N(2), D(3), C(4), Q(5), E(6), G(7), H(8), I(9),
///                    L(10), K(11), M(12), F(13), P(14), S(15), T(16), W(17), Y(18), V(19),
///                    B(20), J(21), Z(22), X(23), *(24)
pub static BLOSUM62: [i8; BLOSUM62_SIZE * BLOSUM62_SIZE] = [
    //       A,  R,  N,  D,  C,  Q,  E,  G,  H,  I,  L,  K,  M,  F,  P,  S,  T,  W,  Y,  V,  B,  J,  Z,  X,  *
    /*A*/    4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1, -1, -1, -4,
    /*R*/   -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1, -2,  0, -1, -4,
    /*N*/   -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  4, -3,  0, -1, -4,
    /*D*/   -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4, -3,  1, -1, -4,
    /*C*/    0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -1, -3, -1, -4,
    /*Q*/   -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0, -2,  4, -1, -4,
    /*E*/   -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1, -3,  4, -1, -4,
    /*G*/    0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -4, -2, -1, -4,
    /*H*/   -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0, -3,  0, -1, -4,
    /*I*/   -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3,  3, -3, -1, -4,
    /*L*/   -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4,  3, -3, -1, -4,
    /*K*/   -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0, -3,  1, -1, -4,
    /*M*/   -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3,  2, -1, -1, -4,
    /*F*/   -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3,  0, -3, -1, -4,
    /*P*/   -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -3, -1, -1, -4,
    /*S*/    1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0, -2,  0, -1, -4,
    /*T*/    0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1, -1, -1, -4,
    /*W*/   -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -2, -2, -1, -4,
    /*Y*/   -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -1, -2, -1, -4,
    /*V*/    0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3,  2, -2, -1, -4,
    /*B*/   -2, -1,  4,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4, -3,  0, -1, -4,
    /*J*/   -1, -2, -3, -3, -1, -2, -3, -4, -3,  3,  3, -3,  2,  0, -3, -2, -1, -2, -1,  2, -3,  3, -3, -1, -4,
    /*Z*/   -1,  0,  0,  1, -3,  4,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -2, -2, -2,  0, -3,  4, -1, -4,
    /*X*/   -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -4,
    /***/   -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1,
];

/// Get BLOSUM62 score for two amino acids in NCBISTDAA encoding
/// Handles the conversion from NCBISTDAA (28) to BLOSUM62 order (25) internally
/// 
/// NCBI FSM (Full Score Matrix) behavior:
/// - Index 0 (gap/sentinel) returns defscore (-4)
/// - This ensures proper X-drop termination at sequence boundaries
/// 
/// Reference: ncbi-blast/c++/src/util/tables/raw_scoremat.c:91
///   fsm->s[0][i] = psm->defscore;
#[inline(always)]
pub fn blosum62_score(aa1_ncbi: u8, aa2_ncbi: u8) -> i32 {
    // NCBI FSM: index 0 (gap/sentinel) returns defscore
    if aa1_ncbi == 0 || aa2_ncbi == 0 {
        return DEFSCORE;
    }
    let b1 = ncbistdaa_to_blosum62(aa1_ncbi) as usize;
    let b2 = ncbistdaa_to_blosum62(aa2_ncbi) as usize;
    BLOSUM62[b1 * BLOSUM62_SIZE + b2] as i32
}

/// Encode an ASCII protein sequence to NCBISTDAA, one residue per byte.
pub fn aa_to_ncbistdaa(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|&aa| aa_char_to_ncbistdaa(aa.to_ascii_uppercase()))
        .collect()
}

/// Dense square substitution matrix indexed by alphabet letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreMatrix {
    size: usize,
    scores: Vec<i32>,
}

impl ScoreMatrix {
    /// Build a `size x size` matrix from `score(row, col)`.
    pub fn from_fn(size: usize, mut score: impl FnMut(u8, u8) -> i32) -> Self {
        let mut scores = Vec::with_capacity(size * size);
        for a in 0..size {
            for b in 0..size {
                scores.push(score(a as u8, b as u8));
            }
        }
        Self { size, scores }
    }

    /// Wrap row-major scores; `scores.len()` must be `size * size`.
    pub fn from_scores(size: usize, scores: Vec<i32>) -> Result<Self> {
        if scores.len() != size * size {
            return Err(LookupError::malformed(format!(
                "{} scores do not form a {size}x{size} matrix",
                scores.len()
            )));
        }
        Ok(Self { size, scores })
    }

    /// BLOSUM62 over the NCBISTDAA alphabet, with the gap/sentinel row and column
    /// scoring [`DEFSCORE`].
    pub fn blosum62() -> Self {
        Self::from_fn(BLASTAA_SIZE, blosum62_score)
    }

    /// Number of letters the matrix covers.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Scores of `letter` against every letter.
    #[inline]
    pub fn row(&self, letter: u8) -> &[i32] {
        let start = letter as usize * self.size;
        &self.scores[start..start + self.size]
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.scores[a as usize * self.size + b as usize]
    }

    /// Best score of `letter` against any letter among the first `alphabet_size`.
    pub fn row_max(&self, letter: u8, alphabet_size: usize) -> i32 {
        self.row(letter)[..alphabet_size.min(self.size)]
            .iter()
            .copied()
            .max()
            .unwrap_or(DEFSCORE)
    }
}

/// Position-specific scoring matrix: one row of `alphabet_size` scores per
/// query position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pssm {
    alphabet_size: usize,
    scores: Vec<i32>,
}

impl Pssm {
    /// Build from per-position rows; every row must have the same, non-zero width.
    pub fn from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Self> {
        let alphabet_size = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if rows.is_empty() || alphabet_size == 0 {
            return Err(LookupError::malformed("PSSM has no columns"));
        }
        let mut scores = Vec::with_capacity(rows.len() * alphabet_size);
        for (pos, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != alphabet_size {
                return Err(LookupError::malformed(format!(
                    "PSSM row {pos} has {} scores, expected {alphabet_size}",
                    row.len()
                )));
            }
            scores.extend_from_slice(row);
        }
        Ok(Self {
            alphabet_size,
            scores,
        })
    }

    /// Number of query positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.scores.len() / self.alphabet_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Scores of every letter at query position `pos`.
    #[inline]
    pub fn column(&self, pos: usize) -> &[i32] {
        let start = pos * self.alphabet_size;
        &self.scores[start..start + self.alphabet_size]
    }
}
