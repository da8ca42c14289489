//! Sequence Encoding
//!
//! Nucleotide queries are indexed one base per byte in BLASTNA codes (A=0, C=1,
//! G=2, T=3, ambiguity codes 4..15). Nucleotide subjects are scanned in packed
//! ncbi2na form.
//!
//! # Packing Order
//! 4 nucleotides are packed into each byte, most significant bits first:
//! - Base 0: bits 6-7 (shift 6)
//! - Base 1: bits 4-5 (shift 4)
//! - Base 2: bits 2-3 (shift 2)
//! - Base 3: bits 0-1 (shift 0)

use crate::error::{LookupError, Result};

/// Compression ratio: 4 nucleotides per byte
pub const COMPRESSION_RATIO: usize = 4;

/// Bit mask for extracting a single 2-bit base
const BASE_MASK: u8 = 0x03;

// IUPAC letter -> BLASTNA code; anything unrecognised maps to 15.
const IUPACNA_TO_BLASTNA: [u8; 128] = [
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15,  0, 10,  1, 11, 15, 15,  2, 12, 15, 15,  7, 15,  6, 14, 15,
    15, 15,  4,  9,  3,  3, 13,  8, 15,  5, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15,
];

#[inline]
fn encode_iupac_base_to_blastna(base: u8) -> u8 {
    let upper = base.to_ascii_uppercase() as usize;
    if upper < IUPACNA_TO_BLASTNA.len() {
        IUPACNA_TO_BLASTNA[upper]
    } else {
        15
    }
}

/// Encode an ASCII sequence to BLASTNA codes (one base per byte).
/// Codes above 3 are ambiguity codes and never take part in an indexed word.
pub fn encode_blastna(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&base| encode_iupac_base_to_blastna(base)).collect()
}

/// Encode an ASCII sequence to packed ncbi2na (4 bases per byte, remainder count
/// in the low bits of the last byte). Ambiguity codes keep their low two bits.
pub fn pack_ncbi2na(seq: &[u8]) -> Vec<u8> {
    if seq.is_empty() {
        return Vec::new();
    }

    let mut packed = vec![0u8; seq.len() / COMPRESSION_RATIO + 1];
    for (chunk, byte) in seq.chunks(COMPRESSION_RATIO).zip(packed.iter_mut()) {
        for (i, &base) in chunk.iter().enumerate() {
            let code = encode_iupac_base_to_blastna(base) & BASE_MASK;
            *byte |= code << (6 - 2 * i);
        }
    }
    let last = packed.len() - 1;
    packed[last] |= (seq.len() % COMPRESSION_RATIO) as u8;
    packed
}

/// Borrowed view of a packed ncbi2na subject sequence.
#[derive(Debug, Clone, Copy)]
pub struct PackedNucleotides<'a> {
    bytes: &'a [u8],
    len: usize,
}

impl<'a> PackedNucleotides<'a> {
    /// View `len` bases stored in `bytes`. Bytes past the last base (such as the
    /// remainder byte written by [`pack_ncbi2na`]) are allowed and ignored.
    pub fn new(bytes: &'a [u8], len: usize) -> Result<Self> {
        let needed = (len + COMPRESSION_RATIO - 1) / COMPRESSION_RATIO;
        if bytes.len() < needed {
            return Err(LookupError::malformed(format!(
                "{len} packed bases need {needed} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self { bytes, len })
    }

    /// Length in bases.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Base at `pos` (0=A, 1=C, 2=G, 3=T).
    #[inline(always)]
    pub fn base(&self, pos: usize) -> u8 {
        let byte = self.bytes[pos / COMPRESSION_RATIO];
        (byte >> (6 - 2 * (pos % COMPRESSION_RATIO))) & BASE_MASK
    }

    /// Hash of the `word_length` bases starting at `pos`, first base most significant.
    ///
    /// Works at any phase inside a byte: the covering bytes are loaded together,
    /// then the leading phase and trailing bases are shifted off. Requires
    /// `word_length <= 12` and `pos + word_length <= len`.
    #[inline(always)]
    pub fn word_at(&self, pos: usize, word_length: usize) -> usize {
        let phase = pos % COMPRESSION_RATIO;
        let first = pos / COMPRESSION_RATIO;
        let last = (pos + word_length - 1) / COMPRESSION_RATIO;
        let mut acc: u64 = 0;
        for &b in &self.bytes[first..=last] {
            acc = (acc << 8) | b as u64;
        }
        let covered = (last - first + 1) * COMPRESSION_RATIO;
        let trailing = covered - phase - word_length;
        ((acc >> (2 * trailing)) & ((1u64 << (2 * word_length)) - 1)) as usize
    }
}
