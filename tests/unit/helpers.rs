//! Test utilities and helpers for unit tests
//!
//! - Deterministic residue generators
//! - A writer for small RPS profile databases
//! - Brute-force references for scanner output

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use byteorder::{NativeEndian, WriteBytesExt};
use tempfile::TempDir;

use wordlookup::core::blast_lookup::{charsize_for, TableGeometry};
use wordlookup::core::blast_rps::{RpsLookupHeader, RPS_HITS_PER_CELL, RPS_MAGIC_NUM_28, RPS_WORD_LENGTH};

/// Deterministic xorshift residues in `0..alphabet_size`.
pub fn random_codes(len: usize, alphabet_size: u8, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % alphabet_size as u64) as u8
        })
        .collect()
}

/// Every `(query_offset, subject_offset)` pair where the `word_length` letters at
/// both offsets agree, in subject order then query order.
pub fn brute_force_exact_pairs(query: &[u8], subject: &[u8], word_length: usize) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    if query.len() < word_length || subject.len() < word_length {
        return pairs;
    }
    for s in 0..=subject.len() - word_length {
        for q in 0..=query.len() - word_length {
            if query[q..q + word_length] == subject[s..s + word_length] {
                pairs.push((q as u32, s as u32));
            }
        }
    }
    pairs
}

/// Sort pairs by subject offset, then query offset.
pub fn sorted_by_subject(mut pairs: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    pairs.sort_by_key(|&(q, s)| (s, q));
    pairs
}

/// A profile database written to a temporary directory.
pub struct RpsFixture {
    pub dir: TempDir,
    pub lookup_path: PathBuf,
    pub profile_path: PathBuf,
    /// Stored hit lists per backbone slot, in the order written.
    pub cells: BTreeMap<usize, Vec<i32>>,
}

/// Write a 28-letter database indexing every exact word of each profile
/// sequence (NCBISTDAA). PSSM row `r`, column `c` scores `r * 100 + c`.
pub fn write_rps_database(profiles: &[Vec<u8>]) -> RpsFixture {
    let alphabet_size = 28usize;
    let geometry = TableGeometry::new(RPS_WORD_LENGTH, alphabet_size, charsize_for(alphabet_size));

    let mut offsets = vec![0i32];
    let mut cells: BTreeMap<usize, Vec<i32>> = BTreeMap::new();
    for profile in profiles {
        let base = *offsets.last().unwrap();
        for (start, word) in profile.windows(RPS_WORD_LENGTH).enumerate() {
            let index = geometry.word_index(word).unwrap();
            // Stored hits point at the word's last residue.
            let last = base + (start + RPS_WORD_LENGTH - 1) as i32;
            cells.entry(index).or_default().push(last);
        }
        offsets.push(base + profile.len() as i32);
    }

    let header_len = std::mem::size_of::<RpsLookupHeader>();
    let cell_len = 4 * (1 + RPS_HITS_PER_CELL);
    let start_of_backbone = header_len;
    let end_of_backbone = start_of_backbone + geometry.backbone_size * cell_len;

    let mut overflow: Vec<i32> = Vec::new();
    let mut backbone = vec![[0i32; 1 + RPS_HITS_PER_CELL]; geometry.backbone_size];
    for (&index, hits) in &cells {
        let cell = &mut backbone[index];
        cell[0] = hits.len() as i32;
        if hits.len() <= RPS_HITS_PER_CELL {
            cell[1..1 + hits.len()].copy_from_slice(hits);
        } else {
            cell[1] = hits[0];
            cell[2] = (overflow.len() * 4) as i32;
            overflow.extend_from_slice(&hits[1..]);
        }
    }
    let num_hits: usize = cells.values().map(Vec::len).sum();

    let dir = tempfile::tempdir().unwrap();
    let lookup_path = dir.path().join("db.loo");
    let profile_path = dir.path().join("db.rps");

    let mut w = BufWriter::new(File::create(&lookup_path).unwrap());
    for value in [
        RPS_MAGIC_NUM_28,
        1,
        num_hits as i32,
        cells.len() as i32,
        overflow.len() as i32,
        0,
        0,
        0,
        start_of_backbone as i32,
        end_of_backbone as i32,
    ] {
        w.write_i32::<NativeEndian>(value).unwrap();
    }
    for cell in &backbone {
        for &value in cell {
            w.write_i32::<NativeEndian>(value).unwrap();
        }
    }
    for &value in &overflow {
        w.write_i32::<NativeEndian>(value).unwrap();
    }
    w.flush().unwrap();

    let mut w = BufWriter::new(File::create(&profile_path).unwrap());
    w.write_i32::<NativeEndian>(RPS_MAGIC_NUM_28).unwrap();
    w.write_i32::<NativeEndian>(profiles.len() as i32).unwrap();
    for &offset in &offsets {
        w.write_i32::<NativeEndian>(offset).unwrap();
    }
    let rows = *offsets.last().unwrap() as usize + 1;
    for row in 0..rows {
        for col in 0..alphabet_size {
            w.write_i32::<NativeEndian>((row * 100 + col) as i32).unwrap();
        }
    }
    w.flush().unwrap();

    RpsFixture {
        dir,
        lookup_path,
        profile_path,
        cells,
    }
}
