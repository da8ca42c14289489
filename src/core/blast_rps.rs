//! RPS (Reverse Position-Specific) Lookup Table
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_rps.h
//!
//! The table is born frozen. Its backbone, overflow array, profile offsets and
//! PSSM rows are slices of two memory-mapped database files, read in place:
//!
//! - lookup file (`.loo`): [`RpsLookupHeader`], then backbone cells
//!   ([`RpsBackboneCell`]) from `start_of_backbone` to `end_of_backbone` (byte
//!   offsets), then `overflow_hits` 32-bit hits
//! - profile file (`.rps`): magic number, profile count, `num_profiles + 1`
//!   start offsets, then one row of `alphabet_size` scores per profile residue
//!   (plus one trailing row)
//!
//! Everything is native-endian 32-bit. [`RpsLookupTable`] borrows those slices
//! for `'a` and owns only its scalars, the presence vector it derives from the
//! backbone, and per-profile lengths; dropping it leaves the mapping untouched.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use log::info;

use super::blast_lookup::{charsize_for, CellHits, PresenceVector, TableGeometry};
use crate::error::{LookupError, Result};
use crate::utils::mmap::MappedFile;

/// Magic number of databases over the 26-letter protein alphabet.
pub const RPS_MAGIC_NUM: i32 = 0x1e16;
/// Magic number of databases over the 28-letter protein alphabet.
pub const RPS_MAGIC_NUM_28: i32 = 0x1e17;
/// Hits a cell stores before spilling into the overflow array.
pub const RPS_HITS_PER_CELL: usize = 3;
/// Word length of every RPS database.
pub const RPS_WORD_LENGTH: usize = 3;

const I32_BYTES: usize = std::mem::size_of::<i32>();

/// Fixed header at the start of the lookup file.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RpsLookupHeader {
    pub magic_number: i32,
    pub num_lookup_tables: i32,
    pub num_hits: i32,
    pub num_filled_backbone_cells: i32,
    pub overflow_hits: i32,
    pub unused: [i32; 3],
    pub start_of_backbone: i32,
    pub end_of_backbone: i32,
}

/// One backbone cell as laid out on disk.
///
/// With `num_used <= RPS_HITS_PER_CELL` the hits are `entries[..num_used]`.
/// Otherwise `entries[0]` is the first hit and `entries[1]` is a byte offset into
/// the overflow array holding the remaining `num_used - 1`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct RpsBackboneCell {
    pub num_used: i32,
    pub entries: [i32; RPS_HITS_PER_CELL],
}

/// Alphabet size a magic number stands for.
pub fn alphabet_size_for_magic(magic: i32) -> Option<usize> {
    match magic {
        RPS_MAGIC_NUM => Some(26),
        RPS_MAGIC_NUM_28 => Some(28),
        _ => None,
    }
}

/// Both database files, mapped read-only.
#[derive(Debug)]
pub struct RpsInfo {
    lookup: MappedFile,
    profile: MappedFile,
}

impl RpsInfo {
    /// Map the lookup (`.loo`) and profile (`.rps`) files. Nothing is validated
    /// until a table is built from them.
    pub fn open(lookup_path: impl AsRef<Path>, profile_path: impl AsRef<Path>) -> Result<Self> {
        let lookup = MappedFile::open(lookup_path)?;
        let profile = MappedFile::open(profile_path)?;
        Ok(Self { lookup, profile })
    }

    #[inline]
    pub fn lookup_bytes(&self) -> &[u8] {
        self.lookup.as_bytes()
    }

    #[inline]
    pub fn profile_bytes(&self) -> &[u8] {
        self.profile.as_bytes()
    }
}

/// Frozen lookup table over a borrowed profile database.
#[derive(Debug, Clone)]
pub struct RpsLookupTable<'a> {
    header: RpsLookupHeader,
    geometry: TableGeometry,
    num_profiles: usize,
    longest_chain: usize,
    backbone: &'a [RpsBackboneCell],
    overflow: &'a [i32],
    pv: PresenceVector,
    seq_offsets: &'a [i32],
    pssm: &'a [i32],
    profile_lengths: Vec<usize>,
}

impl<'a> RpsLookupTable<'a> {
    /// Build the table over a mapped database.
    pub fn new(info: &'a RpsInfo) -> Result<Self> {
        let table = Self::from_bytes(info.lookup_bytes(), info.profile_bytes())?;
        info!(
            "opened RPS database {} / {}: {} profiles, {} backbone cells ({} filled), {} overflow hits",
            info.lookup.path().display(),
            info.profile.path().display(),
            table.num_profiles,
            table.backbone.len(),
            table.pv.count_ones(),
            table.overflow.len()
        );
        Ok(table)
    }

    /// Build the table over raw file images. Both buffers must be 4-byte aligned.
    pub fn from_bytes(lookup: &'a [u8], profile: &'a [u8]) -> Result<Self> {
        let header_len = std::mem::size_of::<RpsLookupHeader>();
        if lookup.len() < header_len {
            return Err(LookupError::malformed(format!(
                "RPS lookup file holds {} bytes, header needs {header_len}",
                lookup.len()
            )));
        }
        let header: RpsLookupHeader = bytemuck::try_pod_read_unaligned(&lookup[..header_len])
            .map_err(|e| LookupError::malformed(format!("RPS lookup header: {e:?}")))?;

        let alphabet_size = alphabet_size_for_magic(header.magic_number).ok_or_else(|| {
            LookupError::malformed(format!("bad RPS lookup magic number {:#x}", header.magic_number))
        })?;
        if header.num_lookup_tables != 1 {
            return Err(LookupError::malformed(format!(
                "RPS lookup file holds {} tables, expected 1",
                header.num_lookup_tables
            )));
        }
        let geometry = TableGeometry::new(RPS_WORD_LENGTH, alphabet_size, charsize_for(alphabet_size));

        let backbone = Self::map_backbone(lookup, &header, header_len)?;
        if backbone.len() != geometry.backbone_size {
            return Err(LookupError::malformed(format!(
                "RPS backbone has {} cells, alphabet of {alphabet_size} needs {}",
                backbone.len(),
                geometry.backbone_size
            )));
        }
        let overflow = Self::map_overflow(lookup, &header)?;

        let (seq_offsets, pssm) = Self::map_profiles(profile, header.magic_number, alphabet_size)?;
        let num_profiles = seq_offsets.len() - 1;
        let profile_lengths = seq_offsets
            .windows(2)
            .map(|w| (w[1] - w[0]) as usize)
            .collect();

        let table_correction = (RPS_WORD_LENGTH - 1) as i32;
        let mut pv = PresenceVector::new(backbone.len())?;
        let mut longest_chain = 0usize;
        for (index, cell) in backbone.iter().enumerate() {
            let hits = Self::cell_hits(cell, overflow).ok_or_else(|| {
                LookupError::malformed(format!("RPS backbone cell {index} points outside the overflow array"))
            })?;
            if hits.is_empty() {
                continue;
            }
            if hits.iter().any(|h| h < table_correction) {
                return Err(LookupError::malformed(format!(
                    "RPS backbone cell {index} stores a hit before the end of a word"
                )));
            }
            pv.set(index);
            longest_chain = longest_chain.max(hits.len());
        }

        Ok(Self {
            header,
            geometry,
            num_profiles,
            longest_chain,
            backbone,
            overflow,
            pv,
            seq_offsets,
            pssm,
            profile_lengths,
        })
    }

    fn map_backbone(
        lookup: &'a [u8],
        header: &RpsLookupHeader,
        header_len: usize,
    ) -> Result<&'a [RpsBackboneCell]> {
        let start = usize::try_from(header.start_of_backbone).ok();
        let end = usize::try_from(header.end_of_backbone).ok();
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if s >= header_len && s <= e && e <= lookup.len() => (s, e),
            _ => {
                return Err(LookupError::malformed(format!(
                    "RPS backbone bounds {}..{} outside a {}-byte file",
                    header.start_of_backbone,
                    header.end_of_backbone,
                    lookup.len()
                )))
            }
        };
        bytemuck::try_cast_slice(&lookup[start..end])
            .map_err(|e| LookupError::malformed(format!("RPS backbone: {e:?}")))
    }

    fn map_overflow(lookup: &'a [u8], header: &RpsLookupHeader) -> Result<&'a [i32]> {
        let start = header.end_of_backbone as usize;
        let count = usize::try_from(header.overflow_hits)
            .map_err(|_| LookupError::malformed("negative RPS overflow size"))?;
        let end = count
            .checked_mul(I32_BYTES)
            .and_then(|bytes| start.checked_add(bytes))
            .filter(|&end| end <= lookup.len())
            .ok_or_else(|| LookupError::malformed(format!("RPS overflow of {count} hits runs past the file")))?;
        bytemuck::try_cast_slice(&lookup[start..end])
            .map_err(|e| LookupError::malformed(format!("RPS overflow: {e:?}")))
    }

    /// Split the profile file into start offsets and PSSM scores.
    fn map_profiles(profile: &'a [u8], magic: i32, alphabet_size: usize) -> Result<(&'a [i32], &'a [i32])> {
        let words: &'a [i32] = bytemuck::try_cast_slice(&profile[..profile.len() - profile.len() % I32_BYTES])
            .map_err(|e| LookupError::malformed(format!("RPS profile file: {e:?}")))?;
        if words.len() < 3 {
            return Err(LookupError::malformed("RPS profile file too short for its header"));
        }
        if words[0] != magic {
            return Err(LookupError::malformed(format!(
                "RPS profile magic {:#x} does not match lookup magic {magic:#x}",
                words[0]
            )));
        }
        let num_profiles = usize::try_from(words[1])
            .map_err(|_| LookupError::malformed("negative RPS profile count"))?;
        let offsets_end = 2 + num_profiles + 1;
        if words.len() < offsets_end {
            return Err(LookupError::malformed(format!(
                "RPS profile file too short for {num_profiles} start offsets"
            )));
        }
        let seq_offsets = &words[2..offsets_end];
        if seq_offsets[0] != 0 || seq_offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(LookupError::malformed("RPS profile start offsets are not ascending from 0"));
        }

        let rows = seq_offsets[num_profiles] as usize + 1;
        let pssm_end = rows
            .checked_mul(alphabet_size)
            .and_then(|n| n.checked_add(offsets_end))
            .filter(|&end| end <= words.len())
            .ok_or_else(|| LookupError::malformed(format!("RPS profile file too short for {rows} PSSM rows")))?;
        Ok((seq_offsets, &words[offsets_end..pssm_end]))
    }

    /// Hits of one on-disk cell, or `None` if its overflow reference is out of range.
    fn cell_hits(cell: &'a RpsBackboneCell, overflow: &'a [i32]) -> Option<CellHits<'a>> {
        let num_used = usize::try_from(cell.num_used).ok()?;
        if num_used <= RPS_HITS_PER_CELL {
            return Some(CellHits::new(&cell.entries[..num_used], &[]));
        }
        // entries[1] is a byte offset into the overflow array.
        // NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_aascan.c
        //   s_BlastRPSScanSubject:
        //     if (numhits <= RPS_HITS_PER_CELL) src = cell->entries;
        //     else src = (Int4 *)((Uint1 *)lookup->overflow + cell->entries[1]);
        let cursor = usize::try_from(cell.entries[1]).ok()?;
        if cursor % I32_BYTES != 0 {
            return None;
        }
        let start = cursor / I32_BYTES;
        let tail = overflow.get(start..start.checked_add(num_used - 1)?)?;
        Some(CellHits::new(&cell.entries[..1], tail))
    }

    /// Hits stored for backbone slot `index`, profile offsets of each word's last
    /// residue. Empty for out-of-range indices.
    #[inline(always)]
    pub fn hits(&self, index: usize) -> CellHits<'a> {
        self.backbone
            .get(index)
            .and_then(|cell| Self::cell_hits(cell, self.overflow))
            .unwrap_or_default()
    }

    /// Amount subtracted from stored hits to get word starts.
    #[inline]
    pub fn table_correction(&self) -> i32 {
        // NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_aascan.c
        //   s_BlastRPSScanSubject: Int4 table_correction = lookup->wordsize - 1;
        (self.geometry.word_length - 1) as i32
    }

    #[inline]
    pub fn header(&self) -> &RpsLookupHeader {
        &self.header
    }

    #[inline]
    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    #[inline]
    pub fn word_length(&self) -> usize {
        self.geometry.word_length
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.geometry.alphabet_size
    }

    #[inline]
    pub fn presence_vector(&self) -> &PresenceVector {
        &self.pv
    }

    #[inline]
    pub fn backbone(&self) -> &'a [RpsBackboneCell] {
        self.backbone
    }

    #[inline]
    pub fn overflow(&self) -> &'a [i32] {
        self.overflow
    }

    #[inline]
    pub fn longest_chain(&self) -> usize {
        self.longest_chain
    }

    #[inline]
    pub fn num_profiles(&self) -> usize {
        self.num_profiles
    }

    /// Start of each profile in concatenated profile space, plus the total length.
    #[inline]
    pub fn profile_offsets(&self) -> &'a [i32] {
        self.seq_offsets
    }

    #[inline]
    pub fn profile_lengths(&self) -> &[usize] {
        &self.profile_lengths
    }

    /// Number of PSSM rows (profile residues plus the trailing row).
    #[inline]
    pub fn num_pssm_rows(&self) -> usize {
        self.pssm.len() / self.geometry.alphabet_size
    }

    /// Scores of every letter at concatenated profile position `i`.
    #[inline]
    pub fn pssm_row(&self, i: usize) -> Option<&'a [i32]> {
        let width = self.geometry.alphabet_size;
        self.pssm.get(i * width..(i + 1) * width)
    }

    /// Map a concatenated profile-space offset to `(profile, residue)`.
    pub fn profile_for_offset(&self, q_off: u32) -> Option<(usize, usize)> {
        let q_off = i32::try_from(q_off).ok()?;
        let offsets = self.seq_offsets;
        if q_off >= offsets[self.num_profiles] {
            return None;
        }
        let mut lo = 0usize;
        let mut hi = self.num_profiles;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if q_off < offsets[mid] {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        let profile = lo.saturating_sub(1);
        Some((profile, (q_off - offsets[profile]) as usize))
    }
}
