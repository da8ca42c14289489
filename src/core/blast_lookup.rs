//! Common Lookup Table Infrastructure
//!
//! Shared by the protein (`blast_aalookup`), nucleotide (`blast_nalookup`) and
//! RPS (`blast_rps`) lookup tables:
//!
//! - [`PresenceVector`]: one bit per backbone slot, tested before any cell is touched
//! - [`ThinBackbone`]: the mutable, chained form filled while a query is indexed
//! - [`ThickBackbone`]: the frozen form, fixed-size cells plus one overflow array
//! - table geometry helpers (`charsize`, backbone size, mask, word hashing)
//!
//! A thin backbone becomes a thick one exactly once, through [`ThinBackbone::compact`],
//! which consumes it.

use std::ops::Range;

use log::debug;

use crate::error::{LookupError, Result};

/// Number of query offsets stored directly in a backbone cell.
pub const HITS_ON_BACKBONE: usize = 3;

/// Bits-to-shift from a backbone index to its presence-vector word.
pub const PV_ARRAY_BTS: usize = 6;
/// Mask selecting the bit inside a presence-vector word.
pub const PV_ARRAY_MASK: usize = 63;
/// Bits held by one presence-vector word.
pub const PV_BUCKET_BITS: usize = 64;

// ---------------------------------------------------------------------------
// Presence vector
// ---------------------------------------------------------------------------

/// Packed bit array with one bit per backbone slot.
///
/// Bit `i` is set iff backbone cell `i` holds at least one hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceVector {
    bits: Vec<u64>,
    len: usize,
}

impl PresenceVector {
    /// All-clear vector covering `len` slots.
    pub fn new(len: usize) -> Result<Self> {
        let words = pv_array_size(len);
        let mut bits = Vec::new();
        bits.try_reserve_exact(words)
            .map_err(LookupError::alloc("presence vector"))?;
        bits.resize(words, 0);
        Ok(Self { bits, len })
    }

    /// Number of slots covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark slot `index` as occupied.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    #[inline(always)]
    pub fn set(&mut self, index: usize) {
        assert!(index < self.len, "presence vector index {index} out of range");
        self.bits[index >> PV_ARRAY_BTS] |= 1u64 << (index & PV_ARRAY_MASK);
    }

    /// Whether slot `index` is occupied. Indices past the end read as clear, so a
    /// word hashed from out-of-alphabet letters is rejected rather than trusted.
    #[inline(always)]
    pub fn test(&self, index: usize) -> bool {
        index < self.len && (self.bits[index >> PV_ARRAY_BTS] >> (index & PV_ARRAY_MASK)) & 1 != 0
    }

    /// Number of occupied slots.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Number of presence-vector words needed for a backbone of `backbone_size` slots.
#[inline]
pub fn pv_array_size(backbone_size: usize) -> usize {
    (backbone_size + PV_BUCKET_BITS - 1) / PV_BUCKET_BITS
}

// ---------------------------------------------------------------------------
// Table geometry
// ---------------------------------------------------------------------------

#[inline]
pub fn ilog2(mut x: usize) -> usize {
    let mut lg = 0usize;
    while x > 1 {
        x >>= 1;
        lg += 1;
    }
    lg
}

/// Bits used per letter when hashing words over an alphabet of `alphabet_size`.
#[inline]
pub fn charsize_for(alphabet_size: usize) -> usize {
    ilog2(alphabet_size.saturating_sub(1)) + 1
}

/// Number of addressable backbone slots: the largest index a valid word can hash to, plus one.
#[inline]
pub fn compute_backbone_size(word_length: usize, alphabet_size: usize, charsize: usize) -> usize {
    let mut backbone_size: usize = 0;
    for i in 0..word_length {
        backbone_size |= (alphabet_size - 1) << (i * charsize);
    }
    backbone_size + 1
}

#[inline]
pub fn compute_mask(word_length: usize, charsize: usize) -> usize {
    (1usize << (word_length * charsize)) - 1
}

/// Hash a whole word, first letter in the most significant position.
#[inline]
pub fn compute_table_index(word: &[u8], charsize: usize) -> usize {
    word.iter()
        .fold(0usize, |index, &letter| (index << charsize) | letter as usize)
}

/// Shift one more letter into a running word hash.
#[inline(always)]
pub fn compute_table_index_incremental(index: usize, letter: u8, charsize: usize, mask: usize) -> usize {
    ((index << charsize) | letter as usize) & mask
}

/// Fixed hashing parameters of one lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableGeometry {
    /// Letters per indexed word.
    pub word_length: usize,
    pub alphabet_size: usize,
    pub charsize: usize,
    pub mask: usize,
    pub backbone_size: usize,
}

impl TableGeometry {
    pub fn new(word_length: usize, alphabet_size: usize, charsize: usize) -> Self {
        Self {
            word_length,
            alphabet_size,
            charsize,
            mask: compute_mask(word_length, charsize),
            backbone_size: compute_backbone_size(word_length, alphabet_size, charsize),
        }
    }

    /// Backbone index of `word`, or `MalformedInput` if the word has the wrong
    /// length or a letter outside the alphabet.
    pub fn word_index(&self, word: &[u8]) -> Result<usize> {
        if word.len() != self.word_length {
            return Err(LookupError::malformed(format!(
                "word has {} letters, table indexes words of {}",
                word.len(),
                self.word_length
            )));
        }
        if let Some(&bad) = word.iter().find(|&&l| l as usize >= self.alphabet_size) {
            return Err(LookupError::malformed(format!(
                "letter {bad} outside alphabet of size {}",
                self.alphabet_size
            )));
        }
        Ok(compute_table_index(word, self.charsize) & self.mask)
    }
}

// ---------------------------------------------------------------------------
// Thin backbone (indexing phase)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct HitNode {
    query_offset: i32,
    next: Option<u32>,
}

/// Chained backbone filled during indexing.
///
/// Hits live in one arena and are addressed by `u32`; every slot keeps the head
/// of its chain. Insertion prepends, so chains read newest-first until
/// [`compact`](ThinBackbone::compact) restores insertion order.
#[derive(Debug, Clone)]
pub struct ThinBackbone {
    heads: Vec<Option<u32>>,
    chain_lens: Vec<u32>,
    nodes: Vec<HitNode>,
    longest_chain: usize,
}

impl ThinBackbone {
    pub fn new(backbone_size: usize) -> Result<Self> {
        let mut heads = Vec::new();
        heads
            .try_reserve_exact(backbone_size)
            .map_err(LookupError::alloc("thin backbone"))?;
        heads.resize(backbone_size, None);

        let mut chain_lens = Vec::new();
        chain_lens
            .try_reserve_exact(backbone_size)
            .map_err(LookupError::alloc("thin backbone"))?;
        chain_lens.resize(backbone_size, 0);

        Ok(Self {
            heads,
            chain_lens,
            nodes: Vec::new(),
            longest_chain: 0,
        })
    }

    /// Prepend `query_offset` to the chain of slot `index`. O(1) amortized.
    pub fn add_hit(&mut self, index: usize, query_offset: i32) -> Result<()> {
        if index >= self.heads.len() {
            return Err(LookupError::malformed(format!(
                "backbone index {index} out of range ({} slots)",
                self.heads.len()
            )));
        }
        let node = u32::try_from(self.nodes.len())
            .map_err(|_| LookupError::malformed("more than u32::MAX word hits in one table"))?;
        self.nodes
            .try_reserve(1)
            .map_err(LookupError::alloc("hit chain arena"))?;
        self.nodes.push(HitNode {
            query_offset,
            next: self.heads[index],
        });
        self.heads[index] = Some(node);

        let len = &mut self.chain_lens[index];
        *len += 1;
        self.longest_chain = self.longest_chain.max(*len as usize);
        Ok(())
    }

    #[inline]
    pub fn backbone_size(&self) -> usize {
        self.heads.len()
    }

    /// Total hits stored across all chains.
    #[inline]
    pub fn num_hits(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn longest_chain(&self) -> usize {
        self.longest_chain
    }

    #[inline]
    pub fn chain_len(&self, index: usize) -> usize {
        self.chain_lens.get(index).copied().unwrap_or(0) as usize
    }

    /// Chain of slot `index`, newest hit first.
    pub fn chain(&self, index: usize) -> impl Iterator<Item = i32> + '_ {
        let mut cursor = self.heads.get(index).copied().flatten();
        std::iter::from_fn(move || {
            let node = self.nodes[cursor? as usize];
            cursor = node.next;
            Some(node.query_offset)
        })
    }

    /// Freeze into a [`ThickBackbone`].
    ///
    /// Every allocation the frozen form needs is reserved before the first cell is
    /// written, so an error leaves nothing half-built behind; the chains are dropped
    /// together with `self` either way.
    pub fn compact(self) -> Result<ThickBackbone> {
        let backbone_size = self.heads.len();
        let overflow_len: usize = self
            .chain_lens
            .iter()
            .map(|&n| (n as usize).saturating_sub(HITS_ON_BACKBONE))
            .sum();
        if overflow_len > u32::MAX as usize {
            return Err(LookupError::malformed("overflow array exceeds u32 addressing"));
        }

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(backbone_size)
            .map_err(LookupError::alloc("thick backbone"))?;
        let mut overflow = Vec::new();
        overflow
            .try_reserve_exact(overflow_len)
            .map_err(LookupError::alloc("overflow array"))?;
        let mut pv = PresenceVector::new(backbone_size)?;
        let mut scratch: Vec<i32> = Vec::new();
        scratch
            .try_reserve_exact(self.longest_chain)
            .map_err(LookupError::alloc("chain scratch"))?;

        let mut filled = 0usize;
        for index in 0..backbone_size {
            if self.chain_lens[index] == 0 {
                cells.push(BackboneCell::EMPTY);
                continue;
            }
            scratch.clear();
            scratch.extend(self.chain(index));
            scratch.reverse();
            cells.push(BackboneCell::pack(&scratch, &mut overflow));
            pv.set(index);
            filled += 1;
        }

        debug!(
            "finalized lookup table: backbone={} cells, filled={}, hits={}, overflow={}, longest_chain={}",
            backbone_size,
            filled,
            self.nodes.len(),
            overflow.len(),
            self.longest_chain
        );

        Ok(ThickBackbone {
            cells,
            overflow,
            pv,
            longest_chain: self.longest_chain,
            num_hits: self.nodes.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Thick backbone (frozen)
// ---------------------------------------------------------------------------

/// One frozen backbone slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackboneCell {
    /// Up to [`HITS_ON_BACKBONE`] hits, all stored in the cell. `len == 0` is an empty slot.
    Inline { len: u8, hits: [i32; HITS_ON_BACKBONE] },
    /// The first [`HITS_ON_BACKBONE`] hits in the cell, the remaining
    /// `count - HITS_ON_BACKBONE` at `overflow[cursor..]`.
    Overflowed {
        first: [i32; HITS_ON_BACKBONE],
        cursor: u32,
        count: u32,
    },
}

impl BackboneCell {
    pub const EMPTY: BackboneCell = BackboneCell::Inline {
        len: 0,
        hits: [0; HITS_ON_BACKBONE],
    };

    /// Build the cell for `hits` (insertion order), appending any tail to `overflow`.
    /// The caller has reserved room in `overflow` and bounded its length by `u32`.
    fn pack(hits: &[i32], overflow: &mut Vec<i32>) -> Self {
        if hits.len() <= HITS_ON_BACKBONE {
            let mut inline = [0; HITS_ON_BACKBONE];
            inline[..hits.len()].copy_from_slice(hits);
            BackboneCell::Inline {
                len: hits.len() as u8,
                hits: inline,
            }
        } else {
            let mut first = [0; HITS_ON_BACKBONE];
            first.copy_from_slice(&hits[..HITS_ON_BACKBONE]);
            let cursor = overflow.len() as u32;
            overflow.extend_from_slice(&hits[HITS_ON_BACKBONE..]);
            BackboneCell::Overflowed {
                first,
                cursor,
                count: hits.len() as u32,
            }
        }
    }

    /// Number of hits the cell stands for, inline and overflowed together.
    #[inline]
    pub fn len(&self) -> usize {
        match *self {
            BackboneCell::Inline { len, .. } => len as usize,
            BackboneCell::Overflowed { count, .. } => count as usize,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Frozen backbone: cells, overflow and presence vector. Read-only, `Sync`.
#[derive(Debug, Clone)]
pub struct ThickBackbone {
    cells: Vec<BackboneCell>,
    overflow: Vec<i32>,
    pv: PresenceVector,
    longest_chain: usize,
    num_hits: usize,
}

impl ThickBackbone {
    /// Hits stored for slot `index`, in insertion order. Empty for out-of-range indices.
    #[inline(always)]
    pub fn hits(&self, index: usize) -> CellHits<'_> {
        match self.cells.get(index) {
            Some(BackboneCell::Inline { len, hits }) => CellHits::new(&hits[..*len as usize], &[]),
            Some(BackboneCell::Overflowed { first, cursor, count }) => {
                let start = *cursor as usize;
                let end = start + *count as usize - HITS_ON_BACKBONE;
                CellHits::new(first, &self.overflow[start..end])
            }
            None => CellHits::default(),
        }
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<&BackboneCell> {
        self.cells.get(index)
    }

    #[inline]
    pub fn presence_vector(&self) -> &PresenceVector {
        &self.pv
    }

    #[inline]
    pub fn overflow(&self) -> &[i32] {
        &self.overflow
    }

    #[inline]
    pub fn backbone_size(&self) -> usize {
        self.cells.len()
    }

    /// Longest hit list of any slot; output buffers of at least this size never
    /// need to split a cell across scan calls.
    #[inline]
    pub fn longest_chain(&self) -> usize {
        self.longest_chain
    }

    #[inline]
    pub fn num_hits(&self) -> usize {
        self.num_hits
    }
}

/// Hit list of one cell, split into its stored head and its overflow tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellHits<'a> {
    head: &'a [i32],
    tail: &'a [i32],
}

impl<'a> CellHits<'a> {
    #[inline]
    pub fn new(head: &'a [i32], tail: &'a [i32]) -> Self {
        Self { head, tail }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<i32> {
        if i < self.head.len() {
            Some(self.head[i])
        } else {
            self.tail.get(i - self.head.len()).copied()
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + 'a {
        self.head.iter().chain(self.tail.iter()).copied()
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Exact-match query indexing
// ---------------------------------------------------------------------------

/// Add one hit per valid word start of `seq` inside each half-open range of `locations`.
///
/// Ranges shorter than `full_word_length` are skipped. A letter outside the alphabet
/// moves the next eligible word end past itself, so no indexed word contains one.
/// With `byte_aligned`, each range end is first rounded down to a whole packed byte.
/// Returns the number of hits added.
pub(crate) fn index_exact_words(
    backbone: &mut ThinBackbone,
    geometry: &TableGeometry,
    full_word_length: usize,
    byte_aligned: bool,
    seq: &[u8],
    query_bias: i32,
    locations: &[Range<usize>],
) -> Result<usize> {
    let word_length = geometry.word_length;
    let mut added = 0usize;

    for loc in locations {
        let from = loc.start;
        let mut to = loc.end.min(seq.len());
        if byte_aligned {
            to -= to % super::blast_encoding::COMPRESSION_RATIO;
        }
        if to < from || to - from < full_word_length {
            log::trace!("skipping range {}..{}: shorter than word", loc.start, loc.end);
            continue;
        }

        let mut index = 0usize;
        let mut word_target = from + word_length;
        for offset in from..to {
            let letter = seq[offset];
            // NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_lookup.c
            //   BlastLookupIndexQueryExactMatches:
            //     if (*s & invalid_mask) word_target = s + lut_word_length + 1;
            if letter as usize >= geometry.alphabet_size {
                word_target = offset + word_length + 1;
            }
            index = compute_table_index_incremental(index, letter, geometry.charsize, geometry.mask);
            if offset + 1 >= word_target {
                let start = offset + 1 - word_length;
                backbone.add_hit(index, query_offset(query_bias, start)?)?;
                added += 1;
            }
        }
    }

    Ok(added)
}

/// `query_bias + position` as a stored offset.
pub(crate) fn query_offset(query_bias: i32, position: usize) -> Result<i32> {
    i32::try_from(position)
        .ok()
        .and_then(|p| p.checked_add(query_bias))
        .filter(|&off| off >= 0)
        .ok_or_else(|| {
            LookupError::malformed(format!(
                "query offset {position} + bias {query_bias} is not a valid 32-bit offset"
            ))
        })
}
