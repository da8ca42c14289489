//! Amino Acid Lookup Table
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_aalookup.c
//!
//! Protein words are hashed `charsize` bits per residue, first residue most
//! significant. Besides exact query words, the table holds every *neighboring*
//! word: any word whose summed score against the query word reaches the
//! threshold. Scores come from a substitution matrix (one row per query letter)
//! or, for profile queries, from a PSSM (one column per query position).
//!
//! Neighbors are enumerated depth-first. A letter at position `i` is only
//! followed if the running score plus the best score still reachable at
//! positions `i + 1..` can meet the threshold, so the work tracks the number of
//! qualifying words rather than `alphabet_size ^ word_length`.

use std::ops::Range;

use log::debug;

use super::blast_lookup::{
    charsize_for, index_exact_words, query_offset, TableGeometry, ThickBackbone, ThinBackbone,
};
use super::blast_options::{AaLookupOptions, MAX_AA_WORD_LENGTH};
use crate::error::{LookupError, Result};
use crate::utils::matrix::{Pssm, ScoreMatrix};

/// Diagnostic counts of inserted words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborStats {
    /// Inserted words identical to the query word at that offset.
    pub exact_matches: usize,
    /// Every other inserted word. All PSSM-derived words count here.
    pub neighbor_matches: usize,
}

/// Mutable protein table, filled while queries are indexed.
#[derive(Debug)]
pub struct AaLookupTableBuilder {
    options: AaLookupOptions,
    geometry: TableGeometry,
    backbone: ThinBackbone,
    stats: NeighborStats,
}

impl AaLookupTableBuilder {
    pub fn new(options: AaLookupOptions) -> Result<Self> {
        options.validate()?;
        let charsize = charsize_for(options.alphabet_size);
        let geometry = TableGeometry::new(options.word_length, options.alphabet_size, charsize);
        let backbone = ThinBackbone::new(geometry.backbone_size)?;
        Ok(Self {
            options,
            geometry,
            backbone,
            stats: NeighborStats::default(),
        })
    }

    #[inline]
    pub fn options(&self) -> &AaLookupOptions {
        &self.options
    }

    #[inline]
    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    #[inline]
    pub fn stats(&self) -> NeighborStats {
        self.stats
    }

    #[inline]
    pub fn num_hits(&self) -> usize {
        self.backbone.num_hits()
    }

    /// Record that `word` occurs (or is to be reported) at `query_offset`.
    pub fn add_word_hit(&mut self, word: &[u8], query_offset: i32) -> Result<()> {
        let index = self.geometry.word_index(word)?;
        self.backbone.add_hit(index, query_offset)
    }

    /// Index the literal query words inside `locations`, without neighbors.
    pub fn index_query_exact_matches(
        &mut self,
        query: &[u8],
        query_bias: i32,
        locations: &[Range<usize>],
    ) -> Result<usize> {
        query_offset(query_bias, 0)?;
        let added = index_exact_words(
            &mut self.backbone,
            &self.geometry,
            self.geometry.word_length,
            false,
            query,
            query_bias,
            locations,
        )?;
        self.stats.exact_matches += added;
        Ok(added)
    }

    /// Index every word scoring at least `threshold` against each query word in
    /// `locations`, scoring with `matrix`. The query word itself is always indexed,
    /// even when its self-score is below `threshold`. A zero threshold indexes exact
    /// words only. Returns the number of hits added.
    pub fn add_neighboring_words(
        &mut self,
        matrix: &ScoreMatrix,
        query: &[u8],
        query_bias: i32,
        locations: &[Range<usize>],
    ) -> Result<usize> {
        if self.options.use_pssm {
            return Err(LookupError::malformed(
                "table was created for PSSM scoring; use add_pssm_neighboring_words",
            ));
        }
        let alphabet_size = self.geometry.alphabet_size;
        if matrix.size() < alphabet_size {
            return Err(LookupError::malformed(format!(
                "{}-letter matrix cannot score a {alphabet_size}-letter alphabet",
                matrix.size()
            )));
        }
        if self.options.threshold == 0 {
            return self.index_query_exact_matches(query, query_bias, locations);
        }

        let word_length = self.geometry.word_length;
        let charsize = self.geometry.charsize;

        // Group word starts by exact word so each word's neighborhood is walked once.
        let mut exact_words: Vec<(usize, i32)> = Vec::new();
        for loc in locations {
            let to = loc.end.min(query.len());
            if to < loc.start || to - loc.start < word_length {
                continue;
            }
            let starts = to - loc.start - word_length + 1;
            exact_words
                .try_reserve(starts)
                .map_err(LookupError::alloc("exact word list"))?;
            for start in loc.start..=to - word_length {
                let word = &query[start..start + word_length];
                if word.iter().any(|&l| l as usize >= alphabet_size) {
                    continue;
                }
                let index = self.geometry.word_index(word)?;
                exact_words.push((index, query_offset(query_bias, start)?));
            }
        }
        exact_words.sort_by_key(|&(index, _)| index);

        let row_max: Vec<i32> = (0..alphabet_size)
            .map(|letter| matrix.row_max(letter as u8, alphabet_size))
            .collect();

        let mut added = 0usize;
        let mut neighbors: Vec<usize> = Vec::new();
        let mut group_start = 0usize;
        while group_start < exact_words.len() {
            let word_index = exact_words[group_start].0;
            let group_end = group_start
                + exact_words[group_start..]
                    .iter()
                    .take_while(|&&(index, _)| index == word_index)
                    .count();
            let offsets = &exact_words[group_start..group_end];

            let mut search = NeighborSearch::new(word_length, alphabet_size, charsize, self.options.threshold);
            let mut self_score = 0i32;
            for pos in 0..word_length {
                let shift = (word_length - 1 - pos) * charsize;
                let letter = (word_index >> shift) & ((1 << charsize) - 1);
                let row = &matrix.row(letter as u8)[..alphabet_size];
                self_score = self_score.saturating_add(row[letter]);
                search.set_row(pos, row, row_max[letter]);
            }

            // The neighborhood misses the query word itself when it scores below
            // threshold; index it anyway so exact copies still seed.
            // NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_aalookup.c
            //   s_AddWordHitsCore: if (threshold == 0 || score < threshold)
            //       BlastLookupAddWordHit(...)
            if self_score < self.options.threshold {
                for &(_, q_off) in offsets {
                    self.backbone.add_hit(word_index, q_off)?;
                }
                self.stats.exact_matches += offsets.len();
                added += offsets.len();
            }

            neighbors.clear();
            search.run(&mut neighbors);

            for &neighbor in &neighbors {
                for &(_, q_off) in offsets {
                    self.backbone.add_hit(neighbor, q_off)?;
                }
                if neighbor == word_index {
                    self.stats.exact_matches += offsets.len();
                } else {
                    self.stats.neighbor_matches += offsets.len();
                }
                added += offsets.len();
            }
            group_start = group_end;
        }

        debug!(
            "neighbor expansion: {} query words, {} hits added (threshold={}, exact={}, neighbor={})",
            exact_words.len(),
            added,
            self.options.threshold,
            self.stats.exact_matches,
            self.stats.neighbor_matches
        );
        Ok(added)
    }

    /// Index every word scoring at least `threshold` against the PSSM columns
    /// starting at each position in `locations`. Returns the number of hits added.
    pub fn add_pssm_neighboring_words(
        &mut self,
        pssm: &Pssm,
        query_bias: i32,
        locations: &[Range<usize>],
    ) -> Result<usize> {
        if !self.options.use_pssm {
            return Err(LookupError::malformed(
                "table was created for matrix scoring; use add_neighboring_words",
            ));
        }
        let alphabet_size = self.geometry.alphabet_size;
        if pssm.alphabet_size() < alphabet_size {
            return Err(LookupError::malformed(format!(
                "{}-column PSSM cannot score a {alphabet_size}-letter alphabet",
                pssm.alphabet_size()
            )));
        }
        query_offset(query_bias, 0)?;

        let word_length = self.geometry.word_length;
        let charsize = self.geometry.charsize;
        let mut added = 0usize;
        let mut neighbors: Vec<usize> = Vec::new();

        for loc in locations {
            let to = loc.end.min(pssm.len());
            if to < loc.start || to - loc.start < word_length {
                continue;
            }
            for start in loc.start..=to - word_length {
                let mut search = NeighborSearch::new(word_length, alphabet_size, charsize, self.options.threshold);
                for pos in 0..word_length {
                    let column = &pssm.column(start + pos)[..alphabet_size];
                    let best = column.iter().copied().max().unwrap_or(i32::MIN / 2);
                    search.set_row(pos, column, best);
                }
                neighbors.clear();
                search.run(&mut neighbors);

                let q_off = query_offset(query_bias, start)?;
                for &neighbor in &neighbors {
                    self.backbone.add_hit(neighbor, q_off)?;
                }
                self.stats.neighbor_matches += neighbors.len();
                added += neighbors.len();
            }
        }

        debug!(
            "PSSM neighbor expansion: {} hits added over {} ranges (threshold={})",
            added,
            locations.len(),
            self.options.threshold
        );
        Ok(added)
    }

    /// Freeze the table. Consumes the builder, so nothing can be inserted afterwards.
    pub fn finalize(self) -> Result<AaLookupTable> {
        let backbone = self.backbone.compact()?;
        Ok(AaLookupTable {
            options: self.options,
            geometry: self.geometry,
            backbone,
            stats: self.stats,
        })
    }
}

const NO_ROW: &[i32] = &[];

/// Branch-and-bound walk over all words of one query position.
struct NeighborSearch<'r> {
    rows: [&'r [i32]; MAX_AA_WORD_LENGTH],
    row_best: [i32; MAX_AA_WORD_LENGTH],
    word_length: usize,
    alphabet_size: usize,
    charsize: usize,
    threshold: i32,
}

impl<'r> NeighborSearch<'r> {
    fn new(word_length: usize, alphabet_size: usize, charsize: usize, threshold: i32) -> Self {
        Self {
            rows: [NO_ROW; MAX_AA_WORD_LENGTH],
            row_best: [0; MAX_AA_WORD_LENGTH],
            word_length,
            alphabet_size,
            charsize,
            threshold,
        }
    }

    /// Scores of every letter at word position `pos`, and the best of them.
    fn set_row(&mut self, pos: usize, row: &'r [i32], best: i32) {
        self.rows[pos] = row;
        self.row_best[pos] = best;
    }

    /// Append the index of every qualifying word, in lexicographic letter order.
    fn run(&self, out: &mut Vec<usize>) {
        // suffix_max[i]: best score reachable at positions i..
        let mut suffix_max = [0i32; MAX_AA_WORD_LENGTH + 1];
        for i in (0..self.word_length).rev() {
            suffix_max[i] = suffix_max[i + 1].saturating_add(self.row_best[i]);
        }
        if suffix_max[0] >= self.threshold {
            self.walk(&suffix_max, 0, 0, 0, out);
        }
    }

    fn walk(&self, suffix_max: &[i32], pos: usize, score: i32, index: usize, out: &mut Vec<usize>) {
        if pos == self.word_length {
            out.push(index);
            return;
        }
        let rest = suffix_max[pos + 1];
        let row = self.rows[pos];
        for letter in 0..self.alphabet_size {
            let next = score.saturating_add(row[letter]);
            if next.saturating_add(rest) >= self.threshold {
                self.walk(suffix_max, pos + 1, next, (index << self.charsize) | letter, out);
            }
        }
    }
}

/// Frozen protein table, shared read-only by any number of scanners.
#[derive(Debug, Clone)]
pub struct AaLookupTable {
    options: AaLookupOptions,
    geometry: TableGeometry,
    backbone: ThickBackbone,
    stats: NeighborStats,
}

impl AaLookupTable {
    #[inline]
    pub fn word_length(&self) -> usize {
        self.geometry.word_length
    }

    #[inline]
    pub fn alphabet_size(&self) -> usize {
        self.geometry.alphabet_size
    }

    #[inline]
    pub fn charsize(&self) -> usize {
        self.geometry.charsize
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.geometry.mask
    }

    #[inline]
    pub fn threshold(&self) -> i32 {
        self.options.threshold
    }

    #[inline]
    pub fn use_pssm(&self) -> bool {
        self.options.use_pssm
    }

    #[inline]
    pub fn backbone_size(&self) -> usize {
        self.geometry.backbone_size
    }

    #[inline]
    pub fn longest_chain(&self) -> usize {
        self.backbone.longest_chain()
    }

    #[inline]
    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    #[inline]
    pub fn backbone(&self) -> &ThickBackbone {
        &self.backbone
    }

    #[inline]
    pub fn stats(&self) -> NeighborStats {
        self.stats
    }
}
