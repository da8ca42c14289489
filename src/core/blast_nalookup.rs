//! Nucleotide Lookup Table
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_nalookup.c
//!
//! Direct-address table over 4^`lut_word_length` slots. Query words are hashed
//! from BLASTNA codes (A=0, C=1, G=2, T=3), first base most significant, which
//! is the same order packed ncbi2na subjects are read in. Anything above 3 is an
//! ambiguity code and never takes part in an indexed word.

use std::ops::Range;

use log::debug;

use super::blast_lookup::{index_exact_words, query_offset, TableGeometry, ThickBackbone, ThinBackbone};
use super::blast_options::NaLookupOptions;
use crate::error::Result;

/// Letters in the nucleotide lookup alphabet.
pub const NA_ALPHABET_SIZE: usize = 4;
/// Bits per base in a nucleotide word hash.
pub const NA_CHARSIZE: usize = 2;

/// Mutable nucleotide table, filled while queries are indexed.
#[derive(Debug)]
pub struct NaLookupTableBuilder {
    options: NaLookupOptions,
    geometry: TableGeometry,
    backbone: ThinBackbone,
}

impl NaLookupTableBuilder {
    pub fn new(options: NaLookupOptions) -> Result<Self> {
        options.validate()?;
        let geometry = TableGeometry::new(options.lut_word_length, NA_ALPHABET_SIZE, NA_CHARSIZE);
        let backbone = ThinBackbone::new(geometry.backbone_size)?;
        Ok(Self {
            options,
            geometry,
            backbone,
        })
    }

    #[inline]
    pub fn options(&self) -> &NaLookupOptions {
        &self.options
    }

    #[inline]
    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    /// Hits added so far.
    #[inline]
    pub fn num_hits(&self) -> usize {
        self.backbone.num_hits()
    }

    /// Record that `word` (`lut_word_length` BLASTNA codes, all below 4) occurs in
    /// the query at `query_offset`.
    pub fn add_word_hit(&mut self, word: &[u8], query_offset: i32) -> Result<()> {
        let index = self.geometry.word_index(word)?;
        self.backbone.add_hit(index, query_offset)
    }

    /// Index every word start of `query` (BLASTNA codes) inside `locations`, storing
    /// `position + query_bias`. Returns the number of hits added.
    pub fn index_query_exact_matches(
        &mut self,
        query: &[u8],
        query_bias: i32,
        locations: &[Range<usize>],
    ) -> Result<usize> {
        // Validate the bias once up front so an empty range list still reports it.
        query_offset(query_bias, 0)?;
        let added = index_exact_words(
            &mut self.backbone,
            &self.geometry,
            self.options.word_length,
            self.options.variable_wordsize,
            query,
            query_bias,
            locations,
        )?;
        debug!(
            "indexed {} nucleotide words from {} ranges (lut_word_length={})",
            added,
            locations.len(),
            self.geometry.word_length
        );
        Ok(added)
    }

    /// Freeze the table. Consumes the builder, so nothing can be inserted afterwards.
    pub fn finalize(self) -> Result<NaLookupTable> {
        let backbone = self.backbone.compact()?;
        Ok(NaLookupTable {
            options: self.options,
            geometry: self.geometry,
            scan_step: self.options.effective_scan_step(),
            backbone,
        })
    }
}

/// Frozen nucleotide table, shared read-only by any number of scanners.
#[derive(Debug, Clone)]
pub struct NaLookupTable {
    options: NaLookupOptions,
    geometry: TableGeometry,
    scan_step: usize,
    backbone: ThickBackbone,
}

impl NaLookupTable {
    /// Bases per backbone word.
    #[inline]
    pub fn lut_word_length(&self) -> usize {
        self.geometry.word_length
    }

    /// Seed length later stages require.
    #[inline]
    pub fn word_length(&self) -> usize {
        self.options.word_length
    }

    #[inline]
    pub fn scan_step(&self) -> usize {
        self.scan_step
    }

    #[inline]
    pub fn ag_scanning(&self) -> bool {
        self.options.ag_scanning
    }

    #[inline]
    pub fn variable_wordsize(&self) -> bool {
        self.options.variable_wordsize
    }

    #[inline]
    pub fn mask(&self) -> usize {
        self.geometry.mask
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
    pub fn backbone(&self) -> &ThickBackbone {
        &self.backbone
    }

    #[inline]
    pub fn options(&self) -> &NaLookupOptions {
        &self.options
    }
}
