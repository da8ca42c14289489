//! Lookup Table Options
//!
//! Construction-time options for the nucleotide and protein lookup tables.
//! Everything here is fixed once a builder exists; [`NaLookupOptions::validate`]
//! and [`AaLookupOptions::validate`] run inside the builder constructors, so an
//! inconsistent combination is rejected before any memory is committed.

use crate::error::{LookupError, Result};
use crate::utils::matrix::BLASTAA_SIZE;

/// Default nucleotide word length (blastn).
pub const DEFAULT_NA_WORD_LENGTH: usize = 11;
/// Default nucleotide lookup word length.
pub const DEFAULT_NA_LUT_WORD_LENGTH: usize = 8;
/// Largest nucleotide lookup word length: 4^12 backbone cells.
pub const MAX_NA_LUT_WORD_LENGTH: usize = 12;

/// Default protein word length.
pub const DEFAULT_AA_WORD_LENGTH: usize = 3;
/// Default neighboring-word threshold (blastp, BLOSUM62).
pub const DEFAULT_AA_THRESHOLD: i32 = 11;
/// Largest protein word length the backbone can address.
pub const MAX_AA_WORD_LENGTH: usize = 5;

/// Options for [`NaLookupTableBuilder`](super::blast_nalookup::NaLookupTableBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaLookupOptions {
    /// Minimum seed length later stages require; ranges shorter than this are not indexed.
    pub word_length: usize,
    /// Bases hashed into the backbone.
    pub lut_word_length: usize,
    /// Distance between tested subject word starts. `None` picks
    /// `word_length - lut_word_length + 1` for AG scanning and 1 otherwise.
    pub scan_step: Option<usize>,
    /// Use the strided scanner.
    pub ag_scanning: bool,
    /// Compare at packed-byte granularity: trailing partial bytes of each query
    /// range are not indexed.
    pub variable_wordsize: bool,
}

impl Default for NaLookupOptions {
    fn default() -> Self {
        Self {
            word_length: DEFAULT_NA_WORD_LENGTH,
            lut_word_length: DEFAULT_NA_LUT_WORD_LENGTH,
            scan_step: None,
            ag_scanning: false,
            variable_wordsize: false,
        }
    }
}

impl NaLookupOptions {
    pub fn with_word_length(mut self, word_length: usize) -> Self {
        self.word_length = word_length;
        self
    }

    pub fn with_lut_word_length(mut self, lut_word_length: usize) -> Self {
        self.lut_word_length = lut_word_length;
        self
    }

    pub fn with_scan_step(mut self, scan_step: usize) -> Self {
        self.scan_step = Some(scan_step);
        self
    }

    pub fn with_ag_scanning(mut self, ag_scanning: bool) -> Self {
        self.ag_scanning = ag_scanning;
        self
    }

    pub fn with_variable_wordsize(mut self, variable_wordsize: bool) -> Self {
        self.variable_wordsize = variable_wordsize;
        self
    }

    /// Scan step the table will use.
    pub fn effective_scan_step(&self) -> usize {
        match self.scan_step {
            Some(step) => step,
            // NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_nalookup.c
            //   lookup->scan_step = lookup->word_length - lookup->lut_word_length + 1;
            None if self.ag_scanning => {
                (self.word_length.saturating_sub(self.lut_word_length) + 1).max(1)
            }
            None => 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lut_word_length == 0 || self.lut_word_length > MAX_NA_LUT_WORD_LENGTH {
            return Err(LookupError::malformed(format!(
                "lut_word_length {} outside 1..={}",
                self.lut_word_length, MAX_NA_LUT_WORD_LENGTH
            )));
        }
        if self.word_length < self.lut_word_length {
            return Err(LookupError::malformed(format!(
                "word_length {} shorter than lut_word_length {}",
                self.word_length, self.lut_word_length
            )));
        }
        let step = self.effective_scan_step();
        if step == 0 {
            return Err(LookupError::malformed("scan_step must be at least 1"));
        }
        if step != 1 && !self.ag_scanning {
            return Err(LookupError::malformed(format!(
                "scan_step {step} requires AG scanning"
            )));
        }
        if self.ag_scanning && self.variable_wordsize && self.word_length % step != 0 {
            return Err(LookupError::malformed(format!(
                "scan_step {step} does not divide word_length {} in byte-aligned mode",
                self.word_length
            )));
        }
        Ok(())
    }
}

/// Options for [`AaLookupTableBuilder`](super::blast_aalookup::AaLookupTableBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AaLookupOptions {
    pub word_length: usize,
    /// Neighboring words must score at least this much. `0` indexes exact words only.
    pub threshold: i32,
    pub alphabet_size: usize,
    /// Score words against a PSSM instead of a substitution matrix.
    pub use_pssm: bool,
}

impl Default for AaLookupOptions {
    fn default() -> Self {
        Self {
            word_length: DEFAULT_AA_WORD_LENGTH,
            threshold: DEFAULT_AA_THRESHOLD,
            alphabet_size: BLASTAA_SIZE,
            use_pssm: false,
        }
    }
}

impl AaLookupOptions {
    pub fn with_word_length(mut self, word_length: usize) -> Self {
        self.word_length = word_length;
        self
    }

    pub fn with_threshold(mut self, threshold: i32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_alphabet_size(mut self, alphabet_size: usize) -> Self {
        self.alphabet_size = alphabet_size;
        self
    }

    pub fn with_pssm(mut self, use_pssm: bool) -> Self {
        self.use_pssm = use_pssm;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.word_length == 0 || self.word_length > MAX_AA_WORD_LENGTH {
            return Err(LookupError::malformed(format!(
                "word_length {} outside 1..={}",
                self.word_length, MAX_AA_WORD_LENGTH
            )));
        }
        if !(2..=32).contains(&self.alphabet_size) {
            return Err(LookupError::malformed(format!(
                "alphabet_size {} outside 2..=32",
                self.alphabet_size
            )));
        }
        if self.threshold < 0 {
            return Err(LookupError::malformed(format!(
                "negative threshold {}",
                self.threshold
            )));
        }
        if self.use_pssm && self.threshold == 0 {
            return Err(LookupError::malformed(
                "PSSM lookup tables need a positive threshold",
            ));
        }
        Ok(())
    }
}
