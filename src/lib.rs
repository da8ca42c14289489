//! Word lookup tables and subject scanners for BLAST-style seed finding.
//!
//! A query is indexed into a mutable builder ([`AaLookupTableBuilder`],
//! [`NaLookupTableBuilder`]), frozen exactly once with `finalize`, and then
//! scanned against any number of subjects, from any number of threads. Profile
//! databases skip the first phase: [`RpsLookupTable`] is read in place from
//! memory-mapped files.
//!
//! Every scanner writes `(query_offset, subject_offset)` pairs into caller-owned
//! buffers and stops when they are full; a [`ScanCursor`] carries the position
//! to resume from.

pub mod core;
pub mod error;
pub mod utils;

pub use crate::core::blast_aalookup::{AaLookupTable, AaLookupTableBuilder, NeighborStats};
pub use crate::core::blast_encoding::{encode_blastna, pack_ncbi2na, PackedNucleotides};
pub use crate::core::blast_lookup::{
    BackboneCell, CellHits, PresenceVector, TableGeometry, ThickBackbone, ThinBackbone, HITS_ON_BACKBONE,
};
pub use crate::core::blast_nalookup::{NaLookupTable, NaLookupTableBuilder};
pub use crate::core::blast_options::{AaLookupOptions, NaLookupOptions};
pub use crate::core::blast_rps::{RpsInfo, RpsLookupTable};
pub use crate::core::offset_pairs::{collect_hits, ScanCursor, SubjectScanner};
pub use crate::error::{LookupError, Result};
pub use crate::utils::matrix::{Pssm, ScoreMatrix};
