//! BLAST Core Word Lookup
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/
//!
//! Word indexing and subject scanning, organized after NCBI BLAST's core/ directory:
//!
//! - **Lookup Tables** (`blast_lookup`, `blast_aalookup`, `blast_nalookup`, `blast_rps`)
//!   - Presence vector, thin (chained) and thick (celled) backbones
//!   - Exact and neighboring word indexing
//!   - Profile database tables over mapped files
//!
//! - **Scanning** (`blast_aascan`, `blast_nascan`, `offset_pairs`)
//!   - Protein, RPS, exact nucleotide and strided (AG) nucleotide scanners
//!   - Bounded, resumable offset-pair output
//!
//! - **Utilities** (`blast_encoding`, `blast_options`)
//!   - Nucleotide encoding and packed subject views
//!   - Lookup table options

// Lookup Tables
pub mod blast_lookup;
pub mod blast_aalookup;
pub mod blast_nalookup;
pub mod blast_rps;

// Scanning
pub mod offset_pairs;
pub mod blast_aascan;
pub mod blast_nascan;

// Utilities
pub mod blast_encoding;

// Parameters and Options
pub mod blast_options;
