//! Amino Acid Sequence Scanning
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_aascan.c
//!
//! Protein and RPS subjects are one residue per byte (NCBISTDAA). Both scanners
//! share one loop: roll the word hash one residue at a time, test the presence
//! vector, and copy the cell's hits out on a set bit. They differ only in where
//! the cells live and in the query-side correction (RPS tables store the offset
//! of a word's last residue).

use super::blast_aalookup::AaLookupTable;
use super::blast_lookup::{compute_table_index_incremental, CellHits, PresenceVector, TableGeometry};
use super::blast_rps::RpsLookupTable;
use super::offset_pairs::{OffsetPairs, ScanCursor, SubjectScanner};

/// Frozen backbone a residue scanner can walk.
trait WordHitSource {
    fn geometry(&self) -> &TableGeometry;
    fn presence_vector(&self) -> &PresenceVector;
    fn cell(&self, index: usize) -> CellHits<'_>;
    /// Added to every stored hit before it is reported.
    fn query_adjust(&self) -> i32;
}

impl WordHitSource for AaLookupTable {
    #[inline(always)]
    fn geometry(&self) -> &TableGeometry {
        AaLookupTable::geometry(self)
    }

    #[inline(always)]
    fn presence_vector(&self) -> &PresenceVector {
        self.backbone().presence_vector()
    }

    #[inline(always)]
    fn cell(&self, index: usize) -> CellHits<'_> {
        self.backbone().hits(index)
    }

    #[inline(always)]
    fn query_adjust(&self) -> i32 {
        0
    }
}

impl WordHitSource for RpsLookupTable<'_> {
    #[inline(always)]
    fn geometry(&self) -> &TableGeometry {
        RpsLookupTable::geometry(self)
    }

    #[inline(always)]
    fn presence_vector(&self) -> &PresenceVector {
        RpsLookupTable::presence_vector(self)
    }

    #[inline(always)]
    fn cell(&self, index: usize) -> CellHits<'_> {
        self.hits(index)
    }

    #[inline(always)]
    fn query_adjust(&self) -> i32 {
        -self.table_correction()
    }
}

#[inline(always)]
fn scan_residues<T: WordHitSource>(
    table: &T,
    subject: &[u8],
    cursor: &mut ScanCursor,
    query_offsets: &mut [u32],
    subject_offsets: &mut [u32],
    max_hits: usize,
) -> usize {
    let mut out = OffsetPairs::new(query_offsets, subject_offsets, max_hits);
    if out.capacity() == 0 {
        return 0;
    }

    let geometry = table.geometry();
    let word_length = geometry.word_length;
    let len = subject.len();
    let start = cursor.offset();
    if start + word_length > len {
        return 0;
    }

    let pv = table.presence_vector();
    let q_adjust = table.query_adjust();
    let mut skip = cursor.in_cell();

    // Word starts before `valid_from` contain a residue outside the alphabet.
    let mut valid_from = start;
    let mut index = 0usize;
    for (i, &residue) in subject[start..start + word_length - 1].iter().enumerate() {
        if residue as usize >= geometry.alphabet_size {
            valid_from = start + i + 1;
        }
        index = compute_table_index_incremental(index, residue, geometry.charsize, geometry.mask);
    }

    for end in start + word_length - 1..len {
        let residue = subject[end];
        if residue as usize >= geometry.alphabet_size {
            valid_from = end + 1;
        }
        index = compute_table_index_incremental(index, residue, geometry.charsize, geometry.mask);

        let s_off = end + 1 - word_length;
        // NCBI reference: ncbi-blast/c++/src/algo/blast/core/blast_aascan.c
        //   s_BlastAaScanSubject: if (PV_TEST(pv, index, PV_ARRAY_BTS)) { ... }
        if s_off >= valid_from && pv.test(index) {
            if let Some(next) = out.emit(table.cell(index), skip, s_off, q_adjust) {
                cursor.park(s_off, next);
                return out.len();
            }
        }
        skip = 0;
    }

    cursor.park(len + 1 - word_length, 0);
    out.len()
}

/// Scan a protein subject against a protein lookup table.
pub fn scan_subject(
    table: &AaLookupTable,
    subject: &[u8],
    cursor: &mut ScanCursor,
    query_offsets: &mut [u32],
    subject_offsets: &mut [u32],
    max_hits: usize,
) -> usize {
    scan_residues(table, subject, cursor, query_offsets, subject_offsets, max_hits)
}

/// Scan a protein subject against a profile database.
///
/// Query offsets are word starts in concatenated profile space; map them back
/// with [`RpsLookupTable::profile_for_offset`].
pub fn rps_scan_subject(
    table: &RpsLookupTable<'_>,
    subject: &[u8],
    cursor: &mut ScanCursor,
    query_offsets: &mut [u32],
    subject_offsets: &mut [u32],
    max_hits: usize,
) -> usize {
    scan_residues(table, subject, cursor, query_offsets, subject_offsets, max_hits)
}

impl SubjectScanner for AaLookupTable {
    type Subject<'s> = &'s [u8];

    fn scan_subject(
        &self,
        subject: &[u8],
        cursor: &mut ScanCursor,
        query_offsets: &mut [u32],
        subject_offsets: &mut [u32],
        max_hits: usize,
    ) -> usize {
        scan_subject(self, subject, cursor, query_offsets, subject_offsets, max_hits)
    }
}

impl SubjectScanner for RpsLookupTable<'_> {
    type Subject<'s> = &'s [u8];

    fn scan_subject(
        &self,
        subject: &[u8],
        cursor: &mut ScanCursor,
        query_offsets: &mut [u32],
        subject_offsets: &mut [u32],
        max_hits: usize,
    ) -> usize {
        rps_scan_subject(self, subject, cursor, query_offsets, subject_offsets, max_hits)
    }
}
