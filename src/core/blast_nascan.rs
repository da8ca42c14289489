//! Nucleotide Subject Scanning
//!
//! Reference: ncbi-blast/c++/src/algo/blast/core/blast_nascan.c
//!
//! Subjects are packed ncbi2na ([`PackedNucleotides`]). Two scanners:
//!
//! - [`scan_subject_exact`]: every word start, reading one packed byte per outer
//!   step and rolling the word hash one base at a time
//! - [`scan_subject_ag`]: word starts `cursor, cursor + step, ...`, each word
//!   extracted directly at whatever phase it starts inside its byte
//!
//! With `scan_step == 1` both produce identical output. Subject offsets are word
//! starts in bases; query offsets are returned exactly as indexed.

use super::blast_encoding::{PackedNucleotides, COMPRESSION_RATIO};
use super::blast_nalookup::{NaLookupTable, NA_CHARSIZE};
use super::offset_pairs::{OffsetPairs, ScanCursor, SubjectScanner};

/// Scan with the table's configured scanner.
#[inline]
pub fn scan_subject(
    table: &NaLookupTable,
    subject: PackedNucleotides<'_>,
    cursor: &mut ScanCursor,
    query_offsets: &mut [u32],
    subject_offsets: &mut [u32],
    max_hits: usize,
) -> usize {
    if table.ag_scanning() {
        scan_subject_ag(table, subject, cursor, query_offsets, subject_offsets, max_hits)
    } else {
        scan_subject_exact(table, subject, cursor, query_offsets, subject_offsets, max_hits)
    }
}

/// Test every word start from `cursor` on.
pub fn scan_subject_exact(
    table: &NaLookupTable,
    subject: PackedNucleotides<'_>,
    cursor: &mut ScanCursor,
    query_offsets: &mut [u32],
    subject_offsets: &mut [u32],
    max_hits: usize,
) -> usize {
    let mut out = OffsetPairs::new(query_offsets, subject_offsets, max_hits);
    if out.capacity() == 0 {
        return 0;
    }

    let lut_word_length = table.lut_word_length();
    let len = subject.len();
    let start = cursor.offset();
    if start + lut_word_length > len {
        return 0;
    }

    let backbone = table.backbone();
    let pv = backbone.presence_vector();
    let mask = table.mask();
    let bytes = subject.bytes();
    let mut skip = cursor.in_cell();

    // Hash of the first lut_word_length - 1 bases; the loop shifts in the rest.
    let mut index = if lut_word_length > 1 {
        subject.word_at(start, lut_word_length - 1)
    } else {
        0
    };
    // Position of the next base to shift in.
    let mut end = start + lut_word_length - 1;

    while end < len {
        let byte = bytes[end / COMPRESSION_RATIO];
        let byte_stop = ((end / COMPRESSION_RATIO + 1) * COMPRESSION_RATIO).min(len);
        while end < byte_stop {
            let shift = 6 - NA_CHARSIZE * (end % COMPRESSION_RATIO);
            let base = (byte >> shift) & 0x03;
            index = ((index << NA_CHARSIZE) | base as usize) & mask;

            let s_off = end + 1 - lut_word_length;
            if pv.test(index) {
                if let Some(next) = out.emit(backbone.hits(index), skip, s_off, 0) {
                    cursor.park(s_off, next);
                    return out.len();
                }
            }
            skip = 0;
            end += 1;
        }
    }

    cursor.park(len + 1 - lut_word_length, 0);
    out.len()
}

/// Test word starts `cursor, cursor + scan_step, ...`.
pub fn scan_subject_ag(
    table: &NaLookupTable,
    subject: PackedNucleotides<'_>,
    cursor: &mut ScanCursor,
    query_offsets: &mut [u32],
    subject_offsets: &mut [u32],
    max_hits: usize,
) -> usize {
    let mut out = OffsetPairs::new(query_offsets, subject_offsets, max_hits);
    if out.capacity() == 0 {
        return 0;
    }

    let lut_word_length = table.lut_word_length();
    let len = subject.len();
    let step = table.scan_step();
    let mut s_off = cursor.offset();
    if s_off + lut_word_length > len {
        return 0;
    }
    let last = len - lut_word_length;

    let backbone = table.backbone();
    let pv = backbone.presence_vector();
    let mut skip = cursor.in_cell();

    while s_off <= last {
        let index = subject.word_at(s_off, lut_word_length);
        if pv.test(index) {
            if let Some(next) = out.emit(backbone.hits(index), skip, s_off, 0) {
                cursor.park(s_off, next);
                return out.len();
            }
        }
        skip = 0;
        s_off += step;
    }

    cursor.park(s_off, 0);
    out.len()
}

impl SubjectScanner for NaLookupTable {
    type Subject<'s> = PackedNucleotides<'s>;

    fn scan_subject(
        &self,
        subject: PackedNucleotides<'_>,
        cursor: &mut ScanCursor,
        query_offsets: &mut [u32],
        subject_offsets: &mut [u32],
        max_hits: usize,
    ) -> usize {
        scan_subject(self, subject, cursor, query_offsets, subject_offsets, max_hits)
    }
}
