//! Offset pair output and scan resumption shared by every subject scanner.
//!
//! Scanners write `(query_offset, subject_offset)` pairs into two caller-owned
//! parallel arrays and stop when they are full. The [`ScanCursor`] is the only
//! state carried between calls: the next word start to test and how many hits
//! of the cell at that start were already written. A cell larger than the room
//! left is split across calls, so any `max_hits >= 1` makes progress.

use super::blast_lookup::CellHits;

/// Resumption point of a subject scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScanCursor {
    offset: usize,
    in_cell: u32,
}

impl ScanCursor {
    /// Cursor at the first word start of the subject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor at an arbitrary word start.
    pub fn at(offset: usize) -> Self {
        Self { offset, in_cell: 0 }
    }

    /// Next subject word start to be tested.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the previous call stopped part-way through a cell.
    #[inline]
    pub fn is_mid_cell(&self) -> bool {
        self.in_cell != 0
    }

    #[inline]
    pub(crate) fn in_cell(&self) -> usize {
        self.in_cell as usize
    }

    #[inline]
    pub(crate) fn park(&mut self, offset: usize, in_cell: usize) {
        self.offset = offset;
        self.in_cell = in_cell as u32;
    }
}

/// Bounded writer over the caller's two output arrays.
pub(crate) struct OffsetPairs<'o> {
    query: &'o mut [u32],
    subject: &'o mut [u32],
    capacity: usize,
    len: usize,
}

impl<'o> OffsetPairs<'o> {
    pub(crate) fn new(query: &'o mut [u32], subject: &'o mut [u32], max_hits: usize) -> Self {
        let capacity = max_hits.min(query.len()).min(subject.len());
        Self {
            query,
            subject,
            capacity,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write hits `skip..` of `hits`, each shifted by `q_adjust`, against subject offset
    /// `s_off`. Returns `None` once the cell is exhausted, or `Some(next)` with the
    /// index of the first hit that did not fit.
    #[inline(always)]
    pub(crate) fn emit(
        &mut self,
        hits: CellHits<'_>,
        skip: usize,
        s_off: usize,
        q_adjust: i32,
    ) -> Option<usize> {
        let total = hits.len();
        let room = self.capacity - self.len;
        let n = (total.saturating_sub(skip)).min(room);
        for (i, q_off) in hits.iter().skip(skip).take(n).enumerate() {
            self.query[self.len + i] = (q_off + q_adjust) as u32;
            self.subject[self.len + i] = s_off as u32;
        }
        self.len += n;
        if skip + n < total {
            Some(skip + n)
        } else {
            None
        }
    }
}

/// Common shape of the protein, nucleotide and RPS scanners.
pub trait SubjectScanner {
    /// Subject representation the scanner walks.
    type Subject<'s>: Copy;

    /// Scan from `cursor`, writing at most `max_hits` pairs (further bounded by the
    /// two array lengths). Returns the number written; `0` means the subject is
    /// exhausted at `cursor` (or there was no room at all, in which case the
    /// cursor is untouched).
    fn scan_subject(
        &self,
        subject: Self::Subject<'_>,
        cursor: &mut ScanCursor,
        query_offsets: &mut [u32],
        subject_offsets: &mut [u32],
        max_hits: usize,
    ) -> usize;
}

/// Drive `scanner` over the whole subject with buffers of `batch` pairs and
/// collect every `(query_offset, subject_offset)` pair in scan order.
pub fn collect_hits<S: SubjectScanner>(
    scanner: &S,
    subject: S::Subject<'_>,
    batch: usize,
) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    if batch == 0 {
        return pairs;
    }
    let mut q = vec![0u32; batch];
    let mut s = vec![0u32; batch];
    let mut cursor = ScanCursor::new();
    loop {
        let n = scanner.scan_subject(subject, &mut cursor, &mut q, &mut s, batch);
        if n == 0 {
            break;
        }
        pairs.extend(q[..n].iter().copied().zip(s[..n].iter().copied()));
    }
    pairs
}
