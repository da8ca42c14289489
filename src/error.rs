//! Error type for lookup table construction and database mapping.

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by indexing, finalization and RPS table construction.
///
/// Scanning never fails; every variant here is detected before the first
/// subject is scanned.
#[derive(Debug, Error)]
pub enum LookupError {
    /// A backbone, chain arena, overflow array or presence vector could not grow.
    /// The caller is expected to discard the table being built.
    #[error("allocation failure while growing {what}: {source}")]
    AllocationFailure {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// Inconsistent options, out-of-alphabet words or a corrupt mapped table.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A profile database file could not be opened or memory-mapped.
    #[error("cannot map {}: {source}", path.display())]
    MappingUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LookupError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        LookupError::MalformedInput(msg.into())
    }

    pub(crate) fn alloc(what: &'static str) -> impl FnOnce(TryReserveError) -> Self {
        move |source| LookupError::AllocationFailure { what, source }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LookupError>;
