//! Error types
//!
//! The core deliberately has almost no error surface: invalid samples are
//! rejected through [`AddOutcome`](crate::buffer::AddOutcome) rather than
//! errors, and buffer disorder self-heals via `sort()`. The only fallible
//! operation is constructing a series, which requires a stable identity.

use thiserror_no_std::Error;

/// Errors raised when constructing a series
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// A series must have a non-empty point identifier
    #[error("series id cannot be empty")]
    EmptyId,
}
