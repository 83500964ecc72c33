//! Error types for table models.

use super::value::ValueKind;

/// Result type alias for table model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by table models, comparators and the selection engine.
///
/// A call that returns an error has not mutated any state and has not
/// dispatched any operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An index or coordinate lies outside its valid bounds.
    #[error("{what} {index} is out of range 0..{limit}")]
    Range {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// A row's width does not match the table's column count.
    #[error("row has {actual} columns, table has {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A comparator was asked to order two values of incomparable kinds.
    #[error("cannot compare {left} with {right}")]
    TypeIncompatibility { left: ValueKind, right: ValueKind },

    /// Internal bookkeeping reached a state it is not designed to handle.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Create a range error. `limit` is the exclusive upper bound.
    pub fn range(what: &'static str, index: usize, limit: usize) -> Self {
        Self::Range { what, index, limit }
    }

    /// Create an invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Returns `Ok(())` if `index < limit`, a range error otherwise.
    pub fn check_range(what: &'static str, index: usize, limit: usize) -> Result<()> {
        if index < limit {
            Ok(())
        } else {
            Err(Self::range(what, index, limit))
        }
    }
}
