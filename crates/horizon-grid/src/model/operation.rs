//! The operation algebra: immutable descriptions of atomic table changes.
//!
//! Every committed transaction is delivered to listeners as an ordered list
//! of [`Operation`]s. Replaying that list against the model's previous state
//! yields its current state.

use std::sync::Arc;

use super::error::{Error, Result};
use super::value::CellValue;

/// A single-row, read-only table capturing a row's values at one moment.
///
/// Snapshots are cheap to clone; the values are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSnapshot {
    values: Arc<[CellValue]>,
}

impl RowSnapshot {
    /// Creates a snapshot from the given values.
    pub fn new(values: impl Into<Arc<[CellValue]>>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Always 1: a snapshot holds exactly one row.
    pub fn row_count(&self) -> usize {
        1
    }

    /// Number of cells in the row.
    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    /// Returns the value at (`row`, `column`). Only row 0 exists.
    pub fn get(&self, row: usize, column: usize) -> Result<CellValue> {
        Error::check_range("row", row, 1)?;
        self.value(column)
            .cloned()
            .ok_or_else(|| Error::range("column", column, self.values.len()))
    }

    /// Borrows the value in `column`, if present.
    pub fn value(&self, column: usize) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// All values of the row.
    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    /// Returns a copy of this snapshot with `column` replaced by `value`.
    pub(crate) fn with_value(&self, column: usize, value: CellValue) -> Self {
        let mut values = self.values.to_vec();
        values[column] = value;
        Self::new(values)
    }
}

impl From<Vec<CellValue>> for RowSnapshot {
    fn from(values: Vec<CellValue>) -> Self {
        Self::new(values)
    }
}

/// Discriminant of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// A row was inserted.
    AddRow,
    /// A row was removed.
    RemoveRow,
    /// A row was relocated.
    MoveRow,
    /// A cell value changed.
    UpdateValue,
}

/// One atomic change to a table model.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `row` was inserted so that it now sits at `index`.
    AddRow { index: usize, row: RowSnapshot },
    /// The row at `index` was removed; `row` holds its values before removal.
    RemoveRow { index: usize, row: RowSnapshot },
    /// The row at `source` was taken out and reinserted at `destination`.
    MoveRow { source: usize, destination: usize },
    /// The cell at (`row`, `column`) changed from `previous` to `current`.
    UpdateValue {
        row: usize,
        column: usize,
        previous: CellValue,
        current: CellValue,
    },
}

impl Operation {
    /// Returns the discriminant of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::AddRow { .. } => OperationKind::AddRow,
            Operation::RemoveRow { .. } => OperationKind::RemoveRow,
            Operation::MoveRow { .. } => OperationKind::MoveRow,
            Operation::UpdateValue { .. } => OperationKind::UpdateValue,
        }
    }

    /// Returns `true` for operations that change the row structure.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Operation::UpdateValue { .. })
    }
}

/// Where a row that sat at `index` ends up after the row at `source` has
/// moved to `destination`.
pub(crate) fn moved_index(index: usize, source: usize, destination: usize) -> usize {
    if index == source {
        destination
    } else if source < destination && source < index && index <= destination {
        index - 1
    } else if destination < source && destination <= index && index < source {
        index + 1
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_snapshot_is_single_row_table() {
        let snapshot = RowSnapshot::from(vec![CellValue::from(1), CellValue::from("a")]);
        assert_eq!(snapshot.row_count(), 1);
        assert_eq!(snapshot.column_count(), 2);
        assert_eq!(snapshot.get(0, 1), Ok(CellValue::from("a")));
        assert!(matches!(snapshot.get(1, 0), Err(Error::Range { what: "row", .. })));
        assert!(matches!(snapshot.get(0, 2), Err(Error::Range { what: "column", .. })));
    }

    #[test]
    fn test_with_value_leaves_original_untouched() {
        let original = RowSnapshot::from(vec![CellValue::from(1), CellValue::from(2)]);
        let updated = original.with_value(1, CellValue::from(9));
        assert_eq!(original.values(), &[CellValue::from(1), CellValue::from(2)]);
        assert_eq!(updated.values(), &[CellValue::from(1), CellValue::from(9)]);
    }

    #[test]
    fn test_operation_kind() {
        let op = Operation::MoveRow {
            source: 0,
            destination: 2,
        };
        assert_eq!(op.kind(), OperationKind::MoveRow);
        assert!(op.is_structural());

        let op = Operation::UpdateValue {
            row: 0,
            column: 0,
            previous: CellValue::Empty,
            current: CellValue::from(1),
        };
        assert_eq!(op.kind(), OperationKind::UpdateValue);
        assert!(!op.is_structural());
    }

    #[test]
    fn test_moved_index_matches_vec_remove_insert() {
        for len in 1..6usize {
            for source in 0..len {
                for destination in 0..len {
                    let mut items: Vec<usize> = (0..len).collect();
                    let item = items.remove(source);
                    items.insert(destination, item);
                    for original in 0..len {
                        let now = items.iter().position(|&i| i == original).unwrap();
                        assert_eq!(moved_index(original, source, destination), now);
                    }
                }
            }
        }
    }
}
