//! Array-backed table model.
//!
//! [`ArrayTableModel`] is the mutable source of truth at the bottom of every
//! model chain. It is the only model that originates operations; derived
//! models only translate what it emits.

use parking_lot::RwLock;

use super::error::{Error, Result};
use super::operation::{Operation, RowSnapshot};
use super::traits::{ModelSignals, TableModel};
use super::value::CellValue;

/// A mutable table that stores its rows in memory.
///
/// Each public mutator runs as one transaction. Mutators invoked while an
/// outer transaction is open are coalesced into that transaction's single
/// dispatch, in call order.
///
/// A table holding exactly one zero-width row reports `row_count() == 0`;
/// that row is a placeholder and is replaced by the first real row added.
///
/// # Example
///
/// ```
/// use horizon_grid::model::{ArrayTableModel, CellValue, TableModel};
///
/// let model = ArrayTableModel::new();
/// model.add_row(vec![CellValue::from("Alice"), CellValue::from(34)]).unwrap();
/// model.add_row(vec![CellValue::from("Bob"), CellValue::from(27)]).unwrap();
///
/// model.set(1, 1, 28).unwrap();
/// assert_eq!(model.get(1, 1).unwrap(), CellValue::from(28));
/// assert_eq!(model.row_count(), 2);
/// ```
pub struct ArrayTableModel {
    rows: RwLock<Vec<RowSnapshot>>,
    signals: ModelSignals,
}

impl Default for ArrayTableModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayTableModel {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            signals: ModelSignals::new(),
        }
    }

    /// Creates a table holding `rows`.
    ///
    /// Fails with [`Error::WidthMismatch`] if the rows do not all have the
    /// width of the first one. Zero-width rows make an empty table.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some(bad) = rows.iter().find(|row| row.len() != expected) {
                return Err(Error::WidthMismatch {
                    expected,
                    actual: bad.len(),
                });
            }
        }
        let mut rows: Vec<RowSnapshot> = rows.into_iter().map(RowSnapshot::from).collect();
        // Zero-width rows only ever exist as the lone placeholder.
        if rows.first().is_some_and(|row| row.column_count() == 0) {
            rows.truncate(1);
        }
        tracing::debug!(target: "horizon_grid::model", rows = rows.len(), "array model created");
        Ok(Self {
            rows: RwLock::new(rows),
            signals: ModelSignals::new(),
        })
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Appends `row` to the end of the table.
    pub fn add_row(&self, row: Vec<CellValue>) -> Result<()> {
        let index = self.row_count();
        self.insert_row(index, row)
    }

    /// Inserts `row` so that it ends up at `index`.
    ///
    /// Fails with [`Error::WidthMismatch`] if the table is non-empty and the
    /// widths differ, or with [`Error::Range`] if `index > row_count()`.
    pub fn insert_row(&self, index: usize, row: Vec<CellValue>) -> Result<()> {
        let _tx = self.signals.transaction_guard();
        let operation = {
            let mut rows = self.rows.write();
            let row_count = live_row_count(&rows);
            if row_count > 0 && row.len() != rows[0].column_count() {
                return Err(Error::WidthMismatch {
                    expected: rows[0].column_count(),
                    actual: row.len(),
                });
            }
            if index > row_count {
                return Err(Error::range("row", index, row_count + 1));
            }

            if row_count == 0 {
                rows.clear();
                if row.is_empty() {
                    // Zero-width rows in an empty table only leave a placeholder.
                    rows.push(RowSnapshot::from(row));
                    return Ok(());
                }
            }

            let snapshot = RowSnapshot::from(row);
            rows.insert(index, snapshot.clone());
            Operation::AddRow {
                index,
                row: snapshot,
            }
        };
        tracing::trace!(target: "horizon_grid::model", index, "row added");
        self.signals.record(operation);
        Ok(())
    }

    /// Removes the row at `index` and returns its values.
    pub fn remove_row(&self, index: usize) -> Result<RowSnapshot> {
        let _tx = self.signals.transaction_guard();
        let removed = {
            let mut rows = self.rows.write();
            Error::check_range("row", index, live_row_count(&rows))?;
            rows.remove(index)
        };
        tracing::trace!(target: "horizon_grid::model", index, "row removed");
        self.signals.record(Operation::RemoveRow {
            index,
            row: removed.clone(),
        });
        Ok(removed)
    }

    /// Moves the row at `source` so that it ends up at `destination`.
    ///
    /// Both indices must lie in `[0, row_count())`. Moving a row onto itself
    /// succeeds without emitting anything.
    pub fn move_row(&self, source: usize, destination: usize) -> Result<()> {
        let _tx = self.signals.transaction_guard();
        {
            let mut rows = self.rows.write();
            let row_count = live_row_count(&rows);
            Error::check_range("source row", source, row_count)?;
            Error::check_range("destination row", destination, row_count)?;
            if source == destination {
                return Ok(());
            }
            let row = rows.remove(source);
            rows.insert(destination, row);
        }
        tracing::trace!(target: "horizon_grid::model", source, destination, "row moved");
        self.signals.record(Operation::MoveRow {
            source,
            destination,
        });
        Ok(())
    }

    /// Stores `value` at (`row`, `column`).
    pub fn set(&self, row: usize, column: usize, value: impl Into<CellValue>) -> Result<()> {
        let current = value.into();
        let _tx = self.signals.transaction_guard();
        let previous = {
            let mut rows = self.rows.write();
            Error::check_range("row", row, live_row_count(&rows))?;
            Error::check_range("column", column, rows[row].column_count())?;
            let previous = rows[row].values()[column].clone();
            let updated = rows[row].with_value(column, current.clone());
            rows[row] = updated;
            previous
        };
        tracing::trace!(target: "horizon_grid::model", row, column, "value updated");
        self.signals.record(Operation::UpdateValue {
            row,
            column,
            previous,
            current,
        });
        Ok(())
    }

    /// Removes every row as one transaction.
    pub fn clear(&self) {
        self.transaction(|| {
            for index in (0..self.row_count()).rev() {
                if let Err(err) = self.remove_row(index) {
                    tracing::error!(target: "horizon_grid::model", %err, "failed to clear row");
                }
            }
            // Drop a leftover placeholder, which never counted as a row.
            self.rows.write().clear();
        });
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Opens a (possibly nested) transaction. See [`ModelSignals::begin_transaction`].
    pub fn begin_transaction(&self) {
        self.signals.begin_transaction();
    }

    /// Closes a transaction. See [`ModelSignals::end_transaction`].
    pub fn end_transaction(&self) -> Result<()> {
        self.signals.end_transaction()
    }

    /// Runs `f` inside one transaction so that every mutation it makes is
    /// dispatched together.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        self.signals.transaction(f)
    }

    /// Copies out every row.
    pub fn rows(&self) -> Vec<RowSnapshot> {
        let rows = self.rows.read();
        rows[..live_row_count(&rows)].to_vec()
    }
}

/// Number of rows, not counting a lone zero-width placeholder.
fn live_row_count(rows: &[RowSnapshot]) -> usize {
    match rows {
        [only] if only.column_count() == 0 => 0,
        _ => rows.len(),
    }
}

impl TableModel for ArrayTableModel {
    fn row_count(&self) -> usize {
        live_row_count(&self.rows.read())
    }

    fn column_count(&self) -> usize {
        let rows = self.rows.read();
        if live_row_count(&rows) == 0 {
            0
        } else {
            rows[0].column_count()
        }
    }

    fn get(&self, row: usize, column: usize) -> Result<CellValue> {
        let rows = self.rows.read();
        Error::check_range("row", row, live_row_count(&rows))?;
        rows[row].get(0, column)
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn row(&self, index: usize) -> Result<RowSnapshot> {
        let rows = self.rows.read();
        Error::check_range("row", index, live_row_count(&rows))?;
        Ok(rows[index].clone())
    }
}

static_assertions::assert_impl_all!(ArrayTableModel: Send, Sync);
