//! Index-translation layer over a source model.
//!
//! [`TranslatedTableModel`] exposes its source's rows in a logical order of
//! its own. Moving a row only shuffles the logical-to-physical index table;
//! the source is never touched.

use std::sync::{Arc, Weak};

use horizon_grid_core::Subscription;
use parking_lot::RwLock;

use super::error::{Error, Result};
use super::operation::{moved_index, Operation, RowSnapshot};
use super::traits::{ModelSignals, TableModel};
use super::value::CellValue;

/// A view of a source model whose rows can be reordered independently of
/// the source.
///
/// `references[logical]` holds the physical source row shown at `logical`.
/// It always has one entry per source row and starts out as the identity.
///
/// Source operations are translated as follows:
///
/// - `AddRow` at physical `p` is shown directly before the row that used to
///   sit at `p` (at the end when `p` was the row count)
/// - `RemoveRow` and `UpdateValue` are re-addressed to the logical slot
///   showing the affected physical row
/// - `MoveRow` only re-points references; the logical order is kept, so
///   nothing is emitted
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_grid::model::{ArrayTableModel, CellValue, TableModel, TranslatedTableModel};
///
/// let source = Arc::new(
///     ArrayTableModel::from_rows(vec![vec!["A".into()], vec!["B".into()], vec!["C".into()]])
///         .unwrap(),
/// );
/// let view = TranslatedTableModel::new(source.clone());
///
/// view.move_row(0, 2).unwrap();
/// assert_eq!(view.get(0, 0).unwrap(), CellValue::from("B"));
/// assert_eq!(view.get(2, 0).unwrap(), CellValue::from("A"));
/// assert_eq!(source.get(0, 0).unwrap(), CellValue::from("A"));
/// ```
pub struct TranslatedTableModel<S: TableModel> {
    source: Arc<S>,
    references: RwLock<Vec<usize>>,
    signals: ModelSignals,
    _subscription: Subscription,
}

impl<S: TableModel + 'static> TranslatedTableModel<S> {
    /// Wraps `source` with an identity translation.
    pub fn new(source: Arc<S>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = source.signals().connect(move |operations| {
                if let Some(model) = weak.upgrade() {
                    model.on_source_changed(operations);
                }
            });
            let references: Vec<usize> = (0..source.row_count()).collect();
            tracing::debug!(
                target: "horizon_grid::model",
                rows = references.len(),
                "translated model created"
            );
            Self {
                source,
                references: RwLock::new(references),
                signals: ModelSignals::new(),
                _subscription: subscription,
            }
        })
    }

    /// Returns the wrapped source model.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Moves the logical row at `source` so that it ends up at `destination`.
    ///
    /// Both indices must lie in `[0, row_count())`. Moving a row onto itself
    /// succeeds without emitting anything.
    pub fn move_row(&self, source: usize, destination: usize) -> Result<()> {
        let _tx = self.signals.transaction_guard();
        {
            let mut references = self.references.write();
            Error::check_range("source row", source, references.len())?;
            Error::check_range("destination row", destination, references.len())?;
            if source == destination {
                return Ok(());
            }
            let reference = references.remove(source);
            references.insert(destination, reference);
        }
        tracing::trace!(target: "horizon_grid::model", source, destination, "logical row moved");
        self.signals.record(Operation::MoveRow {
            source,
            destination,
        });
        Ok(())
    }

    /// Returns the physical source row shown at `logical`.
    pub fn map_to_source(&self, logical: usize) -> Option<usize> {
        self.references.read().get(logical).copied()
    }

    /// Returns the logical row showing the physical source row `physical`.
    pub fn map_from_source(&self, physical: usize) -> Option<usize> {
        self.references.read().iter().position(|&r| r == physical)
    }

    /// Returns a copy of the logical-to-physical index table.
    pub fn references(&self) -> Vec<usize> {
        self.references.read().clone()
    }

    fn on_source_changed(&self, operations: &[Operation]) {
        let _tx = self.signals.transaction_guard();
        for operation in operations {
            match self.translate(operation) {
                Ok(Some(translated)) => self.signals.record(translated),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        target: "horizon_grid::model",
                        %err,
                        ?operation,
                        "translated model lost track of its source"
                    );
                    panic!("translated model out of sync with its source: {err}");
                }
            }
        }
    }

    /// Updates the index table for one source operation and returns the
    /// operation to re-publish, if any.
    fn translate(&self, operation: &Operation) -> Result<Option<Operation>> {
        let mut references = self.references.write();
        let translated = match operation {
            Operation::AddRow { index, row } => {
                let physical = *index;
                let logical = references
                    .iter()
                    .position(|&r| r == physical)
                    .unwrap_or(references.len());
                for reference in references.iter_mut().filter(|r| **r >= physical) {
                    *reference += 1;
                }
                references.insert(logical, physical);
                Some(Operation::AddRow {
                    index: logical,
                    row: row.clone(),
                })
            }
            Operation::RemoveRow { index, row } => {
                let physical = *index;
                let logical = logical_row(&references, physical)?;
                references.remove(logical);
                for reference in references.iter_mut().filter(|r| **r > physical) {
                    *reference -= 1;
                }
                Some(Operation::RemoveRow {
                    index: logical,
                    row: row.clone(),
                })
            }
            Operation::UpdateValue {
                row,
                column,
                previous,
                current,
            } => Some(Operation::UpdateValue {
                row: logical_row(&references, *row)?,
                column: *column,
                previous: previous.clone(),
                current: current.clone(),
            }),
            Operation::MoveRow {
                source,
                destination,
            } => {
                for reference in references.iter_mut() {
                    *reference = moved_index(*reference, *source, *destination);
                }
                None
            }
        };
        Ok(translated)
    }
}

fn logical_row(references: &[usize], physical: usize) -> Result<usize> {
    references
        .iter()
        .position(|&r| r == physical)
        .ok_or_else(|| Error::invariant(format!("no logical row refers to source row {physical}")))
}

impl<S: TableModel + 'static> TableModel for TranslatedTableModel<S> {
    fn row_count(&self) -> usize {
        self.references.read().len()
    }

    fn column_count(&self) -> usize {
        if self.row_count() == 0 {
            0
        } else {
            self.source.column_count()
        }
    }

    fn get(&self, row: usize, column: usize) -> Result<CellValue> {
        let physical = {
            let references = self.references.read();
            Error::check_range("row", row, references.len())?;
            references[row]
        };
        self.source.get(physical, column)
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn row(&self, index: usize) -> Result<RowSnapshot> {
        let physical = {
            let references = self.references.read();
            Error::check_range("row", index, references.len())?;
            references[index]
        };
        self.source.row(physical)
    }
}

static_assertions::assert_impl_all!(
    TranslatedTableModel<super::array_model::ArrayTableModel>: Send,
    Sync
);
