//! Filtering layer over a source model.
//!
//! [`FilteredTableModel`] shows the source rows whose value in one column
//! satisfies a [`Predicate`], in source order, and keeps that subset up to
//! date incrementally as the source changes.

use std::sync::{Arc, Weak};

use horizon_grid_core::logging::span_names;
use horizon_grid_core::{PerfSpan, Subscription};
use parking_lot::RwLock;

use super::error::{Error, Result};
use super::operation::{moved_index, Operation, RowSnapshot};
use super::traits::{ModelSignals, TableModel};
use super::value::CellValue;

/// Decides whether a cell value makes its row visible.
///
/// Any `Fn(&CellValue) -> bool` closure is a predicate.
pub trait Predicate: Send + Sync {
    /// Returns `true` if a row holding `value` in the filter column is shown.
    fn evaluate(&self, value: &CellValue) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&CellValue) -> bool + Send + Sync,
{
    fn evaluate(&self, value: &CellValue) -> bool {
        self(value)
    }
}

/// Visibility bookkeeping, one entry per source row.
struct RowMapping {
    /// The source rows as of the last operation applied.
    rows: Vec<RowSnapshot>,
    /// Whether each source row currently passes the predicate.
    visible: Vec<bool>,
    /// Source index of every visible row, ascending.
    proxy_to_source: Vec<usize>,
}

impl RowMapping {
    /// Number of visible rows before source row `physical`.
    fn logical_position(&self, physical: usize) -> usize {
        self.proxy_to_source.partition_point(|&s| s < physical)
    }

    fn check_physical(&self, physical: usize) -> Result<()> {
        if physical < self.rows.len() {
            Ok(())
        } else {
            Err(Error::invariant(format!(
                "source row {physical} is unknown to the filter ({} rows tracked)",
                self.rows.len()
            )))
        }
    }
}

/// A view showing the source rows that pass a predicate.
///
/// The predicate is evaluated on the value in [`filter_column`](Self::filter_column).
/// It is re-evaluated when a row is added and when that column changes;
/// updates to other columns of visible rows pass through, updates to hidden
/// rows are swallowed.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_grid::model::{ArrayTableModel, CellValue, FilteredTableModel, TableModel};
///
/// let source = Arc::new(
///     ArrayTableModel::from_rows(vec![vec![(-6).into()], vec![1.into()], vec![6.into()]])
///         .unwrap(),
/// );
/// let positive = FilteredTableModel::new(source.clone(), 0, |v: &CellValue| {
///     v.as_int().is_some_and(|n| n > 0)
/// })
/// .unwrap();
///
/// assert_eq!(positive.row_count(), 2);
/// source.set(0, 0, 4).unwrap();
/// assert_eq!(positive.get(0, 0).unwrap(), CellValue::from(4));
/// ```
pub struct FilteredTableModel<S: TableModel> {
    source: Arc<S>,
    column: usize,
    predicate: Box<dyn Predicate>,
    mapping: RwLock<RowMapping>,
    signals: ModelSignals,
    _subscription: Subscription,
}

impl<S: TableModel + 'static> FilteredTableModel<S> {
    /// Filters `source` by evaluating `predicate` on each row's `column`.
    ///
    /// Fails with [`Error::Range`] if the source has rows and `column` is not
    /// one of its columns.
    pub fn new<P>(source: Arc<S>, column: usize, predicate: P) -> Result<Arc<Self>>
    where
        P: Predicate + 'static,
    {
        let row_count = source.row_count();
        if row_count > 0 {
            Error::check_range("filter column", column, source.column_count())?;
        }

        let _perf = PerfSpan::with_rows(span_names::BUILD, row_count);
        let rows = (0..row_count)
            .map(|row| source.row(row))
            .collect::<Result<Vec<_>>>()?;
        let predicate: Box<dyn Predicate> = Box::new(predicate);
        let visible: Vec<bool> = rows
            .iter()
            .map(|row| passes(predicate.as_ref(), column, row))
            .collect();
        let proxy_to_source: Vec<usize> = visible
            .iter()
            .enumerate()
            .filter_map(|(index, &shown)| shown.then_some(index))
            .collect();
        tracing::debug!(
            target: "horizon_grid::model::filter",
            rows = row_count,
            visible = proxy_to_source.len(),
            column,
            "filtered model created"
        );

        Ok(Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = source.signals().connect(move |operations| {
                if let Some(model) = weak.upgrade() {
                    model.on_source_changed(operations);
                }
            });
            Self {
                source,
                column,
                predicate,
                mapping: RwLock::new(RowMapping {
                    rows,
                    visible,
                    proxy_to_source,
                }),
                signals: ModelSignals::new(),
                _subscription: subscription,
            }
        }))
    }

    /// Returns the wrapped source model.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Returns the column the predicate is evaluated on.
    pub fn filter_column(&self) -> usize {
        self.column
    }

    /// Returns the source row shown at `logical`.
    pub fn map_to_source(&self, logical: usize) -> Option<usize> {
        self.mapping.read().proxy_to_source.get(logical).copied()
    }

    /// Returns the logical row showing source row `physical`, or `None` if it
    /// is filtered out.
    pub fn map_from_source(&self, physical: usize) -> Option<usize> {
        let mapping = self.mapping.read();
        match mapping.visible.get(physical) {
            Some(true) => Some(mapping.logical_position(physical)),
            _ => None,
        }
    }

    fn on_source_changed(&self, operations: &[Operation]) {
        let _tx = self.signals.transaction_guard();
        for operation in operations {
            match self.apply(operation) {
                Ok(Some(filtered)) => self.signals.record(filtered),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(
                        target: "horizon_grid::model::filter",
                        %err,
                        ?operation,
                        "filtered model lost track of its source"
                    );
                    panic!("filtered model out of sync with its source: {err}");
                }
            }
        }
    }

    /// Applies one source operation and returns the operation to re-publish,
    /// if the visible rows changed.
    fn apply(&self, operation: &Operation) -> Result<Option<Operation>> {
        let mut mapping = self.mapping.write();
        let filtered = match operation {
            Operation::AddRow { index, row } => {
                let physical = *index;
                if physical > mapping.rows.len() {
                    return Err(Error::invariant(format!(
                        "source row {physical} added past the end of {} rows",
                        mapping.rows.len()
                    )));
                }
                let shown = self.passes(row);
                mapping.rows.insert(physical, row.clone());
                mapping.visible.insert(physical, shown);
                for source in mapping.proxy_to_source.iter_mut().filter(|s| **s >= physical) {
                    *source += 1;
                }
                let logical = mapping.logical_position(physical);
                tracing::trace!(target: "horizon_grid::model::filter", physical, shown, "source row added");
                shown.then(|| {
                    mapping.proxy_to_source.insert(logical, physical);
                    Operation::AddRow {
                        index: logical,
                        row: row.clone(),
                    }
                })
            }
            Operation::RemoveRow { index, row } => {
                let physical = *index;
                mapping.check_physical(physical)?;
                mapping.rows.remove(physical);
                let shown = mapping.visible.remove(physical);
                let logical = mapping.logical_position(physical);
                if shown {
                    mapping.proxy_to_source.remove(logical);
                }
                for source in mapping.proxy_to_source.iter_mut().filter(|s| **s > physical) {
                    *source -= 1;
                }
                shown.then(|| Operation::RemoveRow {
                    index: logical,
                    row: row.clone(),
                })
            }
            Operation::UpdateValue {
                row: physical,
                column,
                previous,
                current,
            } => {
                let physical = *physical;
                mapping.check_physical(physical)?;
                let before = mapping.rows[physical].clone();
                Error::check_range("column", *column, before.column_count())?;
                let after = before.with_value(*column, current.clone());
                mapping.rows[physical] = after.clone();

                let was_shown = mapping.visible[physical];
                let shown = if *column == self.column {
                    self.passes(&after)
                } else {
                    was_shown
                };
                mapping.visible[physical] = shown;
                let logical = mapping.logical_position(physical);

                match (was_shown, shown) {
                    (false, false) => None,
                    (true, true) => Some(Operation::UpdateValue {
                        row: logical,
                        column: *column,
                        previous: previous.clone(),
                        current: current.clone(),
                    }),
                    (false, true) => {
                        tracing::trace!(target: "horizon_grid::model::filter", physical, "row became visible");
                        mapping.proxy_to_source.insert(logical, physical);
                        Some(Operation::AddRow {
                            index: logical,
                            row: after,
                        })
                    }
                    (true, false) => {
                        tracing::trace!(target: "horizon_grid::model::filter", physical, "row became hidden");
                        mapping.proxy_to_source.remove(logical);
                        Some(Operation::RemoveRow {
                            index: logical,
                            row: before,
                        })
                    }
                }
            }
            Operation::MoveRow {
                source,
                destination,
            } => {
                let (source, destination) = (*source, *destination);
                mapping.check_physical(source)?;
                mapping.check_physical(destination)?;
                let row = mapping.rows.remove(source);
                mapping.rows.insert(destination, row);
                let shown = mapping.visible.remove(source);
                mapping.visible.insert(destination, shown);

                if shown {
                    let from = mapping.logical_position(source);
                    mapping.proxy_to_source.remove(from);
                    for s in mapping.proxy_to_source.iter_mut() {
                        *s = moved_index(*s, source, destination);
                    }
                    let to = mapping.logical_position(destination);
                    mapping.proxy_to_source.insert(to, destination);
                    (from != to).then_some(Operation::MoveRow {
                        source: from,
                        destination: to,
                    })
                } else {
                    for s in mapping.proxy_to_source.iter_mut() {
                        *s = moved_index(*s, source, destination);
                    }
                    None
                }
            }
        };
        Ok(filtered)
    }

    fn passes(&self, row: &RowSnapshot) -> bool {
        passes(self.predicate.as_ref(), self.column, row)
    }
}

/// Evaluates `predicate` on `row[column]`; a missing cell counts as empty.
fn passes(predicate: &dyn Predicate, column: usize, row: &RowSnapshot) -> bool {
    match row.value(column) {
        Some(value) => predicate.evaluate(value),
        None => predicate.evaluate(&CellValue::Empty),
    }
}

impl<S: TableModel + 'static> TableModel for FilteredTableModel<S> {
    fn row_count(&self) -> usize {
        self.mapping.read().proxy_to_source.len()
    }

    fn column_count(&self) -> usize {
        let mapping = self.mapping.read();
        mapping
            .proxy_to_source
            .first()
            .map_or(0, |&physical| mapping.rows[physical].column_count())
    }

    fn get(&self, row: usize, column: usize) -> Result<CellValue> {
        let mapping = self.mapping.read();
        Error::check_range("row", row, mapping.proxy_to_source.len())?;
        mapping.rows[mapping.proxy_to_source[row]].get(0, column)
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn row(&self, index: usize) -> Result<RowSnapshot> {
        let mapping = self.mapping.read();
        Error::check_range("row", index, mapping.proxy_to_source.len())?;
        Ok(mapping.rows[mapping.proxy_to_source[index]].clone())
    }
}

static_assertions::assert_impl_all!(
    FilteredTableModel<super::array_model::ArrayTableModel>: Send,
    Sync
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ArrayTableModel;
    use parking_lot::Mutex;

    fn ints(values: &[i64]) -> Arc<ArrayTableModel> {
        Arc::new(
            ArrayTableModel::from_rows(values.iter().map(|v| vec![CellValue::from(*v)]).collect())
                .unwrap(),
        )
    }

    fn positive(source: Arc<ArrayTableModel>) -> Arc<FilteredTableModel<ArrayTableModel>> {
        FilteredTableModel::new(source, 0, |v: &CellValue| {
            v.as_int().is_some_and(|n| n > 0)
        })
        .unwrap()
    }

    fn column<M: TableModel>(model: &M) -> Vec<i64> {
        (0..model.row_count())
            .map(|row| model.get(row, 0).unwrap().as_int().unwrap())
            .collect()
    }

    fn recorder<M: TableModel>(model: &M) -> (Arc<Mutex<Vec<Vec<Operation>>>>, Subscription) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        let subscription = model
            .signals()
            .connect(move |ops| received_clone.lock().push(ops.to_vec()));
        (received, subscription)
    }

    #[test]
    fn test_construction_and_update_becoming_visible() {
        let source = ints(&[-6, 1, -6, 6]);
        let view = positive(source.clone());
        assert_eq!(column(view.as_ref()), vec![1, 6]);

        let (received, _sub) = recorder(view.as_ref());
        source.set(0, 0, 4).unwrap();
        assert_eq!(column(view.as_ref()), vec![4, 1, 6]);
        assert!(matches!(
            &received.lock()[0][..],
            [Operation::AddRow { index: 0, row }] if row.values() == [CellValue::from(4)]
        ));
    }

    #[test]
    fn test_update_transitions() {
        let source = ints(&[1, -1, 2]);
        let view = positive(source.clone());
        let (received, _sub) = recorder(view.as_ref());

        // Hidden stays hidden.
        source.set(1, 0, -5).unwrap();
        assert!(received.lock().is_empty());

        // Visible stays visible.
        source.set(2, 0, 3).unwrap();
        assert_eq!(
            received.lock()[0],
            vec![Operation::UpdateValue {
                row: 1,
                column: 0,
                previous: 2.into(),
                current: 3.into(),
            }]
        );

        // Visible becomes hidden; the removed snapshot carries the old value.
        source.set(0, 0, 0).unwrap();
        assert!(matches!(
            &received.lock()[1][..],
            [Operation::RemoveRow { index: 0, row }] if row.values() == [CellValue::from(1)]
        ));
        assert_eq!(column(view.as_ref()), vec![3]);
    }

    #[test]
    fn test_update_outside_filter_column() {
        let source = Arc::new(
            ArrayTableModel::from_rows(vec![
                vec![(-1).into(), "a".into()],
                vec![1.into(), "b".into()],
            ])
            .unwrap(),
        );
        let view = positive(source.clone());
        let (received, _sub) = recorder(view.as_ref());

        source.set(0, 1, "x").unwrap();
        source.set(1, 1, "y").unwrap();
        assert_eq!(received.lock().len(), 1);
        assert!(matches!(
            received.lock()[0][..],
            [Operation::UpdateValue { row: 0, column: 1, .. }]
        ));
        assert_eq!(view.get(0, 1).unwrap(), CellValue::from("y"));
    }

    #[test]
    fn test_add_and_remove() {
        let source = ints(&[1, -1, 2]);
        let view = positive(source.clone());
        let (received, _sub) = recorder(view.as_ref());

        source.insert_row(2, vec![5.into()]).unwrap();
        source.insert_row(0, vec![(-3).into()]).unwrap();
        assert_eq!(column(view.as_ref()), vec![1, 5, 2]);

        source.remove_row(2).unwrap();
        source.remove_row(2).unwrap();
        assert_eq!(column(view.as_ref()), vec![1, 2]);

        let received = received.lock();
        // Hidden rows come and go without a dispatch.
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0][..], [Operation::AddRow { index: 1, .. }]));
        assert!(matches!(received[1][..], [Operation::RemoveRow { index: 1, .. }]));
        assert_eq!(view.map_to_source(1), Some(2));
        assert_eq!(view.map_from_source(0), None);
    }

    #[test]
    fn test_source_move() {
        let source = ints(&[1, -1, 2, 3]);
        let view = positive(source.clone());
        let (received, _sub) = recorder(view.as_ref());

        source.move_row(0, 3).unwrap();
        assert_eq!(column(view.as_ref()), vec![2, 3, 1]);
        source.move_row(0, 2).unwrap();
        assert_eq!(column(view.as_ref()), vec![2, 3, 1]);

        let received = received.lock();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0],
            vec![Operation::MoveRow {
                source: 0,
                destination: 2
            }]
        );
    }

    #[test]
    fn test_batch_keeps_snapshots_consistent() {
        let source = ints(&[-1, -2]);
        let view = positive(source.clone());
        let (received, _sub) = recorder(view.as_ref());

        source.transaction(|| {
            source.set(0, 0, 7).unwrap();
            source.set(0, 0, 8).unwrap();
        });
        let received = received.lock();
        assert!(matches!(
            &received[0][..],
            [Operation::AddRow { index: 0, row }, Operation::UpdateValue { row: 0, .. }]
                if row.values() == [CellValue::from(7)]
        ));
        assert_eq!(column(view.as_ref()), vec![8]);
    }

    #[test]
    fn test_invalid_filter_column() {
        assert!(FilteredTableModel::new(ints(&[1]), 1, |_: &CellValue| true).is_err());
        assert!(FilteredTableModel::new(ints(&[]), 3, |_: &CellValue| true).is_ok());
    }
}
