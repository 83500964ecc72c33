//! Sorting layer over a source model.
//!
//! [`SortedTableModel`] keeps its rows ordered by a list of [`ColumnOrder`]
//! entries. It owns a [`TranslatedTableModel`] over the source and orders
//! rows by moving them in that translation layer, so the source itself is
//! never reordered.
//!
//! Rows are re-seated incrementally: after each committed source change only
//! the rows that were added, or whose ordered columns changed, are moved.

use std::cmp::Ordering;
use std::sync::{Arc, Weak};

use horizon_grid_core::logging::span_names;
use horizon_grid_core::{PerfSpan, Subscription};
use parking_lot::RwLock;

use super::comparator::{ColumnOrder, Comparator, DefaultComparator};
use super::error::{Error, Result};
use super::operation::{moved_index, Operation, RowSnapshot};
use super::traits::{ModelSignals, TableModel};
use super::translated_model::TranslatedTableModel;
use super::value::CellValue;

/// A view of a source model kept in comparator order.
///
/// For any two rows at positions `i < j`, comparing row `i` with row `j`
/// column by column along [`column_order`](Self::column_order) never yields
/// `Greater`. Rows that compare equal keep their relative order.
///
/// Changing the column order re-sorts immediately. A comparison that fails
/// while re-seating a changed row is logged and leaves that row in place.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_grid::model::{ArrayTableModel, CellValue, ColumnOrder, SortedTableModel, TableModel};
///
/// let source = Arc::new(
///     ArrayTableModel::from_rows(vec![vec![7.into()], vec![1.into()], vec![6.into()]]).unwrap(),
/// );
/// let sorted = SortedTableModel::new(source.clone(), vec![ColumnOrder::ascending(0)]).unwrap();
/// assert_eq!(sorted.get(0, 0).unwrap(), CellValue::from(1));
///
/// source.add_row(vec![0.into()]).unwrap();
/// assert_eq!(sorted.get(0, 0).unwrap(), CellValue::from(0));
/// ```
pub struct SortedTableModel<S: TableModel> {
    translated: Arc<TranslatedTableModel<S>>,
    comparator: Box<dyn Comparator>,
    column_order: RwLock<Vec<ColumnOrder>>,
    signals: ModelSignals,
    _subscription: Subscription,
}

impl<S: TableModel + 'static> SortedTableModel<S> {
    /// Sorts `source` by `column_order` using the [`DefaultComparator`].
    pub fn new(source: Arc<S>, column_order: Vec<ColumnOrder>) -> Result<Arc<Self>> {
        Self::builder(source).column_order(column_order).build()
    }

    /// Starts building a sorted model over `source`.
    pub fn builder(source: Arc<S>) -> SortedTableModelBuilder<S> {
        SortedTableModelBuilder::new(source)
    }

    fn with_parts(
        source: Arc<S>,
        comparator: Box<dyn Comparator>,
        column_order: Vec<ColumnOrder>,
    ) -> Result<Arc<Self>> {
        check_columns(&*source, &column_order)?;
        let translated = TranslatedTableModel::new(source);
        let model = Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = translated.signals().connect(move |operations| {
                if let Some(model) = weak.upgrade() {
                    model.on_translated_changed(operations);
                }
            });
            Self {
                translated,
                comparator,
                column_order: RwLock::new(column_order),
                signals: ModelSignals::new(),
                _subscription: subscription,
            }
        });
        model.sort()?;
        Ok(model)
    }

    /// Returns the wrapped source model.
    pub fn source(&self) -> &Arc<S> {
        self.translated.source()
    }

    /// Returns the comparator used to order cell values.
    pub fn comparator(&self) -> &dyn Comparator {
        self.comparator.as_ref()
    }

    /// Returns the current tie-break list.
    pub fn column_order(&self) -> Vec<ColumnOrder> {
        self.column_order.read().clone()
    }

    /// Replaces the tie-break list and re-sorts.
    ///
    /// The moves the re-sort makes are dispatched as one transaction. On
    /// failure the previous list is restored and nothing is dispatched.
    pub fn set_column_order(&self, column_order: Vec<ColumnOrder>) -> Result<()> {
        check_columns(self, &column_order)?;
        let previous = std::mem::replace(&mut *self.column_order.write(), column_order);
        if let Err(err) = self.sort() {
            *self.column_order.write() = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Returns the source row shown at `logical`.
    pub fn map_to_source(&self, logical: usize) -> Option<usize> {
        self.translated.map_to_source(logical)
    }

    /// Returns the logical row showing source row `physical`.
    pub fn map_from_source(&self, physical: usize) -> Option<usize> {
        self.translated.map_from_source(physical)
    }

    /// Fully re-sorts the rows.
    ///
    /// Every comparison is made before any row moves, so a comparison
    /// failure leaves the order untouched. The moves are dispatched as one
    /// transaction; replaying them on the previous order yields the sorted
    /// order.
    pub fn sort(&self) -> Result<()> {
        let order = self.column_order.read().clone();
        let row_count = self.translated.row_count();
        let _perf = PerfSpan::with_rows(span_names::SORT, row_count);

        // Stable binary insertion: each row goes after every row equal to it.
        let mut target: Vec<usize> = Vec::with_capacity(row_count);
        for row in 0..row_count {
            let mut low = 0;
            let mut high = target.len();
            while low < high {
                let mid = (low + high) / 2;
                if self.compare_rows(row, target[mid], &order)? == Ordering::Less {
                    high = mid;
                } else {
                    low = mid + 1;
                }
            }
            target.insert(low, row);
        }

        let _tx = self.signals.transaction_guard();
        let mut current: Vec<usize> = (0..row_count).collect();
        let mut moves = 0usize;
        for (position, row) in target.into_iter().enumerate() {
            let Some(found) = current[position..].iter().position(|&r| r == row) else {
                return Err(Error::invariant(format!("row {row} vanished while sorting")));
            };
            let from = position + found;
            if from != position {
                self.translated.move_row(from, position)?;
                let moved = current.remove(from);
                current.insert(position, moved);
                moves += 1;
            }
        }
        tracing::debug!(target: "horizon_grid::model::sort", rows = row_count, moves, "sorted");
        Ok(())
    }

    /// Compares the rows at logical positions `a` and `b` along `order`.
    fn compare_rows(&self, a: usize, b: usize, order: &[ColumnOrder]) -> Result<Ordering> {
        for column in order {
            let left = self.translated.get(a, column.index)?;
            let right = self.translated.get(b, column.index)?;
            let ordering = column
                .direction
                .apply(self.comparator.compare(&left, &right)?);
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    fn on_translated_changed(&self, operations: &[Operation]) {
        let _tx = self.signals.transaction_guard();
        let ordered: Vec<usize> = self
            .column_order
            .read()
            .iter()
            .map(|column| column.index)
            .collect();

        // Logical positions of rows whose place in the order is unknown,
        // kept current as later operations shift them.
        let mut unsettled: Vec<usize> = Vec::new();
        for operation in operations {
            self.signals.record(operation.clone());
            match operation {
                Operation::AddRow { index, .. } => {
                    for row in unsettled.iter_mut().filter(|r| **r >= *index) {
                        *row += 1;
                    }
                    unsettled.push(*index);
                }
                Operation::RemoveRow { index, .. } => {
                    unsettled.retain(|r| r != index);
                    for row in unsettled.iter_mut().filter(|r| **r > *index) {
                        *row -= 1;
                    }
                }
                Operation::MoveRow {
                    source,
                    destination,
                } => {
                    for row in unsettled.iter_mut() {
                        *row = moved_index(*row, *source, *destination);
                    }
                }
                Operation::UpdateValue { row, column, .. } => {
                    if ordered.contains(column) && !unsettled.contains(row) {
                        unsettled.push(*row);
                    }
                }
            }
        }

        if !unsettled.is_empty() {
            self.seat(unsettled);
        }
    }

    /// Moves each unsettled row directly before the first settled row that
    /// sorts after it.
    fn seat(&self, mut unsettled: Vec<usize>) {
        let order = self.column_order.read().clone();
        while let Some(from) = unsettled.pop() {
            let destination = match self.destination(from, &unsettled, &order) {
                Ok(destination) => destination,
                Err(err) => {
                    tracing::warn!(
                        target: "horizon_grid::model::sort",
                        %err,
                        row = from,
                        "cannot order row, leaving it in place"
                    );
                    continue;
                }
            };
            if destination == from {
                continue;
            }
            tracing::trace!(target: "horizon_grid::model::sort", from, destination, "seating row");
            if let Err(err) = self.translated.move_row(from, destination) {
                tracing::error!(target: "horizon_grid::model::sort", %err, "failed to seat row");
                continue;
            }
            for row in unsettled.iter_mut() {
                *row = moved_index(*row, from, destination);
            }
        }
    }

    /// Where the row at `from` belongs among the settled rows, as a
    /// `move_row` destination.
    fn destination(&self, from: usize, unsettled: &[usize], order: &[ColumnOrder]) -> Result<usize> {
        let row_count = self.translated.row_count();
        // `slot` indexes the rows as they are with `from` taken out.
        for slot in 0..row_count.saturating_sub(1) {
            let other = if slot < from { slot } else { slot + 1 };
            if unsettled.contains(&other) {
                continue;
            }
            if self.compare_rows(from, other, order)? == Ordering::Less {
                return Ok(slot);
            }
        }
        Ok(row_count.saturating_sub(1))
    }
}

/// Fails with [`Error::Range`] if `model` has rows and an entry of
/// `column_order` names a column it lacks.
fn check_columns<M: TableModel + ?Sized>(model: &M, column_order: &[ColumnOrder]) -> Result<()> {
    if model.row_count() == 0 {
        return Ok(());
    }
    let columns = model.column_count();
    column_order
        .iter()
        .try_for_each(|column| Error::check_range("sort column", column.index, columns))
}

impl<S: TableModel + 'static> TableModel for SortedTableModel<S> {
    fn row_count(&self) -> usize {
        self.translated.row_count()
    }

    fn column_count(&self) -> usize {
        self.translated.column_count()
    }

    fn get(&self, row: usize, column: usize) -> Result<CellValue> {
        self.translated.get(row, column)
    }

    fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    fn row(&self, index: usize) -> Result<RowSnapshot> {
        self.translated.row(index)
    }
}

/// Builder for [`SortedTableModel`].
pub struct SortedTableModelBuilder<S: TableModel> {
    source: Arc<S>,
    comparator: Box<dyn Comparator>,
    column_order: Vec<ColumnOrder>,
}

impl<S: TableModel + 'static> SortedTableModelBuilder<S> {
    /// Creates a builder that sorts nothing with the [`DefaultComparator`].
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            comparator: Box::new(DefaultComparator),
            column_order: Vec::new(),
        }
    }

    /// Uses `comparator` to order cell values.
    pub fn comparator<C>(mut self, comparator: C) -> Self
    where
        C: Comparator + 'static,
    {
        self.comparator = Box::new(comparator);
        self
    }

    /// Replaces the tie-break list.
    pub fn column_order(mut self, column_order: Vec<ColumnOrder>) -> Self {
        self.column_order = column_order;
        self
    }

    /// Appends one column to the tie-break list.
    pub fn then_by(mut self, column: ColumnOrder) -> Self {
        self.column_order.push(column);
        self
    }

    /// Builds the model and performs the initial sort.
    pub fn build(self) -> Result<Arc<SortedTableModel<S>>> {
        SortedTableModel::with_parts(self.source, self.comparator, self.column_order)
    }
}

static_assertions::assert_impl_all!(
    SortedTableModel<super::array_model::ArrayTableModel>: Send,
    Sync
);
