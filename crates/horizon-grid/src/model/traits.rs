//! Core traits for table models.
//!
//! This module defines the read/observe contract every model implements and
//! the transaction machinery models use to batch their change notifications.

use horizon_grid_core::{Signal, Subscription};
use parking_lot::Mutex;

use super::error::{Error, Result};
use super::operation::{Operation, RowSnapshot};
use super::value::CellValue;

/// The observable tabular interface every model implements and consumes.
///
/// # Implementation Requirements
///
/// - [`row_count`](TableModel::row_count) - Number of rows currently exposed
/// - [`column_count`](TableModel::column_count) - Number of columns; 0 when
///   there are no rows
/// - [`get`](TableModel::get) - Cell lookup, failing with
///   [`Error::Range`] outside `[0, row_count) × [0, column_count)`
/// - [`signals`](TableModel::signals) - The model's change notifications
///
/// Listeners receive the operations of one committed transaction at a time,
/// synchronously, on the stack of the call that closed the outermost
/// transaction. Calls that fail never dispatch.
pub trait TableModel: Send + Sync {
    /// Returns the number of rows.
    fn row_count(&self) -> usize;

    /// Returns the number of columns.
    fn column_count(&self) -> usize;

    /// Returns the value stored at (`row`, `column`).
    fn get(&self, row: usize, column: usize) -> Result<CellValue>;

    /// Returns the signals for this model.
    fn signals(&self) -> &ModelSignals;

    // -------------------------------------------------------------------------
    // Provided methods
    // -------------------------------------------------------------------------

    /// Returns `true` if the model exposes no rows.
    fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Captures the row at `index`.
    fn row(&self, index: usize) -> Result<RowSnapshot> {
        Error::check_range("row", index, self.row_count())?;
        let values = (0..self.column_count())
            .map(|column| self.get(index, column))
            .collect::<Result<Vec<_>>>()?;
        Ok(RowSnapshot::from(values))
    }

    /// Subscribes `listener` to committed transactions.
    ///
    /// Keep the returned [`Subscription`] alive for as long as notifications
    /// are wanted; dropping it (or calling `unlisten()`) stops delivery.
    fn connect<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Operation]) + Send + Sync + 'static,
        Self: Sized,
    {
        self.signals().connect(listener)
    }
}

/// Transaction bookkeeping: nesting depth plus the operations buffered so far.
#[derive(Debug, Default)]
struct TransactionState {
    depth: usize,
    pending: Vec<Operation>,
}

/// Change notifications and transaction batching for a table model.
///
/// Every mutation is bracketed by [`begin_transaction`](Self::begin_transaction)
/// and [`end_transaction`](Self::end_transaction). Operations recorded while a
/// transaction is open are buffered; when the outermost transaction closes the
/// buffer is dispatched to [`changed`](Self::changed) as one unit. An empty
/// buffer is not dispatched.
pub struct ModelSignals {
    /// Emitted once per committed, non-empty transaction.
    pub changed: Signal<Vec<Operation>>,
    transaction: Mutex<TransactionState>,
}

impl Default for ModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSignals {
    /// Creates a new set of model signals.
    pub fn new() -> Self {
        Self {
            changed: Signal::new(),
            transaction: Mutex::new(TransactionState::default()),
        }
    }

    /// Subscribes `listener` to committed transactions.
    pub fn connect<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[Operation]) + Send + Sync + 'static,
    {
        self.changed
            .connect_scoped(move |operations: &Vec<Operation>| listener(operations))
    }

    /// Opens a (possibly nested) transaction.
    pub fn begin_transaction(&self) {
        let mut state = self.transaction.lock();
        state.depth += 1;
        if state.depth == 1 {
            state.pending.clear();
        }
    }

    /// Closes a transaction, dispatching the buffered operations if this was
    /// the outermost one.
    ///
    /// Fails with [`Error::InvariantViolation`] if no transaction is open.
    pub fn end_transaction(&self) -> Result<()> {
        let operations = {
            let mut state = self.transaction.lock();
            if state.depth == 0 {
                return Err(Error::invariant(
                    "end_transaction called without a matching begin_transaction",
                ));
            }
            state.depth -= 1;
            if state.depth > 0 {
                return Ok(());
            }
            std::mem::take(&mut state.pending)
        };

        if operations.is_empty() {
            tracing::trace!(target: "horizon_grid::model::transaction", "empty transaction, nothing to dispatch");
            return Ok(());
        }
        tracing::trace!(
            target: "horizon_grid::model::transaction",
            operations = operations.len(),
            "dispatching transaction"
        );
        self.changed.emit(operations);
        Ok(())
    }

    /// Runs `f` inside a transaction.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.transaction_guard();
        f()
    }

    /// Opens a transaction that closes when the returned guard is dropped.
    pub fn transaction_guard(&self) -> TransactionGuard<'_> {
        self.begin_transaction();
        TransactionGuard { signals: self }
    }

    /// Buffers `operation` in the open transaction.
    ///
    /// Recording outside a transaction commits the operation on its own.
    pub fn record(&self, operation: Operation) {
        let mut state = self.transaction.lock();
        if state.depth > 0 {
            state.pending.push(operation);
            return;
        }
        drop(state);
        let _guard = self.transaction_guard();
        self.transaction.lock().pending.push(operation);
    }

    /// Current nesting depth; 0 when no transaction is open.
    pub fn transaction_depth(&self) -> usize {
        self.transaction.lock().depth
    }

    /// Returns `true` while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction_depth() > 0
    }
}

/// Closes the transaction opened by [`ModelSignals::transaction_guard`].
pub struct TransactionGuard<'a> {
    signals: &'a ModelSignals,
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.signals.end_transaction() {
            tracing::error!(target: "horizon_grid::model::transaction", %err, "failed to close transaction");
        }
    }
}
