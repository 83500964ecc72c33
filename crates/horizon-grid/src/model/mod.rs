//! Observable table models for Horizon Grid.
//!
//! This module provides a mutable source table plus a set of derived views
//! that keep themselves up to date incrementally as their source changes:
//!
//! - Every view, from any sequence of source mutations, shows the same rows
//!   it would show if rebuilt from scratch
//! - Mutations are batched into transactions; listeners see one ordered
//!   list of [`Operation`]s per committed transaction
//! - Views can be stacked, each subscribing to exactly one upstream model
//!
//! # Core Types
//!
//! - `CellValue`: The value stored in one cell
//! - `Operation`: One atomic change (add, remove, move, update)
//! - `TableModel`: The read/observe trait every model implements
//! - `ModelSignals`: Change notifications and transaction batching
//!
//! # Model Implementations
//!
//! - `ArrayTableModel`: The mutable source of truth
//! - `TranslatedTableModel`: Reorders rows without touching the source
//! - `FilteredTableModel`: Shows the rows that pass a predicate
//! - `SortedTableModel`: Keeps rows in comparator order
//! - `SelectionModel`: Row selection driven by pointer and keyboard input
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::model::{
//!     ArrayTableModel, CellValue, ColumnOrder, FilteredTableModel, SortedTableModel, TableModel,
//! };
//!
//! let source = Arc::new(ArrayTableModel::new());
//! let positive = FilteredTableModel::new(source.clone(), 0, |v: &CellValue| {
//!     v.as_int().is_some_and(|n| n > 0)
//! })
//! .unwrap();
//! let sorted = SortedTableModel::new(positive.clone(), vec![ColumnOrder::descending(0)]).unwrap();
//!
//! let _subscription = sorted.connect(|operations| {
//!     println!("{} operations committed", operations.len());
//! });
//!
//! source.transaction(|| {
//!     for n in [3, -1, 8, 5] {
//!         source.add_row(vec![CellValue::from(n)]).unwrap();
//!     }
//! });
//! assert_eq!(sorted.row_count(), 3);
//! assert_eq!(sorted.get(0, 0).unwrap(), CellValue::from(8));
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌────────────────┐     ┌──────────────────┐     ┌──────────────────┐
//! │ ArrayTableModel│────>│FilteredTableModel│────>│ SortedTableModel │
//! │ (originates    │     │ (visibility)     │     │ ┌──────────────┐ │
//! │  operations)   │     └──────────────────┘     │ │ Translated   │ │
//! └────────────────┘                              │ └──────────────┘ │
//!         │                                       └──────────────────┘
//!         │            ┌────────────────┐
//!         └───────────>│ SelectionModel │  (row count only)
//!                      └────────────────┘
//! ```

mod array_model;
mod comparator;
mod error;
mod filtered_model;
mod operation;
pub mod selection;
mod sorted_model;
mod traits;
mod translated_model;
mod value;

pub use array_model::ArrayTableModel;
pub use comparator::{ColumnOrder, Comparator, DefaultComparator, SortDirection};
pub use error::{Error, Result};
pub use filtered_model::{FilteredTableModel, Predicate};
pub use operation::{Operation, OperationKind, RowSnapshot};
pub use selection::machine::{Guards, InputState, InteractionState, RowSpan};
pub use selection::SelectionModel;
pub use sorted_model::{SortedTableModel, SortedTableModelBuilder};
pub use traits::{ModelSignals, TableModel, TransactionGuard};
pub use translated_model::TranslatedTableModel;
pub use value::{CellValue, ValueKind};
