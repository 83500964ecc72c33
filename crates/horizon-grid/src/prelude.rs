//! Prelude module for Horizon Grid.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```
//! use horizon_grid::prelude::*;
//! ```

// ============================================================================
// Observer Plumbing
// ============================================================================

pub use crate::signal::{ConnectionId, Signal, Subscription};

// ============================================================================
// Models
// ============================================================================

pub use crate::model::{
    ArrayTableModel, CellValue, FilteredTableModel, ModelSignals, Operation, RowSnapshot,
    SelectionModel, SortedTableModel, TableModel, TranslatedTableModel,
};

// ============================================================================
// Sorting and Filtering
// ============================================================================

pub use crate::model::{ColumnOrder, Comparator, DefaultComparator, Predicate, SortDirection};

// ============================================================================
// Input
// ============================================================================

pub use crate::input::{Key, KeyboardModifiers};

// ============================================================================
// Errors
// ============================================================================

pub use crate::model::{Error, Result};
