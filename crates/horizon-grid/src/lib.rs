//! Horizon Grid - a reactive tabular-data engine.
//!
//! This crate provides an observable table abstraction, composable derived
//! views (index translation, filtering, sorting) that stay consistent with
//! their source incrementally, and a row-selection state machine driven by
//! pointer and keyboard input.
//!
//! Rendering is out of scope: collaborators read models through
//! [`TableModel`](model::TableModel) and forward input into
//! [`SelectionModel`](model::SelectionModel).
//!
//! # Example
//!
//! ```
//! use horizon_grid::prelude::*;
//!
//! let table = ArrayTableModel::new();
//! let _subscription = table.connect(|operations| {
//!     for operation in operations {
//!         println!("{:?}", operation.kind());
//!     }
//! });
//!
//! table.add_row(vec![CellValue::from("Alice"), CellValue::from(34)])?;
//! table.set(0, 1, 35)?;
//! # Ok::<(), horizon_grid::Error>(())
//! ```

pub use horizon_grid_core::*;

pub mod input;
pub mod model;
pub mod prelude;

pub use model::{Error, Result};
