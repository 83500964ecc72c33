//! Core systems for Horizon Grid.
//!
//! This crate provides the observer plumbing shared by every table model in
//! the Horizon Grid engine:
//!
//! - **Signals**: A synchronous, re-entrancy safe listener registry
//! - **Subscriptions**: RAII handles whose `unlisten()` stops delivery
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Signal Example
//!
//! ```
//! use horizon_grid_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a listener to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal, Subscription};
