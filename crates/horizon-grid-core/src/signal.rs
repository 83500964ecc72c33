//! Signal/listener registry for Horizon Grid.
//!
//! Every table model publishes its changes through a [`Signal`]. Listeners
//! (closures) are connected to a signal and invoked synchronously, on the
//! caller's stack, each time the signal is emitted.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The registry of connected listeners
//! - [`ConnectionId`] - Unique identifier returned when connecting a listener
//! - [`Subscription`] - RAII handle that disconnects on `unlisten()` or drop
//!
//! # Re-entrancy
//!
//! No lock is held while a listener runs. A listener may connect, disconnect,
//! or emit on the same signal from inside its own invocation. A listener that
//! is disconnected while an emission is in progress is not invoked for the
//! remainder of that emission.
//!
//! # Example
//!
//! ```
//! use horizon_grid_core::Signal;
//!
//! let rows_changed = Signal::<usize>::new();
//!
//! let subscription = rows_changed.connect_scoped(|count| {
//!     println!("row count is now {}", count);
//! });
//!
//! rows_changed.emit(3);
//!
//! // No further delivery after this point.
//! subscription.unlisten();
//! rows_changed.emit(4);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// A unique identifier for a signal-listener connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Internal storage for a single connection.
struct Connection<Args> {
    /// The listener to invoke.
    slot: Slot<Args>,
    /// Registration sequence number; emission follows this order.
    sequence: u64,
}

type ConnectionTable<Args> = Mutex<SlotMap<ConnectionId, Connection<Args>>>;

/// A type-safe signal that can have multiple connected listeners.
///
/// Listeners are invoked in registration order. Emission is synchronous.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed (by reference) to connected listeners.
pub struct Signal<Args> {
    /// All active connections. Shared with [`Subscription`] handles.
    connections: Arc<ConnectionTable<Args>>,
    /// Source of registration sequence numbers.
    next_sequence: AtomicU64,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(Mutex::new(SlotMap::with_key())),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Connect a listener to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the listener later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let connection = Connection {
            slot: Arc::new(slot),
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
        };
        let id = self.connections.lock().insert(connection);
        tracing::trace!(target: "horizon_grid_core::signal", ?id, "listener connected");
        id
    }

    /// Connect a listener and return a [`Subscription`] that disconnects it.
    ///
    /// Dropping the subscription disconnects the listener, so keep it alive
    /// for as long as notifications are wanted.
    pub fn connect_scoped<F>(&self, slot: F) -> Subscription
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        let table: Arc<dyn Detach> = self.connections.clone();
        Subscription {
            table: Arc::downgrade(&table),
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Disconnect a specific listener by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Returns `true` if the connection is still registered.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(id)
    }

    /// Get the number of connected listeners.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Emit the signal, invoking all connected listeners in registration order.
    ///
    /// The connection table is snapshotted up front and unlocked before any
    /// listener runs. Listeners connected during the emission are not
    /// invoked by it; listeners disconnected during the emission are skipped.
    #[tracing::instrument(skip_all, target = "horizon_grid_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        let mut snapshot: Vec<(u64, ConnectionId, Slot<Args>)> = {
            let connections = self.connections.lock();
            connections
                .iter()
                .map(|(id, conn)| (conn.sequence, id, conn.slot.clone()))
                .collect()
        };
        snapshot.sort_unstable_by_key(|(sequence, _, _)| *sequence);
        tracing::trace!(
            target: "horizon_grid_core::signal",
            connection_count = snapshot.len(),
            "emitting signal"
        );

        for (_, id, slot) in snapshot {
            if self.is_connected(id) {
                slot(&args);
            }
        }
    }
}

/// Type-erased access to a connection table, used by [`Subscription`].
trait Detach: Send + Sync {
    fn detach(&self, id: ConnectionId) -> bool;
}

impl<Args: Send + 'static> Detach for ConnectionTable<Args> {
    fn detach(&self, id: ConnectionId) -> bool {
        self.lock().remove(id).is_some()
    }
}

/// A connection handle that disconnects its listener when dropped.
///
/// Returned by [`Signal::connect_scoped`]. The handle only holds a weak
/// reference to the signal's connection table, so it may outlive the signal;
/// unlistening after the signal is gone is a no-op.
///
/// # Example
///
/// ```
/// use horizon_grid_core::Signal;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// let signal = Signal::<i32>::new();
/// let counter = Arc::new(AtomicI32::new(0));
/// {
///     let counter_clone = counter.clone();
///     let _subscription = signal.connect_scoped(move |&n| {
///         counter_clone.fetch_add(n, Ordering::SeqCst);
///     });
///     signal.emit(42);
/// }
/// signal.emit(43);
/// assert_eq!(counter.load(Ordering::SeqCst), 42);
/// ```
pub struct Subscription {
    table: Weak<dyn Detach>,
    id: ConnectionId,
    active: AtomicBool,
}

impl Subscription {
    /// The connection this subscription controls.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` until [`unlisten`](Self::unlisten) has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Disconnect the listener. Safe to call at any time, any number of
    /// times, including from inside another listener's invocation.
    pub fn unlisten(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(table) = self.table.upgrade() {
            table.detach(self.id);
            tracing::trace!(target: "horizon_grid_core::signal", id = ?self.id, "listener disconnected");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unlisten();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<Vec<u32>>: Send, Sync);
static_assertions::assert_impl_all!(Subscription: Send, Sync);
