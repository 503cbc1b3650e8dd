// Resource pool
//
// Exclusive-lease pool of model handles, grouped by qualified
// "<provider>/<model>" key. Each key owns a fixed slab of handles and a
// wait-capable free list: leasing takes a handle off the free list,
// suspending FIFO among waiters when none is available, and the RAII
// lease guard returns the handle on drop so release runs on every exit
// path, including errors and cancellation.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;

use redfuzz_core::{FuzzError, ProviderHandle, Result};

/// Per-key slab: free list plus occupancy counters.
struct PoolSlot {
    free_tx: mpsc::UnboundedSender<ProviderHandle>,
    // Waiters queue on this lock; tokio's Mutex is fair, so leases are
    // granted in arrival order.
    free_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ProviderHandle>>,
    capacity: AtomicUsize,
    available: AtomicUsize,
}

impl PoolSlot {
    fn new() -> Self {
        let (free_tx, free_rx) = mpsc::unbounded_channel();
        Self {
            free_tx,
            free_rx: tokio::sync::Mutex::new(free_rx),
            capacity: AtomicUsize::new(0),
            available: AtomicUsize::new(0),
        }
    }
}

/// Exclusive-lease pool of named, stateful model handles.
///
/// Handles are registered at run start and leased one at a time; a key's
/// concurrently leased handles never exceed the number registered for it.
pub struct ResourcePool {
    slots: RwLock<HashMap<String, Arc<PoolSlot>>>,
}

impl ResourcePool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handle under its qualified key
    pub fn register(&self, handle: ProviderHandle) {
        let key = handle.qualified_name().to_string();
        let slot = {
            let mut slots = self.slots.write();
            Arc::clone(slots.entry(key.clone()).or_insert_with(|| Arc::new(PoolSlot::new())))
        };

        slot.capacity.fetch_add(1, Ordering::SeqCst);
        slot.available.fetch_add(1, Ordering::SeqCst);
        // The receiver half lives in the slot, so the send cannot fail.
        let _ = slot.free_tx.send(handle);
        debug!(key = %key, "registered handle");
    }

    /// Lease a handle for `key`, suspending until one becomes available.
    ///
    /// Fails immediately with `ResourceNotFound` if no handle was ever
    /// registered for `key` -- checked eagerly, before any wait is
    /// entered, since waiting on a key nobody will register is a silent
    /// deadlock.
    pub async fn lease(&self, key: &str) -> Result<Lease> {
        let slot = self
            .slots
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| FuzzError::ResourceNotFound(key.to_string()))?;

        let mut free_rx = slot.free_rx.lock().await;
        let handle = free_rx
            .recv()
            .await
            .ok_or_else(|| FuzzError::provider("resource pool free list closed"))?;
        drop(free_rx);

        slot.available.fetch_sub(1, Ordering::SeqCst);
        debug!(key = %key, "leased handle");

        Ok(Lease {
            handle: Some(handle),
            slot,
        })
    }

    /// Registered keys, in arbitrary order
    pub fn keys(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    /// Whether any handle was registered for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.slots.read().contains_key(key)
    }

    /// Number of handles registered for `key`
    pub fn capacity(&self, key: &str) -> usize {
        self.slots
            .read()
            .get(key)
            .map(|s| s.capacity.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Number of handles currently on the free list for `key`
    pub fn available(&self, key: &str) -> usize {
        self.slots
            .read()
            .get(key)
            .map(|s| s.available.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive, temporary ownership of one pooled handle.
///
/// Dropping the lease returns the handle to the pool and wakes the next
/// waiter.
pub struct Lease {
    handle: Option<ProviderHandle>,
    slot: Arc<PoolSlot>,
}

impl Lease {
    /// The leased provider handle
    pub fn provider(&self) -> &(dyn redfuzz_core::ModelProvider + 'static) {
        // Invariant: `handle` is only taken in Drop.
        self.handle.as_deref().unwrap()
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("key", &self.provider().qualified_name())
            .finish_non_exhaustive()
    }
}

impl Deref for Lease {
    type Target = dyn redfuzz_core::ModelProvider;

    fn deref(&self) -> &Self::Target {
        self.provider()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.slot.available.fetch_add(1, Ordering::SeqCst);
            let _ = self.slot.free_tx.send(handle);
        }
    }
}
