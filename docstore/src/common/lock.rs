use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// A handle to a named mutex that can be stored and reused.
#[derive(Clone)]
pub struct LockHandle {
    lock: Arc<Mutex<()>>,
}

impl LockHandle {
    /// Acquires the lock, blocking the current thread until it is available.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}

/// Registry of named mutexes.
///
/// The collection registry and the fjall store use it to serialize work that
/// must not interleave for the same name (check-then-create of a collection,
/// position assignment inside one collection) while leaving unrelated names
/// free to proceed in parallel.
///
/// ```
/// use docstore::common::LockRegistry;
///
/// let locks = LockRegistry::new();
/// let handle = locks.get_lock("books");
/// {
///     let _guard = handle.lock();
///     // only one thread at a time reaches this point for "books"
/// }
/// ```
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        LockRegistry {
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Gets the lock for the given name, creating it on first use.
    pub fn get_lock(&self, name: &str) -> LockHandle {
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        LockHandle { lock }
    }

    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }
}
