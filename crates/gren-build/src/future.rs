//! One-shot futures for fan-out / fan-in coordination
//!
//! Each concurrent task (verify one package, compile one module) writes its
//! result into a `Promise` exactly once; dependent tasks block on `wait`
//! until the writer finishes. Promises live in an append-only map: the
//! coordinator registers every key up front inside one short critical
//! section, then readers never contend with each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};

/// A write-once cell with blocking reads.
pub struct Promise<T> {
    slot: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> Promise<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Fill the promise. Filling twice is a coordinator bug.
    pub fn fulfill(&self, value: T) {
        let mut slot = self.slot.lock().expect("promise poisoned");
        debug_assert!(slot.is_none(), "promise fulfilled twice");
        *slot = Some(value);
        self.ready.notify_all();
    }

    /// Block until the promise is filled, then clone the value out.
    pub fn wait(&self) -> T {
        let mut slot = self.slot.lock().expect("promise poisoned");
        loop {
            if let Some(value) = slot.as_ref() {
                return value.clone();
            }
            slot = self.ready.wait(slot).expect("promise poisoned");
        }
    }
}

impl<T: Clone> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An append-only map of promises.
pub struct PromiseMap<K, V> {
    inner: Mutex<HashMap<K, Arc<Promise<V>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> PromiseMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Register a fresh promise under `key` and hand it back for the task
    /// that will fulfill it.
    pub fn register(&self, key: K) -> Arc<Promise<V>> {
        let promise = Arc::new(Promise::new());
        let mut inner = self.inner.lock().expect("promise map poisoned");
        inner.insert(key, Arc::clone(&promise));
        promise
    }

    pub fn get(&self, key: &K) -> Option<Arc<Promise<V>>> {
        let inner = self.inner.lock().expect("promise map poisoned");
        inner.get(key).cloned()
    }

    /// Block on the promise under `key`. `None` when the key was never
    /// registered (the caller treats that like a failed producer).
    pub fn wait_for(&self, key: &K) -> Option<V> {
        self.get(key).map(|promise| promise.wait())
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for PromiseMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
