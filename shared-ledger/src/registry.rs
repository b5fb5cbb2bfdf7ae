//! One-time construction of shared instances
//!
//! [`InstanceRegistry`] hands out `Arc` handles to a single lazily-built
//! value. Construction uses double-checked locking:
//!
//! 1. Lock-free fast path: if the instance exists, clone the handle and return.
//! 2. Otherwise take the construction lock and check again, since several
//!    threads may have missed the fast path at the same time.
//! 3. Build only if the instance is still absent.
//!
//! After the first construction every call stays on the fast path and never
//! touches the lock. The lock guard is scoped, so it is released on every
//! exit path, including a failed or panicking constructor. A failed
//! construction leaves the registry empty and a later call may retry.

use parking_lot::{const_mutex, Mutex};
use std::sync::{Arc, OnceLock};

/// Lazily-initialized holder of a single shared instance
pub struct InstanceRegistry<T> {
    /// The instance, once built
    instance: OnceLock<Arc<T>>,

    /// Serializes constructors during the first-access window
    init_lock: Mutex<()>,
}

impl<T> InstanceRegistry<T> {
    /// Create an empty registry, usable in a `static`
    pub const fn new() -> Self {
        Self {
            instance: OnceLock::new(),
            init_lock: const_mutex(()),
        }
    }

    /// Handle to the instance, if it has been built
    pub fn get(&self) -> Option<Arc<T>> {
        self.instance.get().cloned()
    }

    /// Whether the instance has been built
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Handle to the instance, building it with `init` on first access
    ///
    /// `init` runs at most once per registry, no matter how many threads race
    /// on the first call.
    pub fn get_or_init<F>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        match self.get_or_try_init(|| Ok::<T, std::convert::Infallible>(init())) {
            Ok(instance) => instance,
            Err(never) => match never {},
        }
    }

    /// Handle to the instance, building it with a fallible `init` on first access
    ///
    /// If `init` fails the error goes to this caller only and the registry
    /// stays empty.
    pub fn get_or_try_init<F, E>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(instance) = self.instance.get() {
            return Ok(Arc::clone(instance));
        }

        let _guard = self.init_lock.lock();

        if let Some(instance) = self.instance.get() {
            return Ok(Arc::clone(instance));
        }

        let instance = Arc::new(init()?);
        // Only writer: we hold init_lock and saw the cell empty
        let _ = self.instance.set(Arc::clone(&instance));
        Ok(instance)
    }

    /// Drop the registry's handle so the next access builds a fresh instance
    ///
    /// Outstanding handles stay valid and keep pointing at the old instance.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&mut self) -> Option<Arc<T>> {
        self.instance.take()
    }
}

impl<T> Default for InstanceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for InstanceRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
