//! Internally serialized stack for callers that cannot guarantee a single
//! owner.
//!
//! [`FixedStack`] only *detects* overlapping callers; [`SyncStack`] is the
//! second capability level that actually serializes them, by holding a
//! mutex across each operation. The embedded sanity counter keeps running
//! underneath and will still catch a serialization bug inside this module.

use crate::stack::{FixedStack, OutOfMemory, ResizeStats, StackStats};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-serialized wrapper around [`FixedStack`]. `Send + Sync` when
/// `T: Send`.
pub struct SyncStack<T> {
    inner: Mutex<FixedStack<T>>,
}

impl<T> SyncStack<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FixedStack::new()),
        }
    }

    // A poisoned lock means a panic mid-operation on another thread; the
    // container is still structurally consistent, so keep serving.
    fn lock(&self) -> MutexGuard<'_, FixedStack<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, value: T) -> Result<(), OutOfMemory> {
        self.lock().push(value)
    }

    pub fn pop(&self) -> Option<T> {
        self.lock().pop()
    }

    /// Run `f` on the top element (or `None` when empty) without the borrow
    /// escaping the lock.
    pub fn with_top<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let guard = self.lock();
        if guard.is_empty() {
            f(None)
        } else {
            f(Some(guard.peek()))
        }
    }

    pub fn entries(&self) -> usize {
        self.lock().entries()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn stats(&self) -> StackStats {
        self.lock().stats()
    }

    pub fn resize_stats(&self) -> ResizeStats {
        self.lock().resize_stats()
    }
}

impl<T> Default for SyncStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
