//! Reuse pool for the scratch state of in-flight `handle` calls.
//!
//! Formatting a record needs a line buffer, a key-prefix buffer and, when a
//! replace hook is configured, a list of open group names. Allocating these
//! per record would dominate the cost of logging small records, so they are
//! borrowed from a bounded free list and handed back when the call finishes.
//!
//! # Lifecycle
//!
//! Each acquisition returns a [`Pooled`] guard that owns its value outright;
//! nothing is shared between concurrent calls. Dropping the guard clears the
//! value (length zero, capacity kept) and returns it to the pool, so release
//! happens on every exit path, including early returns and panics.
//!
//! Values that grew past [`MAX_POOLED_CAPACITY`] and values beyond the idle
//! bound are dropped instead of kept, so one huge record cannot pin memory.

use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

lazy_static! {
    /// The process-wide pool used by handlers not configured with their own.
    static ref SHARED_POOL: Arc<ScratchPool> = Arc::new(ScratchPool::default());
}

/// Largest capacity, in bytes or elements, a value may have and still be
/// returned to the pool.
pub const MAX_POOLED_CAPACITY: usize = 16 << 10;

/// Default number of idle values kept per kind.
pub const DEFAULT_MAX_IDLE: usize = 64;

/// Scratch values that can be reset and reused.
pub trait Reusable: Default {
    fn reset(&mut self);
    fn capacity(&self) -> usize;
}

impl Reusable for Vec<u8> {
    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }
}

impl Reusable for String {
    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        String::capacity(self)
    }
}

impl Reusable for Vec<String> {
    fn reset(&mut self) {
        self.clear();
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }
}

struct FreeList<T> {
    idle: Mutex<Vec<T>>,
}

impl<T: Reusable> FreeList<T> {
    fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
        }
    }

    fn take(&self) -> T {
        self.idle.lock().pop().unwrap_or_default()
    }

    fn give_back(&self, mut value: T, max_idle: usize) {
        if value.capacity() > MAX_POOLED_CAPACITY {
            tracing::trace!(capacity = value.capacity(), "dropping oversized scratch value");
            return;
        }
        value.reset();
        let mut idle = self.idle.lock();
        if idle.len() < max_idle {
            idle.push(value);
        }
    }

    fn len(&self) -> usize {
        self.idle.lock().len()
    }
}

/// A bounded free list of line buffers, prefix buffers and group lists.
pub struct ScratchPool {
    buffers: FreeList<Vec<u8>>,
    prefixes: FreeList<String>,
    group_lists: FreeList<Vec<String>>,
    max_idle: usize,
}

impl ScratchPool {
    /// Creates a pool keeping at most `max_idle` idle values of each kind.
    pub fn new(max_idle: usize) -> Self {
        tracing::debug!(max_idle, "creating scratch pool");
        Self {
            buffers: FreeList::new(),
            prefixes: FreeList::new(),
            group_lists: FreeList::new(),
            max_idle,
        }
    }

    /// Returns the process-wide pool.
    pub fn shared() -> Arc<ScratchPool> {
        Arc::clone(&SHARED_POOL)
    }

    pub fn buffer(&self) -> Pooled<'_, Vec<u8>> {
        self.acquire(&self.buffers)
    }

    pub fn prefix(&self) -> Pooled<'_, String> {
        self.acquire(&self.prefixes)
    }

    pub fn group_list(&self) -> Pooled<'_, Vec<String>> {
        self.acquire(&self.group_lists)
    }

    /// Number of idle line buffers currently held.
    pub fn idle_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn acquire<'p, T: Reusable>(&'p self, list: &'p FreeList<T>) -> Pooled<'p, T> {
        Pooled {
            value: list.take(),
            list,
            max_idle: self.max_idle,
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

/// An exclusively owned scratch value, returned to its pool on drop.
pub struct Pooled<'p, T: Reusable> {
    value: T,
    list: &'p FreeList<T>,
    max_idle: usize,
}

impl<T: Reusable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Reusable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Reusable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        self.list.give_back(mem::take(&mut self.value), self.max_idle);
    }
}
