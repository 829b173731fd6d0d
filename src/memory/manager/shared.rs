/*!
 * Shared Memory Manager
 * Mutual-exclusion boundary for using one heap from several threads
 */

use super::{HeapReport, MemoryManager};
use crate::core::types::{Address, Size};
use crate::memory::types::{HeapResult, HeapStats};
use crate::segment::{DataSegment, SegmentProvider};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle serializing every operation on one heap
///
/// The manager itself is single-threaded; this wrapper holds a lock for the
/// full duration of each call.
pub struct SharedMemoryManager<P: SegmentProvider = DataSegment> {
    inner: Arc<Mutex<MemoryManager<P>>>,
}

impl<P: SegmentProvider> SharedMemoryManager<P> {
    pub fn new(manager: MemoryManager<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    pub fn malloc(&self, size: Size) -> Address {
        self.inner.lock().malloc(size)
    }

    pub fn try_malloc(&self, size: Size) -> HeapResult<Address> {
        self.inner.lock().try_malloc(size)
    }

    pub fn calloc(&self, count: Size, size: Size) -> HeapResult<Address> {
        self.inner.lock().calloc(count, size)
    }

    pub fn realloc(&self, address: Option<Address>, size: Size) -> Option<Address> {
        self.inner.lock().realloc(address, size)
    }

    pub fn free(&self, address: Address) {
        self.inner.lock().free(address)
    }

    pub fn check(&self) -> HeapReport {
        self.inner.lock().check()
    }

    pub fn stats(&self) -> HeapStats {
        self.inner.lock().stats()
    }

    /// Run `f` with exclusive access to the manager
    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryManager<P>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<P: SegmentProvider> Clone for SharedMemoryManager<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
