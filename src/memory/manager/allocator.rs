/*!
 * Heap Allocator Implementation
 * malloc, calloc, realloc and free
 */

use super::{fatal, MemoryManager};
use crate::core::limits::{BLOCK_OVERHEAD, GRANULARITY, WORD_SIZE};
use crate::core::types::{Address, Size};
use crate::memory::types::{BlockStatus, HeapError, HeapResult};
use crate::segment::SegmentProvider;
use tracing::{debug, trace, warn};

/// Block size holding `size` payload bytes plus both tags
fn block_size_for(size: Size) -> HeapResult<Size> {
    size.checked_add(BLOCK_OVERHEAD + GRANULARITY - 1)
        .map(|total| total & !(GRANULARITY - 1))
        .ok_or(HeapError::RequestTooLarge(size))
}

impl<P: SegmentProvider> MemoryManager<P> {
    /// Allocate at least `size` payload bytes
    ///
    /// Fatal if the provider cannot grow the heap.
    pub fn malloc(&mut self, size: Size) -> Address {
        match self.try_malloc(size) {
            Ok(address) => address,
            Err(err) => fatal("malloc", err),
        }
    }

    /// Allocate at least `size` payload bytes, handing exhaustion back
    ///
    /// The heap is unchanged when an error is returned.
    pub fn try_malloc(&mut self, size: Size) -> HeapResult<Address> {
        debug!(size, "malloc");
        self.heap("malloc");

        let needed = block_size_for(size)?;
        trace!(needed, "  blocksize");

        let block = match self.find_fit(needed) {
            Some(block) => block,
            None => {
                let deficit = needed.saturating_sub(self.trailing_free());
                self.grow(deficit)?;
                match self.find_fit(needed) {
                    Some(block) => block,
                    None => fatal(
                        "malloc",
                        HeapError::Corrupted {
                            errors: self.check().errors.len(),
                        },
                    ),
                }
            }
        };

        self.split(block, needed);
        self.write_block(block, needed, BlockStatus::Allocated);
        self.verify("malloc");

        Ok(block + WORD_SIZE)
    }

    /// Allocate a zero-filled region for `count` elements of `size` bytes
    pub fn calloc(&mut self, count: Size, size: Size) -> HeapResult<Address> {
        debug!(count, size, "calloc");
        self.heap("calloc");

        let total = count.checked_mul(size).ok_or_else(|| {
            warn!(count, size, "calloc size overflow");
            HeapError::SizeOverflow { count, size }
        })?;

        let address = self.malloc(total);
        self.fill_payload(address, total, 0);
        Ok(address)
    }

    /// Resize the allocation at `address` to `size` payload bytes
    ///
    /// `None` behaves like `malloc`; a zero size frees the block and returns
    /// `None`. Shrinking and growing into a free successor happen in place,
    /// anything else moves the content to a new block.
    pub fn realloc(&mut self, address: Option<Address>, size: Size) -> Option<Address> {
        debug!(address = ?address, size, "realloc");
        self.heap("realloc");

        let Some(address) = address else {
            return Some(self.malloc(size));
        };
        if size == 0 {
            self.free(address);
            return None;
        }

        let block = match self.locate(address) {
            Some(block) if !block.is_free() => block,
            Some(_) => fatal("realloc", HeapError::DoubleFree { address }),
            None => fatal("realloc", HeapError::InvalidFree { address }),
        };
        let needed = block_size_for(size).unwrap_or_else(|err| fatal("realloc", err));

        if needed <= block.size {
            if needed < block.size {
                trace!("  shrinking in place");
                self.split(block.address, needed);
                self.write_block(block.address, needed, BlockStatus::Allocated);
                self.coalesce(block.address + needed);
            }
            self.verify("realloc");
            return Some(address);
        }

        let next = self.read_tag(block.end());
        if next.is_free() && block.size + next.size() >= needed {
            trace!("  growing into succeeding block");
            let merged = block.size + next.size();
            self.write_block(block.address, merged, BlockStatus::Allocated);
            self.split(block.address, needed);
            self.write_block(block.address, needed, BlockStatus::Allocated);

            let heap = self.heap_mut("realloc");
            if heap.cursor == block.end() {
                heap.cursor = block.address;
            }
            self.verify("realloc");
            return Some(address);
        }

        trace!("  moving to a new block");
        let moved = self.malloc(size);
        let keep = (block.size - BLOCK_OVERHEAD).min(size);
        self.copy_payload(address, moved, keep);
        self.free(address);
        Some(moved)
    }

    /// Release the allocation at `address`
    ///
    /// Freeing anything but a live allocation is fatal.
    pub fn free(&mut self, address: Address) {
        debug!(address = format_args!("0x{:x}", address), "free");
        self.heap("free");

        let block = match self.locate(address) {
            Some(block) if block.is_free() => {
                fatal("free", HeapError::DoubleFree { address })
            }
            Some(block) => block,
            None => fatal("free", HeapError::InvalidFree { address }),
        };

        self.write_block(block.address, block.size, BlockStatus::Free);
        self.coalesce(block.address);
        self.verify("free");
    }
}
