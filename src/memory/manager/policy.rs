/*!
 * Block Selection Policies
 * First fit, next fit and best fit searches over the implicit free list
 */

use super::MemoryManager;
use crate::core::types::{Address, Size};
use crate::memory::types::{AllocationPolicy, BlockInfo};
use crate::segment::SegmentProvider;
use tracing::trace;

#[inline]
fn fits(block: &BlockInfo, size: Size) -> bool {
    let hit = block.is_free() && block.size >= size;
    trace!(
        address = format_args!("0x{:x}", block.address),
        size = block.size,
        status = %block.status,
        hit,
        "  visit"
    );
    hit
}

impl<P: SegmentProvider> MemoryManager<P> {
    /// Find a free block of at least `size` bytes with the configured policy
    pub(super) fn find_fit(&mut self, size: Size) -> Option<Address> {
        let found = match self.heap("find_fit").policy {
            AllocationPolicy::FirstFit => self.first_fit(size),
            AllocationPolicy::NextFit => self.next_fit(size),
            AllocationPolicy::BestFit => self.best_fit(size),
        };

        match found {
            Some(address) => trace!(address = format_args!("0x{:x}", address), "--> match"),
            None => trace!(size, "no suitable block found"),
        }
        found
    }

    fn first_fit(&self, size: Size) -> Option<Address> {
        self.blocks()
            .find(|block| fits(block, size))
            .map(|block| block.address)
    }

    /// Resume at the cursor and wrap around to `heap_start` once
    fn next_fit(&mut self, size: Size) -> Option<Address> {
        let heap = self.heap("next_fit");
        let cursor = heap.cursor;
        trace!(cursor = format_args!("0x{:x}", cursor), "starting search");

        let found = self
            .blocks_from(cursor)
            .chain(
                self.blocks_from(heap.heap_start)
                    .take_while(|block| block.address != cursor),
            )
            .find(|block| fits(block, size))
            .map(|block| block.address);

        if let Some(address) = found {
            self.heap_mut("next_fit").cursor = address;
        }
        found
    }

    /// Smallest qualifying block, earliest on ties; always scans the whole heap
    fn best_fit(&self, size: Size) -> Option<Address> {
        self.blocks()
            .filter(|block| fits(block, size))
            .fold(None, |best: Option<BlockInfo>, block| match best {
                Some(current) if current.size <= block.size => Some(current),
                _ => Some(block),
            })
            .map(|block| block.address)
    }
}
