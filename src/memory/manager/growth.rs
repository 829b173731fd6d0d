/*!
 * Heap Growth
 * Extends the arena in whole chunks when no free block fits
 */

use super::MemoryManager;
use crate::core::limits::{round_down, WORD_SIZE};
use crate::core::types::{Address, Size};
use crate::memory::tag::Tag;
use crate::memory::types::{BlockStatus, HeapError, HeapResult};
use crate::segment::SegmentProvider;
use tracing::{info, warn};

impl<P: SegmentProvider> MemoryManager<P> {
    /// Extend the heap by at least `min_bytes`, rounded up to whole chunks
    ///
    /// The new region becomes one free block where the end sentinel used to
    /// be and is merged with a free block in front of it. Returns the header
    /// of the resulting free block. On failure nothing is changed.
    pub(super) fn grow(&mut self, min_bytes: Size) -> HeapResult<Address> {
        let heap = self.heap("grow");
        let chunk = heap.chunk_size;
        let bytes = min_bytes
            .max(chunk)
            .checked_next_multiple_of(chunk)
            .ok_or(HeapError::RequestTooLarge(min_bytes))?;

        let brk = self.segment.extend(bytes).map_err(|source| {
            warn!(bytes, error = %source, "cannot increase heap break");
            HeapError::OutOfMemory {
                requested: bytes,
                source,
            }
        })?;

        let old_end = heap.heap_end;
        let new_end = round_down(brk - WORD_SIZE);

        self.write_tag(new_end, Tag::SENTINEL);
        self.write_block(old_end, new_end - old_end, BlockStatus::Free);

        let state = self.heap_mut("grow");
        state.heap_end = new_end;
        state.grow_count += 1;

        info!(
            bytes,
            heap_end = format_args!("0x{:x}", new_end),
            brk = format_args!("0x{:x}", brk),
            "Heap extended"
        );

        Ok(self.coalesce(old_end))
    }
}
