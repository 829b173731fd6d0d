/*!
 * Splitting and Coalescing
 */

use super::MemoryManager;
use crate::core::limits::WORD_SIZE;
use crate::core::types::{Address, Size};
use crate::memory::types::BlockStatus;
use crate::segment::SegmentProvider;
use tracing::trace;

impl<P: SegmentProvider> MemoryManager<P> {
    /// Carve the tail beyond `needed` bytes off `block` as a new free block
    ///
    /// The caller rewrites the tags of the front part. Equal sizes leave the
    /// block untouched.
    pub(super) fn split(&mut self, block: Address, needed: Size) {
        let size = self.read_tag(block).size();
        if size <= needed {
            return;
        }

        let rest = block + needed;
        let rest_size = size - needed;
        trace!(
            block = format_args!("0x{:x}", block),
            needed,
            rest = format_args!("0x{:x}", rest),
            rest_size,
            "split"
        );
        self.write_block(rest, rest_size, BlockStatus::Free);
    }

    /// Merge the free block at `block` with free neighbors
    ///
    /// Returns the header of the merged block. The next-fit cursor is moved
    /// to the merged header if it pointed into the merged range.
    pub(super) fn coalesce(&mut self, block: Address) -> Address {
        let tag = self.read_tag(block);
        debug_assert!(tag.is_free(), "coalescing an allocated block");

        let mut header = block;
        let mut size = tag.size();

        let next = self.read_tag(block + size);
        if next.is_free() {
            trace!("  coalescing with succeeding block");
            size += next.size();
        }

        let prev = self.read_tag(block - WORD_SIZE);
        if prev.is_free() {
            trace!("  coalescing with preceding block");
            header -= prev.size();
            size += prev.size();
        }

        if size != tag.size() {
            self.write_block(header, size, BlockStatus::Free);

            let heap = self.heap_mut("coalesce");
            if (header..header + size).contains(&heap.cursor) {
                heap.cursor = header;
            }
        }
        header
    }
}
