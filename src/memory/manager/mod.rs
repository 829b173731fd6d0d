/*!
 * Memory Management
 *
 * Boundary-tag heap manager over a single growable arena.
 *
 * ## Heap Organization
 *
 * The arena is owned by a [`SegmentProvider`]. Between two sentinel
 * half-blocks lies the usable heap `[heap_start, heap_end)`, aligned to the
 * 32-byte block granularity:
 *
 * ```text
 *         initial sentinel half-block                  end sentinel half-block
 *                   |                                             |
 *   segment start   |   heap_start                         heap_end       brk
 *               |   |   |                                         |       |
 *               v   v   v                                         v       v
 *               +---+---+-----------------------------------------+---+---+
 *               |???| F | h :                                 : f | H |???|
 *               +---+---+-----------------------------------------+---+---+
 * ```
 *
 * Every block carries identical header and footer tags, so both neighbors
 * of a block are reachable in O(1) and freed blocks are coalesced
 * immediately.
 *
 * ## Features
 *
 * - **Policies**: first fit, next fit and best fit, fixed at `init`
 * - **Block splitting**: always at granularity boundaries
 * - **Growth**: the arena is extended in whole chunks of provider pages
 * - **Fatal corruption handling**: double frees and invalid frees stop the
 *   manager instead of returning an error
 */

mod allocator;
mod arena;
mod check;
mod coalesce;
mod growth;
mod policy;
mod shared;

pub use arena::Blocks;
pub use check::{CheckError, HeapReport};
pub use shared::SharedMemoryManager;

use super::traits::{Allocator, HeapInspector};
use super::types::{
    AllocationPolicy, BlockInfo, BlockStatus, HeapConfig, HeapError, HeapResult, HeapStats,
};
use crate::core::limits::{round_down, round_up, BLOCK_OVERHEAD, GRANULARITY, WORD_SIZE};
use crate::core::types::{Address, Size};
use crate::memory::tag::Tag;
use crate::segment::{DataSegment, SegmentProvider};
use tracing::{debug, error, info};

/// Process-lifetime bookkeeping, present once the heap is initialized
#[derive(Debug, Clone, Copy)]
pub(super) struct HeapState {
    pub policy: AllocationPolicy,
    pub heap_start: Address,
    pub heap_end: Address,
    /// Most recently selected block, used by next fit
    pub cursor: Address,
    pub chunk_size: Size,
    pub grow_count: usize,
}

/// Heap manager context
///
/// Owns its segment provider. Starts uninitialized; [`MemoryManager::init`]
/// must be called exactly once before any other operation.
pub struct MemoryManager<P: SegmentProvider = DataSegment> {
    pub(super) segment: P,
    pub(super) config: HeapConfig,
    pub(super) state: Option<HeapState>,
}

/// Report a fatal heap condition and stop
#[cold]
#[track_caller]
pub(super) fn fatal(op: &'static str, err: HeapError) -> ! {
    error!(op, error = %err, "fatal heap condition");
    panic!("PANIC in {}: {}", op, err);
}

impl<P: SegmentProvider> MemoryManager<P> {
    pub fn new(segment: P) -> Self {
        Self::with_config(segment, HeapConfig::default())
    }

    pub fn with_config(segment: P, config: HeapConfig) -> Self {
        Self {
            segment,
            config,
            state: None,
        }
    }

    /// Initialize the heap with the given block selection policy
    ///
    /// Obtains the first chunk from the provider, writes both sentinels and
    /// formats the usable range as one free block.
    pub fn init(&mut self, policy: AllocationPolicy) {
        debug!(%policy, "init");

        if self.state.is_some() {
            fatal("init", HeapError::AlreadyInitialized);
        }

        let (start, brk) = self.segment.extent();
        let page_size = self.segment.page_size();
        debug!(
            start = format_args!("0x{:x}", start),
            brk = format_args!("0x{:x}", brk),
            page_size,
            "segment status"
        );

        if start != brk {
            fatal("init", HeapError::SegmentNotClean { start, brk });
        }
        if page_size == 0 {
            fatal("init", HeapError::InvalidPageSize(page_size));
        }
        let chunk_size = page_size
            .checked_mul(self.config.chunk_pages)
            .unwrap_or_else(|| fatal("init", HeapError::InvalidChunkSize(usize::MAX)));
        if chunk_size % GRANULARITY != 0 || chunk_size < 2 * GRANULARITY {
            fatal("init", HeapError::InvalidChunkSize(chunk_size));
        }

        let brk = match self.segment.extend(chunk_size) {
            Ok(brk) => brk,
            Err(source) => fatal(
                "init",
                HeapError::OutOfMemory {
                    requested: chunk_size,
                    source,
                },
            ),
        };

        let heap_start = round_up(start + WORD_SIZE);
        let heap_end = round_down(brk - WORD_SIZE);

        self.write_tag(heap_start - WORD_SIZE, Tag::SENTINEL);
        self.write_tag(heap_end, Tag::SENTINEL);
        if heap_end > heap_start {
            self.write_block(heap_start, heap_end - heap_start, BlockStatus::Free);
        }

        self.state = Some(HeapState {
            policy,
            heap_start,
            heap_end,
            cursor: heap_start,
            chunk_size,
            grow_count: 0,
        });

        info!(
            %policy,
            heap_start = format_args!("0x{:x}", heap_start),
            heap_end = format_args!("0x{:x}", heap_end),
            chunk_size,
            "Heap manager initialized"
        );
        self.verify("init");
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Selected policy, `None` before `init`
    pub fn policy(&self) -> Option<AllocationPolicy> {
        self.state.map(|s| s.policy)
    }

    /// Usable heap range as `(heap_start, heap_end)`
    pub fn heap_bounds(&self) -> (Address, Address) {
        let heap = self.heap("heap_bounds");
        (heap.heap_start, heap.heap_end)
    }

    /// Provider extent as `(start, brk)`
    pub fn segment_extent(&self) -> (Address, Address) {
        self.segment.extent()
    }

    pub fn chunk_size(&self) -> Size {
        self.heap("chunk_size").chunk_size
    }

    /// Block the next-fit search resumes at
    pub fn cursor(&self) -> Address {
        self.heap("cursor").cursor
    }

    pub fn segment(&self) -> &P {
        &self.segment
    }

    /// Raw provider access for diagnostics
    ///
    /// Writes outside allocated payloads corrupt the block structure.
    pub fn segment_mut(&mut self) -> &mut P {
        &mut self.segment
    }

    /// Header view of the block starting at `address`
    pub fn block(&self, address: Address) -> HeapResult<BlockInfo> {
        let heap = self.heap("block");
        if address < heap.heap_start || address >= heap.heap_end {
            return Err(HeapError::InvalidAddress(address));
        }
        let tag = self.try_read_tag(address)?;
        Ok(BlockInfo {
            address,
            size: tag.size(),
            status: tag.status(),
        })
    }

    /// Iterate over all blocks from `heap_start` to the end sentinel
    pub fn blocks(&self) -> Blocks<'_> {
        let heap = self.heap("blocks");
        self.blocks_from(heap.heap_start)
    }

    /// Payload bytes available in the allocation at `address`
    pub fn usable_size(&self, address: Address) -> HeapResult<Size> {
        self.allocated_block(address)
            .map(|block| block.size - BLOCK_OVERHEAD)
    }

    /// Payload of the allocation at `address`
    pub fn payload(&self, address: Address) -> HeapResult<&[u8]> {
        let len = self.usable_size(address)?;
        let offset = self.offset(address)?;
        Ok(&self.segment.bytes()[offset..offset + len])
    }

    /// Mutable payload of the allocation at `address`
    pub fn payload_mut(&mut self, address: Address) -> HeapResult<&mut [u8]> {
        let len = self.usable_size(address)?;
        let offset = self.offset(address)?;
        Ok(&mut self.segment.bytes_mut()[offset..offset + len])
    }

    /// Consume the manager and hand back its provider
    pub fn into_segment(self) -> P {
        self.segment
    }

    pub(super) fn heap(&self, op: &'static str) -> HeapState {
        match self.state {
            Some(state) => state,
            None => fatal(op, HeapError::NotInitialized),
        }
    }

    pub(super) fn heap_mut(&mut self, op: &'static str) -> &mut HeapState {
        match self.state.as_mut() {
            Some(state) => state,
            None => fatal(op, HeapError::NotInitialized),
        }
    }

    /// Allocated block whose payload starts at `address`
    fn allocated_block(&self, address: Address) -> HeapResult<BlockInfo> {
        match self.locate(address) {
            Some(block) if !block.is_free() => Ok(block),
            _ => Err(HeapError::InvalidAddress(address)),
        }
    }

    /// Run the consistency checker when configured to
    pub(super) fn verify(&self, op: &'static str) {
        if !self.config.verify_each_operation {
            return;
        }
        let report = self.check();
        if !report.is_coherent() {
            error!("{}", report);
            fatal(
                op,
                HeapError::Corrupted {
                    errors: report.errors.len(),
                },
            );
        }
    }
}

impl<P: SegmentProvider> Allocator for MemoryManager<P> {
    fn malloc(&mut self, size: Size) -> Address {
        MemoryManager::malloc(self, size)
    }

    fn calloc(&mut self, count: Size, size: Size) -> HeapResult<Address> {
        MemoryManager::calloc(self, count, size)
    }

    fn realloc(&mut self, address: Option<Address>, size: Size) -> Option<Address> {
        MemoryManager::realloc(self, address, size)
    }

    fn free(&mut self, address: Address) {
        MemoryManager::free(self, address)
    }
}

impl<P: SegmentProvider> HeapInspector for MemoryManager<P> {
    fn check(&self) -> HeapReport {
        MemoryManager::check(self)
    }

    fn stats(&self) -> HeapStats {
        MemoryManager::stats(self)
    }
}

impl<P: SegmentProvider> std::fmt::Debug for MemoryManager<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("extent", &self.segment.extent())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}
