/*!
 * Tagged Heap Library
 * Boundary-tag dynamic memory manager over a growable data segment
 */

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod segment;

// Re-exports
pub use crate::core::limits::{GRANULARITY, WORD_SIZE};
pub use crate::core::types::{Address, Size, Word};
pub use memory::{
    AllocationPolicy, Allocator, BlockInfo, BlockStatus, CheckError, HeapConfig, HeapError,
    HeapInspector, HeapReport, HeapResult, HeapStats, MemoryManager, SharedMemoryManager, Tag,
};
pub use monitoring::init_tracing;
pub use segment::{DataSegment, SegmentError, SegmentProvider, SegmentResult};
