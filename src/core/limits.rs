/*!
 * Heap Limits and Constants
 *
 * Centralized location for the block layout constants and provider defaults.
 */

use super::types::{Size, Word};

// =============================================================================
// BLOCK LAYOUT
// =============================================================================

/// Size of one heap word (header or footer tag)
pub const WORD_SIZE: Size = std::mem::size_of::<Word>();

/// Block granularity (32 bytes)
/// Minimum block size and alignment unit. Holds a header, a footer and two
/// payload words. Must be a power of two.
pub const GRANULARITY: Size = 32;

/// Bytes of bookkeeping per block (header + footer)
pub const BLOCK_OVERHEAD: Size = 2 * WORD_SIZE;

/// Low tag bits reserved for the status flags
pub const STATUS_MASK: Word = 0x7;

// =============================================================================
// SEGMENT DEFAULTS
// =============================================================================

/// Default provider page size (4KB)
pub const DEFAULT_PAGE_SIZE: Size = 4 * 1024;

/// Default number of pages per growth chunk
/// One page gives a 4KB growth chunk.
pub const DEFAULT_CHUNK_PAGES: Size = 1;

/// Default data segment capacity (32MB)
pub const DEFAULT_SEGMENT_CAPACITY: Size = 32 * 1024 * 1024;

/// Round `value` up to the next multiple of the block granularity
#[inline]
pub const fn round_up(value: Size) -> Size {
    (value + GRANULARITY - 1) & !(GRANULARITY - 1)
}

/// Round `value` down to the previous multiple of the block granularity
#[inline]
pub const fn round_down(value: Size) -> Size {
    value & !(GRANULARITY - 1)
}
