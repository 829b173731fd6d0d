/*!
 * Memory Types
 * Common types for heap management
 */

use crate::core::limits::DEFAULT_CHUNK_PAGES;
use crate::core::types::{Address, Size};
use crate::segment::SegmentError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Heap operation result
pub type HeapResult<T> = Result<T, HeapError>;

/// Heap errors
///
/// Usage errors, corruption and provider exhaustion are fatal: the manager
/// reports them and stops. Only caller-input errors are handed back.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum HeapError {
    #[error("Heap manager not initialized")]
    #[diagnostic(code(heap::not_initialized), help("Call init() before any other operation."))]
    NotInitialized,

    #[error("Heap manager already initialized")]
    #[diagnostic(code(heap::already_initialized))]
    AlreadyInitialized,

    #[error("Heap not clean: segment extent is [0x{start:x}, 0x{brk:x})")]
    #[diagnostic(
        code(heap::segment_not_clean),
        help("The segment provider must hand over an empty extent.")
    )]
    SegmentNotClean { start: Address, brk: Address },

    #[error("Reported page size {0} is invalid")]
    #[diagnostic(code(heap::invalid_page_size))]
    InvalidPageSize(Size),

    #[error("Growth chunk of {0} bytes is not a positive multiple of the block granularity")]
    #[diagnostic(code(heap::invalid_chunk_size))]
    InvalidChunkSize(Size),

    #[error("Out of memory: cannot extend heap by {requested} bytes")]
    #[diagnostic(code(heap::out_of_memory))]
    OutOfMemory {
        requested: Size,
        #[source]
        source: SegmentError,
    },

    #[error("Request of {0} bytes exceeds the addressable block size")]
    #[diagnostic(code(heap::request_too_large))]
    RequestTooLarge(Size),

    #[error("Allocation size overflow: {count} x {size} bytes")]
    #[diagnostic(
        code(heap::size_overflow),
        help("The element count times the element size does not fit in a usize.")
    )]
    SizeOverflow { count: Size, size: Size },

    #[error("Invalid free of 0x{address:x}: not a block payload")]
    #[diagnostic(code(heap::invalid_free))]
    InvalidFree { address: Address },

    #[error("Double free detected at 0x{address:x}")]
    #[diagnostic(code(heap::double_free))]
    DoubleFree { address: Address },

    #[error("Invalid heap address: 0x{0:x}")]
    #[diagnostic(code(heap::invalid_address))]
    InvalidAddress(Address),

    #[error("Access outside the arena at 0x{address:x}")]
    #[diagnostic(code(heap::out_of_bounds))]
    OutOfBounds { address: Address },

    #[error("Heap corruption detected: {errors} inconsistencies")]
    #[diagnostic(code(heap::corrupted), help("Run check() and inspect the report."))]
    Corrupted { errors: usize },
}

impl HeapError {
    /// Whether the heap can no longer be trusted after this error
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            HeapError::SizeOverflow { .. } | HeapError::InvalidAddress(_)
        )
    }
}

/// Block status stored in the low tag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Free,
    Allocated,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockStatus::Free => write!(f, "free"),
            BlockStatus::Allocated => write!(f, "allocated"),
        }
    }
}

/// Block selection policy, fixed at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationPolicy {
    /// First free block large enough, scanning from the heap start
    FirstFit,
    /// First free block large enough, resuming at the cursor
    NextFit,
    /// Smallest free block large enough
    BestFit,
}

impl AllocationPolicy {
    pub const ALL: [AllocationPolicy; 3] = [
        AllocationPolicy::FirstFit,
        AllocationPolicy::NextFit,
        AllocationPolicy::BestFit,
    ];
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AllocationPolicy::FirstFit => write!(f, "first-fit"),
            AllocationPolicy::NextFit => write!(f, "next-fit"),
            AllocationPolicy::BestFit => write!(f, "best-fit"),
        }
    }
}

/// Error returned when parsing an unknown policy name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown allocation policy '{0}' (expected first-fit, next-fit or best-fit)")]
pub struct ParsePolicyError(pub String);

impl FromStr for AllocationPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first-fit" | "firstfit" | "ff" => Ok(AllocationPolicy::FirstFit),
            "next" | "next-fit" | "nextfit" | "nf" => Ok(AllocationPolicy::NextFit),
            "best" | "best-fit" | "bestfit" | "bf" => Ok(AllocationPolicy::BestFit),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Header view of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub address: Address,
    pub size: Size,
    pub status: BlockStatus,
}

impl BlockInfo {
    pub fn is_free(&self) -> bool {
        self.status == BlockStatus::Free
    }

    /// Address of the following block
    pub fn end(&self) -> Address {
        self.address + self.size
    }
}

/// Heap statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HeapStats {
    pub segment_size: Size,
    pub heap_size: Size,
    pub allocated_blocks: usize,
    pub free_blocks: usize,
    pub allocated_bytes: Size,
    pub free_bytes: Size,
    pub largest_free_block: Size,
    pub grow_count: usize,
}

impl HeapStats {
    /// Share of free bytes outside the largest free block (0.0 = none)
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free_block as f64 / self.free_bytes as f64
    }
}

/// Heap manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    /// Provider pages requested per growth chunk
    pub chunk_pages: Size,
    /// Run the consistency checker after every mutating operation
    pub verify_each_operation: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            chunk_pages: DEFAULT_CHUNK_PAGES,
            verify_each_operation: false,
        }
    }
}

impl HeapConfig {
    /// Configuration that verifies heap integrity after every operation
    pub const fn verified() -> Self {
        Self {
            chunk_pages: DEFAULT_CHUNK_PAGES,
            verify_each_operation: true,
        }
    }

    /// Read overrides from the environment
    ///
    /// Environment variables:
    /// - HEAP_CHUNK_PAGES: pages per growth chunk (default: 1)
    /// - HEAP_VERIFY: check the heap after every operation (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let chunk_pages = std::env::var("HEAP_CHUNK_PAGES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&pages: &Size| pages > 0)
            .unwrap_or(defaults.chunk_pages);
        let verify_each_operation = std::env::var("HEAP_VERIFY")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(defaults.verify_each_operation);

        Self {
            chunk_pages,
            verify_each_operation,
        }
    }
}
