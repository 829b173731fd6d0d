/*!
 * Heap Consistency Checker
 * Walks the block chain and verifies the boundary tags
 */

use super::MemoryManager;
use crate::core::limits::{GRANULARITY, WORD_SIZE};
use crate::core::types::{Address, Size, Word};
use crate::memory::tag::Tag;
use crate::memory::types::{BlockInfo, HeapStats};
use crate::segment::SegmentProvider;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Inconsistency found while walking the heap
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckError {
    #[error("footer at 0x{footer_address:x} differs from header at 0x{address:x}: 0x{header:x} != 0x{footer:x}")]
    FooterMismatch {
        address: Address,
        footer_address: Address,
        header: Word,
        footer: Word,
    },

    #[error("size 0 detected at 0x{address:x}, traversal aborted")]
    ZeroSize { address: Address },

    #[error("block at 0x{address:x} has size 0x{size:x}, not a multiple of the granularity")]
    Misaligned { address: Address, size: Size },

    #[error("block at 0x{address:x} with size 0x{size:x} runs past heap_end")]
    Overshoot { address: Address, size: Size },

    #[error("free block at 0x{address:x} follows another free block")]
    AdjacentFree { address: Address },

    #[error("sentinel at 0x{address:x} is 0x{tag:x}, expected a zero-size allocated tag")]
    BadSentinel { address: Address, tag: Word },

    #[error("walk exceeded {limit} blocks, traversal aborted")]
    WalkLimit { limit: usize },
}

/// Result of walking the heap
#[derive(Debug, Clone, Serialize)]
pub struct HeapReport {
    pub segment_start: Address,
    pub segment_brk: Address,
    pub heap_start: Address,
    pub heap_end: Address,
    pub initial_sentinel: Word,
    pub end_sentinel: Word,
    pub blocks: Vec<BlockInfo>,
    pub errors: Vec<CheckError>,
}

impl HeapReport {
    /// The walk visited every block, landed on `heap_end` and found no error
    pub fn is_coherent(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn free_blocks(&self) -> impl Iterator<Item = &BlockInfo> {
        self.blocks.iter().filter(|block| block.is_free())
    }
}

impl fmt::Display for HeapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(97);
        writeln!(f, "\n{:-^97}", " heap check ")?;
        writeln!(f, "  segment start:          0x{:x}", self.segment_start)?;
        writeln!(f, "  segment brk:            0x{:x}", self.segment_brk)?;
        writeln!(f, "  heap_start:             0x{:x}", self.heap_start)?;
        writeln!(f, "  heap_end:               0x{:x}", self.heap_end)?;
        writeln!(f)?;

        let initial = Tag::from_raw(self.initial_sentinel);
        let end = Tag::from_raw(self.end_sentinel);
        writeln!(
            f,
            "  initial sentinel:       0x{:x}: size: {:6x}, status: {}",
            self.heap_start - WORD_SIZE,
            initial.size(),
            initial.status()
        )?;
        writeln!(
            f,
            "  end sentinel:           0x{:x}: size: {:6x}, status: {}",
            self.heap_end,
            end.size(),
            end.status()
        )?;
        writeln!(f)?;

        writeln!(f, "  blocks:")?;
        for block in &self.blocks {
            writeln!(
                f,
                "    0x{:x}: size: {:6x}, status: {}",
                block.address, block.size, block.status
            )?;
        }
        for error in &self.errors {
            writeln!(f, "    --> ERROR: {}", error)?;
        }

        writeln!(f)?;
        if self.is_coherent() {
            writeln!(f, "  Block structure coherent.")?;
        }
        write!(f, "{}", rule)
    }
}

impl<P: SegmentProvider> MemoryManager<P> {
    /// Walk the heap from `heap_start` to `heap_end` and verify every block
    ///
    /// Checks that header and footer tags match, that sizes are granular,
    /// that the walk lands exactly on `heap_end` and that no two free blocks
    /// are adjacent. Errors are collected rather than raised.
    pub fn check(&self) -> HeapReport {
        let heap = self.heap("check");
        let (segment_start, segment_brk) = self.segment.extent();

        let mut errors = Vec::new();
        let mut sentinel = |address: Address| match self.try_read_tag(address) {
            Ok(tag) if tag == Tag::SENTINEL => tag.raw(),
            Ok(tag) => {
                errors.push(CheckError::BadSentinel {
                    address,
                    tag: tag.raw(),
                });
                tag.raw()
            }
            Err(_) => {
                errors.push(CheckError::BadSentinel { address, tag: 0 });
                0
            }
        };
        let initial_sentinel = sentinel(heap.heap_start - WORD_SIZE);
        let end_sentinel = sentinel(heap.heap_end);

        let limit = (heap.heap_end - heap.heap_start) / GRANULARITY + 1;
        let mut blocks = Vec::new();
        let mut address = heap.heap_start;
        let mut previous_free = false;

        while address < heap.heap_end {
            if blocks.len() == limit {
                errors.push(CheckError::WalkLimit { limit });
                break;
            }

            let header = self.read_tag(address);
            let size = header.size();
            blocks.push(BlockInfo {
                address,
                size,
                status: header.status(),
            });

            if size == 0 {
                errors.push(CheckError::ZeroSize { address });
                break;
            }
            if size % GRANULARITY != 0 {
                errors.push(CheckError::Misaligned { address, size });
            }
            let end = match address.checked_add(size) {
                Some(end) if end <= heap.heap_end => end,
                _ => {
                    errors.push(CheckError::Overshoot { address, size });
                    break;
                }
            };

            let footer_address = end - WORD_SIZE;
            let footer = self.read_tag(footer_address);
            if footer != header {
                errors.push(CheckError::FooterMismatch {
                    address,
                    footer_address,
                    header: header.raw(),
                    footer: footer.raw(),
                });
            }

            if header.is_free() && previous_free {
                errors.push(CheckError::AdjacentFree { address });
            }
            previous_free = header.is_free();
            address = end;
        }

        HeapReport {
            segment_start,
            segment_brk,
            heap_start: heap.heap_start,
            heap_end: heap.heap_end,
            initial_sentinel,
            end_sentinel,
            blocks,
            errors,
        }
    }

    /// Summarize block usage
    pub fn stats(&self) -> HeapStats {
        let heap = self.heap("stats");
        let (start, brk) = self.segment.extent();

        let mut stats = HeapStats {
            segment_size: brk - start,
            heap_size: heap.heap_end - heap.heap_start,
            grow_count: heap.grow_count,
            ..Default::default()
        };
        for block in self.blocks() {
            if block.is_free() {
                stats.free_blocks += 1;
                stats.free_bytes += block.size;
                stats.largest_free_block = stats.largest_free_block.max(block.size);
            } else {
                stats.allocated_blocks += 1;
                stats.allocated_bytes += block.size;
            }
        }
        stats
    }
}
