/*!
 * Memory Traits
 * Heap management abstractions
 */

use super::manager::HeapReport;
use super::types::*;
use crate::core::types::{Address, Size};

/// Dynamic memory allocator interface
pub trait Allocator {
    /// Allocate a block with at least `size` payload bytes
    fn malloc(&mut self, size: Size) -> Address;

    /// Allocate a zero-filled block for `count` elements of `size` bytes
    fn calloc(&mut self, count: Size, size: Size) -> HeapResult<Address>;

    /// Resize an allocation, preserving its content up to the smaller size
    fn realloc(&mut self, address: Option<Address>, size: Size) -> Option<Address>;

    /// Release an allocation
    fn free(&mut self, address: Address);
}

/// Heap introspection
pub trait HeapInspector {
    /// Walk every block and verify the boundary tags
    fn check(&self) -> HeapReport;

    /// Summarize block usage
    fn stats(&self) -> HeapStats;

    /// Whether the block structure is coherent
    fn is_coherent(&self) -> bool {
        self.check().is_coherent()
    }
}
