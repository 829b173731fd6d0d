/*!
 * Core Types
 * Common types used across the heap manager
 */

/// Address type for arena operations
///
/// Addresses are offsets in the segment provider's address space, not host
/// pointers. The provider maps `[start, brk)` onto its byte storage.
pub type Address = usize;

/// Size type for arena operations
pub type Size = usize;

/// A heap word: the unit of a header or footer tag
pub type Word = u64;
