/*!
 * Memory Module
 * Boundary-tag heap management over a segment provider
 */

pub mod manager;
pub mod tag;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use manager::{Blocks, CheckError, HeapReport, MemoryManager, SharedMemoryManager};
pub use tag::Tag;
pub use traits::*;
pub use types::*;
