/*!
 * Error Types
 * Centralized error re-exports
 */

pub use crate::memory::{CheckError, HeapError, HeapResult};
pub use crate::segment::{SegmentError, SegmentResult};
