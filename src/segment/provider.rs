/*!
 * Segment Provider
 * Interface between the heap manager and the owner of the arena
 */

use super::types::SegmentResult;
use crate::core::types::{Address, Size};

/// Owner of a contiguous, growable byte range
///
/// The heap manager never allocates storage itself. It queries the extent
/// and page size once at initialization and afterwards only asks the
/// provider to extend the range.
pub trait SegmentProvider {
    /// Current extent as `(start, brk)`
    fn extent(&self) -> (Address, Address);

    /// Page size of the underlying memory system
    fn page_size(&self) -> Size;

    /// Grow the extent by `by` bytes and return the new break
    ///
    /// On failure the extent is left unchanged.
    fn extend(&mut self, by: Size) -> SegmentResult<Address>;

    /// Arena content covering `[start, brk)`; index 0 maps to `start`
    fn bytes(&self) -> &[u8];

    /// Mutable arena content covering `[start, brk)`
    fn bytes_mut(&mut self) -> &mut [u8];
}
