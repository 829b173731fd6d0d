/*!
 * Boundary Tag Codec
 * Packs a block's size and status into one heap word
 */

use super::types::BlockStatus;
use crate::core::limits::STATUS_MASK;
use crate::core::types::{Size, Word};

const ALLOCATED_BIT: Word = 0x1;

/// Packed `(size, status)` word stored in a block's header and footer
///
/// Sizes are multiples of the granularity, leaving the low three bits for
/// status. No validation is done here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(Word);

impl Tag {
    /// Zero-size allocated tag terminating traversal
    pub const SENTINEL: Tag = Tag(ALLOCATED_BIT);

    #[inline]
    pub const fn pack(size: Size, status: BlockStatus) -> Self {
        let bits = match status {
            BlockStatus::Free => 0,
            BlockStatus::Allocated => ALLOCATED_BIT,
        };
        Tag(size as Word | bits)
    }

    #[inline]
    pub const fn from_raw(word: Word) -> Self {
        Tag(word)
    }

    #[inline]
    pub const fn raw(self) -> Word {
        self.0
    }

    #[inline]
    pub const fn size(self) -> Size {
        (self.0 & !STATUS_MASK) as Size
    }

    #[inline]
    pub const fn status(self) -> BlockStatus {
        if self.0 & ALLOCATED_BIT != 0 {
            BlockStatus::Allocated
        } else {
            BlockStatus::Free
        }
    }

    #[inline]
    pub const fn is_free(self) -> bool {
        self.0 & ALLOCATED_BIT == 0
    }
}
