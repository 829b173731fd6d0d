/*!
 * Arena Access
 * Bounds-checked tag reads and writes over the provider's bytes
 */

use super::{fatal, MemoryManager};
use crate::core::limits::{GRANULARITY, WORD_SIZE};
use crate::core::types::{Address, Size, Word};
use crate::memory::tag::Tag;
use crate::memory::types::{BlockInfo, BlockStatus, HeapError, HeapResult};
use crate::segment::SegmentProvider;

/// Read the word at `address` from an arena starting at `base`
#[inline]
fn read_word(bytes: &[u8], base: Address, address: Address) -> Option<Word> {
    let offset = address.checked_sub(base)?;
    let raw = bytes.get(offset..offset.checked_add(WORD_SIZE)?)?;
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(raw);
    Some(Word::from_le_bytes(word))
}

impl<P: SegmentProvider> MemoryManager<P> {
    /// Arena index of `address`
    pub(super) fn offset(&self, address: Address) -> HeapResult<usize> {
        let (start, brk) = self.segment.extent();
        if address < start || address >= brk {
            return Err(HeapError::OutOfBounds { address });
        }
        Ok(address - start)
    }

    pub(super) fn try_read_tag(&self, address: Address) -> HeapResult<Tag> {
        let (start, _) = self.segment.extent();
        read_word(self.segment.bytes(), start, address)
            .map(Tag::from_raw)
            .ok_or(HeapError::OutOfBounds { address })
    }

    /// Read a tag the heap structure guarantees to exist
    pub(super) fn read_tag(&self, address: Address) -> Tag {
        self.try_read_tag(address)
            .unwrap_or_else(|err| fatal("read_tag", err))
    }

    pub(super) fn write_tag(&mut self, address: Address, tag: Tag) {
        let offset = match self.offset(address) {
            Ok(offset) if offset + WORD_SIZE <= self.segment.bytes().len() => offset,
            _ => fatal("write_tag", HeapError::OutOfBounds { address }),
        };
        self.segment.bytes_mut()[offset..offset + WORD_SIZE]
            .copy_from_slice(&tag.raw().to_le_bytes());
    }

    /// Write matching header and footer tags for a block
    pub(super) fn write_block(&mut self, address: Address, size: Size, status: BlockStatus) {
        let tag = Tag::pack(size, status);
        self.write_tag(address, tag);
        self.write_tag(address + size - WORD_SIZE, tag);
    }

    /// Block whose payload starts at `address`, of either status
    ///
    /// Returns `None` unless `address` sits one word past a granule-aligned
    /// header inside the heap whose footer matches.
    pub(super) fn locate(&self, address: Address) -> Option<BlockInfo> {
        let heap = self.state?;
        let header = address.checked_sub(WORD_SIZE)?;
        if header < heap.heap_start || header >= heap.heap_end || header % GRANULARITY != 0 {
            return None;
        }

        let tag = self.try_read_tag(header).ok()?;
        let size = tag.size();
        if size < GRANULARITY || size % GRANULARITY != 0 {
            return None;
        }
        let end = header.checked_add(size).filter(|&end| end <= heap.heap_end)?;
        if self.try_read_tag(end - WORD_SIZE).ok()? != tag {
            return None;
        }

        Some(BlockInfo {
            address: header,
            size,
            status: tag.status(),
        })
    }

    /// Size of the free block ending at `heap_end`, zero if it is allocated
    pub(super) fn trailing_free(&self) -> Size {
        let heap = self.heap("trailing_free");
        let tag = self.read_tag(heap.heap_end - WORD_SIZE);
        if tag.is_free() {
            tag.size()
        } else {
            0
        }
    }

    pub(super) fn fill_payload(&mut self, address: Address, len: Size, value: u8) {
        let offset = self
            .offset(address)
            .unwrap_or_else(|err| fatal("fill_payload", err));
        self.segment.bytes_mut()[offset..offset + len].fill(value);
    }

    pub(super) fn copy_payload(&mut self, from: Address, to: Address, len: Size) {
        let src = self
            .offset(from)
            .unwrap_or_else(|err| fatal("copy_payload", err));
        let dst = self
            .offset(to)
            .unwrap_or_else(|err| fatal("copy_payload", err));
        self.segment.bytes_mut().copy_within(src..src + len, dst);
    }

    /// Blocks from `address` up to the end sentinel
    pub(super) fn blocks_from(&self, address: Address) -> Blocks<'_> {
        let heap = self.heap("blocks");
        let (base, _) = self.segment.extent();
        Blocks {
            bytes: self.segment.bytes(),
            base,
            next: address,
            end: heap.heap_end,
            remaining: (heap.heap_end - heap.heap_start) / GRANULARITY + 1,
        }
    }
}

/// Iterator over consecutive blocks
///
/// Stops at the end sentinel, at a zero-size tag, at a block running past
/// the end sentinel, on leaving the arena, or after visiting more blocks than
/// the heap has granules.
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    bytes: &'a [u8],
    base: Address,
    next: Address,
    end: Address,
    remaining: usize,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.next >= self.end || self.remaining == 0 {
            return None;
        }
        let tag = Tag::from_raw(read_word(self.bytes, self.base, self.next)?);
        let following = match self.next.checked_add(tag.size()) {
            Some(following) if tag.size() != 0 && following <= self.end => following,
            _ => {
                self.remaining = 0;
                return None;
            }
        };

        let block = BlockInfo {
            address: self.next,
            size: tag.size(),
            status: tag.status(),
        };
        self.next = following;
        self.remaining -= 1;
        Some(block)
    }
}
