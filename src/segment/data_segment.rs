/*!
 * Data Segment
 * Vec-backed segment provider with a fixed capacity
 */

use super::provider::SegmentProvider;
use super::types::{SegmentError, SegmentResult};
use crate::core::limits::DEFAULT_PAGE_SIZE;
use crate::core::types::{Address, Size};
use tracing::trace;

/// In-process data segment
///
/// Behaves like a program break: the extent starts empty at `base` and only
/// grows. Storage is reserved up front so extension never moves existing
/// bytes, and fresh bytes read as zero.
#[derive(Debug, Clone)]
pub struct DataSegment {
    base: Address,
    data: Vec<u8>,
    capacity: Size,
    page_size: Size,
}

impl DataSegment {
    /// Create an empty segment that can grow up to `capacity` bytes
    pub fn new(capacity: Size) -> Self {
        Self {
            base: 0,
            data: Vec::with_capacity(capacity),
            capacity,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the reported page size
    pub fn with_page_size(mut self, page_size: Size) -> Self {
        self.page_size = page_size;
        self
    }

    /// Place the segment at a different base address
    pub fn with_base(mut self, base: Address) -> Self {
        self.base = base;
        self
    }

    /// Maximum extent in bytes
    pub fn capacity(&self) -> Size {
        self.capacity
    }

    /// Current extent in bytes
    pub fn len(&self) -> Size {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl SegmentProvider for DataSegment {
    fn extent(&self) -> (Address, Address) {
        (self.base, self.base + self.data.len())
    }

    fn page_size(&self) -> Size {
        self.page_size
    }

    fn extend(&mut self, by: Size) -> SegmentResult<Address> {
        let available = self.capacity - self.data.len();
        if by > available {
            trace!(requested = by, available, "data segment cannot grow");
            return Err(SegmentError::Exhausted {
                requested: by,
                available,
            });
        }

        self.data.resize(self.data.len() + by, 0);
        let brk = self.base + self.data.len();
        trace!(by, brk = format_args!("0x{:x}", brk), "data segment extended");
        Ok(brk)
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
