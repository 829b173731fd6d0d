/*!
 * Segment Module
 * The growable byte range the heap manager formats into blocks
 */

mod data_segment;
mod provider;
mod types;

pub use data_segment::DataSegment;
pub use provider::SegmentProvider;
pub use types::{SegmentError, SegmentResult};
