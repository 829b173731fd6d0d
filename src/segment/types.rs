/*!
 * Segment Types
 */

use crate::core::types::Size;
use miette::Diagnostic;
use thiserror::Error;

/// Segment operation result
pub type SegmentResult<T> = Result<T, SegmentError>;

/// Segment provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SegmentError {
    #[error("Segment exhausted: requested {requested} bytes, {available} bytes available")]
    #[diagnostic(
        code(segment::exhausted),
        help("Create the data segment with a larger capacity.")
    )]
    Exhausted { requested: Size, available: Size },
}
