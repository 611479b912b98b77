//! Signed geometry primitives used across trellis.
//!
//! Component rectangles live in a single absolute coordinate space shared by
//! every group, so all coordinates are signed: a pasted block or a template
//! recipe may well start left of, or above, its container.

/// Point helpers.
mod point;
/// Rectangle operations.
mod rect;

pub use point::Point;
pub use rect::Rect;
