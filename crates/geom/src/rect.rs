//! Integer rectangles.

use std::fmt;

use super::Point;

/// A rectangle with a signed origin and signed size.
///
/// Sizes are signed because they round-trip through textual `int` properties;
/// nothing here clamps them, and a negative size simply yields an empty
/// rectangle for containment purposes.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Rect {
    /// Top-left corner.
    pub tl: Point,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl Rect {
    /// Construct a rectangle from coordinates and size.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            tl: Point { x, y },
            w,
            h,
        }
    }

    /// A zero-sized rectangle at the origin.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The x coordinate one past the right edge.
    pub fn right(&self) -> i32 {
        self.tl.x.saturating_add(self.w)
    }

    /// The y coordinate one past the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.tl.y.saturating_add(self.h)
    }

    /// Return the same rectangle moved so its top-left corner is `tl`.
    pub fn at(&self, tl: Point) -> Self {
        Self { tl, ..*self }
    }

    /// Return the same rectangle shifted by an offset.
    pub fn shift(&self, dx: i32, dy: i32) -> Self {
        Self {
            tl: self.tl.shift(dx, dy),
            ..*self
        }
    }

    /// Does this rect contain the point?
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.tl.x && p.x < self.right() && p.y >= self.tl.y && p.y < self.bottom()
    }

    /// Does this rect completely enclose `other`?
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.tl.x >= self.tl.x
            && other.tl.y >= self.tl.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Compute the bounding box of a set of rectangles: the minimum top-left
    /// corner and the maximum right/bottom edges. Returns `None` for an empty
    /// input.
    pub fn bounding<I>(rects: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut iter = rects.into_iter();
        let first = iter.next()?;
        let (mut minx, mut miny) = (first.tl.x, first.tl.y);
        let (mut maxx, mut maxy) = (first.right(), first.bottom());
        for r in iter {
            minx = minx.min(r.tl.x);
            miny = miny.min(r.tl.y);
            maxx = maxx.max(r.right());
            maxy = maxy.max(r.bottom());
        }
        Some(Self::new(
            minx,
            miny,
            maxx.saturating_sub(minx).max(0),
            maxy.saturating_sub(miny).max(0),
        ))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.tl.x, self.tl.y, self.w, self.h)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn bounding_box() {
        assert_eq!(Rect::bounding(Vec::new()), None);
        let r = Rect::bounding([Rect::new(10, 10, 5, 5), Rect::new(-2, 12, 4, 20)]);
        assert_eq!(r, Some(Rect::new(-2, 10, 17, 22)));
    }

    #[test]
    fn moves() {
        let r = Rect::new(1, 2, 3, 4);
        assert_eq!(r.shift(10, -2), Rect::new(11, 0, 3, 4));
        assert_eq!(r.at(Point::new(7, 7)), Rect::new(7, 7, 3, 4));
        assert!(r.contains_point(Point::new(1, 2)));
        assert!(!r.contains_point(Point::new(4, 2)));
        assert_eq!(r.to_string(), "(1, 2) 3x4");
    }

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (-1000i32..1000, -1000i32..1000, 0i32..500, 0i32..500)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn bounding_encloses_all(rects in prop::collection::vec(rect_strategy(), 1..20)) {
            let b = Rect::bounding(rects.iter().copied()).unwrap();
            for r in &rects {
                prop_assert!(b.contains_rect(r));
            }
        }
    }
}
