//! Rectangular bounding boxes and associated trait implementations.

use serde::{Deserialize, Serialize};

use super::{Point, Rect};

/// An axis-aligned rectangular bounding box.
///
/// Points `p0` and `p1` follow the same half-open convention as [`Rect`].
///
/// This differs from [`Rect`] in that it could be empty, meaning that `p0`
/// is to the upper right of `p1`. An empty box never absorbs a stale origin:
/// the first union with a non-empty box simply returns that box.
#[derive(Debug, Copy, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Bbox {
    pub p0: Point,
    pub p1: Point,
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bbox {
    /// Create a new [`Bbox`] from two [`Point`]s.
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates an empty, otherwise invalid bounding box.
    pub const fn empty() -> Self {
        Self {
            p0: Point::new(i64::MAX, i64::MAX),
            p1: Point::new(i64::MIN, i64::MIN),
        }
    }

    /// Returns `true` if the bounding box is empty.
    ///
    /// Zero-area boxes count as empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.p0.x >= self.p1.x || self.p0.y >= self.p1.y
    }

    /// Finds the width of the bounding box in the x-direction.
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// Finds the height of the bounding box in the y-direction.
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// Expands the box in all directions by `delta`.
    ///
    /// Empty boxes stay empty.
    pub fn expand(self, delta: i64) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            p0: Point::new(self.p0.x - delta, self.p0.y - delta),
            p1: Point::new(self.p1.x + delta, self.p1.y + delta),
        }
    }

    /// Shifts the box by `p`.
    pub fn translated(self, p: Point) -> Self {
        if self.is_empty() {
            return self;
        }
        Self {
            p0: self.p0 + p,
            p1: self.p1 + p,
        }
    }

    /// Converts the bounding box into a [`Rect`], if it is not empty.
    #[inline]
    pub fn into_rect(self) -> Option<Rect> {
        if self.is_empty() {
            None
        } else {
            Some(Rect {
                p0: self.p0,
                p1: self.p1,
            })
        }
    }
}

impl From<Rect> for Bbox {
    fn from(r: Rect) -> Self {
        Self { p0: r.p0, p1: r.p1 }
    }
}

/// A trait representing functions available for objects with a bounding box.
pub trait BoundBox {
    /// Compute a rectangular bounding box around the implementing type.
    fn bbox(&self) -> Bbox;

    /// Computes the union with rectangular bounding box `bbox`.
    ///
    /// Default implementation is to return the union of `self.bbox()` and `bbox`.
    fn union(&self, bbox: Bbox) -> Bbox {
        self.bbox().union(bbox)
    }
}

impl<T> BoundBox for &T
where
    T: BoundBox,
{
    fn bbox(&self) -> Bbox {
        T::bbox(*self)
    }
}

impl BoundBox for Bbox {
    fn bbox(&self) -> Bbox {
        *self
    }

    fn union(&self, bbox: Bbox) -> Bbox {
        if bbox.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return bbox;
        }
        Bbox::new(
            Point::new(self.p0.x.min(bbox.p0.x), self.p0.y.min(bbox.p0.y)),
            Point::new(self.p1.x.max(bbox.p1.x), self.p1.y.max(bbox.p1.y)),
        )
    }
}

impl BoundBox for Rect {
    fn bbox(&self) -> Bbox {
        Bbox::from(*self)
    }
}

impl<T: BoundBox> BoundBox for [T] {
    fn bbox(&self) -> Bbox {
        self.iter()
            .fold(Bbox::empty(), |acc, item| acc.union(item.bbox()))
    }
}

impl<T: BoundBox> BoundBox for Vec<T> {
    fn bbox(&self) -> Bbox {
        self.as_slice().bbox()
    }
}
