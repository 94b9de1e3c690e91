//! Integer layout geometry used by the stack synthesizer.
//!
//! All coordinates are in design units. A [`Rect`] is half-open: it covers
//! `p0.x..p1.x` by `p0.y..p1.y`, so a rectangle whose last covered unit is
//! `h` stores `h + 1` as its upper coordinate.

use std::fmt::Display;
use std::str::FromStr;

use array_map::Indexable;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::bbox::Bbox;

pub mod bbox;
pub mod snap;

/// A point in two-dimensional layout-space.
#[derive(Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    /// Creates a new [`Point`] from (x,y) coordinates.
    #[inline]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, (0, 0).
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Creates a new [`Point`] that serves as an offset in direction `dir`.
    pub fn offset(val: i64, dir: Dir) -> Self {
        match dir {
            Dir::Horiz => Self { x: val, y: 0 },
            Dir::Vert => Self { x: 0, y: val },
        }
    }

    /// Gets the coordinate associated with direction `dir`.
    pub fn coord(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    /// Creates a new [`Point`] shifted by `p`.
    #[inline]
    pub fn translated(&self, p: Point) -> Self {
        *self + p
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(i64, i64)> for Point {
    fn from(value: (i64, i64)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

/// An enumeration of axis-aligned directions.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Indexable)]
pub enum Dir {
    /// The horizontal, or x-aligned, direction.
    Horiz,
    /// The vertical, or y-aligned, direction.
    Vert,
}

#[derive(Debug, Error)]
#[error("error parsing direction: {0}")]
pub struct DirParseError(String);

impl FromStr for Dir {
    type Err = DirParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" | "horiz" | "h" | "x" => Ok(Self::Horiz),
            "vertical" | "vert" | "v" | "y" => Ok(Self::Vert),
            _ => Err(DirParseError(s.to_string())),
        }
    }
}

impl Dir {
    /// Returns the other direction.
    pub fn other(self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }
}

impl Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horiz => write!(f, "horizontal"),
            Self::Vert => write!(f, "vertical"),
        }
    }
}

impl std::ops::Not for Dir {
    type Output = Self;
    fn not(self) -> Self::Output {
        self.other()
    }
}

/// A width and height.
#[derive(Debug, Default, Copy, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dims {
    w: i64,
    h: i64,
}

impl Dims {
    /// Creates a new [`Dims`] from a width and height.
    pub fn new(w: i64, h: i64) -> Self {
        Self { w, h }
    }

    /// Returns the dimension along direction `dir`.
    pub fn dim(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.w,
            Dir::Vert => self.h,
        }
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.w
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.h
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.w * self.h
    }
}

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
///
/// The upper-right corner is exclusive.
#[derive(Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}

impl Rect {
    /// Creates a rectangle from any two corners, normalizing them.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from a lower-left corner and a (possibly negative) extent.
    ///
    /// A negative width or height extends the rectangle to the left or downward
    /// from `(x, y)`.
    pub fn from_extent(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self::new(Point::new(x, y), Point::new(x + w, y + h))
    }

    /// Creates a rectangle from an inclusive pair of corners.
    ///
    /// This is the convention used by tile-based geometry files.
    pub fn from_inclusive(llx: i64, lly: i64, urx: i64, ury: i64) -> Self {
        Self::new(Point::new(llx, lly), Point::new(urx + 1, ury + 1))
    }

    #[inline]
    pub fn left(&self) -> i64 {
        self.p0.x
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.p0.y
    }

    #[inline]
    pub fn right(&self) -> i64 {
        self.p1.x
    }

    #[inline]
    pub fn top(&self) -> i64 {
        self.p1.y
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        Dims::new(self.width(), self.height())
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Returns `true` if the rectangle covers no area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Returns the lower edge of the rectangle in direction `dir`.
    pub fn lower_edge(&self, dir: Dir) -> i64 {
        self.p0.coord(dir)
    }

    /// Returns the upper edge of the rectangle in direction `dir`.
    pub fn upper_edge(&self, dir: Dir) -> i64 {
        self.p1.coord(dir)
    }

    /// Returns the length of the rectangle in direction `dir`.
    pub fn length(&self, dir: Dir) -> i64 {
        self.upper_edge(dir) - self.lower_edge(dir)
    }

    /// Expands the rectangle by `amount` on all sides.
    #[inline]
    pub fn expand(&self, amount: i64) -> Self {
        Self::new(
            Point::new(self.p0.x - amount, self.p0.y - amount),
            Point::new(self.p1.x + amount, self.p1.y + amount),
        )
    }

    /// Returns `true` if `pt` lies within the rectangle.
    pub fn contains(&self, pt: Point) -> bool {
        self.p0.x <= pt.x && pt.x < self.p1.x && self.p0.y <= pt.y && pt.y < self.p1.y
    }

    /// Returns `true` if this rectangle fully covers `other`.
    pub fn encloses(&self, other: &Rect) -> bool {
        self.p0.x <= other.p0.x
            && self.p0.y <= other.p0.y
            && self.p1.x >= other.p1.x
            && self.p1.y >= other.p1.y
    }

    /// Returns `true` if the interiors of the two rectangles overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
    }

    /// Shifts the rectangle by `p`.
    #[inline]
    pub fn translated(&self, p: Point) -> Self {
        Self {
            p0: self.p0 + p,
            p1: self.p1 + p,
        }
    }
}

impl From<Bbox> for Rect {
    /// # Panics
    ///
    /// Panics if the bounding box is empty.
    fn from(b: Bbox) -> Self {
        assert!(!b.is_empty(), "cannot convert an empty bounding box to a rectangle");
        Self { p0: b.p0, p1: b.p1 }
    }
}
