//! Snapping coordinates to routing-track grids.

use array_map::ArrayMap;
use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::{Dir, Point};

/// Rounds `pos` up to the nearest multiple of `pitch`.
///
/// Rounding is toward positive infinity for negative coordinates as well,
/// so `snap_up(-5, 4) == -4`.
///
/// # Panics
///
/// Panics if `pitch` is not positive.
#[inline]
pub fn snap_up(pos: i64, pitch: i64) -> i64 {
    assert!(pitch > 0, "grid pitch must be positive");
    let rem = pos.rem_euclid(pitch);
    if rem == 0 {
        pos
    } else {
        pos + pitch - rem
    }
}

/// Rounds `pos` down to the nearest multiple of `pitch`.
///
/// Rounding is toward negative infinity, so `snap_dn(-5, 4) == -8`.
///
/// # Panics
///
/// Panics if `pitch` is not positive.
#[inline]
pub fn snap_dn(pos: i64, pitch: i64) -> i64 {
    assert!(pitch > 0, "grid pitch must be positive");
    pos - pos.rem_euclid(pitch)
}

/// A pair of track pitches, one per axis.
///
/// The x pitch is the pitch of the metal layer that legalizes horizontal
/// placement coordinates, the y pitch that of the layer legalizing vertical ones.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pitch: ArrayMap<Dir, i64, 2>,
}

impl Grid {
    /// Creates a new [`Grid`].
    ///
    /// # Panics
    ///
    /// Panics if either pitch is not positive.
    pub fn new(x: i64, y: i64) -> Self {
        assert!(x > 0 && y > 0, "grid pitches must be positive");
        // IMPORTANT: the ordering of array elements here must match
        // the ordering of variants in the [`Dir`] enum.
        Self {
            pitch: ArrayMap::new([x, y]),
        }
    }

    /// The pitch along direction `dir`.
    #[inline]
    pub fn pitch(&self, dir: Dir) -> i64 {
        self.pitch[dir]
    }

    #[inline]
    pub fn snap_up(&self, dir: Dir, pos: i64) -> i64 {
        snap_up(pos, self.pitch(dir))
    }

    #[inline]
    pub fn snap_dn(&self, dir: Dir, pos: i64) -> i64 {
        snap_dn(pos, self.pitch(dir))
    }

    /// Grows `bbox` outward until both corners lie on the grid.
    ///
    /// Empty boxes are returned unchanged.
    pub fn snap_out(&self, bbox: Bbox) -> Bbox {
        if bbox.is_empty() {
            return bbox;
        }
        Bbox::new(
            Point::new(
                self.snap_dn(Dir::Horiz, bbox.p0.x),
                self.snap_dn(Dir::Vert, bbox.p0.y),
            ),
            Point::new(
                self.snap_up(Dir::Horiz, bbox.p1.x),
                self.snap_up(Dir::Vert, bbox.p1.y),
            ),
        )
    }

    /// Returns `true` if both corners of `bbox` lie on the grid.
    pub fn is_aligned(&self, bbox: Bbox) -> bool {
        [Dir::Horiz, Dir::Vert].into_iter().all(|dir| {
            let pitch = self.pitch(dir);
            bbox.p0.coord(dir).rem_euclid(pitch) == 0 && bbox.p1.coord(dir).rem_euclid(pitch) == 0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;

    #[test]
    fn snap_positive() {
        assert_eq!(snap_up(0, 4), 0);
        assert_eq!(snap_up(1, 4), 4);
        assert_eq!(snap_up(8, 4), 8);
        assert_eq!(snap_dn(7, 4), 4);
        assert_eq!(snap_dn(8, 4), 8);
    }

    #[test]
    fn snap_negative_is_directional() {
        assert_eq!(snap_up(-5, 4), -4);
        assert_eq!(snap_up(-8, 4), -8);
        assert_eq!(snap_dn(-5, 4), -8);
        assert_eq!(snap_dn(-1, 4), -4);
        assert_eq!(snap_dn(-4, 4), -4);
    }

    #[test]
    fn snap_out_covers_and_aligns() {
        let grid = Grid::new(10, 6);
        let b = Bbox::from(Rect::from_extent(-13, -1, 30, 7));
        let s = grid.snap_out(b);
        assert_eq!(s, Bbox::new(Point::new(-20, -6), Point::new(20, 12)));
        assert!(grid.is_aligned(s));
        assert_eq!(grid.snap_out(s), s);
    }
}
