//! Geometry kernel: points, axis-aligned boxes and quarter-turn rotations.
//!
//! A piece stores its pose in its own unrotated frame: the top-left corner of
//! the intrinsic rectangle plus intrinsic width and height. Every collision,
//! snap and selection computation works on the rotation-resolved [`BBox`]
//! instead, derived here. Rotations are clockwise in screen space (y grows
//! downward) and always whole quarter turns, so all rotation math is exact
//! coordinate swapping with no trigonometry.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use serde::{Deserialize, Serialize};

use crate::consts::OVERLAP_EPSILON;
use crate::doc::Piece;

/// A point in canvas space (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn minus(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

/// Error returned when a stored rotation is not a whole quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rotation must be 0, 90, 180 or 270 degrees, got {0}")]
pub struct InvalidRotation(pub u16);

/// A piece rotation, restricted to whole quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation in degrees.
    #[must_use]
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Number of clockwise quarter turns, in `0..4`.
    #[must_use]
    pub fn quarter_turns(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Build a rotation from any number of quarter turns (negative is counter-clockwise).
    #[must_use]
    pub fn from_quarter_turns(turns: i32) -> Self {
        match turns.rem_euclid(4) {
            1 => Self::Deg90,
            2 => Self::Deg180,
            3 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    /// This rotation advanced by `turns` clockwise quarter turns.
    #[must_use]
    pub fn rotated(self, turns: i32) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + turns)
    }

    /// Quarter turns needed to go from `self` to `target`, in `0..4`.
    #[must_use]
    pub fn turns_to(self, target: Rotation) -> i32 {
        (target.quarter_turns() - self.quarter_turns()).rem_euclid(4)
    }

    /// True for 90° and 270°, where the bounding box swaps width and height.
    #[must_use]
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// Axis-aligned bounding box. Derived from a pose, never stored authoritatively.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    #[must_use]
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self { min_x, min_y, width, height }
    }

    /// Build a box from its four edges.
    #[must_use]
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { min_x: left, min_y: top, width: right - left, height: bottom - top }
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.min_x + self.width
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.min_y + self.height
    }

    #[must_use]
    pub fn top_left(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.min_x + self.width / 2.0, self.min_y + self.height / 2.0)
    }

    /// The box moved by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { min_x: self.min_x + dx, min_y: self.min_y + dy, ..*self }
    }

    /// Smallest box containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &BBox) -> Self {
        Self::from_edges(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Union of every box in `boxes`, or `None` when empty.
    pub fn union_all<I>(boxes: I) -> Option<Self>
    where
        I: IntoIterator<Item = BBox>,
    {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }

    /// Whether `p` lies inside the box, with `eps` slack.
    #[must_use]
    pub fn contains_point(&self, p: Point, eps: f64) -> bool {
        p.x >= self.min_x - eps && p.x <= self.max_x() + eps && p.y >= self.min_y - eps && p.y <= self.max_y() + eps
    }
}

/// Which axis a separation or guide refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Gap between two boxes that face each other along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Axis along which the boxes are separated.
    pub axis: Axis,
    /// Non-negative distance between the facing edges.
    pub gap: f64,
    /// True when the first box sits on the high side (right of / below) the second.
    pub first_is_after: bool,
}

/// Bounding box for a pose given by its intrinsic top-left, size and rotation.
///
/// For 90° and 270° the box swaps width and height and stays centered on the
/// intrinsic rectangle's center. For 0° and 180° it equals the intrinsic rectangle.
#[must_use]
pub fn pose_bbox(origin: Point, width: f64, height: f64, rotation: Rotation) -> BBox {
    if rotation.is_sideways() {
        let cx = origin.x + width / 2.0;
        let cy = origin.y + height / 2.0;
        BBox::new(cx - height / 2.0, cy - width / 2.0, height, width)
    } else {
        BBox::new(origin.x, origin.y, width, height)
    }
}

/// Inverse of [`pose_bbox`]: the stored top-left for a box top-left at `bbox_top_left`.
#[must_use]
pub fn pose_origin(bbox_top_left: Point, width: f64, height: f64, rotation: Rotation) -> Point {
    if rotation.is_sideways() {
        let cx = bbox_top_left.x + height / 2.0;
        let cy = bbox_top_left.y + width / 2.0;
        Point::new(cx - width / 2.0, cy - height / 2.0)
    } else {
        bbox_top_left
    }
}

/// Rotation-aware bounding box of a piece.
#[must_use]
pub fn bounding_box(piece: &Piece) -> BBox {
    pose_bbox(Point::new(piece.x, piece.y), piece.width, piece.height, piece.rotation)
}

/// Stored position that puts `piece`'s bounding box top-left at `bbox_top_left`.
#[must_use]
pub fn local_position_from_bbox(bbox_top_left: Point, piece: &Piece) -> Point {
    pose_origin(bbox_top_left, piece.width, piece.height, piece.rotation)
}

/// Rotate `p` about `pivot` by `turns` clockwise quarter turns.
#[must_use]
pub fn rotate_about(p: Point, pivot: Point, turns: i32) -> Point {
    let (dx, dy) = (p.x - pivot.x, p.y - pivot.y);
    let (rx, ry) = match turns.rem_euclid(4) {
        1 => (-dy, dx),
        2 => (-dx, -dy),
        3 => (dy, -dx),
        _ => (dx, dy),
    };
    Point::new(pivot.x + rx, pivot.y + ry)
}

/// Separating-axis overlap test. Boxes that merely touch do not overlap.
#[must_use]
pub fn overlaps(a: &BBox, b: &BBox) -> bool {
    a.min_x < b.max_x() - OVERLAP_EPSILON
        && b.min_x < a.max_x() - OVERLAP_EPSILON
        && a.min_y < b.max_y() - OVERLAP_EPSILON
        && b.min_y < a.max_y() - OVERLAP_EPSILON
}

/// Whether `inner` lies within `outer`, allowing `eps` slack on each side.
#[must_use]
pub fn contains(outer: &BBox, inner: &BBox, eps: f64) -> bool {
    inner.min_x >= outer.min_x - eps
        && inner.min_y >= outer.min_y - eps
        && inner.max_x() <= outer.max_x() + eps
        && inner.max_y() <= outer.max_y() + eps
}

/// Facing gap between `a` and `b` when they share a span on the other axis.
///
/// Returns `None` when the boxes overlap, or when they only meet diagonally
/// (no shared span on either axis).
#[must_use]
pub fn separation(a: &BBox, b: &BBox) -> Option<Separation> {
    let x_gap = (b.min_x - a.max_x()).max(a.min_x - b.max_x());
    let y_gap = (b.min_y - a.max_y()).max(a.min_y - b.max_y());
    let shares_y = y_gap < -OVERLAP_EPSILON;
    let shares_x = x_gap < -OVERLAP_EPSILON;
    if shares_y && x_gap >= -OVERLAP_EPSILON {
        return Some(Separation { axis: Axis::X, gap: x_gap.max(0.0), first_is_after: a.min_x >= b.max_x() - OVERLAP_EPSILON });
    }
    if shares_x && y_gap >= -OVERLAP_EPSILON {
        return Some(Separation { axis: Axis::Y, gap: y_gap.max(0.0), first_is_after: a.min_y >= b.max_y() - OVERLAP_EPSILON });
    }
    None
}
