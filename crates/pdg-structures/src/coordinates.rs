use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Sub};

//region Offset

/// A 2D displacement with floating point axes.
///
/// Points and vectors share the same representation, see [`Point`] and [`Vector`].
///
/// # Example
/// ```
/// use pdg_structures::Offset;
///
/// let step = Offset::new(3.0, -4.0);
/// assert_eq!(step.length(), 5.0);
/// assert!(!step.is_zero());
/// assert!(Offset::ZERO.is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

/// A position in 2D space.
pub type Point = Offset;

/// A direction and magnitude in 2D space.
pub type Vector = Offset;

impl Offset {
    pub const ZERO: Offset = Offset::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Rotates the offset counterclockwise around the origin.
    pub fn rotated(&self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Display for Offset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

//endregion

//region Rect

/// Axis aligned rectangle stored by its edges.
///
/// `right` and `bottom` are exclusive in the sense that `width = right - left`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Builds a rectangle from its left-top corner and a width/height offset.
    ///
    /// # Example
    /// ```
    /// use pdg_structures::{Offset, Rect};
    ///
    /// let rect = Rect::from_origin_size(Offset::new(5.0, 5.0), Offset::new(10.0, 20.0));
    /// assert_eq!(rect, Rect::new(5.0, 5.0, 15.0, 25.0));
    /// ```
    pub fn from_origin_size(left_top: Point, size: Offset) -> Self {
        Self::new(
            left_top.x,
            left_top.y,
            left_top.x + size.x,
            left_top.y + size.y,
        )
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn left_top(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Width and height as an offset.
    pub fn size(&self) -> Offset {
        Offset::new(self.width(), self.height())
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2.0,
            self.top + self.height() / 2.0,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

impl Display for Rect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect(l: {}, t: {}, r: {}, b: {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

//endregion

//region RotatedRect

/// A rectangle rotated around its (adjusted) center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotatedRect {
    pub rect: Rect,
    /// Rotation angle in radians.
    pub radians: f32,
    /// Displacement of the rotation pivot from the rectangle's center.
    pub center_offset: Offset,
}

impl RotatedRect {
    pub const fn new(rect: Rect, radians: f32, center_offset: Offset) -> Self {
        Self {
            rect,
            radians,
            center_offset,
        }
    }

    pub fn pivot(&self) -> Point {
        self.rect.center() + self.center_offset
    }

    /// The four rotated corners, clockwise from left-top.
    pub fn corners(&self) -> Quad {
        let pivot = self.pivot();
        let r = &self.rect;
        let corner = |x: f32, y: f32| pivot + (Point::new(x, y) - pivot).rotated(self.radians);
        Quad::new([
            corner(r.left, r.top),
            corner(r.right, r.top),
            corner(r.right, r.bottom),
            corner(r.left, r.bottom),
        ])
    }
}

//endregion

//region Quad

/// Four arbitrary corner points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub const fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Smallest axis aligned rectangle containing all four points.
    pub fn bounding_rect(&self) -> Rect {
        let mut bounds = Rect::new(
            self.points[0].x,
            self.points[0].y,
            self.points[0].x,
            self.points[0].y,
        );
        for point in &self.points[1..] {
            bounds.left = bounds.left.min(point.x);
            bounds.top = bounds.top.min(point.y);
            bounds.right = bounds.right.max(point.x);
            bounds.bottom = bounds.bottom.max(point.y);
        }
        bounds
    }
}

impl From<Rect> for Quad {
    fn from(rect: Rect) -> Self {
        Quad::new([
            Point::new(rect.left, rect.top),
            Point::new(rect.right, rect.top),
            Point::new(rect.right, rect.bottom),
            Point::new(rect.left, rect.bottom),
        ])
    }
}

//endregion
