// src/image/geom.rs

//! Geometric primitives: integer points, sizes and rectangles, plus the
//! rational rescaling used by map-mode conversion.
//!
//! Rectangles use an exclusive right and bottom edge, so a rectangle of
//! width `w` starting at `x` covers the columns `x..x + w`. Device-pixel
//! bounds produced by the reducer follow the same convention.

use crate::utils::error::{FlattenError, Result};

/// A 2D point with integer coordinates (logic or device pixels).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// A 2D extent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Represents a 2D rectangle with integer coordinates.
///
/// The rectangle is defined by its top-left corner (`x`, `y`) and its `width` and `height`.
/// This struct is `Copy`, so it can be passed around cheaply by value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an empty rectangle.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a rectangle from two opposite edges, normalizing the order.
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        let (x0, x1) = if left <= right { (left, right) } else { (right, left) };
        let (y0, y1) = if top <= bottom { (top, bottom) } else { (bottom, top) };
        Rect::new(x0, y0, x1.abs_diff(x0), y1.abs_diff(y0))
    }

    /// Creates a rectangle from a corner point and a size.
    pub fn from_point_size(point: Point, size: Size) -> Self {
        Rect::new(point.x, point.y, size.width, size.height)
    }

    /// Returns the x-coordinate of the right edge (`x + width`).
    pub fn x_max(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    /// Returns the y-coordinate of the bottom edge (`y + height`).
    pub fn y_max(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Area in square units; empty rectangles have zero area.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Checks if the rectangle has zero width or height.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks if a point is contained within the rectangle's bounds.
    /// The right and bottom edges are exclusive.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        !self.is_empty() && px >= self.x && px < self.x_max() && py >= self.y && py < self.y_max()
    }

    /// Checks whether `other` lies completely inside `self`.
    ///
    /// An empty `other` covers no area and is contained in any rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        if other.is_empty() {
            return true;
        }
        !self.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.x_max() <= self.x_max()
            && other.y_max() <= self.y_max()
    }

    /// Checks whether the two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !self.intersection(other).is_empty()
    }

    /// Returns a new rectangle that is the intersection of `self` and `other`.
    pub fn intersection(&self, other: &Rect) -> Rect {
        if self.is_empty() || other.is_empty() {
            return Rect::empty();
        }

        let x = self.x.max(other.x);
        let y = self.y.max(other.y);

        let x_max = self.x_max().min(other.x_max());
        let y_max = self.y_max().min(other.y_max());

        if x >= x_max || y >= y_max {
            Rect::empty()
        } else {
            Rect::new(x, y, x_max.abs_diff(x), y_max.abs_diff(y))
        }
    }

    /// Returns a new rectangle that is the smallest bounding box containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x = self.x.min(other.x);
        let y = self.y.min(other.y);

        let x_max = self.x_max().max(other.x_max());
        let y_max = self.y_max().max(other.y_max());

        Rect::new(x, y, x_max.abs_diff(x), y_max.abs_diff(y))
    }

    /// Returns a new rectangle translated by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        if self.is_empty() {
            Rect::empty()
        } else {
            Rect::new(
                self.x.saturating_add(dx),
                self.y.saturating_add(dy),
                self.width,
                self.height,
            )
        }
    }

    /// Returns a new rectangle with size adjusted by `(dx, dy)` on each side.
    pub fn inflate(&self, dx: i32, dy: i32) -> Rect {
        if self.is_empty() {
            return Rect::empty();
        }
        let new_x = self.x.saturating_sub(dx);
        let new_y = self.y.saturating_sub(dy);
        let new_width = i64::from(self.width) + 2 * i64::from(dx);
        let new_height = i64::from(self.height) + 2 * i64::from(dy);

        if new_width <= 0 || new_height <= 0 {
            Rect::empty()
        } else {
            Rect::new(new_x, new_y, new_width as u32, new_height as u32)
        }
    }
}

/// A reduced rational number (p/q) with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    pub const ONE: Fraction = Fraction { num: 1, den: 1 };

    pub fn new(num: i64, den: i64) -> Result<Self> {
        if den == 0 {
            return Err(FlattenError::ZeroDenominator);
        }
        if num == 0 {
            return Ok(Fraction { num: 0, den: 1 });
        }
        let (mut num, mut den) = (num, den);
        if den < 0 {
            num = -num;
            den = -den;
        }
        let common = gcd(num.abs(), den);
        Ok(Fraction {
            num: num / common,
            den: den / common,
        })
    }

    pub fn num(&self) -> i64 {
        self.num
    }

    pub fn den(&self) -> i64 {
        self.den
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::ONE
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Computes `n * num / den`, rounding half away from zero.
///
/// A zero denominator yields zero. Off-by-one results here change which
/// bounding boxes touch, so the rounding must not drift towards negative
/// infinity the way plain integer division of negatives would.
pub fn rescale(n: i64, num: i64, den: i64) -> i64 {
    rescale_wide(i128::from(n), i128::from(num), i128::from(den))
}

/// [`rescale`] over 128-bit operands. Products that overflow saturate to
/// the `i64` bound of their sign.
pub fn rescale_wide(n: i128, num: i128, den: i128) -> i64 {
    if den == 0 {
        return 0;
    }
    let (num, den) = if den < 0 {
        (num.saturating_neg(), den.saturating_neg())
    } else {
        (num, den)
    };
    let Some(prod) = n.checked_mul(num) else {
        return if (n < 0) != (num < 0) { i64::MIN } else { i64::MAX };
    };
    let half = den / 2;
    let q = if prod >= 0 {
        prod.saturating_add(half) / den
    } else {
        -(prod.saturating_neg().saturating_add(half) / den)
    };
    q.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Saturates a 64-bit coordinate into the `i32` range.
pub fn clamp_coord(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
