// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel rectangles and sizes.

use core::fmt;

/// Width and height of a raster, in whole pixels.
///
/// Negative inputs are clamped to zero, so a `PixelSize` is always
/// non-negative. A size with either dimension zero is *empty*.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    width: i32,
    height: i32,
}

impl PixelSize {
    /// The empty size.
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    /// Creates a new size, clamping negative dimensions to zero.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self {
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(self) -> i32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(self) -> i32 {
        self.height
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// The rectangle at the origin with this size.
    #[must_use]
    pub const fn to_rect(self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }
}

impl fmt::Debug for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned rectangle on an integer pixel grid.
///
/// Stored as origin plus size, `(x, y, width, height)`. The size is never
/// negative; constructors clamp negative extents to zero. A rectangle with
/// zero width or height is *empty*: it covers no pixels and contributes
/// nothing to damage.
///
/// Equality is field-wise, so two empty rectangles at different origins are
/// not equal. That matters for change tracking, where an empty rectangle
/// that moved is still a change.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl PixelRect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle from its origin and size.
    ///
    /// Negative `width` or `height` are clamped to zero.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: if width < 0 { 0 } else { width },
            height: if height < 0 { 0 } else { height },
        }
    }

    /// Creates a rectangle from two corner points, in any order.
    #[must_use]
    pub fn from_points(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }

    /// Creates a rectangle from an origin and a [`PixelSize`].
    #[must_use]
    pub const fn from_origin_size(x: i32, y: i32, size: PixelSize) -> Self {
        Self::new(x, y, size.width, size.height)
    }

    /// Left edge.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.x
    }

    /// Top edge.
    #[must_use]
    pub const fn y(self) -> i32 {
        self.y
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(self) -> i32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(self) -> i32 {
        self.height
    }

    /// Exclusive right edge.
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Top-left corner.
    #[must_use]
    pub const fn origin(self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Size of the rectangle.
    #[must_use]
    pub const fn size(self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns the same rectangle moved to a new origin.
    #[must_use]
    pub const fn with_origin(self, x: i32, y: i32) -> Self {
        Self::new(x, y, self.width, self.height)
    }

    /// Returns the same origin with a new size.
    #[must_use]
    pub const fn with_size(self, size: PixelSize) -> Self {
        Self::new(self.x, self.y, size.width, size.height)
    }

    /// Returns the rectangle translated by `(dx, dy)`.
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    /// Returns `true` if the pixel at `(px, py)` lies inside the rectangle.
    #[must_use]
    pub const fn contains_point(self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    ///
    /// An empty `other` is contained if its origin lies within the closed
    /// bounds of `self`.
    #[must_use]
    pub const fn contains_rect(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    ///
    /// Empty rectangles never overlap anything.
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns `true` if the rectangles overlap or share an edge or corner.
    ///
    /// This is the merge criterion for damage lists: touching regions are
    /// coalesced so that adjacent small updates end up as one blit.
    /// Empty rectangles never touch anything.
    #[must_use]
    pub const fn touches(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Returns the overlapping region of the two rectangles.
    ///
    /// If they do not overlap, the result is empty (its origin is
    /// unspecified beyond lying on one of the inputs' edges).
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Returns the smallest rectangle containing both inputs.
    ///
    /// Empty inputs are ignored; the union of two empty rectangles is
    /// `self`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Converts to a floating-point [`kurbo::Rect`].
    #[must_use]
    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }

    /// Converts a [`kurbo::Rect`] to the smallest pixel rectangle covering it.
    ///
    /// Edges are rounded outward, so every pixel touched by `rect` is
    /// included. Coordinates outside the `i32` range saturate.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "float to int `as` casts saturate, which is the intended clamping"
    )]
    pub fn from_kurbo_outward(rect: kurbo::Rect) -> Self {
        let rect = rect.abs().expand();
        Self::from_points(
            rect.x0 as i32,
            rect.y0 as i32,
            rect.x1 as i32,
            rect.y1 as i32,
        )
    }
}

impl fmt::Debug for PixelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PixelRect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

impl From<PixelSize> for PixelRect {
    fn from(size: PixelSize) -> Self {
        size.to_rect()
    }
}
