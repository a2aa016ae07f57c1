// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU raster buffers with premultiplied RGBA8 pixels.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use peniko::Color;
use smallvec::SmallVec;
use understory_damage::{PixelRect, PixelSize, ScaleRatio};

/// A premultiplied RGBA8 pixel: `[r, g, b, a]` with color already scaled by
/// alpha.
pub type Pixel = [u8; 4];

/// The fully transparent pixel.
pub const TRANSPARENT: Pixel = [0, 0, 0, 0];

/// Converts a color to a premultiplied pixel.
#[must_use]
pub fn premultiply(color: Color) -> Pixel {
    let c = color.to_rgba8();
    [mul_255(c.r, c.a), mul_255(c.g, c.a), mul_255(c.b, c.a), c.a]
}

/// `a * b / 255`, rounded to nearest.
#[allow(
    clippy::cast_possible_truncation,
    reason = "the rounded quotient of two u8 products divided by 255 fits in u8"
)]
fn mul_255(a: u8, b: u8) -> u8 {
    let t = u16::from(a) * u16::from(b) + 128;
    ((t + (t >> 8)) >> 8) as u8
}

/// Source-over for premultiplied pixels.
fn over(src: Pixel, dst: Pixel) -> Pixel {
    match src[3] {
        255 => src,
        0 => dst,
        a => {
            let inv = 255 - a;
            [
                src[0].saturating_add(mul_255(dst[0], inv)),
                src[1].saturating_add(mul_255(dst[1], inv)),
                src[2].saturating_add(mul_255(dst[2], inv)),
                src[3].saturating_add(mul_255(dst[3], inv)),
            ]
        }
    }
}

/// Error returned when constructing a [`Raster`] from caller-supplied data.
#[derive(Clone, PartialEq, Eq)]
pub enum RasterError {
    /// The pixel buffer length does not match the requested size.
    SizeMismatch {
        /// The requested raster size.
        size: PixelSize,
        /// Number of elements the size requires.
        expected: usize,
        /// Number of elements supplied.
        actual: usize,
    },
}

impl fmt::Debug for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch {
                size,
                expected,
                actual,
            } => write!(
                f,
                "RasterError::SizeMismatch {{ size: {size:?}, expected: {expected}, actual: {actual} }}"
            ),
        }
    }
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SizeMismatch {
                size,
                expected,
                actual,
            } => write!(
                f,
                "a {size:?} raster needs {expected} elements but {actual} were supplied"
            ),
        }
    }
}

impl core::error::Error for RasterError {}

/// An owned image buffer: `width * height` premultiplied RGBA8 pixels in
/// row-major order.
///
/// Zero-sized rasters are valid and hold no pixels. All drawing operations
/// clip against both the source and destination bounds.
///
/// Every raster has a [`RasterId`]; clones get a fresh one. Equality compares
/// pixels only.
pub struct Raster {
    id: RasterId,
    size: PixelSize,
    pixels: Vec<Pixel>,
}

/// Identity of one [`Raster`] buffer.
///
/// A compositor remembers the id of the target it last drew into; a
/// different id means the previous frame's pixels are not there, so the next
/// frame is a full redraw.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RasterId(u64);

impl RasterId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Clone for Raster {
    fn clone(&self) -> Self {
        Self {
            id: RasterId::next(),
            size: self.size,
            pixels: self.pixels.clone(),
        }
    }
}

impl PartialEq for Raster {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.pixels == other.pixels
    }
}

impl Eq for Raster {}

impl Raster {
    /// Creates a fully transparent raster.
    #[must_use]
    pub fn new(size: PixelSize) -> Self {
        Self::filled_with(size, TRANSPARENT)
    }

    /// Creates a raster filled with one color.
    #[must_use]
    pub fn filled(size: PixelSize, color: Color) -> Self {
        Self::filled_with(size, premultiply(color))
    }

    /// Creates a raster filled with one premultiplied pixel value.
    #[must_use]
    pub fn filled_with(size: PixelSize, pixel: Pixel) -> Self {
        Self {
            id: RasterId::next(),
            size,
            pixels: vec![pixel; pixel_count(size)],
        }
    }

    /// Wraps existing premultiplied pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::SizeMismatch`] if `pixels.len()` is not
    /// `width * height`.
    pub fn from_pixels(size: PixelSize, pixels: Vec<Pixel>) -> Result<Self, RasterError> {
        let expected = pixel_count(size);
        if pixels.len() != expected {
            return Err(RasterError::SizeMismatch {
                size,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            id: RasterId::next(),
            size,
            pixels,
        })
    }

    /// Builds a raster from straight (non-premultiplied) RGBA8 bytes, as
    /// produced by most image decoders.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::SizeMismatch`] if `bytes.len()` is not
    /// `width * height * 4`.
    pub fn from_rgba8(size: PixelSize, bytes: &[u8]) -> Result<Self, RasterError> {
        let expected = pixel_count(size) * 4;
        if bytes.len() != expected {
            return Err(RasterError::SizeMismatch {
                size,
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| {
                [
                    mul_255(p[0], p[3]),
                    mul_255(p[1], p[3]),
                    mul_255(p[2], p[3]),
                    p[3],
                ]
            })
            .collect();
        Ok(Self {
            id: RasterId::next(),
            size,
            pixels,
        })
    }

    /// This buffer's identity.
    #[must_use]
    pub fn id(&self) -> RasterId {
        self.id
    }

    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.size.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.size.height()
    }

    /// The rectangle `(0, 0, width, height)`.
    #[must_use]
    pub fn bounds(&self) -> PixelRect {
        self.size.to_rect()
    }

    /// Returns `true` if the raster holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` if out of bounds.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Pixel> {
        self.bounds()
            .contains_point(x, y)
            .then(|| self.pixels[self.index(x, y)])
    }

    /// Overwrites the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, pixel: Pixel) {
        if self.bounds().contains_point(x, y) {
            let idx = self.index(x, y);
            self.pixels[idx] = pixel;
        }
    }

    /// Returns `true` if every pixel inside `rect` equals `pixel`.
    #[must_use]
    pub fn is_uniform(&self, rect: PixelRect, pixel: Pixel) -> bool {
        let rect = rect.intersect(self.bounds());
        if rect.is_empty() {
            return true;
        }
        (rect.y()..rect.bottom()).all(|y| self.row(y, rect).iter().all(|p| *p == pixel))
    }

    /// Fills `rect` (clipped to the raster) with `pixel`, replacing what was
    /// there.
    pub fn fill_rect(&mut self, rect: PixelRect, pixel: Pixel) {
        let rect = rect.intersect(self.bounds());
        if rect.is_empty() {
            return;
        }
        for y in rect.y()..rect.bottom() {
            self.row_mut(y, rect).fill(pixel);
        }
    }

    /// Fills the whole raster with `pixel`.
    pub fn fill(&mut self, pixel: Pixel) {
        self.pixels.fill(pixel);
    }

    /// Copies `src_rect` of `src` so that its origin lands at `(dst_x, dst_y)`,
    /// replacing the destination pixels.
    pub fn copy_from(&mut self, src: &Self, src_rect: PixelRect, dst_x: i32, dst_y: i32) {
        let Some((src_rect, dx, dy)) = self.clip_transfer(src, src_rect, dst_x, dst_y) else {
            return;
        };
        for y in src_rect.y()..src_rect.bottom() {
            let dst_row = src_rect.translate(dx, dy);
            self.row_mut(y + dy, dst_row)
                .copy_from_slice(src.row(y, src_rect));
        }
    }

    /// Composites `src_rect` of `src` over this raster with its origin at
    /// `(dst_x, dst_y)`, using premultiplied source-over.
    pub fn blend_from(&mut self, src: &Self, src_rect: PixelRect, dst_x: i32, dst_y: i32) {
        let Some((src_rect, dx, dy)) = self.clip_transfer(src, src_rect, dst_x, dst_y) else {
            return;
        };
        for y in src_rect.y()..src_rect.bottom() {
            let dst_row = src_rect.translate(dx, dy);
            let row = self.row_mut(y + dy, dst_row);
            for (d, s) in row.iter_mut().zip(src.row(y, src_rect)) {
                *d = over(*s, *d);
            }
        }
    }

    /// Resamples `src_rect` of `src` into `dst_rect` of this raster.
    ///
    /// The filter is an exact integer area average: each destination pixel
    /// is the mean of the source area it covers, with partial source pixels
    /// weighted by coverage. Results depend only on a pixel's offset from
    /// the rectangles' origins and on the reduced ratio between their sizes,
    /// so resampling block-aligned sub-rectangles (see
    /// [`understory_damage::remap_pairs`]) produces exactly the pixels a
    /// full-raster resample would.
    ///
    /// Nothing is drawn if either rectangle is empty or does not lie inside
    /// its raster.
    pub fn scale_from(&mut self, src: &Self, src_rect: PixelRect, dst_rect: PixelRect) {
        let (Some(rx), Some(ry)) = (
            ScaleRatio::new(src_rect.width(), dst_rect.width()),
            ScaleRatio::new(src_rect.height(), dst_rect.height()),
        ) else {
            return;
        };
        let in_bounds =
            src.bounds().contains_rect(src_rect) && self.bounds().contains_rect(dst_rect);
        debug_assert!(in_bounds, "scale_from: {src_rect:?} -> {dst_rect:?} out of bounds");
        if !in_bounds {
            return;
        }
        if rx.is_identity() && ry.is_identity() {
            self.copy_from(src, src_rect, dst_rect.x(), dst_rect.y());
            return;
        }

        let taps_x = axis_taps(rx, dst_rect.width());
        let taps_y = axis_taps(ry, dst_rect.height());
        let total = u64::from(rx.source_block().unsigned_abs())
            * u64::from(ry.source_block().unsigned_abs());

        for (row, y_taps) in taps_y.iter().enumerate() {
            let dst_y = dst_rect.y() + to_i32(row);
            for (col, x_taps) in taps_x.iter().enumerate() {
                let mut acc = [0_u64; 4];
                for &(sy, wy) in y_taps {
                    let src_y = src_rect.y() + sy;
                    for &(sx, wx) in x_taps {
                        let p = src.pixels[src.index(src_rect.x() + sx, src_y)];
                        let w = u64::from(wx) * u64::from(wy);
                        for (a, c) in acc.iter_mut().zip(p) {
                            *a += u64::from(c) * w;
                        }
                    }
                }
                let idx = self.index(dst_rect.x() + to_i32(col), dst_y);
                self.pixels[idx] = acc.map(|a| average(a, total));
            }
        }
    }

    /// Returns a copy of this raster resampled to `size`.
    #[must_use]
    pub fn scaled(&self, size: PixelSize) -> Self {
        let mut out = Self::new(size);
        out.scale_from(self, self.bounds(), out.bounds());
        out
    }

    /// Copies out a sub-rectangle (clipped to the raster).
    #[must_use]
    pub fn sub_raster(&self, rect: PixelRect) -> Self {
        let rect = rect.intersect(self.bounds());
        let mut out = Self::new(rect.size());
        out.copy_from(self, rect, 0, 0);
        out
    }

    fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.bounds().contains_point(x, y), "({x}, {y}) out of bounds");
        to_usize(y) * to_usize(self.size.width()) + to_usize(x)
    }

    fn row(&self, y: i32, span: PixelRect) -> &[Pixel] {
        let start = self.index(span.x(), y);
        &self.pixels[start..start + to_usize(span.width())]
    }

    fn row_mut(&mut self, y: i32, span: PixelRect) -> &mut [Pixel] {
        let start = self.index(span.x(), y);
        &mut self.pixels[start..start + to_usize(span.width())]
    }

    /// Clips a transfer of `src_rect` from `src` to `(dst_x, dst_y)` against
    /// both rasters. Returns the surviving source rect and the source-to-
    /// destination offset.
    fn clip_transfer(
        &self,
        src: &Self,
        src_rect: PixelRect,
        dst_x: i32,
        dst_y: i32,
    ) -> Option<(PixelRect, i32, i32)> {
        let dx = dst_x - src_rect.x();
        let dy = dst_y - src_rect.y();
        let clipped = src_rect
            .intersect(src.bounds())
            .intersect(self.bounds().translate(-dx, -dy));
        (!clipped.is_empty()).then_some((clipped, dx, dy))
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Source taps for one destination pixel along one axis: `(offset, weight)`.
type Taps = SmallVec<[(i32, u32); 4]>;

/// Computes area-average taps for `len` destination pixels.
///
/// Destination pixel `j` spans `[j * sb, (j + 1) * sb)` in units of
/// `1 / db` source pixels; source pixel `i` spans `[i * db, (i + 1) * db)`.
/// Each tap weight is the overlap length, so the weights of one pixel sum
/// to `sb`.
fn axis_taps(ratio: ScaleRatio, len: i32) -> Vec<Taps> {
    let sb = i64::from(ratio.source_block());
    let db = i64::from(ratio.dest_block());
    (0..i64::from(len))
        .map(|j| {
            let lo = j * sb;
            let hi = lo + sb;
            let first = lo / db;
            let last = (hi + db - 1) / db;
            (first..last)
                .filter_map(|i| {
                    let overlap = hi.min((i + 1) * db) - lo.max(i * db);
                    (overlap > 0).then(|| (narrow(i), narrow(overlap).unsigned_abs()))
                })
                .collect()
        })
        .collect()
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "a weighted mean of u8 channels is at most 255"
)]
fn average(acc: u64, total: u64) -> u8 {
    ((acc + total / 2) / total).min(255) as u8
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "tap offsets and weights are bounded by raster extents, which are i32"
)]
fn narrow(v: i64) -> i32 {
    v as i32
}

fn to_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

fn to_usize(v: i32) -> usize {
    usize::try_from(v).unwrap_or(0)
}

fn pixel_count(size: PixelSize) -> usize {
    to_usize(size.width()) * to_usize(size.height())
}
