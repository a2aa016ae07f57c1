// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Remapping dirty rectangles between rasters of different sizes.
//!
//! When a raster of size `S` is rescaled to size `D` along one axis, the
//! mapping only lines up with both pixel grids every `S / gcd(S, D)` source
//! pixels (equivalently every `D / gcd(S, D)` destination pixels). Between
//! those boundaries a destination pixel may straddle two source pixels.
//!
//! [`remap_pairs`] therefore snaps each source rectangle outward to that
//! block grid before scaling. Inside an aligned block the rescale of a
//! sub-region reads exactly the same source pixels with exactly the same
//! weights as a rescale of the whole raster, so redrawing only the remapped
//! rectangles reproduces a full rescale pixel for pixel.

use alloc::vec::Vec;

use crate::list::insert;
use crate::rect::{PixelRect, PixelSize};

/// Greatest common divisor of two non-negative integers.
///
/// `gcd(0, n) == n`.
#[must_use]
pub const fn gcd(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Reduced scale ratio along one axis.
///
/// Holds `source / dest` in lowest terms: `source_block` source pixels map
/// onto exactly `dest_block` destination pixels, with both block grids
/// aligned at multiples of the block sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScaleRatio {
    source_block: i32,
    dest_block: i32,
}

impl ScaleRatio {
    /// Creates the reduced ratio between a source and destination extent.
    ///
    /// Returns `None` if either extent is zero or negative.
    #[must_use]
    pub const fn new(source: i32, dest: i32) -> Option<Self> {
        if source <= 0 || dest <= 0 {
            return None;
        }
        let g = gcd(source, dest);
        Some(Self {
            source_block: source / g,
            dest_block: dest / g,
        })
    }

    /// Source pixels per aligned block.
    #[must_use]
    pub const fn source_block(self) -> i32 {
        self.source_block
    }

    /// Destination pixels per aligned block.
    #[must_use]
    pub const fn dest_block(self) -> i32 {
        self.dest_block
    }

    /// Returns `true` if the ratio is 1:1.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        self.source_block == self.dest_block
    }

    /// Snaps the half-open source span `[start, end)` outward to block
    /// boundaries.
    #[must_use]
    pub const fn snap_outward(self, start: i32, end: i32) -> (i32, i32) {
        let b = self.source_block;
        let lo = start.div_euclid(b) * b;
        let hi = if end.rem_euclid(b) == 0 {
            end
        } else {
            (end.div_euclid(b) + 1) * b
        };
        (lo, hi)
    }

    /// Maps an aligned source coordinate to destination space.
    ///
    /// The coordinate must be a multiple of [`source_block`](Self::source_block).
    #[must_use]
    pub const fn to_dest(self, aligned_source: i32) -> i32 {
        aligned_source / self.source_block * self.dest_block
    }

    /// Maps an aligned destination coordinate back to source space.
    ///
    /// The coordinate must be a multiple of [`dest_block`](Self::dest_block).
    #[must_use]
    pub const fn to_source(self, aligned_dest: i32) -> i32 {
        aligned_dest / self.dest_block * self.source_block
    }
}

/// A dirty region expressed in both source and destination space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemappedRect {
    /// Block-aligned region of the source raster.
    pub source: PixelRect,
    /// Corresponding region of the destination raster.
    pub dest: PixelRect,
}

/// Remaps source-space dirty rectangles into destination space, keeping the
/// aligned source rectangle alongside each result.
///
/// Each input is clipped to the source bounds, snapped outward to the block
/// grid of each axis (see [`ScaleRatio`]), and coalesced with
/// [`insert`](crate::insert); the coalesced rectangles are then scaled
/// linearly into destination space. Every destination pixel whose value
/// could depend on a changed source pixel is covered.
///
/// Returns an empty list if either size is empty: there is nothing to
/// scale to or from.
#[must_use]
pub fn remap_pairs(rects: &[PixelRect], source: PixelSize, dest: PixelSize) -> Vec<RemappedRect> {
    let (Some(rx), Some(ry)) = (
        ScaleRatio::new(source.width(), dest.width()),
        ScaleRatio::new(source.height(), dest.height()),
    ) else {
        return Vec::new();
    };
    let bounds = source.to_rect();

    let mut aligned = Vec::with_capacity(rects.len());
    for rect in rects {
        let rect = rect.intersect(bounds);
        if rect.is_empty() {
            continue;
        }
        let (x0, x1) = rx.snap_outward(rect.x(), rect.right());
        let (y0, y1) = ry.snap_outward(rect.y(), rect.bottom());
        insert(PixelRect::from_points(x0, y0, x1, y1), &mut aligned, bounds);
    }

    aligned
        .into_iter()
        .map(|src| RemappedRect {
            source: src,
            dest: PixelRect::from_points(
                rx.to_dest(src.x()),
                ry.to_dest(src.y()),
                rx.to_dest(src.right()),
                ry.to_dest(src.bottom()),
            ),
        })
        .collect()
}

/// Remaps source-space dirty rectangles into destination space.
///
/// Same as [`remap_pairs`], keeping only the destination rectangles.
///
/// ```
/// use understory_damage::{PixelRect, PixelSize, remap};
///
/// let dest = remap(
///     &[PixelRect::new(10, 10, 4, 4)],
///     PixelSize::new(100, 100),
///     PixelSize::new(50, 50),
/// );
/// assert_eq!(dest, vec![PixelRect::new(5, 5, 2, 2)]);
/// ```
#[must_use]
pub fn remap(rects: &[PixelRect], source: PixelSize, dest: PixelSize) -> Vec<PixelRect> {
    remap_pairs(rects, source, dest)
        .into_iter()
        .map(|pair| pair.dest)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn gcd_basics() {
        assert_eq!(gcd(100, 50), 50);
        assert_eq!(gcd(6, 4), 2);
        assert_eq!(gcd(7, 0), 7);
        assert_eq!(gcd(17, 5), 1);
    }

    #[test]
    fn ratio_reduces_and_rejects_zero() {
        let r = ScaleRatio::new(6, 4).unwrap();
        assert_eq!((r.source_block(), r.dest_block()), (3, 2));
        assert!(ScaleRatio::new(0, 4).is_none());
        assert!(ScaleRatio::new(4, 0).is_none());
        assert!(ScaleRatio::new(5, 5).unwrap().is_identity());
    }

    #[test]
    fn snapping_grows_never_shrinks() {
        let r = ScaleRatio::new(6, 4).unwrap();
        assert_eq!(r.snap_outward(4, 5), (3, 6));
        assert_eq!(r.snap_outward(3, 6), (3, 6));
        assert_eq!(r.snap_outward(-1, 1), (-3, 3));
    }

    #[test]
    fn halving_maps_exactly() {
        let out = remap(
            &[PixelRect::new(10, 10, 4, 4)],
            PixelSize::new(100, 100),
            PixelSize::new(50, 50),
        );
        assert_eq!(out, vec![PixelRect::new(5, 5, 2, 2)]);
    }

    #[test]
    fn odd_edges_snap_outward_when_halving() {
        let out = remap_pairs(
            &[PixelRect::new(11, 3, 1, 1)],
            PixelSize::new(100, 100),
            PixelSize::new(50, 50),
        );
        assert_eq!(
            out,
            vec![RemappedRect {
                source: PixelRect::new(10, 2, 2, 2),
                dest: PixelRect::new(5, 1, 1, 1),
            }]
        );
    }

    #[test]
    fn coprime_sizes_snap_to_whole_axis() {
        // 7 -> 5 has a single block spanning the whole axis.
        let out = remap_pairs(
            &[PixelRect::new(3, 3, 1, 1)],
            PixelSize::new(7, 7),
            PixelSize::new(5, 5),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, PixelRect::new(0, 0, 7, 7));
        assert_eq!(out[0].dest, PixelRect::new(0, 0, 5, 5));
    }

    #[test]
    fn independent_axes() {
        // x: 100 -> 200 (block 1 -> 2), y: 90 -> 60 (block 3 -> 2).
        let out = remap(
            &[PixelRect::new(5, 4, 3, 3)],
            PixelSize::new(100, 90),
            PixelSize::new(200, 60),
        );
        assert_eq!(out, vec![PixelRect::new(10, 2, 6, 4)]);
    }

    #[test]
    fn snapped_neighbours_are_coalesced() {
        let out = remap_pairs(
            &[PixelRect::new(1, 0, 1, 1), PixelRect::new(2, 0, 1, 1)],
            PixelSize::new(8, 8),
            PixelSize::new(4, 4),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, PixelRect::new(0, 0, 4, 2));
    }

    #[test]
    fn degenerate_sizes_produce_nothing() {
        let rects = [PixelRect::new(0, 0, 4, 4)];
        assert!(remap(&rects, PixelSize::new(0, 10), PixelSize::new(5, 5)).is_empty());
        assert!(remap(&rects, PixelSize::new(10, 10), PixelSize::new(5, 0)).is_empty());
    }

    #[test]
    fn outside_source_is_ignored() {
        let out = remap(
            &[PixelRect::new(-20, -20, 5, 5)],
            PixelSize::new(10, 10),
            PixelSize::new(20, 20),
        );
        assert!(out.is_empty());
    }
}
