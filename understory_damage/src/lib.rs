// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_damage --heading-base-level=0

//! Understory Damage: integer dirty-rectangle algebra for incremental raster
//! compositing.
//!
//! This crate is the bookkeeping half of a dirty-rectangle renderer. It knows
//! nothing about pixels; it answers "which regions must be redrawn?".
//!
//! - [`PixelRect`] / [`PixelSize`]: integer rectangles and sizes with
//!   non-negative extents. Zero-area rectangles are valid values that
//!   contribute no damage.
//! - [`TrackedRect`] and [`RectObserver`]: a rectangle that notifies its
//!   observers whenever a mutation actually changes its value, so cached
//!   copies of it can be invalidated.
//! - [`insert`] and [`DamageList`]: clip a candidate, coalesce it with every
//!   rectangle it overlaps or touches, and append it. The list stays pairwise
//!   disjoint and covers everything inserted.
//! - [`remap`] / [`remap_pairs`]: carry a dirty list from one raster to a
//!   rescaled copy of it, snapping to the block grid shared by both sizes so
//!   partial rescaling stays pixel-identical to a full rescale.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_damage::{DamageList, PixelRect, PixelSize, remap};
//!
//! // A node moved from one 32x32 cell to the next.
//! let mut damage = DamageList::new(PixelRect::new(0, 0, 256, 256));
//! damage.add(PixelRect::new(0, 0, 32, 32)); // old position
//! damage.add(PixelRect::new(32, 0, 32, 32)); // new position
//! assert_eq!(damage.rects(), &[PixelRect::new(0, 0, 64, 32)]);
//!
//! // The same damage seen through a half-size view of that raster.
//! let scaled = remap(damage.rects(), PixelSize::new(256, 256), PixelSize::new(128, 128));
//! assert_eq!(scaled, vec![PixelRect::new(0, 0, 32, 16)]);
//! ```
//!
//! ## Features
//!
//! - `std` (default): forwards to Kurbo's `std` feature.
//! - `libm`: forwards to Kurbo's `libm` feature for `no_std` builds.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod list;
mod rect;
mod remap;
mod tracked;

pub use list::{DamageList, insert};
pub use rect::{PixelRect, PixelSize};
pub use remap::{RemappedRect, ScaleRatio, gcd, remap, remap_pairs};
pub use tracked::{RectObserver, TrackedRect};
