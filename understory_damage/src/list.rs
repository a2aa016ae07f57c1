// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-list maintenance: clip, coalesce, append.

use alloc::vec::Vec;

use crate::rect::PixelRect;

/// Inserts `candidate` into `list`, keeping the list coalesced.
///
/// The candidate is first clipped to `clip`; if nothing remains it is
/// discarded. Otherwise every rectangle already in `list` that overlaps or
/// touches the candidate is removed and folded into it (bounding union),
/// repeatedly, until the grown candidate touches nothing left in the list.
/// The grown candidate is then appended.
///
/// If `list` was pairwise disjoint before the call, it still is afterwards,
/// and the covered pixels are a superset of the previous cover plus the
/// clipped candidate. Because merging uses bounding unions, the cover may
/// include pixels that no input covered; that over-draw is the price paid
/// for keeping the number of blits small when many adjacent regions change.
///
/// Returns `true` if anything was added.
pub fn insert(candidate: PixelRect, list: &mut Vec<PixelRect>, clip: PixelRect) -> bool {
    let mut grown = candidate.intersect(clip);
    if grown.is_empty() {
        return false;
    }
    while let Some(idx) = list.iter().position(|r| r.touches(grown)) {
        grown = grown.union(list.swap_remove(idx));
    }
    list.push(grown);
    true
}

/// A coalesced list of dirty rectangles confined to a clip rectangle.
///
/// `DamageList` wraps [`insert`] with a fixed clip. Rectangles handed out by
/// [`rects`](Self::rects) are non-empty, lie inside the clip, and are
/// pairwise disjoint (they do not even share edges).
///
/// # Example
///
/// ```
/// use understory_damage::{DamageList, PixelRect};
///
/// let mut damage = DamageList::new(PixelRect::new(0, 0, 256, 256));
/// damage.add(PixelRect::new(0, 0, 32, 32));
/// damage.add(PixelRect::new(32, 0, 32, 32));
/// damage.add(PixelRect::new(300, 300, 8, 8)); // outside the clip
///
/// assert_eq!(damage.rects(), &[PixelRect::new(0, 0, 64, 32)]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DamageList {
    clip: PixelRect,
    rects: Vec<PixelRect>,
}

impl DamageList {
    /// Creates an empty list confined to `clip`.
    #[must_use]
    pub fn new(clip: PixelRect) -> Self {
        Self {
            clip,
            rects: Vec::new(),
        }
    }

    /// The clip rectangle.
    #[must_use]
    pub fn clip(&self) -> PixelRect {
        self.clip
    }

    /// Adds a rectangle; see [`insert`].
    ///
    /// Returns `true` if anything was added.
    pub fn add(&mut self, rect: PixelRect) -> bool {
        insert(rect, &mut self.rects, self.clip)
    }

    /// Adds every rectangle from an iterator.
    pub fn extend(&mut self, rects: impl IntoIterator<Item = PixelRect>) {
        for rect in rects {
            self.add(rect);
        }
    }

    /// Marks the whole clip rectangle dirty.
    pub fn add_all(&mut self) {
        self.rects.clear();
        if !self.clip.is_empty() {
            self.rects.push(self.clip);
        }
    }

    /// The coalesced rectangles.
    #[must_use]
    pub fn rects(&self) -> &[PixelRect] {
        &self.rects
    }

    /// Returns `true` if nothing is dirty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of rectangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Sum of the areas of all rectangles.
    ///
    /// The rectangles are disjoint, so this is the covered area.
    #[must_use]
    pub fn area(&self) -> u64 {
        self.rects.iter().map(|r| r.area()).sum()
    }

    /// Bounding rectangle of all dirty rectangles, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<PixelRect> {
        let mut it = self.rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, PixelRect::union))
    }

    /// Removes every rectangle, keeping the clip.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Consumes the list, returning the rectangles.
    #[must_use]
    pub fn into_rects(self) -> Vec<PixelRect> {
        self.rects
    }
}
