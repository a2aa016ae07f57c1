// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A compositor rendered into its own buffer and shown, rescaled, as a node
//! of another compositor.

use understory_damage::{PixelRect, PixelSize, remap_pairs};

use crate::compositor::Compositor;
use crate::raster::Raster;

/// What changed in a [`NestedView`]'s output during [`NestedView::update`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NestedUpdate {
    /// The output is pixel-identical to the previous frame.
    Unchanged,
    /// Only these output regions changed.
    Regions(Vec<PixelRect>),
    /// The whole output changed.
    Full,
    /// There is no output, because the output size or the crop is empty.
    NoImage,
}

/// A child [`Compositor`] drawn into a source buffer, then scaled to an
/// output size.
///
/// When the output size equals the (cropped) source size, the source buffer
/// is the output and no copy is made. Otherwise only the output regions
/// affected by the child's dirty rectangles are rescaled, using
/// [`remap_pairs`] so the result matches a full rescale exactly.
///
/// ```
/// use std::sync::Arc;
/// use understory_compositor::{NestedView, Raster, RenderNode};
/// use understory_damage::{PixelRect, PixelSize};
///
/// let mut view = NestedView::new(PixelSize::new(100, 100), PixelSize::new(50, 50));
/// let tile = Arc::new(Raster::filled_with(PixelSize::new(10, 10), [255, 255, 255, 255]));
/// view.compositor_mut().insert(RenderNode::from_image(tile).with_position(20, 20));
/// view.update();
///
/// let (image, dirty) = view.get_image().unwrap();
/// assert_eq!(image.size(), PixelSize::new(50, 50));
/// assert!(dirty.is_none());
/// assert_eq!(image.pixel(12, 12), Some([255, 255, 255, 255]));
/// ```
#[derive(Debug)]
pub struct NestedView {
    child: Compositor,
    source: Raster,
    output_size: PixelSize,
    output: Option<Raster>,
    crop: Option<PixelRect>,
    shown_crop: Option<PixelRect>,
    passthrough: bool,
    has_image: bool,
    dirty: Option<Vec<PixelRect>>,
}

impl NestedView {
    /// Creates a view with an empty child compositor.
    #[must_use]
    pub fn new(source_size: PixelSize, output_size: PixelSize) -> Self {
        Self::with_compositor(Compositor::new(), source_size, output_size)
    }

    /// Creates a view around an existing compositor.
    #[must_use]
    pub fn with_compositor(child: Compositor, source_size: PixelSize, output_size: PixelSize) -> Self {
        Self {
            child,
            source: Raster::new(source_size),
            output_size,
            output: None,
            crop: None,
            shown_crop: None,
            passthrough: false,
            has_image: false,
            dirty: None,
        }
    }

    /// The child compositor.
    #[must_use]
    pub fn compositor(&self) -> &Compositor {
        &self.child
    }

    /// Mutable access to the child compositor.
    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.child
    }

    /// The buffer the child compositor draws into.
    #[must_use]
    pub fn source(&self) -> &Raster {
        &self.source
    }

    /// Size of the source buffer.
    #[must_use]
    pub fn source_size(&self) -> PixelSize {
        self.source.size()
    }

    /// Resizes the source buffer. Its contents are redrawn on the next update.
    pub fn set_source_size(&mut self, size: PixelSize) {
        if size != self.source.size() {
            self.source = Raster::new(size);
            self.child.force_full_redraw();
        }
    }

    /// Size the source is scaled to.
    #[must_use]
    pub fn output_size(&self) -> PixelSize {
        self.output_size
    }

    /// Changes the output size. The output is rescaled in full on the next
    /// update.
    pub fn set_output_size(&mut self, size: PixelSize) {
        self.output_size = size;
    }

    /// The region of the source that is shown, or `None` for all of it.
    #[must_use]
    pub fn crop(&self) -> Option<PixelRect> {
        self.crop
    }

    /// Shows only part of the source, like a camera looking at a larger
    /// scene. The crop is clipped to the source bounds.
    pub fn set_crop(&mut self, crop: Option<PixelRect>) {
        self.crop = crop;
    }

    /// The shown part of the source: the crop clipped to the source bounds.
    fn extent(&self) -> PixelRect {
        let bounds = self.source.bounds();
        self.crop.map_or(bounds, |crop| crop.intersect(bounds))
    }

    /// Returns `true` if the next [`update`](Self::update) may change the
    /// output.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let extent = self.extent();
        if extent.is_empty() || self.output_size.is_empty() {
            return self.has_image;
        }
        let passthrough = extent == self.source.bounds() && extent.size() == self.output_size;
        let resized = !passthrough
            && self
                .output
                .as_ref()
                .is_none_or(|out| out.size() != self.output_size);
        !self.has_image
            || passthrough != self.passthrough
            || self.crop != self.shown_crop
            || resized
            || self.child.is_dirty()
    }

    /// Maps a point of the output, relative to its top-left corner, to the
    /// source pixel shown there.
    ///
    /// Each output pixel maps to the source pixel under its center. Returns
    /// `None` outside the output or when there is no image.
    #[must_use]
    pub fn source_point(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        self.image()?;
        let extent = self.extent();
        let out = self.output_size;
        if x < 0 || y < 0 || x >= out.width() || y >= out.height() {
            return None;
        }
        Some((
            extent.x() + center_to_source(x, extent.width(), out.width()),
            extent.y() + center_to_source(y, extent.height(), out.height()),
        ))
    }

    /// Draws the child compositor and brings the output up to date.
    pub fn update(&mut self) -> NestedUpdate {
        let bounds = self.source.bounds();
        let damage = self.child.advance_frame(&mut self.source, bounds);

        let extent = self.extent();
        if extent.is_empty() || self.output_size.is_empty() {
            let had_image = self.has_image;
            self.output = None;
            self.has_image = false;
            self.dirty = None;
            return if had_image {
                NestedUpdate::NoImage
            } else {
                NestedUpdate::Unchanged
            };
        }

        let passthrough = extent == bounds && extent.size() == self.output_size;
        let fresh = !self.has_image || passthrough != self.passthrough || self.crop != self.shown_crop;
        self.passthrough = passthrough;
        self.shown_crop = self.crop;
        self.has_image = true;

        if passthrough {
            self.output = None;
            self.dirty = if fresh || damage.full_redraw {
                None
            } else {
                Some(damage.dirty_rects)
            };
        } else {
            let resized = self
                .output
                .as_ref()
                .is_none_or(|out| out.size() != self.output_size);
            if resized {
                tracing::debug!(
                    source = ?extent.size(),
                    output = ?self.output_size,
                    "allocating nested output"
                );
                self.output = Some(Raster::new(self.output_size));
            }
            let Some(out) = self.output.as_mut() else {
                return NestedUpdate::Unchanged;
            };
            if fresh || resized || damage.full_redraw {
                out.scale_from(&self.source, extent, out.bounds());
                self.dirty = None;
            } else {
                let local: Vec<PixelRect> = damage
                    .dirty_rects
                    .iter()
                    .map(|r| r.intersect(extent).translate(-extent.x(), -extent.y()))
                    .filter(|r| !r.is_empty())
                    .collect();
                let pairs = remap_pairs(&local, extent.size(), self.output_size);
                for pair in &pairs {
                    let src = pair.source.translate(extent.x(), extent.y());
                    out.scale_from(&self.source, src, pair.dest);
                }
                tracing::trace!(regions = pairs.len(), "rescaled nested output");
                self.dirty = Some(pairs.into_iter().map(|p| p.dest).collect());
            }
        }

        match &self.dirty {
            None => NestedUpdate::Full,
            Some(rects) if rects.is_empty() => NestedUpdate::Unchanged,
            Some(rects) => NestedUpdate::Regions(rects.clone()),
        }
    }

    /// The current output.
    ///
    /// Returns `None` before the first [`update`](Self::update) or when the
    /// output is empty.
    #[must_use]
    pub fn image(&self) -> Option<&Raster> {
        if !self.has_image {
            return None;
        }
        if self.passthrough {
            Some(&self.source)
        } else {
            self.output.as_ref()
        }
    }

    /// The current output and the regions that changed in the last update.
    ///
    /// The region list is `None` when the whole output should be treated as
    /// changed.
    #[must_use]
    pub fn get_image(&self) -> Option<(&Raster, Option<&[PixelRect]>)> {
        self.image().map(|image| (image, self.dirty.as_deref()))
    }
}

/// Source offset under the center of output pixel `at`, for an axis of
/// `source` pixels scaled to `output` pixels.
#[allow(
    clippy::cast_possible_truncation,
    reason = "the result is below `source`, which fits in i32"
)]
fn center_to_source(at: i32, source: i32, output: i32) -> i32 {
    ((2 * i64::from(at) + 1) * i64::from(source) / (2 * i64::from(output))) as i32
}
