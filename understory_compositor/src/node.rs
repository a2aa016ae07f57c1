// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render nodes: an image placed at a position, with dirty tracking.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use smallvec::SmallVec;
use understory_damage::{PixelRect, PixelSize, RectObserver, TrackedRect};

use crate::nested::{NestedUpdate, NestedView};
use crate::raster::Raster;

/// Identifier for a node in a [`Compositor`](crate::Compositor).
///
/// A slot index plus a generation. Removing a node frees its slot; a later
/// insert may reuse the slot with a higher generation, so stale ids never
/// alias a different live node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

bitflags::bitflags! {
    /// Node flags controlling visibility and picking.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node is drawn.
        const VISIBLE  = 0b0000_0001;
        /// Node is reported by [`Compositor::nodes_at`](crate::Compositor::nodes_at).
        const PICKABLE = 0b0000_0010;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// How many more frames a node must be redrawn for.
///
/// A node that just became invisible has its old area cleared on the first
/// frame; the second frame repeats that so an outer nested view that reads
/// this compositor's output one frame late still sees the node disappear.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirtyLevel {
    /// Nothing to redraw.
    #[default]
    Clean,
    /// Redraw on the next frame.
    Changed,
    /// Redraw on the next two frames.
    Pending,
}

impl DirtyLevel {
    /// Returns `true` unless the level is [`Clean`](Self::Clean).
    #[must_use]
    pub const fn is_dirty(self) -> bool {
        !matches!(self, Self::Clean)
    }

    /// The level after one frame has been drawn.
    #[must_use]
    pub const fn decay(self) -> Self {
        match self {
            Self::Pending => Self::Changed,
            Self::Changed | Self::Clean => Self::Clean,
        }
    }
}

/// Dirty state shared with the [`TrackedRect`]s a node observes.
#[derive(Debug, Default)]
struct DirtyState {
    level: Cell<DirtyLevel>,
    whole: Cell<bool>,
}

impl DirtyState {
    fn raise(&self, level: DirtyLevel) {
        if level > self.level.get() {
            self.level.set(level);
        }
    }

    fn mark_whole(&self, level: DirtyLevel) {
        self.raise(level);
        self.whole.set(true);
    }
}

impl RectObserver for DirtyState {
    fn rect_changed(&self) {
        self.mark_whole(DirtyLevel::Changed);
    }
}

/// What a node draws.
#[derive(Debug, Default)]
pub enum NodeContent {
    /// Nothing; the node occupies no area.
    #[default]
    Empty,
    /// A shared image.
    Image(Arc<Raster>),
    /// The output of another compositor.
    Nested(Box<NestedView>),
}

/// A node's per-frame summary, taken before dirty rectangles are computed.
#[derive(Copy, Clone, Debug)]
pub(crate) struct FrameEntry {
    pub(crate) occupied: PixelRect,
    pub(crate) level: DirtyLevel,
    pub(crate) visible: bool,
}

/// An image placed in a compositor, with its position, stacking layer and
/// dirty state.
///
/// The placement is a [`TrackedRect`] observed by the node itself, so
/// moving a node marks it dirty. Its size follows the current image.
pub struct RenderNode {
    content: NodeContent,
    placement: TrackedRect,
    layer: f64,
    flags: NodeFlags,
    state: Rc<DirtyState>,
    regions: SmallVec<[PixelRect; 4]>,
    layer_changed: bool,
}

impl RenderNode {
    /// Creates an empty node at the origin on layer 0.
    ///
    /// A new node is dirty, so it is drawn on the next frame.
    #[must_use]
    pub fn new() -> Self {
        let state = Rc::new(DirtyState::default());
        state.mark_whole(DirtyLevel::Changed);
        let mut placement = TrackedRect::default();
        placement.register(&state);
        Self {
            content: NodeContent::Empty,
            placement,
            layer: 0.0,
            flags: NodeFlags::default(),
            state,
            regions: SmallVec::new(),
            layer_changed: false,
        }
    }

    /// Creates a node showing `image`.
    #[must_use]
    pub fn from_image(image: Arc<Raster>) -> Self {
        let mut node = Self::new();
        node.set_image(Some(image));
        node
    }

    /// Creates a node showing the output of `view`.
    #[must_use]
    pub fn from_nested(view: NestedView) -> Self {
        let mut node = Self::new();
        node.set_nested(view);
        node
    }

    /// Places the node's top-left corner at `(x, y)`.
    #[must_use]
    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.set_position(x, y);
        self
    }

    /// Sets the stacking layer.
    #[must_use]
    pub fn with_layer(mut self, layer: f64) -> Self {
        self.set_layer(layer);
        self
    }

    /// What the node draws.
    #[must_use]
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// The image drawn this frame, if any.
    #[must_use]
    pub fn image(&self) -> Option<&Raster> {
        match &self.content {
            NodeContent::Empty => None,
            NodeContent::Image(image) => Some(image),
            NodeContent::Nested(view) => view.image(),
        }
    }

    /// Replaces the image.
    ///
    /// Setting the image the node already shows (the same [`Arc`]) is not a
    /// change. Returns `true` if the node was marked dirty.
    pub fn set_image(&mut self, image: Option<Arc<Raster>>) -> bool {
        let same = match (&self.content, &image) {
            (NodeContent::Image(current), Some(new)) => Arc::ptr_eq(current, new),
            (NodeContent::Empty, None) => true,
            _ => false,
        };
        if same {
            return false;
        }
        self.content = image.map_or(NodeContent::Empty, NodeContent::Image);
        self.mark_dirty();
        self.sync_size();
        true
    }

    /// Mutable access to the image, copying it first if it is shared.
    ///
    /// Marks the whole node dirty. Use [`mark_region_dirty`](Self::mark_region_dirty)
    /// after editing through [`set_image`](Self::set_image) instead if only a
    /// small part changes.
    pub fn image_mut(&mut self) -> Option<&mut Raster> {
        if !matches!(self.content, NodeContent::Image(_)) {
            return None;
        }
        self.mark_dirty();
        match &mut self.content {
            NodeContent::Image(image) => Some(Arc::make_mut(image)),
            _ => None,
        }
    }

    /// Shows the output of a nested compositor.
    pub fn set_nested(&mut self, view: NestedView) {
        self.content = NodeContent::Nested(Box::new(view));
        self.mark_dirty();
        self.sync_size();
    }

    /// The nested view, if this node shows one.
    #[must_use]
    pub fn nested(&self) -> Option<&NestedView> {
        match &self.content {
            NodeContent::Nested(view) => Some(view),
            _ => None,
        }
    }

    /// Mutable access to the nested view.
    ///
    /// Changes inside the nested compositor are picked up on the next frame,
    /// so this does not mark the node dirty by itself.
    pub fn nested_mut(&mut self) -> Option<&mut NestedView> {
        match &mut self.content {
            NodeContent::Nested(view) => Some(view),
            _ => None,
        }
    }

    /// The occupied rectangle: position plus image size.
    #[must_use]
    pub fn rect(&self) -> PixelRect {
        self.placement.get()
    }

    /// Left edge.
    #[must_use]
    pub fn x(&self) -> i32 {
        self.placement.get().x()
    }

    /// Top edge.
    #[must_use]
    pub fn y(&self) -> i32 {
        self.placement.get().y()
    }

    /// Width of the current image.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.placement.get().width()
    }

    /// Height of the current image.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.placement.get().height()
    }

    /// Moves the node. Returns `true` if the position changed.
    pub fn set_position(&mut self, x: i32, y: i32) -> bool {
        self.placement.set_origin(x, y)
    }

    /// Moves the node by an offset. Returns `true` if the position changed.
    pub fn translate(&mut self, dx: i32, dy: i32) -> bool {
        self.placement.translate(dx, dy)
    }

    /// Marks this node dirty whenever `rect` changes.
    ///
    /// Useful when several nodes are laid out from one shared rectangle.
    pub fn observe(&self, rect: &mut TrackedRect) {
        rect.register(&self.state);
    }

    /// Stops observing `rect`.
    pub fn unobserve(&self, rect: &mut TrackedRect) -> bool {
        rect.unregister(&self.state)
    }

    /// The stacking layer. Higher layers draw on top.
    #[must_use]
    pub fn layer(&self) -> f64 {
        self.layer
    }

    /// Moves the node to another layer.
    ///
    /// Nodes on equal layers keep their insertion order.
    pub fn set_layer(&mut self, layer: f64) {
        if self.layer.total_cmp(&layer).is_ne() {
            self.layer = layer;
            self.layer_changed = true;
            self.mark_dirty();
        }
    }

    /// Flags.
    #[must_use]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Returns `true` if the node is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    /// Shows or hides the node.
    ///
    /// Hiding keeps the node dirty for two frames; see [`DirtyLevel::Pending`].
    /// Showing a hidden node draws it like a newly inserted one.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.is_visible() {
            return;
        }
        self.flags.set(NodeFlags::VISIBLE, visible);
        let level = if visible {
            DirtyLevel::Changed
        } else {
            DirtyLevel::Pending
        };
        self.state.mark_whole(level);
    }

    /// Includes or excludes the node from hit testing.
    pub fn set_pickable(&mut self, pickable: bool) {
        self.flags.set(NodeFlags::PICKABLE, pickable);
    }

    /// Current dirty level.
    #[must_use]
    pub fn dirty_level(&self) -> DirtyLevel {
        self.state.level.get()
    }

    /// Returns `true` if the node will be redrawn on the next frame.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.level.get().is_dirty()
    }

    /// Redraws the whole node on the next frame.
    pub fn mark_dirty(&mut self) {
        self.state.mark_whole(DirtyLevel::Changed);
    }

    /// Redraws part of the node on the next frame.
    ///
    /// `rect` is in image coordinates and is clipped to the image. Regions
    /// are ignored when the whole node is dirty anyway.
    pub fn mark_region_dirty(&mut self, rect: PixelRect) {
        let rect = rect.intersect(self.placement.get().size().to_rect());
        if rect.is_empty() {
            return;
        }
        self.state.raise(DirtyLevel::Changed);
        self.regions.push(rect);
    }

    /// Dirty regions in image coordinates, or `None` if the whole node is
    /// dirty.
    pub(crate) fn pending_regions(&self) -> Option<&[PixelRect]> {
        if self.state.whole.get() {
            None
        } else {
            Some(self.regions.as_slice())
        }
    }

    pub(crate) fn take_layer_changed(&mut self) -> bool {
        core::mem::take(&mut self.layer_changed)
    }

    /// Advances nested content and settles the placement size.
    pub(crate) fn prepare(&mut self) -> FrameEntry {
        let update = match &mut self.content {
            NodeContent::Nested(view) => view.update(),
            _ => NestedUpdate::Unchanged,
        };
        match update {
            NestedUpdate::Unchanged | NestedUpdate::NoImage => {}
            NestedUpdate::Regions(rects) => {
                self.state.raise(DirtyLevel::Changed);
                self.regions.extend(rects);
            }
            NestedUpdate::Full => self.mark_dirty(),
        }
        self.sync_size();
        FrameEntry {
            occupied: self.placement.get(),
            level: self.state.level.get(),
            visible: self.is_visible(),
        }
    }

    /// Called once the node has been drawn for this frame.
    pub(crate) fn finish_frame(&mut self) {
        let level = self.state.level.get().decay();
        self.state.level.set(level);
        if !level.is_dirty() {
            self.state.whole.set(false);
        }
        self.regions.clear();
    }

    fn sync_size(&mut self) {
        let size = self.image().map_or(PixelSize::ZERO, Raster::size);
        self.placement.set_size(size);
    }
}

impl Default for RenderNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderNode")
            .field("rect", &self.placement.get())
            .field("layer", &self.layer)
            .field("flags", &self.flags)
            .field("dirty", &self.state.level.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: i32, h: i32) -> Arc<Raster> {
        Arc::new(Raster::filled_with(PixelSize::new(w, h), [0, 0, 0, 255]))
    }

    #[test]
    fn new_nodes_are_dirty() {
        let node = RenderNode::from_image(image(4, 3)).with_position(5, 6);
        assert_eq!(node.rect(), PixelRect::new(5, 6, 4, 3));
        assert_eq!(node.dirty_level(), DirtyLevel::Changed);
        assert!(node.pending_regions().is_none());
    }

    #[test]
    fn same_image_is_not_a_change() {
        let img = image(2, 2);
        let mut node = RenderNode::from_image(Arc::clone(&img));
        node.finish_frame();
        assert!(!node.is_dirty());

        assert!(!node.set_image(Some(Arc::clone(&img))));
        assert!(!node.is_dirty());

        assert!(node.set_image(Some(image(2, 2))));
        assert!(node.is_dirty());
    }

    #[test]
    fn moving_marks_dirty() {
        let mut node = RenderNode::from_image(image(2, 2));
        node.finish_frame();
        assert!(!node.set_position(0, 0));
        assert!(!node.is_dirty());
        assert!(node.translate(1, 0));
        assert_eq!(node.dirty_level(), DirtyLevel::Changed);
    }

    #[test]
    fn hiding_stays_dirty_for_two_frames() {
        let mut node = RenderNode::from_image(image(2, 2));
        node.finish_frame();
        node.set_visible(false);
        assert_eq!(node.dirty_level(), DirtyLevel::Pending);
        node.finish_frame();
        assert_eq!(node.dirty_level(), DirtyLevel::Changed);
        node.finish_frame();
        assert_eq!(node.dirty_level(), DirtyLevel::Clean);
    }

    #[test]
    fn regions_are_clipped_and_kept_separate() {
        let mut node = RenderNode::from_image(image(10, 10));
        node.finish_frame();
        node.mark_region_dirty(PixelRect::new(8, 8, 5, 5));
        node.mark_region_dirty(PixelRect::new(20, 20, 1, 1));
        assert_eq!(node.pending_regions(), Some(&[PixelRect::new(8, 8, 2, 2)][..]));

        node.mark_dirty();
        assert!(node.pending_regions().is_none());
        node.finish_frame();
        assert_eq!(node.pending_regions(), Some(&[][..]));
    }

    #[test]
    fn shared_rect_dirties_observers() {
        let mut a = RenderNode::from_image(image(1, 1));
        a.finish_frame();
        let mut shared = TrackedRect::new(PixelRect::new(0, 0, 8, 8));
        a.observe(&mut shared);
        shared.translate(1, 1);
        assert!(a.is_dirty());
        assert!(a.unobserve(&mut shared));
    }

    #[test]
    fn layer_change_is_reported_once() {
        let mut node = RenderNode::new();
        node.set_layer(0.0);
        assert!(!node.take_layer_changed());
        node.set_layer(2.5);
        assert!(node.take_layer_changed());
        assert!(!node.take_layer_changed());
    }
}
