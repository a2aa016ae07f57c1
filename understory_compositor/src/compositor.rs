// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor: an ordered collection of nodes drawn incrementally into a
//! target raster.

use std::time::Duration;

use hashbrown::HashMap;
use understory_damage::{DamageList, PixelRect, PixelSize};

use crate::background::Background;
use crate::cache::ScaleCache;
use crate::clock::{FrameClock, SystemClock};
use crate::config::CompositorConfig;
use crate::node::{FrameEntry, NodeFlags, NodeId, RenderNode};
use crate::raster::{Raster, RasterId, TRANSPARENT};

/// Result of [`Compositor::advance_frame`]: the regions of the target that
/// were redrawn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameDamage {
    /// Disjoint, non-touching rectangles covering every changed pixel.
    pub dirty_rects: Vec<PixelRect>,
    /// `true` if the whole clip rectangle was redrawn.
    pub full_redraw: bool,
}

impl FrameDamage {
    /// Returns `true` if nothing was redrawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirty_rects.is_empty()
    }

    /// Bounding box of all dirty rectangles, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<PixelRect> {
        self.dirty_rects.iter().copied().reduce(PixelRect::union)
    }

    /// Bounding box of all dirty rectangles as a [`kurbo::Rect`], for
    /// presenting only part of a surface.
    #[must_use]
    pub fn union_rect(&self) -> Option<kurbo::Rect> {
        self.bounds().map(PixelRect::to_kurbo)
    }
}

/// Measurements of the most recent frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// The frame redrew the whole clip rectangle.
    pub full_redraw: bool,
    /// Number of dirty rectangles.
    pub dirty_rects: usize,
    /// Pixels covered by dirty rectangles.
    pub dirty_area: u64,
    /// Number of node image transfers.
    pub blits: usize,
    /// Time spent computing, clearing and drawing dirty regions.
    pub elapsed: Duration,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    seq: u64,
    node: Option<RenderNode>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    rect: PixelRect,
    visible: bool,
}

/// An ordered collection of [`RenderNode`]s drawn into a target [`Raster`].
///
/// Each call to [`advance_frame`](Self::advance_frame) clears and redraws
/// only what changed since the previous frame: the old and new areas of
/// nodes that moved, changed or were hidden, and areas left by removed
/// nodes. Nodes are drawn in ascending layer order, with insertion order
/// breaking ties.
///
/// When incremental drawing gets too slow to be worth it, the compositor
/// falls back to full redraws; see
/// [`CompositorConfig::with_incremental_budget`].
///
/// ```
/// use std::sync::Arc;
/// use peniko::Color;
/// use understory_compositor::{Background, Compositor, Raster, RenderNode};
/// use understory_damage::{PixelRect, PixelSize};
///
/// let mut compositor = Compositor::new();
/// compositor.set_background(Some(Background::solid(Color::from_rgba8(0, 0, 255, 255))));
/// let tile = Arc::new(Raster::filled_with(PixelSize::new(32, 32), [255, 0, 0, 255]));
/// let id = compositor.insert(RenderNode::from_image(tile));
///
/// let mut target = Raster::new(PixelSize::new(128, 128));
/// assert!(compositor.draw(&mut target).full_redraw);
///
/// compositor.node_mut(id).set_position(32, 0);
/// let damage = compositor.draw(&mut target);
/// assert_eq!(damage.bounds(), Some(PixelRect::new(0, 0, 64, 32)));
/// ```
#[derive(Debug)]
pub struct Compositor {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<NodeId>,
    order_stale: bool,
    next_seq: u64,
    previous: HashMap<NodeId, Snapshot>,
    vacated: Vec<PixelRect>,
    incremental: bool,
    last_clip: Option<PixelRect>,
    last_target: Option<(RasterId, PixelSize)>,
    background: Option<Background>,
    backgrounds: ScaleCache<PixelSize>,
    config: CompositorConfig,
    clock: Box<dyn FrameClock>,
    stats: FrameStats,
}

impl Compositor {
    /// Creates an empty compositor with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CompositorConfig::default())
    }

    /// Creates an empty compositor.
    #[must_use]
    pub fn with_config(config: CompositorConfig) -> Self {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    /// Creates an empty compositor that measures frames with `clock`.
    #[must_use]
    pub fn with_clock(config: CompositorConfig, clock: Box<dyn FrameClock>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            order_stale: false,
            next_seq: 0,
            previous: HashMap::new(),
            vacated: Vec::new(),
            incremental: false,
            last_clip: None,
            last_target: None,
            background: None,
            backgrounds: ScaleCache::new(config.background_cache_capacity()),
            config,
            clock,
            stats: FrameStats::default(),
        }
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Adds a node on top of the other nodes of its layer.
    pub fn insert(&mut self, node: RenderNode) -> NodeId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.seq = seq;
            slot.node = Some(node);
            NodeId::new(idx, slot.generation)
        } else {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "more than u32::MAX nodes is not supported"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 1,
                seq,
                node: Some(node),
            });
            NodeId::new(idx, 1)
        };
        self.order.push(id);
        self.order_stale = true;
        tracing::trace!(?id, "inserted node");
        id
    }

    /// Removes a node, returning it.
    ///
    /// If the node was drawn in the previous frame, its area is cleared on
    /// the next one. Returns `None` for stale ids.
    pub fn remove(&mut self, id: NodeId) -> Option<RenderNode> {
        if !self.is_alive(id) {
            return None;
        }
        let slot = &mut self.slots[id.idx()];
        let node = slot.node.take()?;
        self.free.push(id.0);
        self.order.retain(|other| *other != id);
        if let Some(snapshot) = self.previous.remove(&id)
            && snapshot.visible
            && !snapshot.rect.is_empty()
        {
            self.vacated.push(snapshot.rect);
        }
        tracing::trace!(?id, "removed node");
        Some(node)
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slots
            .get(id.idx())
            .is_some_and(|slot| slot.generation == id.generation() && slot.node.is_some())
    }

    /// The node for `id`, or `None` if it was removed.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&RenderNode> {
        self.slots
            .get(id.idx())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    /// Mutable access to the node for `id`, or `None` if it was removed.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut RenderNode> {
        self.slots
            .get_mut(id.idx())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// The node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the node was removed.
    #[must_use]
    #[track_caller]
    pub fn node(&self, id: NodeId) -> &RenderNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("{id:?} does not refer to a live node"),
        }
    }

    /// Mutable access to the node for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the node was removed.
    #[track_caller]
    pub fn node_mut(&mut self, id: NodeId) -> &mut RenderNode {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("{id:?} does not refer to a live node"),
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node ids in drawing order, bottom first.
    ///
    /// The order reflects layer changes as of the last frame or insertion.
    pub fn ids(&mut self) -> &[NodeId] {
        self.sort_if_needed();
        &self.order
    }

    /// Visible, pickable nodes whose area contains `(x, y)`, topmost first.
    #[must_use]
    pub fn nodes_at(&mut self, x: i32, y: i32) -> Vec<NodeId> {
        self.sort_if_needed();
        self.order
            .iter()
            .rev()
            .copied()
            .filter(|id| {
                self.get(*id).is_some_and(|node| {
                    node.flags().contains(NodeFlags::VISIBLE | NodeFlags::PICKABLE)
                        && node.rect().contains_point(x, y)
                })
            })
            .collect()
    }

    /// Like [`nodes_at`](Self::nodes_at), but also reports nodes of nested
    /// views under the point.
    ///
    /// Each hit is a path of ids, starting with a node of this compositor and
    /// descending one nested view per step. The point is mapped through each
    /// view's crop and scale with [`NestedView::source_point`]. Hits inside a
    /// nested view come right before the path of the view itself, so the list
    /// stays topmost first.
    ///
    /// [`NestedView::source_point`]: crate::NestedView::source_point
    #[must_use]
    pub fn hit_paths(&mut self, x: i32, y: i32) -> Vec<Vec<NodeId>> {
        let mut paths = Vec::new();
        for id in self.nodes_at(x, y) {
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            let origin = node.rect();
            if let Some(view) = node.nested_mut()
                && let Some((sx, sy)) = view.source_point(x - origin.x(), y - origin.y())
            {
                for mut inner in view.compositor_mut().hit_paths(sx, sy) {
                    inner.insert(0, id);
                    paths.push(inner);
                }
            }
            paths.push(vec![id]);
        }
        paths
    }

    /// Sets what dirty regions are cleared to. `None` clears to transparent.
    ///
    /// The next frame is a full redraw.
    pub fn set_background(&mut self, background: Option<Background>) {
        self.background = background.filter(|bg| !bg.is_none());
        self.backgrounds.clear();
        self.force_full_redraw();
    }

    /// The background.
    #[must_use]
    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    /// Makes the next frame a full redraw.
    pub fn force_full_redraw(&mut self) {
        if self.incremental {
            tracing::debug!("incremental drawing disabled");
        }
        self.incremental = false;
    }

    /// Returns `true` if the next frame will only redraw dirty regions.
    ///
    /// Changing the clip rectangle or drawing into a different target between
    /// frames still forces a full redraw.
    #[must_use]
    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Returns `true` if the next frame has anything to redraw.
    ///
    /// Nested views count as dirty when their child compositor is dirty or
    /// their crop or output size changed since the last update.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.incremental
            || !self.vacated.is_empty()
            || self
                .slots
                .iter()
                .filter_map(|slot| slot.node.as_ref())
                .any(|node| {
                    node.is_dirty() || node.nested().is_some_and(|view| view.is_dirty())
                })
    }

    /// Measurements of the last frame.
    #[must_use]
    pub fn last_stats(&self) -> FrameStats {
        self.stats
    }

    /// Draws a frame covering the whole target.
    pub fn draw(&mut self, target: &mut Raster) -> FrameDamage {
        let bounds = target.bounds();
        self.advance_frame(target, bounds)
    }

    /// Draws a frame, touching only pixels inside `clip`.
    ///
    /// Returns the regions that were redrawn. On a frame with no changes
    /// this is empty and no pixels are written.
    pub fn advance_frame(&mut self, target: &mut Raster, clip: PixelRect) -> FrameDamage {
        let clip = clip.intersect(target.bounds());
        let target_key = (target.id(), target.size());
        if self.last_target != Some(target_key) || self.last_clip != Some(clip) {
            if self.last_target.is_some() {
                tracing::debug!(
                    id = ?target.id(),
                    size = ?target.size(),
                    ?clip,
                    "target or clip changed"
                );
            }
            self.force_full_redraw();
            self.last_target = Some(target_key);
            self.last_clip = Some(clip);
        }
        self.sort_if_needed();

        let mut entries: Vec<(NodeId, FrameEntry)> = Vec::with_capacity(self.order.len());
        for &id in &self.order {
            if let Some(node) = self.slots[id.idx()].node.as_mut() {
                entries.push((id, node.prepare()));
            }
        }

        let start = self.clock.now();
        let full_redraw = !self.incremental;
        let mut dirty = DamageList::new(clip);
        if full_redraw {
            dirty.add_all();
        } else {
            dirty.extend(self.vacated.iter().copied());
            for (id, entry) in &entries {
                self.collect_damage(*id, entry, &mut dirty);
            }
        }
        self.vacated.clear();

        let background = self.background.as_ref().map(|bg| {
            self.backgrounds.get_or_insert_with(target.size(), || {
                tracing::debug!(size = ?target.size(), "rendering background");
                bg.render(target.size())
            })
        });
        for rect in dirty.rects() {
            target.fill_rect(*rect, TRANSPARENT);
            if let Some(bg) = &background {
                target.copy_from(bg, *rect, rect.x(), rect.y());
            }
        }

        let mut blits = 0;
        for (id, entry) in &entries {
            let Some(node) = self.slots[id.idx()].node.as_mut() else {
                continue;
            };
            if entry.visible
                && let Some(image) = node.image()
            {
                blits += draw_node(target, image, entry.occupied, dirty.rects());
            }
            node.finish_frame();
        }

        self.previous.clear();
        self.previous.extend(entries.iter().map(|(id, entry)| {
            (
                *id,
                Snapshot {
                    rect: entry.occupied,
                    visible: entry.visible,
                },
            )
        }));

        let elapsed = self.clock.now().saturating_sub(start);
        let incremental = self
            .config
            .incremental_budget()
            .is_none_or(|budget| elapsed < budget);
        if incremental != self.incremental {
            tracing::debug!(?elapsed, incremental, "incremental drawing toggled");
        }
        self.incremental = incremental;

        self.stats = FrameStats {
            full_redraw,
            dirty_rects: dirty.len(),
            dirty_area: dirty.area(),
            blits,
            elapsed,
        };
        tracing::trace!(stats = ?self.stats, "frame drawn");

        FrameDamage {
            dirty_rects: dirty.into_rects(),
            full_redraw,
        }
    }

    fn collect_damage(&self, id: NodeId, entry: &FrameEntry, dirty: &mut DamageList) {
        let previous = self.previous.get(&id);
        let moved = previous.is_some_and(|prev| prev.rect != entry.occupied);
        if !entry.level.is_dirty() && !moved {
            return;
        }
        if let Some(prev) = previous {
            // A node shown again after being hidden has nothing to clear.
            if !entry.visible || (prev.visible && moved) {
                dirty.add(prev.rect);
            }
        }
        if !entry.visible {
            return;
        }
        let regions = self.slots[id.idx()]
            .node
            .as_ref()
            .and_then(RenderNode::pending_regions);
        match regions {
            Some(regions) if !moved && previous.is_some() => {
                let (x, y) = entry.occupied.origin();
                dirty.extend(regions.iter().map(|r| r.translate(x, y)));
            }
            _ => {
                dirty.add(entry.occupied);
            }
        }
    }

    fn sort_if_needed(&mut self) {
        let mut stale = self.order_stale;
        for slot in &mut self.slots {
            if let Some(node) = slot.node.as_mut() {
                stale |= node.take_layer_changed();
            }
        }
        if !stale {
            return;
        }
        let slots = &self.slots;
        let key = |id: &NodeId| {
            let slot = &slots[id.idx()];
            (slot.node.as_ref().map_or(0.0, RenderNode::layer), slot.seq)
        };
        self.order.sort_by(|a, b| {
            let (la, sa) = key(a);
            let (lb, sb) = key(b);
            la.total_cmp(&lb).then(sa.cmp(&sb))
        });
        self.order_stale = false;
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Blends the parts of `image` placed at `occupied` that fall inside `dirty`.
fn draw_node(target: &mut Raster, image: &Raster, occupied: PixelRect, dirty: &[PixelRect]) -> usize {
    let mut blits = 0;
    for rect in dirty {
        let part = occupied.intersect(*rect);
        if part.is_empty() {
            continue;
        }
        let src = part.translate(-occupied.x(), -occupied.y());
        target.blend_from(image, src, part.x(), part.y());
        blits += 1;
    }
    blits
}
