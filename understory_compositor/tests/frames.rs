// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-level behavior of the compositor: what gets redrawn, and that
//! incremental frames always match a from-scratch render.

use std::sync::Arc;
use std::time::Duration;

use peniko::Color;
use understory_compositor::{
    Background, Compositor, CompositorConfig, DirtyLevel, ManualClock, NodeId, Raster,
    RenderNode, TRANSPARENT, premultiply,
};
use understory_damage::{PixelRect, PixelSize};

const RED: [u8; 4] = [255, 0, 0, 255];

fn tile(w: i32, h: i32, pixel: [u8; 4]) -> Arc<Raster> {
    Arc::new(Raster::filled_with(PixelSize::new(w, h), pixel))
}

fn blue() -> Color {
    Color::from_rgba8(0, 0, 255, 255)
}

#[test]
fn unchanged_frame_writes_nothing() {
    let mut compositor = Compositor::new();
    compositor.set_background(Some(Background::solid(blue())));
    compositor.insert(RenderNode::from_image(tile(16, 16, RED)).with_position(8, 8));
    let mut target = Raster::new(PixelSize::new(64, 64));
    assert!(compositor.draw(&mut target).full_redraw);

    // Scribble outside any node; an empty frame must leave it alone.
    target.set_pixel(0, 0, [1, 2, 3, 4]);
    let damage = compositor.draw(&mut target);
    assert!(damage.is_empty());
    assert!(!damage.full_redraw);
    assert_eq!(damage.union_rect(), None);
    assert_eq!(compositor.last_stats().blits, 0);
    assert_eq!(target.pixel(0, 0), Some([1, 2, 3, 4]));
}

#[test]
fn moving_a_node_redraws_old_and_new_area() {
    let background = premultiply(blue());
    let mut compositor = Compositor::new();
    compositor.set_background(Some(Background::solid(blue())));
    let id = compositor.insert(RenderNode::from_image(tile(32, 32, RED)));
    let mut target = Raster::new(PixelSize::new(128, 128));
    compositor.draw(&mut target);
    assert_eq!(target.pixel(10, 10), Some(RED));

    compositor.node_mut(id).set_position(32, 0);
    let damage = compositor.draw(&mut target);
    assert_eq!(damage.dirty_rects, vec![PixelRect::new(0, 0, 64, 32)]);
    assert_eq!(damage.union_rect(), Some(kurbo::Rect::new(0.0, 0.0, 64.0, 32.0)));
    assert!(target.is_uniform(PixelRect::new(0, 0, 32, 32), background));
    assert!(target.is_uniform(PixelRect::new(32, 0, 32, 32), RED));
    assert!(target.is_uniform(PixelRect::new(0, 32, 128, 96), background));
}

#[test]
fn hidden_nodes_are_cleared_on_two_frames() {
    let mut compositor = Compositor::new();
    let id = compositor.insert(RenderNode::from_image(tile(10, 10, RED)).with_position(5, 5));
    let mut target = Raster::new(PixelSize::new(32, 32));
    compositor.draw(&mut target);
    assert!(compositor.draw(&mut target).is_empty());

    compositor.node_mut(id).set_visible(false);
    let first = compositor.draw(&mut target);
    assert_eq!(first.dirty_rects, vec![PixelRect::new(5, 5, 10, 10)]);
    assert!(target.is_uniform(target.bounds(), TRANSPARENT));
    assert_eq!(compositor.node(id).dirty_level(), DirtyLevel::Changed);

    let second = compositor.draw(&mut target);
    assert_eq!(second.dirty_rects, vec![PixelRect::new(5, 5, 10, 10)]);
    assert_eq!(compositor.node(id).dirty_level(), DirtyLevel::Clean);

    assert!(compositor.draw(&mut target).is_empty());
}

#[test]
fn showing_a_node_only_draws_its_new_area() {
    let mut compositor = Compositor::new();
    let id = compositor.insert(RenderNode::from_image(tile(4, 4, RED)));
    let mut target = Raster::new(PixelSize::new(32, 32));
    compositor.node_mut(id).set_visible(false);
    compositor.draw(&mut target);
    compositor.draw(&mut target);
    compositor.draw(&mut target);

    compositor.node_mut(id).set_position(20, 20);
    compositor.node_mut(id).set_visible(true);
    let damage = compositor.draw(&mut target);
    assert_eq!(damage.dirty_rects, vec![PixelRect::new(20, 20, 4, 4)]);
    assert!(target.is_uniform(PixelRect::new(20, 20, 4, 4), RED));
}

#[test]
fn slow_frames_fall_back_to_full_redraws() {
    let clock = ManualClock::with_step(Duration::from_millis(10));
    let config = CompositorConfig::default().with_incremental_budget(Some(Duration::from_millis(5)));
    let mut compositor = Compositor::with_clock(config, Box::new(clock.clone()));
    compositor.insert(RenderNode::from_image(tile(4, 4, RED)));
    let mut target = Raster::new(PixelSize::new(16, 16));

    assert!(compositor.draw(&mut target).full_redraw);
    assert!(!compositor.is_incremental());
    assert_eq!(compositor.last_stats().elapsed, Duration::from_millis(10));
    assert!(compositor.draw(&mut target).full_redraw);

    clock.set_step(Duration::from_millis(1));
    assert!(compositor.draw(&mut target).full_redraw);
    assert!(compositor.is_incremental());
    let damage = compositor.draw(&mut target);
    assert!(!damage.full_redraw);
    assert!(damage.is_empty());
}

#[test]
fn clip_limits_writes_and_changes_force_full_redraw() {
    let mut compositor = Compositor::new();
    compositor.insert(RenderNode::from_image(tile(16, 16, RED)));
    let mut target = Raster::new(PixelSize::new(16, 16));

    let clip = PixelRect::new(0, 0, 8, 16);
    let damage = compositor.advance_frame(&mut target, clip);
    assert_eq!(damage.dirty_rects, vec![clip]);
    assert!(target.is_uniform(clip, RED));
    assert!(target.is_uniform(PixelRect::new(8, 0, 8, 16), TRANSPARENT));

    assert!(compositor.advance_frame(&mut target, clip).is_empty());
    let damage = compositor.draw(&mut target);
    assert!(damage.full_redraw);
    assert!(target.is_uniform(target.bounds(), RED));

    let mut bigger = Raster::new(PixelSize::new(20, 20));
    assert!(compositor.draw(&mut bigger).full_redraw);
}

#[test]
fn drawing_into_a_new_target_redraws_everything() {
    let mut compositor = Compositor::new();
    compositor.insert(RenderNode::from_image(tile(4, 4, RED)).with_position(2, 2));
    let mut first = Raster::new(PixelSize::new(16, 16));
    compositor.draw(&mut first);
    assert!(compositor.draw(&mut first).is_empty());

    // Same size, fresh pixels: nothing would be redrawn if only sizes counted.
    let mut second = Raster::new(PixelSize::new(16, 16));
    let damage = compositor.draw(&mut second);
    assert!(damage.full_redraw);
    assert_eq!(second.pixel(3, 3), Some(RED));
    assert_eq!(second, first);

    assert!(compositor.draw(&mut second).is_empty());
    // A clone is a distinct buffer too.
    let mut copy = second.clone();
    assert!(compositor.draw(&mut copy).full_redraw);
}

#[test]
fn background_changes_force_full_redraw() {
    let mut compositor = Compositor::new();
    let mut target = Raster::new(PixelSize::new(8, 8));
    compositor.draw(&mut target);
    assert!(compositor.is_incremental());

    compositor.set_background(Some(Background::solid(blue())));
    assert!(compositor.draw(&mut target).full_redraw);
    assert!(target.is_uniform(target.bounds(), premultiply(blue())));
}

struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn range(&mut self, lo: i32, hi: i32) -> i32 {
        lo + (self.next_u32() % (hi - lo) as u32) as i32
    }
}

/// Renders the compositor's current state from scratch.
fn reference(compositor: &mut Compositor, size: PixelSize, background: [u8; 4]) -> Raster {
    let mut out = Raster::filled_with(size, background);
    let ids: Vec<NodeId> = compositor.ids().to_vec();
    for id in ids {
        let node = compositor.node(id);
        if !node.is_visible() {
            continue;
        }
        if let Some(image) = node.image() {
            out.blend_from(image, image.bounds(), node.x(), node.y());
        }
    }
    out
}

#[test]
fn incremental_frames_match_full_renders() {
    let size = PixelSize::new(96, 80);
    let background = Color::from_rgba8(30, 60, 90, 255);
    let mut compositor = Compositor::new();
    compositor.set_background(Some(Background::solid(background)));
    let mut target = Raster::new(size);
    let mut rng = Lcg(0xC0FF_EE00_0000_0007);
    let mut ids: Vec<NodeId> = Vec::new();

    for frame in 0..120 {
        for _ in 0..rng.range(0, 4) {
            match rng.range(0, 7) {
                0 if ids.len() < 12 => {
                    // Half-transparent tiles catch double compositing.
                    let alpha = if rng.range(0, 2) == 0 { 255 } else { 128 };
                    let v = rng.range(0, 128) as u8;
                    let image = tile(rng.range(1, 24), rng.range(1, 24), [v, v / 2, 0, alpha]);
                    let node = RenderNode::from_image(image)
                        .with_position(rng.range(-10, 96), rng.range(-10, 80))
                        .with_layer(f64::from(rng.range(0, 3)));
                    ids.push(compositor.insert(node));
                }
                1 if !ids.is_empty() => {
                    let idx = rng.range(0, ids.len() as i32) as usize;
                    compositor.remove(ids.swap_remove(idx));
                }
                2 | 3 if !ids.is_empty() => {
                    let id = ids[rng.range(0, ids.len() as i32) as usize];
                    compositor
                        .node_mut(id)
                        .translate(rng.range(-6, 7), rng.range(-6, 7));
                }
                4 if !ids.is_empty() => {
                    let id = ids[rng.range(0, ids.len() as i32) as usize];
                    let node = compositor.node_mut(id);
                    let visible = node.is_visible();
                    node.set_visible(!visible);
                }
                5 if !ids.is_empty() => {
                    let id = ids[rng.range(0, ids.len() as i32) as usize];
                    compositor
                        .node_mut(id)
                        .set_layer(f64::from(rng.range(0, 3)));
                }
                6 if !ids.is_empty() => {
                    let id = ids[rng.range(0, ids.len() as i32) as usize];
                    let node = compositor.node_mut(id);
                    let (w, h) = (node.width(), node.height());
                    node.set_image(Some(tile(w.max(1), h.max(1), [0, 90, 40, 255])));
                }
                _ => {}
            }
        }

        compositor.draw(&mut target);
        let expected = reference(&mut compositor, size, premultiply(background));
        assert_eq!(target, expected, "frame {frame} diverged from a full render");
    }
}
