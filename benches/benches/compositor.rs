// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use understory_compositor::{Compositor, NestedView, NodeId, Raster, RenderNode};
use understory_damage::PixelSize;

#[derive(Clone)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u32(&mut self) -> u32 {
        // Numerical Recipes LCG parameters.
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    fn range(&mut self, lo: i32, hi: i32) -> i32 {
        lo + (self.next_u32() % (hi - lo) as u32) as i32
    }
}

fn populate(compositor: &mut Compositor, count: usize, extent: PixelSize, seed: u64) -> Vec<NodeId> {
    let mut rng = Lcg::new(seed);
    let sprite = Arc::new(Raster::filled_with(PixelSize::new(24, 24), [200, 80, 20, 255]));
    (0..count)
        .map(|_| {
            let node = RenderNode::from_image(Arc::clone(&sprite)).with_position(
                rng.range(0, extent.width()),
                rng.range(0, extent.height()),
            );
            compositor.insert(node)
        })
        .collect()
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_compositor/frame");
    group.sample_size(50);
    let size = PixelSize::new(640, 480);

    for &(count, moving) in &[(200_usize, 0_usize), (200, 10), (200, 200)] {
        let mut compositor = Compositor::new();
        let ids = populate(&mut compositor, count, size, 0xC0FF_EE00_0000_0001);
        let mut target = Raster::new(size);
        compositor.draw(&mut target);
        let mut rng = Lcg::new(7);

        group.bench_function(format!("incremental(nodes={count},moving={moving})"), |b| {
            b.iter(|| {
                for id in ids.iter().take(moving) {
                    compositor
                        .node_mut(*id)
                        .translate(rng.range(-2, 3), rng.range(-2, 3));
                }
                black_box(compositor.draw(&mut target).dirty_rects.len())
            });
        });

        group.bench_function(format!("full(nodes={count})"), |b| {
            b.iter(|| {
                compositor.force_full_redraw();
                black_box(compositor.draw(&mut target).full_redraw)
            });
        });
    }

    group.finish();
}

fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_compositor/nested");
    group.sample_size(30);
    let source = PixelSize::new(640, 480);
    let output = PixelSize::new(320, 240);

    let mut view = NestedView::new(source, output);
    let ids = populate(view.compositor_mut(), 100, source, 0xC0FF_EE00_0000_0002);
    view.update();
    let mut rng = Lcg::new(11);

    group.bench_function("partial_rescale(moving=5)", |b| {
        b.iter(|| {
            for id in ids.iter().take(5) {
                view.compositor_mut()
                    .node_mut(*id)
                    .translate(rng.range(-2, 3), rng.range(-2, 3));
            }
            black_box(view.update())
        });
    });

    group.bench_function("full_rescale", |b| {
        b.iter(|| black_box(view.source().scaled(output)));
    });

    group.finish();
}

criterion_group!(benches, bench_frames, bench_nested);
criterion_main!(benches);
