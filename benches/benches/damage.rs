// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_damage::{DamageList, PixelRect, PixelSize, remap};

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

    fn range(&mut self, upper_exclusive: i32) -> i32 {
        (self.next_u32() % upper_exclusive as u32) as i32
    }
}

/// Small rectangles scattered over a 1920x1080 screen, like moving sprites.
fn scattered(count: usize, max_size: i32, seed: u64) -> Vec<PixelRect> {
    let mut rng = Lcg::new(seed);
    (0..count)
        .map(|_| {
            PixelRect::new(
                rng.range(1920),
                rng.range(1080),
                1 + rng.range(max_size),
                1 + rng.range(max_size),
            )
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_damage/insert");
    let clip = PixelRect::new(0, 0, 1920, 1080);

    for &(count, max_size) in &[(64_usize, 32_i32), (256, 32), (256, 128), (1_024, 16)] {
        let rects = scattered(count, max_size, 0xDA4A_6E00_0000_0001);
        group.bench_function(format!("coalesce(n={count},size<={max_size})"), |b| {
            b.iter_batched(
                || DamageList::new(clip),
                |mut damage| {
                    damage.extend(rects.iter().copied());
                    black_box(damage.len());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_remap(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_damage/remap");
    let source = PixelSize::new(1920, 1080);

    for &(label, dest) in &[
        ("half", PixelSize::new(960, 540)),
        ("two_thirds", PixelSize::new(1280, 720)),
        ("coprime", PixelSize::new(1021, 577)),
    ] {
        let rects = scattered(128, 48, 0xDA4A_6E00_0000_0002);
        group.bench_function(format!("remap({label})"), |b| {
            b.iter(|| black_box(remap(black_box(&rects), source, dest)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_remap);
criterion_main!(benches);
