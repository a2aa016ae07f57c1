// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame clocks used to measure how long incremental drawing takes.

use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// The compositor reads it twice per frame, around the dirty-computation,
/// clear and draw steps, and compares the difference against
/// [`CompositorConfig::incremental_budget`](crate::CompositorConfig::incremental_budget).
pub trait FrameClock: Debug {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time from [`Instant`].
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A deterministic clock driven by the caller.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to a compositor. With a non-zero [`step`](Self::set_step), every
/// read advances the clock, which makes each measured interval exactly one
/// step long.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    step: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Creates a clock at zero that only moves when told to.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that advances by `step` on every read.
    #[must_use]
    pub fn with_step(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_step(step);
        clock
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Sets the amount added on every read.
    pub fn set_step(&self, step: Duration) {
        self.step.set(step);
    }

    /// Current time, without advancing.
    #[must_use]
    pub fn peek(&self) -> Duration {
        self.now.get()
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> Duration {
        let t = self.now.get();
        self.now.set(t + self.step.get());
        t
    }
}
