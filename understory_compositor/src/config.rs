// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

/// Tuning knobs for a [`Compositor`](crate::Compositor).
///
/// ```
/// use std::time::Duration;
/// use understory_compositor::CompositorConfig;
///
/// let config = CompositorConfig::default()
///     .with_incremental_budget(Some(Duration::from_millis(4)))
///     .with_background_cache_capacity(2);
/// assert_eq!(config.incremental_budget(), Some(Duration::from_millis(4)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositorConfig {
    incremental_budget: Option<Duration>,
    background_cache_capacity: usize,
}

impl CompositorConfig {
    /// Default number of rendered backgrounds kept per compositor.
    pub const DEFAULT_BACKGROUND_CACHE_CAPACITY: usize = 4;

    /// Sets the incremental-drawing budget.
    ///
    /// When computing dirty rectangles, clearing and drawing a frame takes
    /// at least this long, the next frame is a full redraw instead: once most
    /// of the frame is dirty anyway, tracking rectangles costs more than it
    /// saves. A full frame that fits in the budget switches back to
    /// incremental mode.
    ///
    /// `None` never gives up on incremental drawing. The right value depends
    /// on resolution, hardware and target frame rate.
    #[must_use]
    pub fn with_incremental_budget(mut self, budget: Option<Duration>) -> Self {
        self.incremental_budget = budget;
        self
    }

    /// Sets how many rendered backgrounds (one per target size) are kept.
    ///
    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_background_cache_capacity(mut self, capacity: usize) -> Self {
        self.background_cache_capacity = capacity.max(1);
        self
    }

    /// The incremental-drawing budget.
    #[must_use]
    pub fn incremental_budget(&self) -> Option<Duration> {
        self.incremental_budget
    }

    /// Capacity of the rendered-background cache.
    #[must_use]
    pub fn background_cache_capacity(&self) -> usize {
        self.background_cache_capacity
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            incremental_budget: None,
            background_cache_capacity: Self::DEFAULT_BACKGROUND_CACHE_CAPACITY,
        }
    }
}
