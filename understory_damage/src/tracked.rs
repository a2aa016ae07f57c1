// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-tracking rectangles.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::fmt;

use crate::rect::{PixelRect, PixelSize};

/// Receives a notification whenever a [`TrackedRect`] it is registered
/// with changes value.
///
/// Notification means "any rectangle you cached from this tracker is now
/// stale". It is delivered before the tracker stores the new value, so an
/// observer that was notified can rely on the change having happened by the
/// time anyone reads the tracker again.
///
/// Observers are shared (`Rc`) and usually record the change in a `Cell`.
pub trait RectObserver {
    /// Called once per effective change of the tracked rectangle.
    fn rect_changed(&self);
}

/// A [`PixelRect`] that notifies registered observers when it changes.
///
/// Every mutation goes through [`set`](Self::set): the helper methods
/// ([`set_origin`](Self::set_origin), [`translate`](Self::translate),
/// [`set_size`](Self::set_size), [`update`](Self::update)) compute the new
/// value and delegate. A mutation that leaves the rectangle field-wise equal
/// to its old value notifies nobody.
///
/// Observers are held weakly. Dropping an observer unregisters it; dead
/// entries are pruned on the next notification.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_damage::{PixelRect, RectObserver, TrackedRect};
///
/// #[derive(Default)]
/// struct Counter(Cell<u32>);
///
/// impl RectObserver for Counter {
///     fn rect_changed(&self) {
///         self.0.set(self.0.get() + 1);
///     }
/// }
///
/// let counter = Rc::new(Counter::default());
/// let mut rect = TrackedRect::new(PixelRect::new(0, 0, 10, 10));
/// rect.register(&counter);
///
/// rect.translate(5, 0);
/// rect.set_origin(5, 0); // no change, no notification
/// assert_eq!(counter.0.get(), 1);
/// ```
pub struct TrackedRect {
    rect: PixelRect,
    observers: Vec<Weak<dyn RectObserver>>,
}

impl TrackedRect {
    /// Creates a tracker with no observers.
    #[must_use]
    pub fn new(rect: PixelRect) -> Self {
        Self {
            rect,
            observers: Vec::new(),
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> PixelRect {
        self.rect
    }

    /// Replaces the rectangle.
    ///
    /// If `rect` differs from the current value, every live observer is
    /// notified exactly once before the new value is stored. Returns `true`
    /// if the value changed.
    pub fn set(&mut self, rect: PixelRect) -> bool {
        if rect == self.rect {
            return false;
        }
        self.notify();
        self.rect = rect;
        true
    }

    /// Moves the rectangle to a new origin, keeping its size.
    pub fn set_origin(&mut self, x: i32, y: i32) -> bool {
        self.set(self.rect.with_origin(x, y))
    }

    /// Moves the rectangle by `(dx, dy)`.
    pub fn translate(&mut self, dx: i32, dy: i32) -> bool {
        self.set(self.rect.translate(dx, dy))
    }

    /// Resizes the rectangle, keeping its origin.
    pub fn set_size(&mut self, size: PixelSize) -> bool {
        self.set(self.rect.with_size(size))
    }

    /// Applies `f` to the current value and stores the result.
    pub fn update(&mut self, f: impl FnOnce(PixelRect) -> PixelRect) -> bool {
        self.set(f(self.rect))
    }

    /// Registers an observer.
    ///
    /// Registering the same observer twice has no further effect.
    pub fn register<O: RectObserver + 'static>(&mut self, observer: &Rc<O>) {
        let weak = Rc::downgrade(observer) as Weak<dyn RectObserver>;
        if !self.observers.iter().any(|w| Weak::ptr_eq(w, &weak)) {
            self.observers.push(weak);
        }
    }

    /// Removes an observer. Returns `true` if it was registered.
    pub fn unregister<O: RectObserver + 'static>(&mut self, observer: &Rc<O>) -> bool {
        let weak = Rc::downgrade(observer) as Weak<dyn RectObserver>;
        let before = self.observers.len();
        self.observers.retain(|w| !Weak::ptr_eq(w, &weak));
        self.observers.len() != before
    }

    /// Number of observers that are still alive.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Notifies every live observer, pruning dead ones.
    ///
    /// [`set`](Self::set) calls this on change; call it directly to force a
    /// notification without changing the value.
    pub fn notify(&mut self) {
        self.observers.retain(|weak| match weak.upgrade() {
            Some(observer) => {
                observer.rect_changed();
                true
            }
            None => false,
        });
    }
}

impl Default for TrackedRect {
    fn default() -> Self {
        Self::new(PixelRect::ZERO)
    }
}

impl From<PixelRect> for TrackedRect {
    fn from(rect: PixelRect) -> Self {
        Self::new(rect)
    }
}

impl PartialEq<PixelRect> for TrackedRect {
    fn eq(&self, other: &PixelRect) -> bool {
        self.rect == *other
    }
}

impl fmt::Debug for TrackedRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedRect")
            .field("rect", &self.rect)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct Counter(Cell<u32>);

    impl RectObserver for Counter {
        fn rect_changed(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn notifies_only_on_change() {
        let counter = Rc::new(Counter::default());
        let mut rect = TrackedRect::new(PixelRect::new(0, 0, 4, 4));
        rect.register(&counter);

        assert!(!rect.set(PixelRect::new(0, 0, 4, 4)));
        assert_eq!(counter.0.get(), 0);

        assert!(rect.set(PixelRect::new(1, 0, 4, 4)));
        assert_eq!(counter.0.get(), 1);
        assert_eq!(rect.get(), PixelRect::new(1, 0, 4, 4));
    }

    #[test]
    fn every_mutation_path_notifies() {
        let counter = Rc::new(Counter::default());
        let mut rect = TrackedRect::default();
        rect.register(&counter);

        rect.set_origin(3, 3);
        rect.translate(1, 1);
        rect.set_size(PixelSize::new(2, 2));
        rect.update(|r| r.with_size(PixelSize::new(5, 5)));
        assert_eq!(counter.0.get(), 4);
        assert_eq!(rect, PixelRect::new(4, 4, 5, 5));
    }

    #[test]
    fn moving_an_empty_rect_is_a_change() {
        let counter = Rc::new(Counter::default());
        let mut rect = TrackedRect::new(PixelRect::new(0, 0, 0, 0));
        rect.register(&counter);
        rect.set_origin(10, 10);
        assert_eq!(counter.0.get(), 1);
    }

    #[test]
    fn registration_is_idempotent() {
        let counter = Rc::new(Counter::default());
        let mut rect = TrackedRect::default();
        rect.register(&counter);
        rect.register(&counter);
        assert_eq!(rect.observer_count(), 1);

        rect.translate(1, 0);
        assert_eq!(counter.0.get(), 1);
    }

    #[test]
    fn every_observer_is_notified_once() {
        let a = Rc::new(Counter::default());
        let b = Rc::new(Counter::default());
        let mut rect = TrackedRect::default();
        rect.register(&a);
        rect.register(&b);
        rect.translate(0, 1);
        assert_eq!((a.0.get(), b.0.get()), (1, 1));
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let a = Rc::new(Counter::default());
        let mut rect = TrackedRect::default();
        rect.register(&a);
        drop(a);
        assert_eq!(rect.observer_count(), 0);
        rect.translate(1, 1);
        assert_eq!(rect.observers.len(), 0);
    }

    #[test]
    fn unregister() {
        let a = Rc::new(Counter::default());
        let mut rect = TrackedRect::default();
        rect.register(&a);
        assert!(rect.unregister(&a));
        assert!(!rect.unregister(&a));
        rect.translate(1, 1);
        assert_eq!(a.0.get(), 0);
    }
}
