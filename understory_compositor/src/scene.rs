// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keeping a compositor in sync with an external list of entities.

use std::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::compositor::Compositor;
use crate::node::{NodeId, RenderNode};

/// Maps application entities to compositor nodes across frames.
///
/// Each frame, call [`begin`](Self::begin), then [`node_for`](Self::node_for)
/// once per entity that should be shown, then [`end`](Self::end). Entities
/// not seen since `begin` have their nodes removed, so their areas are
/// cleared on the next frame.
///
/// ```
/// use understory_compositor::{Compositor, RenderNode, SceneBinding};
///
/// let mut compositor = Compositor::new();
/// let mut binding = SceneBinding::new();
///
/// binding.sync(&mut compositor, [1_u32, 2], |key, node| {
///     node.set_position(key as i32 * 10, 0);
/// });
/// assert_eq!(compositor.len(), 2);
///
/// binding.sync(&mut compositor, [2_u32], |_, _| {});
/// assert_eq!(compositor.len(), 1);
/// assert!(binding.get(&1).is_none());
/// ```
#[derive(Debug)]
pub struct SceneBinding<K> {
    nodes: HashMap<K, NodeId>,
    seen: HashSet<K>,
}

impl<K: Clone + Eq + Hash> SceneBinding<K> {
    /// Creates an empty binding.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// Number of bound entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no entities are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node bound to `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    /// Starts a pass over the current entities.
    pub fn begin(&mut self) {
        self.seen.clear();
    }

    /// Returns the node for `key`, inserting one made by `create` if the
    /// entity is new or its node was removed behind the binding's back.
    pub fn node_for(
        &mut self,
        compositor: &mut Compositor,
        key: K,
        create: impl FnOnce() -> RenderNode,
    ) -> NodeId {
        let id = match self.nodes.get(&key) {
            Some(id) if compositor.is_alive(*id) => *id,
            _ => {
                let id = compositor.insert(create());
                self.nodes.insert(key.clone(), id);
                id
            }
        };
        self.seen.insert(key);
        id
    }

    /// Ends the pass, removing the nodes of entities not seen since
    /// [`begin`](Self::begin). Returns how many were removed.
    pub fn end(&mut self, compositor: &mut Compositor) -> usize {
        let seen = &self.seen;
        let mut removed = 0;
        self.nodes.retain(|key, id| {
            if seen.contains(key) {
                return true;
            }
            compositor.remove(*id);
            removed += 1;
            false
        });
        if removed > 0 {
            tracing::trace!(removed, "unbound entities");
        }
        removed
    }

    /// Unbinds one entity and removes its node.
    pub fn remove(&mut self, compositor: &mut Compositor, key: &K) -> Option<RenderNode> {
        self.seen.remove(key);
        self.nodes
            .remove(key)
            .and_then(|id| compositor.remove(id))
    }

    /// Runs a whole pass: every key gets a node, `update` is called once
    /// per key with that node, and nodes of missing keys are removed.
    pub fn sync<I, F>(&mut self, compositor: &mut Compositor, keys: I, mut update: F) -> usize
    where
        I: IntoIterator<Item = K>,
        F: FnMut(K, &mut RenderNode),
    {
        self.begin();
        for key in keys {
            let id = self.node_for(compositor, key.clone(), RenderNode::new);
            update(key, compositor.node_mut(id));
        }
        self.end(compositor)
    }
}

impl<K: Clone + Eq + Hash> Default for SceneBinding<K> {
    fn default() -> Self {
        Self::new()
    }
}
