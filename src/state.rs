use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::mem;
use std::sync::Arc;

use log::trace;

use crate::{
    types::{Hasher, Node, Result, RingError, Vnid},
    vnode::{write_replica_key, VirtualNode},
};

/// One immutable snapshot of the ring: the hash-to-owner mapping plus its sorted index.
///
/// Mutation happens on a private clone only (see `HashRing::update`), so by the time a snapshot
/// becomes visible to readers, `sorted` always holds exactly the key set of `circle`, ascending,
/// with no duplicates.
#[derive(Debug)]
pub(crate) struct RingState<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    hasher: H,
    vnodes_per_node: Vnid,
    circle: HashMap<u32, Arc<N>>,
    sorted: Vec<u32>,
}

impl<N, H> Clone for RingState<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    fn clone(&self) -> Self {
        Self {
            hasher: H::default(),
            vnodes_per_node: self.vnodes_per_node,
            circle: self.circle.clone(),
            sorted: self.sorted.clone(),
        }
    }
}

impl<N, H> RingState<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    #[inline]
    pub(crate) fn with_capacity(capacity: usize, hasher: H, vnodes_per_node: Vnid) -> Self {
        let capacity = capacity * vnodes_per_node as usize;
        Self {
            hasher,
            vnodes_per_node,
            circle: HashMap::with_capacity(capacity),
            sorted: Vec::with_capacity(capacity),
        }
    }

    /// Place all virtual replicas of the given nodes on the ring, then rebuild the sorted index.
    ///
    /// Upserts: a replica that hashes to an already occupied position overwrites the previous
    /// owner (so within one node, the replica with the greater index wins, and across calls the
    /// later-inserted node wins). Re-inserting a node reproduces the exact same set of positions,
    /// which makes insertion idempotent.
    pub(crate) fn insert(&mut self, nodes: &[Arc<N>]) {
        for node in nodes {
            for vnid in 0..self.vnodes_per_node {
                let vn = VirtualNode::new(&mut self.hasher, Arc::clone(&node), vnid);
                trace!("placing vnode '{}' on the ring", vn);
                if let Some(prev) = self.circle.insert(vn.position, vn.node) {
                    trace!(
                        "position {} ownership moved away from '{}'",
                        vn.position,
                        String::from_utf8_lossy(&prev.ring_node_id()),
                    );
                }
            }
        }
        self.rebuild_index();
    }

    /// Delete the virtual replicas of the given nodes from the ring, then rebuild the sorted
    /// index.
    ///
    /// Positions are derived exactly as in `insert`, so removal always addresses the same slots
    /// that insertion occupied. Removing a node that is not on the ring is a no-op. If another
    /// node's replica collided with (and was overwritten by) one of the removed positions, that
    /// slot disappears for the other node too; ownership of a position belongs to its last
    /// writer.
    pub(crate) fn remove(&mut self, nodes: &[Arc<N>]) {
        let mut key = Vec::new();
        for node in nodes {
            let node_id = node.ring_node_id();
            for vnid in 0..self.vnodes_per_node {
                write_replica_key(&mut key, &node_id, vnid);
                let position = self.hasher.position(&key);
                if self.circle.remove(&position).is_some() {
                    trace!("position {} vacated", position);
                }
            }
        }
        self.rebuild_index();
    }

    /// Recompute the ascending index from the current mapping.
    ///
    /// The previous allocation is reused, unless its capacity exceeds the current entry count by
    /// more than a factor of `4 * vnodes_per_node`; a ring that shrank a lot would otherwise pin
    /// its high-water memory mark.
    fn rebuild_index(&mut self) {
        let mut index = mem::take(&mut self.sorted);
        index.clear();
        let spread = self.vnodes_per_node.max(1) as usize * 4;
        if index.capacity() / spread > self.circle.len() {
            index = Vec::with_capacity(self.circle.len());
        }
        index.extend(self.circle.keys().copied());
        index.sort_unstable();
        self.sorted = index;
    }

    #[inline]
    pub(crate) fn len_virtual_nodes(&self) -> usize {
        self.circle.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.circle.is_empty()
    }

    /// Walk clockwise from the key's position to the nearest virtual replica and return a
    /// reference to its owner.
    ///
    /// The binary search selects the smallest position *strictly greater* than the key's hash;
    /// past the top of the ring it wraps around to the smallest position present.
    pub(crate) fn node_for_key(&self, key: &[u8]) -> Result<&Arc<N>> {
        if self.circle.is_empty() {
            return Err(RingError::EmptyRing);
        }
        let position = H::default().position(key);
        let index = self.sorted.partition_point(|&p| p <= position);
        let index = if index == self.sorted.len() { 0 } else { index };
        // The sorted index holds exactly the key set of `circle` in every visible snapshot.
        Ok(self
            .circle
            .get(&self.sorted[index])
            .expect("sorted index out of sync with the ring mapping"))
    }
}

impl<N, H> Display for RingState<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "RingState ({} virtual nodes, {} per node) {{",
            self.circle.len(),
            self.vnodes_per_node
        )?;
        for (i, position) in self.sorted.iter().enumerate() {
            let owner = &self.circle[position];
            writeln!(
                f,
                "\t- ({:0>6})  {:010} -> {}",
                i,
                position,
                String::from_utf8_lossy(&owner.ring_node_id())
            )?
        }
        writeln!(f, "}}")
    }
}
