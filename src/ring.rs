// This file is part of shardring.
//
// Copyright 2026 the shardring developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::{Display, Formatter};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_epoch::{self as epoch, Atomic, Owned};

use crate::{
    state::RingState,
    types::{Crc32Hasher, Hasher, Node, Result, Update, Vnid, DEFAULT_VNODES_PER_NODE},
};

/// The consistent hashing ring data structure.
///
/// Users will probably interact with this crate mostly through this type, as it is central to its
/// API.
///
/// In multi-threaded contexts, it needs to be wrapped in [`Arc`]; lookups proceed concurrently
/// and never block, while membership changes are serialized internally and are atomic with
/// respect to every reader.
///
/// To find out more general information regarding its use, refer to the crate-level
/// documentation.
#[derive(Debug)]
pub struct HashRing<N, H = Crc32Hasher>
where
    N: Node + ?Sized,
    H: Hasher,
{
    inner: Atomic<RingState<N, H>>,
    // Serializes writers only; readers never touch it.
    writers: Mutex<()>,
}

impl<N, H> Clone for HashRing<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    fn clone(&self) -> Self {
        // Pin the current thread.
        let guard = epoch::pin();
        // Atomically load the pointer.
        let inner = self.inner.load(Ordering::Acquire, &guard);
        // Dereference it.
        // SAFETY: Only `HashRing::new()`, `HashRing::insert()` and `HashRing::remove()` ever
        // modify the pointer, and none of them sets it to null.
        let inner = unsafe { inner.as_ref().expect("inner RingState is null!") };
        // Clone the copy of the inner state and wrap it in a new `Atomic` and a new `HashRing`.
        Self {
            inner: Atomic::new(inner.clone()),
            writers: Mutex::new(()),
        }
    }
}

impl<N> HashRing<N, Crc32Hasher>
where
    N: Node + ?Sized,
{
    /// Create a new [`HashRing<N, H>`] with the given number of virtual replicas per distinct
    /// node, initially empty of `Node`s.
    ///
    /// The new [`HashRing<N, H>`] will employ the built-in CRC-32/IEEE [`Hasher`] (see
    /// [`Crc32Hasher`]) for placing virtual replicas and keys on the ring.
    #[inline]
    pub fn new(vnodes_per_node: Vnid) -> Self {
        Self::with_hasher_and_nodes(Crc32Hasher::default(), vnodes_per_node, &[])
    }

    /// Create a new [`HashRing<N, H>`] with the given number of virtual replicas per distinct
    /// node and initialize it with the provided `Node`s (the ring is populated by their virtual
    /// replicas automatically).
    ///
    /// The new [`HashRing<N, H>`] will employ the built-in CRC-32/IEEE [`Hasher`] (see
    /// [`Crc32Hasher`]) for placing virtual replicas and keys on the ring.
    #[inline]
    pub fn with_nodes(vnodes_per_node: Vnid, nodes: &[Arc<N>]) -> Self {
        Self::with_hasher_and_nodes(Crc32Hasher::default(), vnodes_per_node, nodes)
    }
}

impl<N> Default for HashRing<N, Crc32Hasher>
where
    N: Node + ?Sized,
{
    /// An empty ring with [`DEFAULT_VNODES_PER_NODE`] virtual replicas per node and the built-in
    /// CRC-32/IEEE [`Hasher`].
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_VNODES_PER_NODE)
    }
}

impl<N, H> HashRing<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    /// Create a new [`HashRing<N, H>`] with the given number of virtual replicas per distinct
    /// node and initialize it with the provided `Node`s.
    ///
    /// The new [`HashRing<N, H>`] will employ the provided [`Hasher`] for placing the virtual
    /// replicas and keys on the ring.
    ///
    /// A `vnodes_per_node` of `0` is accepted but degenerate: no replicas are ever placed, so
    /// every lookup reports [`RingError::EmptyRing`].
    ///
    ///
    ///  [`RingError::EmptyRing`]: enum.RingError.html#variant.EmptyRing
    pub fn with_hasher_and_nodes(hasher: H, vnodes_per_node: Vnid, nodes: &[Arc<N>]) -> Self {
        let mut inner = RingState::with_capacity(nodes.len(), hasher, vnodes_per_node);
        inner.insert(nodes);
        Self {
            inner: Atomic::new(inner),
            writers: Mutex::new(()),
        }
    }

    /// Create a new [`HashRing<N, H>`] with the given number of virtual replicas per distinct
    /// node, initially empty of `Node`s.
    ///
    /// The new [`HashRing<N, H>`] will employ the provided [`Hasher`] for placing the virtual
    /// replicas and keys on the ring.
    #[inline]
    pub fn with_hasher(hasher: H, vnodes_per_node: Vnid) -> Self {
        Self::with_hasher_and_nodes(hasher, vnodes_per_node, &[])
    }

    /// Returns the number of virtual nodes that currently populate the consistent hashing ring.
    ///
    /// Absent hash collisions this is the number of distinct nodes multiplied by the configured
    /// virtual replicas per node; a collision between two replica keys leaves a single entry for
    /// the colliding position, so the count may be lower.
    pub fn len_virtual_nodes(&self) -> usize {
        let guard = epoch::pin();
        let inner = self.inner.load(Ordering::Acquire, &guard);
        // SAFETY: `self.inner` is not null because after its initialization, it is only ever
        // replaced by `update()`, which never sets it to null. Furthermore, it always uses
        // Acquire/Release orderings.
        unsafe { inner.as_ref().expect("inner RingState is null!") }.len_virtual_nodes()
    }

    /// Returns `true` if no virtual node currently populates the consistent hashing ring.
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        let inner = self.inner.load(Ordering::Acquire, &guard);
        // SAFETY: See `HashRing::len_virtual_nodes`.
        unsafe { inner.as_ref().expect("inner RingState is null!") }.is_empty()
    }

    fn update(&self, op: Update, nodes: &[Arc<N>]) {
        // Serialize writers up front; readers never take this lock. Recover a poisoned lock
        // deliberately: the snapshot behind `inner` is only ever replaced whole, so a writer that
        // panicked cannot have left partially mutated state visible.
        let _writer = self.writers.lock().unwrap_or_else(PoisonError::into_inner);

        // Pin current thread.
        let guard = epoch::pin();

        // Atomically load the pointer and then dereference it to retrieve the pointee, in order
        // to be able to clone it and then update it.
        // This is the READ part of the RCU technique.
        // Using `Ordering::Acquire` we make sure that no reads or writes in the current thread
        // can be reordered before this load. All writes in other threads that release the same
        // atomic variable are visible in the current thread.
        let curr_inner_ptr = self.inner.load(Ordering::Acquire, &guard);
        // SAFETY: `self.inner` is not null because after its initialization, it is always us
        // setting it, and we never set it to null. The `writers` lock guarantees a single thread
        // runs this section at a time.
        let curr_inner = unsafe { curr_inner_ptr.as_ref() }.expect("inner RingState was null!");

        // Clone the current inner RingState. This is the COPY part of the RCU technique.
        // Modify the local copy as deemed necessary (i.e., place the new nodes' replicas on the
        // copy, or delete the provided old ones from it). Neither operation can fail: both are
        // total over the node-identifier space.
        let mut new_inner = curr_inner.clone();
        match op {
            Update::Insert => new_inner.insert(nodes),
            Update::Remove => new_inner.remove(nodes),
        }

        // Atomically overwrite the pointer to the inner state with a pointer to the new, updated
        // one.
        // This is the UPDATE part of the RCU technique.
        // A plain swap suffices (rather than compare-and-swap): the `writers` lock already
        // excludes every other writer, so the pointer cannot have changed since it was loaded
        // above. This is also what makes `insert` and `remove` infallible.
        // Using `Ordering::AcqRel` we make sure that no memory reads or writes in the current
        // thread can be reordered before or after this store, and that the modification is
        // visible in other threads that acquire the same atomic variable.
        let old_inner = self
            .inner
            .swap(Owned::new(new_inner), Ordering::AcqRel, &guard);

        // Defer the destruction of the old inner state until there are no active (i.e.,
        // "pinned") threads in the current global epoch. Destruction must run `Drop::drop()`,
        // since `RingState` holds `Arc<N>` owners that need their reference counts decremented;
        // `Guard::defer_destroy` takes ownership of the pointee and drops it, which does exactly
        // that.
        // SAFETY: `old_inner` was read out of `self.inner` and has just been unlinked by the
        // swap above; no new reader can acquire it, and current readers are protected by the
        // epoch.
        unsafe {
            guard.defer_destroy(old_inner);
        }
        // Flush to make the deferred execution of the destructor run as soon as possible.
        guard.flush();
    }

    /// Add the given [`Node`]s to the consistent hashing ring, placing `vnodes_per_node` virtual
    /// replicas on the ring for each of them.
    ///
    /// This operation is total and idempotent: adding a node that is already in the ring
    /// reproduces the exact same set of ring positions and is therefore a no-op. If a replica of
    /// a new node hashes to a position already occupied by another node's replica, the later
    /// insertion overwrites the earlier owner (see the crate-level documentation on collisions).
    #[inline]
    pub fn insert(&self, nodes: &[Arc<N>]) {
        self.update(Update::Insert, nodes)
    }

    /// Remove the given [`Node`]s from the consistent hashing ring, deleting all of their virtual
    /// replicas.
    ///
    /// This operation is total: removing a node that was never added (or was already removed) is
    /// a no-op. Note that if another node's replica collided with one of the removed positions
    /// and had been overwritten by it, that position is vacated for both nodes; this is the
    /// intended last-writer-wins ring semantics.
    #[inline]
    pub fn remove(&self, nodes: &[Arc<N>]) {
        self.update(Update::Remove, nodes)
    }

    /// Look up which [`Node`] the given `key` is routed to and return it (shared through an
    /// [`Arc`]).
    ///
    /// The key is hashed onto the ring and assigned to the owner of the nearest virtual replica
    /// clockwise, wrapping around past the top of the ring. For a fixed set of nodes, the same
    /// key is always routed to the same node.
    ///
    /// # Errors
    ///
    /// Returns [`RingError::EmptyRing`] if the consistent hashing ring is currently empty of
    /// [`Node`]s and therefore the given `key` cannot be assigned to any of them.
    ///
    ///
    ///  [`RingError::EmptyRing`]: enum.RingError.html#variant.EmptyRing
    pub fn node_for_key<K>(&self, key: &K) -> Result<Arc<N>>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        let guard = epoch::pin();
        let inner = self.inner.load(Ordering::Acquire, &guard);
        // SAFETY: See `HashRing::len_virtual_nodes`.
        let inner = unsafe { inner.as_ref().expect("inner RingState is null!") };
        inner.node_for_key(key.as_ref()).map(Arc::clone)
    }
}

impl<N, H> Extend<Arc<N>> for HashRing<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    /// Extend the [`HashRing<N, H>`] by the [`Node`]s provided through the given [`IntoIterator`]
    /// over `Arc<N>`.
    ///
    /// Note that, due to the restriction of [`Extend::extend`]'s signature, a `&mut HashRing` is
    /// required to use this method; [`HashRing::insert`] works through a shared reference and is
    /// usually preferable.
    fn extend<I: IntoIterator<Item = Arc<N>>>(&mut self, iter: I) {
        let nodes = iter.into_iter().collect::<Vec<_>>();
        self.update(Update::Insert, &nodes);
    }
}

impl<N, H> Display for HashRing<N, H>
where
    N: Node + ?Sized,
    H: Hasher,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let guard = epoch::pin();
        let inner = self.inner.load(Ordering::Acquire, &guard);
        // SAFETY: See `HashRing::len_virtual_nodes`.
        let inner = unsafe { inner.as_ref().expect("inner RingState is null!") };
        write!(f, "{}", inner)
    }
}
