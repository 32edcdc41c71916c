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

//! A consistent hashing ring for deterministically routing keys to a fixed but changeable set of
//! backend nodes.
//!
//! Each distinct [`Node`] is placed on a circular 32-bit hash space multiple times, through a
//! configurable number of *virtual replicas* (20 by default, to improve load balance). A key is
//! routed to the node owning the nearest replica clockwise of the key's own hash, wrapping
//! around at the top of the ring. As long as the node set is unchanged, every key is routed to
//! the same node; adding or removing a node only moves the keys adjacent to that node's
//! replicas.
//!
//! # Concurrency
//!
//! [`HashRing<N, H>`] is designed for frequent lookups by many concurrent reader threads and
//! infrequent membership changes. Readers never block: they work on an immutable snapshot of the
//! ring published through an atomic pointer (RCU, with [`crossbeam-epoch`][crossbeam-epoch]
//! memory reclamation). Writers are serialized internally and replace the snapshot as a whole,
//! so no reader ever observes a half-applied membership change.
//!
//! In multi-threaded contexts, the ring should be explicitly wrapped in [`Arc`][Arc]. This is
//! deliberate, to expose the hidden cost of atomic reference counting and also give a chance to
//! single-threaded contexts to opt out of it.
//!
//! # Hashing
//!
//! Replicas and keys are placed on the ring by a [`Hasher`]; the built-in [`Crc32Hasher`]
//! computes the CRC-32/IEEE checksum of the raw input bytes. Any deterministic, restart-stable
//! 32-bit hash can be injected instead. Note that two replica keys may collide on a single ring
//! position; the collision is resolved by deterministic overwrite (the last-inserted replica
//! wins) rather than reported as an error.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use shardring::{HashRing, Result};
//!
//! fn main() -> Result<()> {
//!     // An empty ring with the default 20 virtual replicas per node.
//!     let ring = HashRing::default();
//!
//!     // Membership changes go through shared references; no `mut` required.
//!     ring.insert(&[Arc::from("10.0.0.1"), Arc::from("10.0.0.2")]);
//!
//!     // Deterministic routing: the same key maps to the same node.
//!     let owner = ring.node_for_key("user-42")?;
//!     assert!(["10.0.0.1", "10.0.0.2"].contains(&&*owner));
//!     assert_eq!(&*ring.node_for_key("user-42")?, &*owner);
//!
//!     Ok(())
//! }
//! ```
//!
//!
//!  [crossbeam-epoch]: https://docs.rs/crossbeam-epoch/0.9/crossbeam_epoch/
//!  [Arc]: https://doc.rust-lang.org/std/sync/struct.Arc.html

#![deny(missing_docs)]

mod ring;
mod state;
mod types;
mod vnode;

pub use crate::ring::HashRing;
pub use crate::types::{
    Crc32Hasher, Hasher, Node, Result, RingError, Vnid, DEFAULT_VNODES_PER_NODE,
};
