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

use std::borrow::Cow;

use thiserror::Error;

pub(crate) enum Update {
    Insert,
    Remove,
}

/// A type for the index of each virtual replica of a distinct ring node.
///
/// This is merely a type alias for `u16` for now.
/// Therefore, each distinct [`Node`] in the [`HashRing<N, H>`] can be mapped at least once and at
/// most [`u16::MAX`] times on the consistent hashing ring.
///
///
///  [`HashRing<N, H>`]: ../struct.HashRing.html
pub type Vnid = u16;

/// The number of virtual replicas placed on the ring for each distinct node, unless explicitly
/// configured otherwise through one of the constructors of [`HashRing<N, H>`].
///
///
///  [`HashRing<N, H>`]: ../struct.HashRing.html
pub const DEFAULT_VNODES_PER_NODE: Vnid = 20;

/// A custom `Result` type for this crate, combining a return value with a [`RingError`].
pub type Result<T> = std::result::Result<T, RingError>;

/// A trait to be implemented by any type that needs to act as a distinct node in the consistent
/// hashing ring.
pub trait Node {
    /// Returns a byte slice that uniquely identifies the particular [`Node`] from the rest of its
    /// kind.
    fn ring_node_id(&self) -> Cow<'_, [u8]>;
}

impl Node for String {
    #[inline]
    fn ring_node_id(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.as_bytes())
    }
}

impl Node for str {
    #[inline]
    fn ring_node_id(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl Node for Vec<u8> {
    #[inline]
    fn ring_node_id(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.as_slice())
    }
}

impl Node for [u8] {
    #[inline]
    fn ring_node_id(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

/// An error type returned by calls to the API exposed by this crate.
#[derive(Debug, Error)]
pub enum RingError {
    /// The consistent hashing ring is currently empty, so no key can be assigned to any node.
    ///
    /// Callers are expected to recover from this locally, typically by treating it as "no node
    /// available" and failing the inbound request safely.
    #[error("HashRing is empty")]
    EmptyRing,
}

/// A trait to be implemented by any type that needs to act as the hash algorithm placing keys and
/// virtual replicas on the ring.
///
/// Implementations must be deterministic and stable across process restarts: the same input bytes
/// always map to the same ring position. The built-in [`Crc32Hasher`] should cover most uses;
/// injecting a custom implementation is mainly useful for tests that need hand-computable
/// positions.
// NOTE: The `Hasher` must also be `Default` as a means of instantiating it anew. Alternatively,
// maybe there could be an aditional requirement for a `reset()` function on `Hasher`, to allow
// implementations to reset `Hasher`'s internal state without actually instantiating a new struct.
pub trait Hasher: Default {
    /// Given a byte slice, returns its position on the 32-bit ring.
    fn position(&mut self, bytes: &[u8]) -> u32;
}

/// The built-in [`Hasher`], based on the CRC-32/IEEE checksum as implemented in the
/// [crc32fast][crc32fast] crate.
///
///
///  [crc32fast]: https://docs.rs/crc32fast/1/crc32fast/
#[derive(Debug, Default)]
pub struct Crc32Hasher;

impl Hasher for Crc32Hasher {
    #[inline]
    fn position(&mut self, bytes: &[u8]) -> u32 {
        crc32fast::hash(bytes)
    }
}
