use std::fmt::{Display, Formatter};
use std::io::Write;
use std::sync::Arc;

use crate::types::{Hasher, Node, Vnid};

/// Appends the replica key for `(node_id, vnid)` to the (cleared) `buf`.
///
/// The replica key is the node identifier followed by the ASCII decimal representation of the
/// replica index. Derivation is shared by the insertion and the removal paths, so both always
/// address the exact same ring positions for a given node.
///
/// Note that this scheme is not injective for node identifiers that collide under concatenation
/// (e.g., the first replica of `"host1"` and an eleventh replica of `"host"` both yield
/// `"host10"`); this is an accepted limitation of the key format, inherited by every caller.
pub(crate) fn write_replica_key(buf: &mut Vec<u8>, node_id: &[u8], vnid: Vnid) {
    buf.clear();
    buf.extend_from_slice(node_id);
    // Writing into a Vec<u8> cannot fail.
    write!(buf, "{}", vnid).expect("infallible write to Vec<u8> failed");
}

/// A single virtual replica of a distinct node, placed on the 32-bit ring.
///
/// Multiple `VirtualNode`s may point to the same distinct [`Node`]; exactly one owner is ever
/// associated with a given ring position.
#[derive(Debug)]
pub(crate) struct VirtualNode<N>
where
    N: Node + ?Sized,
{
    pub(crate) position: u32,
    pub(crate) node: Arc<N>,
    pub(crate) vnid: Vnid,
}

impl<N> VirtualNode<N>
where
    N: Node + ?Sized,
{
    pub(crate) fn new<H: Hasher>(hasher: &mut H, node: Arc<N>, vnid: Vnid) -> Self {
        let node_id = node.ring_node_id();
        let mut key = Vec::with_capacity(node_id.len() + 5);
        write_replica_key(&mut key, &node_id, vnid);
        let position = hasher.position(&key);
        VirtualNode {
            position,
            node,
            vnid,
        }
    }
}

impl<N> Display for VirtualNode<N>
where
    N: Node + ?Sized,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let node = &self.node.ring_node_id();
        let node = String::from_utf8_lossy(&node);
        write!(f, "{:010} ({}-{})", self.position, node, self.vnid)
    }
}
