// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connections carry data from an output socket into an input socket.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a link between two sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Mint a fresh link identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A link feeding an input socket from an output socket.
///
/// An input socket has at most one link; an output socket may feed any
/// number of inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Link identity
    pub id: ConnectionId,
    /// Node owning the output socket
    pub from_node: NodeId,
    /// Output socket that produces the value
    pub from_port: PortId,
    /// Node owning the input socket
    pub to_node: NodeId,
    /// Input socket that consumes the value
    pub to_port: PortId,
}

impl Connection {
    /// Link an output socket to an input socket
    pub fn new(
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            from_node,
            from_port,
            to_node,
            to_port,
        }
    }

    /// Whether either endpoint belongs to `node_id`
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_involves_both_endpoints() {
        let (from, to, other) = (NodeId::new(), NodeId::new(), NodeId::new());
        let link = Connection::new(from, PortId::new(), to, PortId::new());
        assert!(link.involves_node(from));
        assert!(link.involves_node(to));
        assert!(!link.involves_node(other));
        assert_ne!(link.id, Connection::new(from, link.from_port, to, link.to_port).id);
    }
}
