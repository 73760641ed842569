// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::connection::{Connection, ConnectionId};
use crate::node::{Node, NodeId};
use crate::port::{Port, PortId, PortValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections.retain(|_, c| !c.involves_node(node_id));
        self.nodes.swap_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Find the node owning a port
    pub fn port_owner(&self, port_id: PortId) -> Option<&Node> {
        self.nodes.values().find(|n| n.port(&port_id).is_some())
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.nodes.values().find_map(|n| n.port(&port_id))
    }

    /// Whether a port exists in the graph
    pub fn contains_port(&self, port_id: PortId) -> bool {
        self.port(port_id).is_some()
    }

    /// Set (or clear) the default value of an input port
    pub fn set_default(&mut self, port_id: PortId, value: Option<PortValue>) -> bool {
        match self.nodes.values_mut().find_map(|n| n.port_mut(&port_id)) {
            Some(port) if port.is_input() => {
                port.default_value = value;
                true
            }
            _ => false,
        }
    }

    /// Add a connection between ports
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Result<ConnectionId, ConnectionError> {
        let source_node = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        let source_port = source_node.port(&from_port)
            .ok_or(ConnectionError::PortNotFound(from_port))?;
        let target_port = target_node.port(&to_port)
            .ok_or(ConnectionError::PortNotFound(to_port))?;

        if !source_port.can_connect(target_port) {
            return Err(ConnectionError::InvalidDirection);
        }

        if !target_port.multi_connect && self.connections_to(to_port).next().is_some() {
            return Err(ConnectionError::PortAlreadyConnected(to_port));
        }

        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        // Data must not flow back into one of its own sources
        if self.depends_on(from_node, to_node) {
            return Err(ConnectionError::Cycle);
        }

        let connection = Connection::new(from_node, from_port, to_node, to_port);
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Connect two ports, looking up their owning nodes
    pub fn connect_ports(&mut self, from_port: PortId, to_port: PortId) -> Result<ConnectionId, ConnectionError> {
        let from_node = self.port_owner(from_port)
            .ok_or(ConnectionError::PortNotFound(from_port))?
            .id;
        let to_node = self.port_owner(to_port)
            .ok_or(ConnectionError::PortNotFound(to_port))?
            .id;
        self.connect(from_node, from_port, to_node, to_port)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.swap_remove(&connection_id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections from a specific port
    pub fn connections_from(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_port == port_id)
    }

    /// Get connections to a specific port
    pub fn connections_to(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to_port == port_id)
    }

    /// Follow the connection into an input port back to its source socket
    pub fn source_of(&self, input: PortId) -> Option<PortId> {
        self.connections_to(input).next().map(|c| c.from_port)
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether `node_id` (transitively) reads from `upstream`
    pub fn depends_on(&self, node_id: NodeId, upstream: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![node_id];

        while let Some(current) = stack.pop() {
            if current == upstream {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                self.connections
                    .values()
                    .filter(|c| c.to_node == current)
                    .map(|c| c.from_node),
            );
        }
        false
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// Connections run from an output to an input
    #[error("Connections must run from an output socket to an input socket")]
    InvalidDirection,

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Connection would close a cycle
    #[error("Connection would create a cycle")]
    Cycle,
}
