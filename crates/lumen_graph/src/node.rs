// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node instances in the graph.

use crate::port::{Port, PortId, PortValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Qualified name of the node declaration, e.g. `Std.Num.Add`
    pub node_type: String,
    /// Display name (can be customized)
    pub name: String,
    /// Input ports, in declaration order
    pub inputs: Vec<Port>,
    /// Output ports, in declaration order
    pub outputs: Vec<Port>,
}

impl Node {
    /// Create a node with one port per socket name
    pub fn new<I, O>(node_type: impl Into<String>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let node_type = node_type.into();
        let name = node_type
            .rsplit('.')
            .next()
            .unwrap_or(node_type.as_str())
            .to_string();
        Self {
            id: NodeId::new(),
            name,
            node_type,
            inputs: inputs.into_iter().map(Port::input).collect(),
            outputs: outputs.into_iter().map(Port::output).collect(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the default value of a named input
    pub fn with_default(mut self, input: &str, value: PortValue) -> Self {
        if let Some(port) = self.inputs.iter_mut().find(|p| p.name == input) {
            port.default_value = Some(value);
        }
        self
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&Port> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&Port> {
        self.outputs.get(index)
    }

    /// Get an input port by socket name
    pub fn input_named(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by socket name
    pub fn output_named(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == *port_id)
            .or_else(|| self.outputs.iter().find(|p| p.id == *port_id))
    }

    /// Get a mutable port by ID
    pub fn port_mut(&mut self, port_id: &PortId) -> Option<&mut Port> {
        self.inputs.iter_mut().chain(self.outputs.iter_mut()).find(|p| p.id == *port_id)
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}
