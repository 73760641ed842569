// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile diagnostics.

use crate::location::Location;
use lumen_graph::{Graph, NodeId, PortId};
use std::fmt;

/// A problem found while compiling a graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The designated output is not an output socket of the graph
    #[error("Invalid output socket {0}")]
    InvalidOutputSocket(PortId),

    /// A node names a declaration the catalog does not know
    #[error("Unknown node type {0}")]
    UnknownNode(String),

    /// A graph socket that the declaration does not have
    #[error("Node {node} has no declared socket {socket}")]
    UnknownSocket {
        /// Qualified node name
        node: String,
        /// Socket name
        socket: String,
    },

    /// No definition for a socket on the selected backend
    #[error("No definition of {node}.{socket} for backend {backend}")]
    NoMatchingDefinition {
        /// Qualified node name
        node: String,
        /// Output socket name
        socket: String,
        /// Backend name
        backend: String,
    },

    /// A required input with neither a connection nor a default
    #[error("Missing input {socket} on node {node}")]
    MissingInput {
        /// Node display name
        node: String,
        /// Input socket name
        socket: String,
    },

    /// A connection cycle reached from the output
    #[error("Connection cycle through node {node}")]
    CyclicConnection {
        /// Node display name
        node: String,
    },

    /// Two types that must agree do not unify
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type
        found: String,
    },

    /// No candidate matches the usage of an overloaded socket
    #[error("No valid overloading of {node}.{socket} for {usage}")]
    NoValidOverloading {
        /// Qualified node name
        node: String,
        /// Output socket name
        socket: String,
        /// Type required at the usage site
        usage: String,
    },

    /// Several equally specific candidates match
    #[error("Ambiguous overloading of {node}.{socket} for {usage}: {}", .candidates.join(", "))]
    AmbiguousOverloading {
        /// Qualified node name
        node: String,
        /// Output socket name
        socket: String,
        /// Type required at the usage site
        usage: String,
        /// Types of the matching candidates
        candidates: Vec<String>,
    },

    /// The root type does not unify with the output contract
    #[error("Invalid output type: expected {expected}, found {found}")]
    InvalidOutputType {
        /// Output contract
        expected: String,
        /// Inferred root type
        found: String,
    },
}

/// A compile error with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What went wrong
    pub error: CompileError,
    /// Offending node, when known
    pub node: Option<NodeId>,
    /// Offending socket, when known
    pub socket: Option<PortId>,
    /// `Node.socket`, resolved against the graph
    pub origin: Option<String>,
}

impl Diagnostic {
    /// A diagnostic without provenance
    pub fn new(error: CompileError) -> Self {
        Self {
            error,
            node: None,
            socket: None,
            origin: None,
        }
    }

    /// Attach a location, naming it from the graph
    pub fn at(mut self, graph: &Graph, location: Option<Location>) -> Self {
        if let Some(location) = location {
            self.node = Some(location.node);
            self.socket = Some(location.socket);
            self.origin = Some(location.describe(graph));
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{origin}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Ordered list of diagnostics from one compile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "Compile diagnostic");
        self.entries.push(diagnostic);
    }

    /// Append every diagnostic from another list
    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.entries {
            self.push(diagnostic);
        }
    }

    /// Entries in the order they were found
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry matches a predicate on its error
    pub fn any(&self, f: impl Fn(&CompileError) -> bool) -> bool {
        self.entries.iter().any(|d| f(&d.error))
    }

    /// Consume into a vector
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.entries {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_graph::Node;

    #[test]
    fn test_display_names_node_and_socket() {
        let mut graph = Graph::new("test");
        let node = Node::new("Std.Image.Over", ["foreground", "background"], ["image"]);
        let socket = node.inputs[1].id;
        graph.add_node(node);

        let diagnostic = Diagnostic::new(CompileError::MissingInput {
            node: "Over".into(),
            socket: "background".into(),
        })
        .at(&graph, Location::of_socket(&graph, socket));

        assert_eq!(diagnostic.socket, Some(socket));
        assert_eq!(
            diagnostic.to_string(),
            "Over.background: Missing input background on node Over"
        );
    }

    #[test]
    fn test_list_keeps_order() {
        let mut list = Diagnostics::new();
        list.push(Diagnostic::new(CompileError::UnknownNode("A".into())));
        list.push(Diagnostic::new(CompileError::UnknownNode("B".into())));
        let names: Vec<String> = list.iter().map(|d| d.to_string()).collect();
        assert_eq!(names, ["Unknown node type A", "Unknown node type B"]);
    }
}
