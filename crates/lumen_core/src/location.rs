// SPDX-License-Identifier: MIT OR Apache-2.0
//! Provenance of terms.

use crate::term::{Term, TermKey};
use lumen_graph::{Graph, NodeId, PortId};
use std::collections::HashMap;

/// A socket in the source graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Owning node
    pub node: NodeId,
    /// Socket on that node
    pub socket: PortId,
}

impl Location {
    /// Location of a socket, looking up its owner in the graph
    pub fn of_socket(graph: &Graph, socket: PortId) -> Option<Self> {
        graph.port_owner(socket).map(|node| Self { node: node.id, socket })
    }

    /// `Node.socket` as shown to the user
    pub fn describe(&self, graph: &Graph) -> String {
        match graph.node(self.node) {
            Some(node) => {
                let socket = node
                    .port(&self.socket)
                    .map(|p| p.name.as_str())
                    .unwrap_or("?");
                format!("{}.{}", node.name, socket)
            }
            None => format!("{}", self.socket),
        }
    }
}

/// Side table from terms to the sockets they came from.
///
/// Terms are keyed by identity, so entries are only meaningful while the
/// recorded terms are alive.
#[derive(Debug, Default)]
pub struct LocationMap {
    terms: HashMap<TermKey, Location>,
}

impl LocationMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where a term came from; the first record wins
    pub fn record_term(&mut self, term: &Term, location: Location) {
        self.terms.entry(term.key()).or_insert(location);
    }

    /// Origin of a term
    pub fn term(&self, term: &Term) -> Option<Location> {
        self.terms.get(&term.key()).copied()
    }

    /// Number of recorded terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
