// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured node graph for the Lumen compositor.
//!
//! This crate holds the user-authored graph that the compiler in
//! `lumen_core` turns into an executable term:
//! - Nodes identified by a qualified name (`Std.Image.Solid`)
//! - Named input/output sockets owned by a node
//! - Connections from an output socket to an input socket
//!
//! ## Architecture
//!
//! The graph only records structure and per-socket default values. Types
//! are not stored on sockets; they are inferred when the graph is compiled.

pub mod node;
pub mod port;
pub mod connection;
pub mod graph;

pub use node::{Node, NodeId};
pub use port::{Port, PortId, PortDirection, PortValue};
pub use connection::{Connection, ConnectionId};
pub use graph::{ConnectionError, Graph};
