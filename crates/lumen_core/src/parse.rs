// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph-to-term translation.
//!
//! Walks backward from the output socket. Each reached output socket
//! becomes its definition's instance applied to the node's inputs in
//! declaration order. An input takes, in order of preference: the term of
//! the connected output, the socket's own default value in the graph, or
//! the declaration's default provider. Problems are recorded as
//! diagnostics and the walk continues so one pass reports as much as it
//! can: a socket that cannot be translated becomes a hole, an exception
//! value that type checks as a fresh variable, so sema still analyzes the
//! rest of the term.

use crate::cache::SocketInstanceCache;
use crate::catalog::{Catalog, NodeDeclaration, NodeDefinition};
use crate::diagnostic::{CompileError, Diagnostic, Diagnostics};
use crate::location::{Location, LocationMap};
use crate::object::Object;
use crate::overload::{Candidate, ClassEnv};
use crate::term::Term;
use lumen_graph::{Graph, Node, NodeId, Port, PortId, PortValue};
use std::collections::{HashMap, HashSet};

/// Result of translating a graph
#[derive(Debug)]
pub struct ParseOutput {
    /// Root term, with holes where translation failed
    pub term: Term,
    /// Number of holes in the term
    pub holes: usize,
    /// Overload classes introduced for ambiguous sockets
    pub classes: ClassEnv,
    /// Origin of every translated term
    pub locations: LocationMap,
}

/// Translate the graph reachable from `output` into a term
pub fn parse(
    graph: &Graph,
    output: PortId,
    catalog: &Catalog,
    backend: &str,
    cache: Option<&SocketInstanceCache>,
    diagnostics: &mut Diagnostics,
) -> ParseOutput {
    let mut translator = Translator {
        graph,
        catalog,
        backend,
        cache,
        diagnostics,
        classes: ClassEnv::new(),
        locations: LocationMap::new(),
        memo: HashMap::new(),
        visiting: HashSet::new(),
        holes: 0,
    };
    let term = translator.output(output);
    tracing::debug!(
        translated = translator.memo.len(),
        overloads = translator.classes.len(),
        holes = translator.holes,
        "Parsed graph"
    );
    ParseOutput {
        term,
        holes: translator.holes,
        classes: translator.classes,
        locations: translator.locations,
    }
}

/// Object for a socket default stored in the graph
pub fn port_value_object(value: &PortValue) -> Object {
    match value {
        PortValue::Bool(v) => Object::bool(*v),
        PortValue::Int(v) => Object::int(*v),
        PortValue::Float(v) => Object::float(*v),
        PortValue::String(v) => Object::string(v.clone()),
        PortValue::Curve(v) => Object::curve(v.clone()),
    }
}

struct Translator<'a> {
    graph: &'a Graph,
    catalog: &'a Catalog,
    backend: &'a str,
    cache: Option<&'a SocketInstanceCache>,
    diagnostics: &'a mut Diagnostics,
    classes: ClassEnv,
    locations: LocationMap,
    /// Finished output sockets, shared by every consumer
    memo: HashMap<PortId, Term>,
    /// Nodes on the current walk
    visiting: HashSet<NodeId>,
    holes: usize,
}

impl Translator<'_> {
    fn report(&mut self, error: CompileError, location: Option<Location>) {
        self.diagnostics
            .push(Diagnostic::new(error).at(self.graph, location));
    }

    /// Report an error and stand a hole in for the untranslatable socket
    fn hole(&mut self, error: CompileError, location: Option<Location>) -> Term {
        let term = Term::value(Object::exception(error.to_string()));
        if let Some(location) = location {
            self.locations.record_term(&term, location);
        }
        self.report(error, location);
        self.holes += 1;
        term
    }

    fn output(&mut self, socket: PortId) -> Term {
        if let Some(done) = self.memo.get(&socket) {
            return done.clone();
        }
        let graph = self.graph;
        let Some(node) = graph.port_owner(socket) else {
            return self.hole(CompileError::InvalidOutputSocket(socket), None);
        };
        let location = Location { node: node.id, socket };

        if !self.visiting.insert(node.id) {
            return self.hole(
                CompileError::CyclicConnection { node: node.name.clone() },
                Some(location),
            );
        }
        let term = self.translate_node(node, socket, location);
        self.visiting.remove(&node.id);

        self.memo.insert(socket, term.clone());
        term
    }

    fn translate_node(&mut self, node: &Node, socket: PortId, location: Location) -> Term {
        tracing::trace!(node = %node.name, node_type = %node.node_type, "Translating node");
        let catalog = self.catalog;
        let Some(declaration) = catalog.declaration(&node.node_type) else {
            return self.hole(CompileError::UnknownNode(node.node_type.clone()), Some(location));
        };

        for port in node.inputs.iter().filter(|p| declaration.input_named(&p.name).is_none()) {
            self.report(
                CompileError::UnknownSocket {
                    node: node.node_type.clone(),
                    socket: port.name.clone(),
                },
                Some(Location { node: node.id, socket: port.id }),
            );
        }

        let mut term = self.instance(node, socket, declaration, location);
        for input in declaration.inputs() {
            let argument = self.input(node, declaration, &input.name);
            term = Term::apply(term, argument);
            self.locations.record_term(&term, location);
        }
        term
    }

    /// Instance term for an output socket: a direct reference when one
    /// definition matches, an overloaded placeholder when several do
    fn instance(
        &mut self,
        node: &Node,
        socket: PortId,
        declaration: &NodeDeclaration,
        location: Location,
    ) -> Term {
        let Some(port) = node.port(&socket) else {
            return self.hole(CompileError::InvalidOutputSocket(socket), Some(location));
        };
        if declaration.output_named(&port.name).is_none() {
            return self.hole(
                CompileError::UnknownSocket {
                    node: node.node_type.clone(),
                    socket: port.name.clone(),
                },
                Some(location),
            );
        }

        let catalog = self.catalog;
        let definitions: Vec<_> = catalog
            .definitions_for(&node.node_type, &port.name, self.backend)
            .collect();

        let term = match definitions.as_slice() {
            [] => {
                return self.hole(
                    CompileError::NoMatchingDefinition {
                        node: node.node_type.clone(),
                        socket: port.name.clone(),
                        backend: self.backend.to_string(),
                    },
                    Some(location),
                );
            }
            [definition] => Term::value(self.cached(socket, definition)),
            several => {
                let candidates = several
                    .iter()
                    .map(|definition| Candidate {
                        definition: definition.id(),
                        instance: self.cached(socket, definition),
                        ty: definition.ty().clone(),
                    })
                    .collect();
                let (class, ty) =
                    self.classes
                        .register(node.id, socket, node.node_type.clone(), candidates);
                tracing::trace!(node = %node.name, candidates = several.len(), "Overloaded socket");
                Term::overloaded(class, ty)
            }
        };
        self.locations.record_term(&term, location);
        term
    }

    fn cached(&self, socket: PortId, definition: &NodeDefinition) -> Object {
        match self.cache {
            Some(cache) => cache.get_or_insert_with(socket, definition.id(), || definition.instance()),
            None => definition.instance(),
        }
    }

    fn input(&mut self, node: &Node, declaration: &NodeDeclaration, name: &str) -> Term {
        let port: Option<&Port> = node.input_named(name);

        if let Some(port) = port {
            if let Some(source) = self.graph.source_of(port.id) {
                return self.output(source);
            }
            if let Some(value) = &port.default_value {
                let term = Term::value(port_value_object(value));
                self.locations
                    .record_term(&term, Location { node: node.id, socket: port.id });
                return term;
            }
        }

        if let Some(object) = declaration.default_for(name) {
            let term = Term::value(object);
            if let Some(port) = port {
                self.locations
                    .record_term(&term, Location { node: node.id, socket: port.id });
            }
            return term;
        }

        self.hole(
            CompileError::MissingInput {
                node: node.name.clone(),
                socket: name.to_string(),
            },
            port.map(|p| Location { node: node.id, socket: p.id }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::std_catalog;
    use crate::eval::{Demand, Machine};

    #[test]
    fn test_single_definition_becomes_direct_reference() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let node = catalog.create_node("Std.Num.Int").unwrap().with_default("value", PortValue::Int(9));
        let out = node.outputs[0].id;
        graph.add_node(node);

        let mut diagnostics = Diagnostics::new();
        let parsed = parse(&graph, out, &catalog, "cpu", None, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert!(parsed.classes.is_empty());
        assert_eq!(parsed.holes, 0);
        let term = parsed.term;
        assert!(!term.has_placeholders());
        let value = Machine::new(Demand::default()).eval(&term).unwrap();
        assert_eq!(value, Object::int(9));
    }

    #[test]
    fn test_several_definitions_become_placeholder() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let add = catalog.create_node("Std.Num.Add").unwrap();
        let a = catalog.create_node("Std.Num.Int").unwrap();
        let b = catalog.create_node("Std.Num.Int").unwrap();
        let (add_id, a_id, b_id) = (add.id, a.id, b.id);
        let (add_a, add_b, out) = (add.inputs[0].id, add.inputs[1].id, add.outputs[0].id);
        let (a_out, b_out) = (a.outputs[0].id, b.outputs[0].id);
        graph.add_node(add);
        graph.add_node(a);
        graph.add_node(b);
        graph.connect(a_id, a_out, add_id, add_a).unwrap();
        graph.connect(b_id, b_out, add_id, add_b).unwrap();

        let mut diagnostics = Diagnostics::new();
        let parsed = parse(&graph, out, &catalog, "cpu", None, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(parsed.classes.len(), 1);
        assert!(parsed.term.has_placeholders());
    }

    #[test]
    fn test_missing_inputs_are_all_reported() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let over = catalog.create_node("Std.Image.Over").unwrap();
        let out = over.outputs[0].id;
        let background = over.inputs[1].id;
        let over_id = over.id;
        graph.add_node(over);

        let mut diagnostics = Diagnostics::new();
        let parsed = parse(&graph, out, &catalog, "cpu", None, &mut diagnostics);
        assert_eq!(parsed.holes, 2);
        assert_eq!(diagnostics.len(), 2);
        let last = diagnostics.iter().last().unwrap();
        assert_eq!(last.node, Some(over_id));
        assert_eq!(last.socket, Some(background));
        assert_eq!(
            last.error,
            CompileError::MissingInput {
                node: "Over".into(),
                socket: "background".into()
            }
        );
    }

    #[test]
    fn test_unknown_backend_has_no_definition() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let node = catalog.create_node("Std.Transform.Identity").unwrap();
        let out = node.outputs[0].id;
        graph.add_node(node);

        let mut diagnostics = Diagnostics::new();
        let parsed = parse(&graph, out, &catalog, "gpu", None, &mut diagnostics);
        assert!(parsed.term.as_value().is_some_and(Object::is_exception));
        assert_eq!(parsed.holes, 1);
        assert!(diagnostics.any(|e| matches!(e, CompileError::NoMatchingDefinition { .. })));
    }

    #[test]
    fn test_shared_output_is_translated_once() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let solid = catalog.create_node("Std.Image.Solid").unwrap();
        let over = catalog.create_node("Std.Image.Over").unwrap();
        let (solid_id, solid_out) = (solid.id, solid.outputs[0].id);
        let (over_id, fg, bg, out) = (over.id, over.inputs[0].id, over.inputs[1].id, over.outputs[0].id);
        graph.add_node(solid);
        graph.add_node(over);
        graph.connect(solid_id, solid_out, over_id, fg).unwrap();
        graph.connect(solid_id, solid_out, over_id, bg).unwrap();

        let cache = SocketInstanceCache::new();
        let mut diagnostics = Diagnostics::new();
        let parsed = parse(&graph, out, &catalog, "cpu", Some(&cache), &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(parsed.holes, 0);
        assert_eq!(cache.len(), 2);
    }
}
