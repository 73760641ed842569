// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node declarations and per-backend definitions.
//!
//! A declaration describes a node's sockets and its declared (possibly
//! polymorphic) type per output. A definition binds one output of one
//! declaration to a backend's instance-producing closure. Several
//! definitions for the same socket and backend are overload candidates;
//! all of them are kept.

use crate::closure::{Closure, Primitive};
use crate::object::Object;
use crate::types::Type;
use crate::unify::specializable;
use lumen_graph::Node;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Produces a fresh object on demand
pub type ObjectFactory = Arc<dyn Fn() -> Object + Send + Sync>;

/// Identity of a node definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub Uuid);

impl DefinitionId {
    /// Mint a new definition id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DefinitionId {
    fn default() -> Self {
        Self::new()
    }
}

/// An input socket of a declaration
#[derive(Clone)]
pub struct InputSocket {
    /// Socket name
    pub name: String,
    /// Provider used when the socket is left unconnected
    pub default: Option<ObjectFactory>,
}

impl fmt::Debug for InputSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSocket")
            .field("name", &self.name)
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// An output socket of a declaration
#[derive(Debug, Clone)]
pub struct OutputSocket {
    /// Socket name
    pub name: String,
    /// Declared type, curried over every input in order
    pub ty: Type,
}

/// Immutable description of a node kind
#[derive(Debug, Clone)]
pub struct NodeDeclaration {
    name: String,
    description: String,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
}

impl NodeDeclaration {
    /// Start a declaration with a qualified name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add a required input
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(InputSocket {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Add an optional input with a default provider
    pub fn input_or<F>(mut self, name: impl Into<String>, default: F) -> Self
    where
        F: Fn() -> Object + Send + Sync + 'static,
    {
        self.inputs.push(InputSocket {
            name: name.into(),
            default: Some(Arc::new(default)),
        });
        self
    }

    /// Add an output with its declared type
    pub fn output(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.outputs.push(OutputSocket { name: name.into(), ty });
        self
    }

    /// Set the description
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable description
    pub fn about(&self) -> &str {
        &self.description
    }

    /// Input sockets in order
    pub fn inputs(&self) -> &[InputSocket] {
        &self.inputs
    }

    /// Output sockets in order
    pub fn outputs(&self) -> &[OutputSocket] {
        &self.outputs
    }

    /// Input socket by name
    pub fn input_named(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Output socket by name
    pub fn output_named(&self, name: &str) -> Option<&OutputSocket> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Evaluate the default provider of an input
    pub fn default_for(&self, input: &str) -> Option<Object> {
        self.input_named(input)?.default.as_ref().map(|f| f())
    }
}

/// Backend-specific binding of a declaration output
#[derive(Clone)]
pub struct NodeDefinition {
    id: DefinitionId,
    declaration: String,
    output: String,
    backend: String,
    ty: Type,
    factory: ObjectFactory,
}

impl NodeDefinition {
    /// Bind a declaration output to an instance factory
    pub fn new<F>(
        declaration: impl Into<String>,
        output: impl Into<String>,
        backend: impl Into<String>,
        ty: Type,
        factory: F,
    ) -> Self
    where
        F: Fn() -> Object + Send + Sync + 'static,
    {
        Self {
            id: DefinitionId::new(),
            declaration: declaration.into(),
            output: output.into(),
            backend: backend.into(),
            ty,
            factory: Arc::new(factory),
        }
    }

    /// Bind a declaration output to a primitive; the type is the primitive's
    pub fn primitive<P>(
        declaration: impl Into<String>,
        output: impl Into<String>,
        backend: impl Into<String>,
        primitive: P,
    ) -> Self
    where
        P: Primitive + Clone + 'static,
    {
        let ty = primitive.ty();
        Self::new(declaration, output, backend, ty, move || {
            Object::closure(Closure::new(Arc::new(primitive.clone())))
        })
    }

    /// Definition id
    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// Qualified name of the declaration
    pub fn declaration(&self) -> &str {
        &self.declaration
    }

    /// Output socket name
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Backend name
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Type of the instances
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Produce a new instance
    pub fn instance(&self) -> Object {
        (self.factory)()
    }
}

impl fmt::Debug for NodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDefinition")
            .field("id", &self.id)
            .field("declaration", &self.declaration)
            .field("output", &self.output)
            .field("backend", &self.backend)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Error when registering declarations or definitions
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// A declaration with this name exists
    #[error("Node {0} is already declared")]
    DuplicateDeclaration(String),

    /// No declaration with this name
    #[error("Node {0} is not declared")]
    UnknownDeclaration(String),

    /// The declaration has no such output
    #[error("Node {node} has no output socket {output}")]
    UnknownOutput {
        /// Qualified node name
        node: String,
        /// Output socket name
        output: String,
    },

    /// A definition type that is not an instance of the declared type
    #[error("Definition of {node}.{output} has type {found}, which does not specialize {declared}")]
    IncompatibleDefinition {
        /// Qualified node name
        node: String,
        /// Output socket name
        output: String,
        /// Declared type
        declared: Type,
        /// Definition type
        found: Type,
    },
}

/// Registry of declarations and their definitions
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    declarations: BTreeMap<String, NodeDeclaration>,
    definitions: BTreeMap<String, Vec<NodeDefinition>>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration
    pub fn declare(&mut self, declaration: NodeDeclaration) -> Result<(), CatalogError> {
        if self.declarations.contains_key(declaration.name()) {
            return Err(CatalogError::DuplicateDeclaration(declaration.name.clone()));
        }
        self.declarations.insert(declaration.name.clone(), declaration);
        Ok(())
    }

    /// Register a definition. Definitions sharing a socket and backend are
    /// retained side by side as overload candidates.
    pub fn define(&mut self, definition: NodeDefinition) -> Result<DefinitionId, CatalogError> {
        let declaration = self
            .declarations
            .get(&definition.declaration)
            .ok_or_else(|| CatalogError::UnknownDeclaration(definition.declaration.clone()))?;
        let output = declaration.output_named(&definition.output).ok_or_else(|| {
            CatalogError::UnknownOutput {
                node: definition.declaration.clone(),
                output: definition.output.clone(),
            }
        })?;
        if !specializable(&output.ty, &definition.ty) {
            return Err(CatalogError::IncompatibleDefinition {
                node: definition.declaration.clone(),
                output: definition.output.clone(),
                declared: output.ty.clone(),
                found: definition.ty.clone(),
            });
        }

        let id = definition.id;
        self.definitions
            .entry(definition.declaration.clone())
            .or_default()
            .push(definition);
        Ok(id)
    }

    /// Look up a declaration
    pub fn declaration(&self, name: &str) -> Option<&NodeDeclaration> {
        self.declarations.get(name)
    }

    /// Declarations in name order
    pub fn declarations(&self) -> impl Iterator<Item = &NodeDeclaration> {
        self.declarations.values()
    }

    /// Every definition of a declaration, across outputs and backends
    pub fn definitions(&self, name: &str) -> &[NodeDefinition] {
        self.definitions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Candidates for one output socket on one backend
    pub fn definitions_for<'a>(
        &'a self,
        name: &str,
        output: &'a str,
        backend: &'a str,
    ) -> impl Iterator<Item = &'a NodeDefinition> + 'a {
        self.definitions(name)
            .iter()
            .filter(move |d| d.output == output && d.backend == backend)
    }

    /// Remove a declaration together with its definitions
    pub fn remove_declaration(&mut self, name: &str) -> Option<NodeDeclaration> {
        self.definitions.remove(name);
        self.declarations.remove(name)
    }

    /// Number of declarations
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Build a graph node whose sockets mirror a declaration
    pub fn create_node(&self, name: &str) -> Result<Node, CatalogError> {
        let declaration = self
            .declaration(name)
            .ok_or_else(|| CatalogError::UnknownDeclaration(name.to_string()))?;
        Ok(Node::new(
            name,
            declaration.inputs.iter().map(|i| i.name.clone()),
            declaration.outputs.iter().map(|o| o.name.clone()),
        ))
    }
}
