// SPDX-License-Identifier: MIT OR Apache-2.0
//! Overload classes shared between parse and sema.

use crate::catalog::DefinitionId;
use crate::object::Object;
use crate::types::{Type, ValueType};
use crate::unify::generalize;
use indexmap::IndexMap;
use lumen_graph::{NodeId, PortId};
use std::fmt;
use uuid::Uuid;

/// Identity of an overload class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub Uuid);

impl ClassId {
    /// Mint a new class id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Tag type carried by the class placeholder
    pub fn tag(&self) -> Type {
        Type::value(ValueType::overload_tag(self.0))
    }
}

impl Default for ClassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One competing implementation
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Definition the instance came from
    pub definition: DefinitionId,
    /// Instance object
    pub instance: Object,
    /// Declared type of the definition
    pub ty: Type,
}

/// Candidates for one overloaded socket
#[derive(Debug, Clone)]
pub struct OverloadClass {
    /// Class id
    pub id: ClassId,
    /// Node owning the socket
    pub node: NodeId,
    /// Output socket being resolved
    pub socket: PortId,
    /// Qualified name of the node
    pub name: String,
    /// Candidates, in catalog order
    pub candidates: Vec<Candidate>,
}

/// Environment of overload classes for one compile
#[derive(Debug, Default)]
pub struct ClassEnv {
    classes: IndexMap<ClassId, OverloadClass>,
}

impl ClassEnv {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class and return its id with the placeholder type: the
    /// class tag applied to the generalization of the candidate types
    pub fn register(
        &mut self,
        node: NodeId,
        socket: PortId,
        name: impl Into<String>,
        candidates: Vec<Candidate>,
    ) -> (ClassId, Type) {
        let id = ClassId::new();
        let types: Vec<Type> = candidates.iter().map(|c| c.ty.clone()).collect();
        let body = generalize(&types).unwrap_or_else(Type::fresh_var);
        self.classes.insert(
            id,
            OverloadClass {
                id,
                node,
                socket,
                name: name.into(),
                candidates,
            },
        );
        (id, Type::apply(id.tag(), body))
    }

    /// Look up a class
    pub fn get(&self, id: ClassId) -> Option<&OverloadClass> {
        self.classes.get(&id)
    }

    /// All classes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &OverloadClass> {
        self.classes.values()
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class was registered
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
