// SPDX-License-Identifier: MIT OR Apache-2.0
//! Executable terms.
//!
//! A term is a value, an application of a function term to one pending
//! argument, or (before sema) an overloaded placeholder. Terms form a
//! graph: subterms are shared by reference, and a fixed point is an apply
//! node whose argument slot points back at the node itself. That back-edge
//! is a [`Weak`] reference, so the cycle never owns itself.

use crate::object::Object;
use crate::overload::ClassId;
use crate::types::Type;
use std::fmt;
use std::sync::{Arc, Weak};

/// Identity of a term, valid while the term is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermKey(usize);

/// Argument slot of an apply node
#[derive(Clone)]
pub enum Argument {
    /// An ordinary argument term
    Term(Term),
    /// Non-owning reference to the enclosing apply node
    Recur(Weak<ApplyNode>),
}

impl Argument {
    /// The argument as a term. `None` when a recursive slot outlived its node.
    pub fn term(&self) -> Option<Term> {
        match self {
            Self::Term(term) => Some(term.clone()),
            Self::Recur(weak) => weak.upgrade().map(Term::Apply),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(term) => term.fmt(f),
            Self::Recur(_) => f.write_str("<self>"),
        }
    }
}

/// A function term applied to one pending argument
#[derive(Debug)]
pub struct ApplyNode {
    function: Term,
    argument: Argument,
}

impl ApplyNode {
    /// Function side
    pub fn function(&self) -> &Term {
        &self.function
    }

    /// Argument side
    pub fn argument(&self) -> &Argument {
        &self.argument
    }

    /// Whether the argument slot refers back to this node
    pub fn is_recursive(&self) -> bool {
        matches!(self.argument, Argument::Recur(_))
    }
}

/// An unresolved overload: one of several candidate instances
#[derive(Debug)]
pub struct Overloaded {
    /// Overload class holding the candidates
    pub class: ClassId,
    /// Placeholder type, the class tag applied to the generalized type
    pub ty: Type,
}

/// A term
#[derive(Clone)]
pub enum Term {
    /// Value (including closures)
    Value(Object),
    /// Application
    Apply(Arc<ApplyNode>),
    /// Placeholder resolved by sema
    Overloaded(Arc<Overloaded>),
}

impl Term {
    /// Value term
    pub fn value(object: Object) -> Self {
        Self::Value(object)
    }

    /// `function argument`
    pub fn apply(function: Term, argument: Term) -> Self {
        Self::Apply(Arc::new(ApplyNode {
            function,
            argument: Argument::Term(argument),
        }))
    }

    /// `function a1 a2 ...`
    pub fn apply_all(function: Term, args: impl IntoIterator<Item = Term>) -> Self {
        args.into_iter().fold(function, Term::apply)
    }

    /// The self-referencing node `x = function x`
    pub fn recursive(function: Term) -> Self {
        Self::Apply(Arc::new_cyclic(|me| ApplyNode {
            function,
            argument: Argument::Recur(me.clone()),
        }))
    }

    /// Overloaded placeholder
    pub fn overloaded(class: ClassId, ty: Type) -> Self {
        Self::Overloaded(Arc::new(Overloaded { class, ty }))
    }

    /// Identity of this term
    pub fn key(&self) -> TermKey {
        match self {
            Self::Value(object) => TermKey(object.address()),
            Self::Apply(node) => TermKey(Arc::as_ptr(node) as *const () as usize),
            Self::Overloaded(o) => TermKey(Arc::as_ptr(o) as *const () as usize),
        }
    }

    /// The value, if this is a value term
    pub fn as_value(&self) -> Option<&Object> {
        match self {
            Self::Value(object) => Some(object),
            _ => None,
        }
    }

    /// Whether two handles are the same term
    pub fn ptr_eq(&self, other: &Term) -> bool {
        self.key() == other.key()
    }

    /// Whether any overloaded placeholder remains
    pub fn has_placeholders(&self) -> bool {
        match self {
            Self::Value(_) => false,
            Self::Overloaded(_) => true,
            Self::Apply(node) => {
                node.function.has_placeholders()
                    || matches!(&node.argument, Argument::Term(t) if t.has_placeholders())
            }
        }
    }
}

impl From<Object> for Term {
    fn from(object: Object) -> Self {
        Self::Value(object)
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(object) => object.fmt(f),
            Self::Apply(node) => write!(f, "({:?} {:?})", node.function, node.argument),
            Self::Overloaded(o) => write!(f, "<overloaded {}>", o.class),
        }
    }
}
