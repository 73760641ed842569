// SPDX-License-Identifier: MIT OR Apache-2.0
//! Primitives and closures.
//!
//! A [`Primitive`] is the implementation behind a node definition: it
//! declares an arity and a type, and knows how to reduce once every
//! argument slot is bound. A [`Closure`] is a primitive plus the argument
//! terms bound so far; arguments stay unevaluated until the primitive
//! forces them.

use crate::eval::{Machine, RuntimeError};
use crate::object::Object;
use crate::term::Term;
use crate::types::Type;
use std::fmt;
use std::sync::Arc;

/// Result of a reduction step
#[derive(Debug, Clone)]
pub enum Reduced {
    /// A value in normal form
    Value(Object),
    /// A further term to evaluate
    Term(Term),
}

/// Implementation of a callable value
pub trait Primitive: Send + Sync + fmt::Debug {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Number of arguments consumed before reducing
    fn arity(&self) -> usize;

    /// Declared type, a curried arrow chain of `arity` arguments
    fn ty(&self) -> Type;

    /// Reduce a saturated application. `args.len() == self.arity()`.
    fn reduce(&self, args: &[Term], machine: &mut Machine) -> Result<Reduced, RuntimeError>;
}

/// A table-driven primitive with plain function pointers
#[derive(Clone, Copy)]
pub struct NativeFn {
    /// Name used in diagnostics
    pub name: &'static str,
    /// Number of arguments
    pub arity: usize,
    /// Builds the declared type
    pub signature: fn() -> Type,
    /// Reduction step
    pub body: fn(&[Term], &mut Machine) -> Result<Reduced, RuntimeError>,
}

impl NativeFn {
    /// Wrap as a fresh closure object
    pub fn instance(self) -> Object {
        Object::closure(Closure::new(Arc::new(self)))
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl Primitive for NativeFn {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn ty(&self) -> Type {
        (self.signature)()
    }

    fn reduce(&self, args: &[Term], machine: &mut Machine) -> Result<Reduced, RuntimeError> {
        (self.body)(args, machine)
    }
}

/// A primitive with some arguments bound
#[derive(Debug, Clone)]
pub struct Closure {
    primitive: Arc<dyn Primitive>,
    bound: Vec<Term>,
}

impl Closure {
    /// Closure with no bound arguments
    pub fn new(primitive: Arc<dyn Primitive>) -> Self {
        Self {
            primitive,
            bound: Vec::new(),
        }
    }

    /// Underlying primitive
    pub fn primitive(&self) -> &Arc<dyn Primitive> {
        &self.primitive
    }

    /// Primitive name
    pub fn name(&self) -> &str {
        self.primitive.name()
    }

    /// Declared arity
    pub fn arity(&self) -> usize {
        self.primitive.arity()
    }

    /// Bound argument terms, unevaluated
    pub fn bound(&self) -> &[Term] {
        &self.bound
    }

    /// Number of arguments still missing
    pub fn missing(&self) -> usize {
        self.arity().saturating_sub(self.bound.len())
    }

    /// Whether every argument slot is bound
    pub fn is_saturated(&self) -> bool {
        self.missing() == 0
    }

    /// A new closure with `argument` appended, left unevaluated
    pub fn apply(&self, argument: Term) -> Self {
        let mut bound = Vec::with_capacity(self.bound.len() + 1);
        bound.extend(self.bound.iter().cloned());
        bound.push(argument);
        Self {
            primitive: Arc::clone(&self.primitive),
            bound,
        }
    }

    /// Declared type with the bound arguments removed
    pub fn ty(&self) -> Type {
        let full = self.primitive.ty();
        full.skip_args(self.bound.len()).unwrap_or_else(Type::fresh_var)
    }
}
