// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lazy reduction of terms.

use crate::closure::Reduced;
use crate::frame::Transform;
use crate::object::{Object, Value};
use crate::term::Term;

/// External input driving one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Demand {
    /// Time in seconds
    pub time: f64,
}

impl Demand {
    /// Demand at a point in time
    pub fn at(time: f64) -> Self {
        Self { time }
    }
}

/// Fault raised while executing a term
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// A value was forced through the wrong type
    #[error("Bad value cast: expected {expected}, found {found}")]
    BadValueCast {
        /// Expected kind
        expected: &'static str,
        /// Actual kind
        found: &'static str,
    },

    /// `fix` applied to something that takes no argument
    #[error("Bad fixed point: {found} takes no argument")]
    BadFixedPoint {
        /// Description of the offending value
        found: String,
    },

    /// An exception value reached the top of an evaluation
    #[error("Exception: {0}")]
    Exception(String),

    /// A placeholder survived into execution
    #[error("Unresolved overloaded term")]
    UnresolvedOverload,

    /// A recursive slot outlived its node
    #[error("Dangling recursive reference")]
    DanglingRecursion,
}

/// Reduction state for one evaluation
#[derive(Debug)]
pub struct Machine {
    demand: Demand,
    reductions: u64,
}

impl Machine {
    /// Create a machine for a demand
    pub fn new(demand: Demand) -> Self {
        Self {
            demand,
            reductions: 0,
        }
    }

    /// The demand being served
    pub fn demand(&self) -> Demand {
        self.demand
    }

    /// Number of primitive reductions performed so far
    pub fn reductions(&self) -> u64 {
        self.reductions
    }

    /// Reduce a term to normal form.
    ///
    /// Applications bind their argument unevaluated; a closure whose last
    /// slot is filled is reduced by its primitive, and the result is
    /// reduced again until a value remains.
    pub fn eval(&mut self, term: &Term) -> Result<Object, RuntimeError> {
        let mut current = term.clone();
        loop {
            let next = match &current {
                Term::Value(object) => match object.value() {
                    Value::Exception(e) => return Err(RuntimeError::Exception(e.message.clone())),
                    Value::Closure(closure) if closure.is_saturated() => {
                        self.reductions += 1;
                        match closure.primitive().reduce(closure.bound(), self)? {
                            Reduced::Value(value) => Term::Value(value),
                            Reduced::Term(term) => term,
                        }
                    }
                    _ => return Ok(object.clone()),
                },
                Term::Apply(node) => {
                    let function = self.eval(node.function())?;
                    let closure = function.as_closure()?;
                    let argument = node
                        .argument()
                        .term()
                        .ok_or(RuntimeError::DanglingRecursion)?;
                    Term::Value(Object::closure(closure.apply(argument)))
                }
                Term::Overloaded(_) => return Err(RuntimeError::UnresolvedOverload),
            };
            current = next;
        }
    }

    /// Alias for [`Machine::eval`], used by primitives
    pub fn force(&mut self, term: &Term) -> Result<Object, RuntimeError> {
        self.eval(term)
    }

    /// Force to an integer
    pub fn force_int(&mut self, term: &Term) -> Result<i64, RuntimeError> {
        self.eval(term)?.as_int()
    }

    /// Force to a float
    pub fn force_float(&mut self, term: &Term) -> Result<f64, RuntimeError> {
        self.eval(term)?.as_float()
    }

    /// Force to a boolean
    pub fn force_bool(&mut self, term: &Term) -> Result<bool, RuntimeError> {
        self.eval(term)?.as_bool()
    }

    /// Force to a transform
    pub fn force_transform(&mut self, term: &Term) -> Result<Transform, RuntimeError> {
        self.eval(term)?.as_transform()
    }

    /// Fixed point of a generator.
    ///
    /// The generator is evaluated once; the result is a node `x = f x`
    /// whose argument slot refers back to itself without owning it.
    pub fn fix(&mut self, generator: &Term) -> Result<Term, RuntimeError> {
        let f = self.eval(generator)?;
        match f.value() {
            Value::Closure(closure) if closure.missing() > 0 => {
                Ok(Term::recursive(Term::Value(f.clone())))
            }
            _ => Err(RuntimeError::BadFixedPoint {
                found: format!("{f:?}"),
            }),
        }
    }
}
