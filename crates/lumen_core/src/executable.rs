// SPDX-License-Identifier: MIT OR Apache-2.0
//! The compiled artifact.

use crate::eval::{Demand, Machine, RuntimeError};
use crate::object::Object;
use crate::term::Term;
use crate::types::Type;

/// A compiled term and its type.
///
/// Executing never modifies the term, so a failed frame can be retried.
/// One executable is meant to be evaluated by one thread at a time.
#[derive(Debug, Clone)]
pub struct Executable {
    term: Term,
    ty: Type,
}

impl Executable {
    /// Wrap a checked term
    pub fn new(term: Term, ty: Type) -> Self {
        Self { term, ty }
    }

    /// The term
    pub fn term(&self) -> &Term {
        &self.term
    }

    /// The type of the result
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Evaluate for a demand
    pub fn execute(&self, demand: Demand) -> Result<Object, RuntimeError> {
        let mut machine = Machine::new(demand);
        let result = machine.eval(&self.term);
        match &result {
            Ok(value) => tracing::trace!(
                time = demand.time,
                reductions = machine.reductions(),
                kind = value.kind_name(),
                "Executed"
            ),
            Err(err) => tracing::warn!(time = demand.time, %err, "Frame failed"),
        }
        result
    }

    /// Evaluate at a point in time
    pub fn execute_at(&self, time: f64) -> Result<Object, RuntimeError> {
        self.execute(Demand::at(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::num::ADD_INT;

    #[test]
    fn test_failed_frame_leaves_term_usable() {
        let good = Executable::new(
            Term::apply_all(
                ADD_INT.instance().into(),
                [Term::value(Object::int(1)), Term::value(Object::int(2))],
            ),
            Type::int(),
        );
        assert_eq!(good.execute_at(0.0).unwrap(), Object::int(3));
        assert_eq!(good.execute_at(1.0).unwrap(), Object::int(3));

        let bad = Executable::new(
            Term::apply_all(
                ADD_INT.instance().into(),
                [Term::value(Object::float(1.0)), Term::value(Object::int(2))],
            ),
            Type::int(),
        );
        assert!(bad.execute_at(0.0).is_err());
        assert!(bad.execute_at(0.0).is_err());
    }
}
