// SPDX-License-Identifier: MIT OR Apache-2.0
//! Time and animation nodes.

use super::declare_with;
use crate::catalog::{Catalog, CatalogError, NodeDeclaration};
use crate::closure::{NativeFn, Reduced};
use crate::eval::{Machine, RuntimeError};
use crate::object::Object;
use crate::term::Term;
use crate::types::Type;

fn now(_: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    Ok(Reduced::Value(Object::float(m.demand().time)))
}

fn curve_eval(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let curve = m.force(&args[0])?;
    let time = m.force_float(&args[1])?;
    match curve.as_curve()?.sample(time) {
        Some(value) => Ok(Reduced::Value(Object::float(value))),
        None => Ok(Reduced::Value(Object::exception("cannot sample a curve without keyframes"))),
    }
}

/// Float: the demanded time
pub const NOW: NativeFn = NativeFn {
    name: "now",
    arity: 0,
    signature: Type::float,
    body: now,
};

/// Curve -> Float -> Float. Not declared in the catalog; introduced when
/// sema expands curve-valued sockets.
pub const CURVE_EVAL: NativeFn = NativeFn {
    name: "curve_eval",
    arity: 2,
    signature: || Type::function([Type::curve(), Type::float()], Type::float()),
    body: curve_eval,
};

/// Declare and define the time nodes
pub fn register(catalog: &mut Catalog, backend: &str) -> Result<(), CatalogError> {
    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Time.Now")
            .output("time", Type::float())
            .description("Current time in seconds"),
        "time",
        &[NOW],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Demand;
    use lumen_curve::{Curve, Keyframe};

    #[test]
    fn test_now_reads_demand() {
        let mut m = Machine::new(Demand::at(2.5));
        assert_eq!(m.eval(&NOW.instance().into()).unwrap(), Object::float(2.5));
    }

    #[test]
    fn test_curve_eval_samples_at_time() {
        let curve = Curve::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(2.0, 4.0)]).unwrap();
        let term = Term::apply_all(
            CURVE_EVAL.instance().into(),
            [Term::value(Object::curve(curve)), NOW.instance().into()],
        );
        let mut m = Machine::new(Demand::at(1.0));
        assert_eq!(m.eval(&term).unwrap(), Object::float(2.0));
    }

    #[test]
    fn test_empty_curve_raises() {
        let term = Term::apply_all(
            CURVE_EVAL.instance().into(),
            [Term::value(Object::curve(Curve::new())), Term::value(Object::float(0.0))],
        );
        let err = Machine::new(Demand::default()).eval(&term).unwrap_err();
        assert!(matches!(err, RuntimeError::Exception(_)));
    }
}
