// SPDX-License-Identifier: MIT OR Apache-2.0
//! Control flow nodes.

use super::declare_with;
use crate::catalog::{Catalog, CatalogError, NodeDeclaration};
use crate::closure::{NativeFn, Reduced};
use crate::eval::{Machine, RuntimeError};
use crate::term::Term;
use crate::types::Type;

fn choose(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let branch = if m.force_bool(&args[0])? { &args[1] } else { &args[2] };
    Ok(Reduced::Term(branch.clone()))
}

fn fix(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    Ok(Reduced::Term(m.fix(&args[0])?))
}

/// Bool -> a -> a -> a, forcing only the chosen branch
pub const IF: NativeFn = NativeFn {
    name: "if",
    arity: 3,
    signature: || {
        let a = Type::fresh_var();
        Type::function([Type::bool(), a.clone(), a.clone()], a)
    },
    body: choose,
};

/// (a -> a) -> a
pub const FIX: NativeFn = NativeFn {
    name: "fix",
    arity: 1,
    signature: || {
        let a = Type::fresh_var();
        Type::arrow(Type::arrow(a.clone(), a.clone()), a)
    },
    body: fix,
};

/// Declare and define the control flow nodes
pub fn register(catalog: &mut Catalog, backend: &str) -> Result<(), CatalogError> {
    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Flow.If")
            .input("condition")
            .input("then")
            .input("else")
            .output("out", (IF.signature)())
            .description("Select one of two values"),
        "out",
        &[IF],
    )?;

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Flow.Fix")
            .input("generator")
            .output("out", (FIX.signature)())
            .description("Fixed point of a generator, for recursive definitions"),
        "out",
        &[FIX],
    )
}
