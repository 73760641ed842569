// SPDX-License-Identifier: MIT OR Apache-2.0
//! Numeric nodes.

use super::declare_with;
use crate::catalog::{Catalog, CatalogError, NodeDeclaration};
use crate::closure::{NativeFn, Reduced};
use crate::eval::{Machine, RuntimeError};
use crate::object::Object;
use crate::term::Term;
use crate::types::Type;

fn pass_through(args: &[Term], _: &mut Machine) -> Result<Reduced, RuntimeError> {
    Ok(Reduced::Term(args[0].clone()))
}

/// Int -> Int
pub const INT_VALUE: NativeFn = NativeFn {
    name: "int_value",
    arity: 1,
    signature: || Type::arrow(Type::int(), Type::int()),
    body: pass_through,
};

/// Float -> Float
pub const FLOAT_VALUE: NativeFn = NativeFn {
    name: "float_value",
    arity: 1,
    signature: || Type::arrow(Type::float(), Type::float()),
    body: pass_through,
};

/// Bool -> Bool
pub const BOOL_VALUE: NativeFn = NativeFn {
    name: "bool_value",
    arity: 1,
    signature: || Type::arrow(Type::bool(), Type::bool()),
    body: pass_through,
};

fn binary(ty: fn() -> Type, ret: fn() -> Type) -> Type {
    Type::function([ty(), ty()], ret())
}

fn add_int(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_int(&args[0])?;
    let b = m.force_int(&args[1])?;
    Ok(Reduced::Value(Object::int(a.wrapping_add(b))))
}

fn add_float(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_float(&args[0])?;
    let b = m.force_float(&args[1])?;
    Ok(Reduced::Value(Object::float(a + b)))
}

fn mul_int(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_int(&args[0])?;
    let b = m.force_int(&args[1])?;
    Ok(Reduced::Value(Object::int(a.wrapping_mul(b))))
}

fn mul_float(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_float(&args[0])?;
    let b = m.force_float(&args[1])?;
    Ok(Reduced::Value(Object::float(a * b)))
}

fn less_int(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_int(&args[0])?;
    let b = m.force_int(&args[1])?;
    Ok(Reduced::Value(Object::bool(a < b)))
}

fn less_float(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_float(&args[0])?;
    let b = m.force_float(&args[1])?;
    Ok(Reduced::Value(Object::bool(a < b)))
}

fn to_float(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
    let a = m.force_int(&args[0])?;
    Ok(Reduced::Value(Object::float(a as f64)))
}

/// Int -> Int -> Int
pub const ADD_INT: NativeFn = NativeFn {
    name: "add_int",
    arity: 2,
    signature: || binary(Type::int, Type::int),
    body: add_int,
};

/// Float -> Float -> Float
pub const ADD_FLOAT: NativeFn = NativeFn {
    name: "add_float",
    arity: 2,
    signature: || binary(Type::float, Type::float),
    body: add_float,
};

/// Int -> Int -> Int
pub const MULTIPLY_INT: NativeFn = NativeFn {
    name: "multiply_int",
    arity: 2,
    signature: || binary(Type::int, Type::int),
    body: mul_int,
};

/// Float -> Float -> Float
pub const MULTIPLY_FLOAT: NativeFn = NativeFn {
    name: "multiply_float",
    arity: 2,
    signature: || binary(Type::float, Type::float),
    body: mul_float,
};

/// Int -> Int -> Bool
pub const LESS_THAN_INT: NativeFn = NativeFn {
    name: "less_than_int",
    arity: 2,
    signature: || binary(Type::int, Type::bool),
    body: less_int,
};

/// Float -> Float -> Bool
pub const LESS_THAN_FLOAT: NativeFn = NativeFn {
    name: "less_than_float",
    arity: 2,
    signature: || binary(Type::float, Type::bool),
    body: less_float,
};

/// Int -> Float
pub const TO_FLOAT: NativeFn = NativeFn {
    name: "to_float",
    arity: 1,
    signature: || Type::arrow(Type::int(), Type::float()),
    body: to_float,
};

/// Declare and define the numeric nodes
pub fn register(catalog: &mut Catalog, backend: &str) -> Result<(), CatalogError> {
    // ========================================================================
    // Constants
    // ========================================================================

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.Int")
            .input_or("value", || Object::int(0))
            .output("out", Type::arrow(Type::int(), Type::int()))
            .description("Integer constant"),
        "out",
        &[INT_VALUE],
    )?;

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.Float")
            .input_or("value", || Object::float(0.0))
            .output("out", Type::arrow(Type::float(), Type::float()))
            .description("Float constant, animatable"),
        "out",
        &[FLOAT_VALUE],
    )?;

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.Bool")
            .input_or("value", || Object::bool(false))
            .output("out", Type::arrow(Type::bool(), Type::bool()))
            .description("Boolean constant"),
        "out",
        &[BOOL_VALUE],
    )?;

    // ========================================================================
    // Arithmetic (overloaded over Int and Float)
    // ========================================================================

    let a = Type::fresh_var();
    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.Add")
            .input("a")
            .input("b")
            .output("out", Type::function([a.clone(), a.clone()], a))
            .description("Sum of two numbers"),
        "out",
        &[ADD_INT, ADD_FLOAT],
    )?;

    let a = Type::fresh_var();
    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.Multiply")
            .input("a")
            .input("b")
            .output("out", Type::function([a.clone(), a.clone()], a))
            .description("Product of two numbers"),
        "out",
        &[MULTIPLY_INT, MULTIPLY_FLOAT],
    )?;

    let a = Type::fresh_var();
    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.LessThan")
            .input("a")
            .input("b")
            .output("out", Type::function([a.clone(), a], Type::bool()))
            .description("Whether a is less than b"),
        "out",
        &[LESS_THAN_INT, LESS_THAN_FLOAT],
    )?;

    // ========================================================================
    // Conversion
    // ========================================================================

    declare_with(
        catalog,
        backend,
        NodeDeclaration::new("Std.Num.ToFloat")
            .input("value")
            .output("out", Type::arrow(Type::int(), Type::float()))
            .description("Convert an integer to a float"),
        "out",
        &[TO_FLOAT],
    )
}
