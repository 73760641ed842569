// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime type values.
//!
//! A [`Type`] is one of:
//! - a nominal value type tagged with a UUID (`Int`, `Image`, ...)
//! - a single-argument arrow; n-ary functions are curried chains
//! - a unification variable with a random id
//! - a type application, which tags a type with another type without
//!   changing its shape (used to carry an overload class through inference)

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Default depth cap when rendering types to text
pub const DEFAULT_PRINT_DEPTH: usize = 48;

/// Identifier of a unification variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub Uuid);

impl TypeVarId {
    /// Mint a fresh variable id
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A nominal type identified by its UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType {
    /// Identity of the type; two value types are equal iff their ids are
    pub id: Uuid,
    /// Display name
    pub name: &'static str,
}

impl ValueType {
    /// Type of the absent object
    pub const UNDEFINED: Self = Self::builtin(0x0000, "Undefined");
    /// Boolean
    pub const BOOL: Self = Self::builtin(0x0001, "Bool");
    /// 64-bit signed integer
    pub const INT: Self = Self::builtin(0x0002, "Int");
    /// 64-bit float
    pub const FLOAT: Self = Self::builtin(0x0003, "Float");
    /// UTF-8 string
    pub const STRING: Self = Self::builtin(0x0004, "String");
    /// RGBA frame buffer
    pub const IMAGE: Self = Self::builtin(0x0005, "Image");
    /// 2D affine transform
    pub const TRANSFORM: Self = Self::builtin(0x0006, "Transform");
    /// Keyframed animation curve
    pub const CURVE: Self = Self::builtin(0x0007, "Curve");
    /// A type carried as a runtime value
    pub const TYPE: Self = Self::builtin(0x0008, "Type");
    /// A propagated runtime exception
    pub const EXCEPTION: Self = Self::builtin(0x0009, "Exception");

    const fn builtin(low: u128, name: &'static str) -> Self {
        Self {
            id: Uuid::from_u128(0x6c75_6d65_6e00_4000_8000_0000_0000_0000 | low),
            name,
        }
    }

    /// Tag type identifying an overload class
    pub const fn overload_tag(class: Uuid) -> Self {
        Self { id: class, name: "Overload" }
    }
}

/// Shape of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Nominal value type
    Value(ValueType),
    /// Function from `captured` to `returns`
    Arrow {
        /// Argument type
        captured: Type,
        /// Result type
        returns: Type,
    },
    /// Unification variable
    Var(TypeVarId),
    /// `body` tagged with `tag`; shape-transparent for unification
    Apply {
        /// Phantom tag
        tag: Type,
        /// Tagged type
        body: Type,
    },
}

/// A shared, immutable type value
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Type(Arc<TypeKind>);

impl Type {
    /// Wrap a type kind
    pub fn new(kind: TypeKind) -> Self {
        Self(Arc::new(kind))
    }

    /// Nominal value type
    pub fn value(value: ValueType) -> Self {
        Self::new(TypeKind::Value(value))
    }

    /// Arrow type `captured -> returns`
    pub fn arrow(captured: Type, returns: Type) -> Self {
        Self::new(TypeKind::Arrow { captured, returns })
    }

    /// Curried function type `a1 -> a2 -> ... -> ret`
    pub fn function(args: impl IntoIterator<Item = Type>, ret: Type) -> Self {
        let args: Vec<Type> = args.into_iter().collect();
        args.into_iter().rev().fold(ret, |acc, arg| Self::arrow(arg, acc))
    }

    /// Variable with a given id
    pub fn var(id: TypeVarId) -> Self {
        Self::new(TypeKind::Var(id))
    }

    /// Fresh unification variable
    pub fn fresh_var() -> Self {
        Self::var(TypeVarId::fresh())
    }

    /// Tag `body` with `tag`
    pub fn apply(tag: Type, body: Type) -> Self {
        Self::new(TypeKind::Apply { tag, body })
    }

    /// `Undefined`
    pub fn undefined() -> Self {
        Self::value(ValueType::UNDEFINED)
    }

    /// `Bool`
    pub fn bool() -> Self {
        Self::value(ValueType::BOOL)
    }

    /// `Int`
    pub fn int() -> Self {
        Self::value(ValueType::INT)
    }

    /// `Float`
    pub fn float() -> Self {
        Self::value(ValueType::FLOAT)
    }

    /// `String`
    pub fn string() -> Self {
        Self::value(ValueType::STRING)
    }

    /// `Image`
    pub fn image() -> Self {
        Self::value(ValueType::IMAGE)
    }

    /// `Transform`
    pub fn transform() -> Self {
        Self::value(ValueType::TRANSFORM)
    }

    /// `Curve`
    pub fn curve() -> Self {
        Self::value(ValueType::CURVE)
    }

    /// Shape of this type
    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// Remove any type application tags from the top of this type
    pub fn strip_tags(&self) -> &Type {
        let mut current = self;
        while let TypeKind::Apply { body, .. } = current.kind() {
            current = body;
        }
        current
    }

    /// Outermost tag, if this is a type application
    pub fn tag(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Apply { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Split an arrow into argument and result
    pub fn as_arrow(&self) -> Option<(&Type, &Type)> {
        match self.strip_tags().kind() {
            TypeKind::Arrow { captured, returns } => Some((captured, returns)),
            _ => None,
        }
    }

    /// Variable id, if this is a variable
    pub fn as_var(&self) -> Option<TypeVarId> {
        match self.strip_tags().kind() {
            TypeKind::Var(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether this is the given value type
    pub fn is_value(&self, value: &ValueType) -> bool {
        matches!(self.strip_tags().kind(), TypeKind::Value(v) if v.id == value.id)
    }

    /// Number of arrows along the result spine
    pub fn arrow_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some((_, returns)) = current.as_arrow() {
            depth += 1;
            current = returns;
        }
        depth
    }

    /// Drop `n` leading arguments from a curried function type
    pub fn skip_args(&self, n: usize) -> Option<Type> {
        let mut current = self;
        for _ in 0..n {
            current = current.as_arrow()?.1;
        }
        Some(current.clone())
    }

    /// Free variables, in order of first appearance
    pub fn free_vars(&self) -> Vec<TypeVarId> {
        let mut vars = Vec::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut Vec<TypeVarId>) {
        match self.kind() {
            TypeKind::Value(_) => {}
            TypeKind::Var(id) => {
                if !vars.contains(id) {
                    vars.push(*id);
                }
            }
            TypeKind::Arrow { captured, returns } => {
                captured.collect_vars(vars);
                returns.collect_vars(vars);
            }
            TypeKind::Apply { tag, body } => {
                tag.collect_vars(vars);
                body.collect_vars(vars);
            }
        }
    }

    /// Whether the type contains no variables
    pub fn is_ground(&self) -> bool {
        self.free_vars().is_empty()
    }

    /// Render with an explicit depth cap
    pub fn display_with_depth(&self, max_depth: usize) -> TypeDisplay<'_> {
        TypeDisplay { ty: self, max_depth }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display_with_depth(DEFAULT_PRINT_DEPTH).fmt(f)
    }
}

/// Depth-capped rendering of a type
pub struct TypeDisplay<'a> {
    ty: &'a Type,
    max_depth: usize,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: HashMap<TypeVarId, String> = self
            .ty
            .free_vars()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, var_name(i)))
            .collect();
        write_type(f, self.ty, &names, 0, self.max_depth)
    }
}

/// `'a` .. `'z`, then `'a1` ..
fn var_name(index: usize) -> String {
    let letter = (b'a' + (index % 26) as u8) as char;
    match index / 26 {
        0 => format!("'{letter}"),
        round => format!("'{letter}{round}"),
    }
}

fn write_type(
    f: &mut fmt::Formatter<'_>,
    ty: &Type,
    names: &HashMap<TypeVarId, String>,
    depth: usize,
    max_depth: usize,
) -> fmt::Result {
    let composite = matches!(ty.kind(), TypeKind::Arrow { .. } | TypeKind::Apply { .. });
    if depth >= max_depth || (composite && depth + 1 >= max_depth) {
        return f.write_str("…");
    }
    match ty.kind() {
        TypeKind::Value(v) => f.write_str(v.name),
        TypeKind::Var(id) => match names.get(id) {
            Some(name) => f.write_str(name),
            None => f.write_str("'?"),
        },
        TypeKind::Arrow { captured, returns } => {
            if captured.as_arrow().is_some() {
                f.write_str("(")?;
                write_type(f, captured, names, depth + 1, max_depth)?;
                f.write_str(")")?;
            } else {
                write_type(f, captured, names, depth + 1, max_depth)?;
            }
            f.write_str(" -> ")?;
            write_type(f, returns, names, depth + 1, max_depth)
        }
        TypeKind::Apply { tag, body } => {
            f.write_str("[")?;
            write_type(f, tag, names, depth + 1, max_depth)?;
            f.write_str("] ")?;
            write_type(f, body, names, depth + 1, max_depth)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_types_compare_by_uuid() {
        assert_eq!(Type::int(), Type::int());
        assert_ne!(Type::int(), Type::float());
        assert_ne!(ValueType::INT.id, ValueType::FLOAT.id);
    }

    #[test]
    fn test_function_is_curried() {
        let ty = Type::function([Type::int(), Type::float()], Type::image());
        assert_eq!(ty.arrow_depth(), 2);
        assert_eq!(ty.skip_args(1), Some(Type::arrow(Type::float(), Type::image())));
        assert_eq!(ty.skip_args(2), Some(Type::image()));
        assert_eq!(ty.skip_args(3), None);
    }

    #[test]
    fn test_render_variables_in_order() {
        let a = Type::fresh_var();
        let b = Type::fresh_var();
        let ty = Type::function([Type::arrow(a.clone(), b.clone()), a], b);
        assert_eq!(ty.to_string(), "('a -> 'b) -> 'a -> 'b");
    }

    #[test]
    fn test_render_is_depth_capped() {
        let mut ty = Type::int();
        for _ in 0..100 {
            ty = Type::arrow(Type::int(), ty);
        }
        let text = ty.to_string();
        assert!(text.ends_with('…'));
        assert_eq!(text.matches("Int").count(), DEFAULT_PRINT_DEPTH - 1);

        let short = ty.display_with_depth(2).to_string();
        assert_eq!(short, "Int -> …");
    }

    #[test]
    fn test_tags_are_transparent_to_shape() {
        let tag = Type::value(ValueType::overload_tag(Uuid::new_v4()));
        let var = Type::fresh_var();
        let tagged = Type::apply(tag.clone(), var.clone());
        assert_eq!(tagged.as_var(), var.as_var());
        assert_eq!(tagged.tag(), Some(&tag));
        assert_eq!(tagged.strip_tags(), &var);
    }
}
