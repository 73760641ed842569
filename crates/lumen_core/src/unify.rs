// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unification engine: substitution, structural equality, anti-unification
//! and specialization checks.
//!
//! Type application tags are phantom: every operation here looks through
//! them to the tagged body.

use crate::types::{Type, TypeKind, TypeVarId};
use std::collections::HashMap;

/// Error when two types cannot be unified
#[derive(Debug, Clone, thiserror::Error)]
pub enum UnifyError {
    /// Incompatible shapes or nominal types
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch {
        /// Left-hand side after substitution
        expected: Type,
        /// Right-hand side after substitution
        found: Type,
    },

    /// Binding would create an infinite type
    #[error("recursive type: {var} occurs in {ty}")]
    Occurs {
        /// The variable being bound
        var: Type,
        /// The type it occurs in
        ty: Type,
    },
}

/// Active substitution from variables to types
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<TypeVarId, Type>,
}

impl Substitution {
    /// Create an empty substitution
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no variable is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Direct binding of a variable
    pub fn get(&self, id: TypeVarId) -> Option<&Type> {
        self.bindings.get(&id)
    }

    /// Follow variable bindings and tags at the top of a type
    fn shallow<'a>(&'a self, ty: &'a Type) -> &'a Type {
        let mut current = ty.strip_tags();
        while let TypeKind::Var(id) = current.kind() {
            match self.bindings.get(id) {
                Some(bound) => current = bound.strip_tags(),
                None => break,
            }
        }
        current
    }

    /// Apply the substitution throughout a type
    pub fn resolve(&self, ty: &Type) -> Type {
        match ty.kind() {
            TypeKind::Value(_) => ty.clone(),
            TypeKind::Var(id) => match self.bindings.get(id) {
                Some(bound) => self.resolve(bound),
                None => ty.clone(),
            },
            TypeKind::Arrow { captured, returns } => {
                Type::arrow(self.resolve(captured), self.resolve(returns))
            }
            TypeKind::Apply { tag, body } => Type::apply(tag.clone(), self.resolve(body)),
        }
    }

    fn occurs(&self, var: TypeVarId, ty: &Type) -> bool {
        match self.shallow(ty).kind() {
            TypeKind::Var(id) => *id == var,
            TypeKind::Value(_) => false,
            TypeKind::Arrow { captured, returns } => {
                self.occurs(var, captured) || self.occurs(var, returns)
            }
            TypeKind::Apply { body, .. } => self.occurs(var, body),
        }
    }

    fn bind(&mut self, var: TypeVarId, ty: &Type) -> Result<(), UnifyError> {
        if self.occurs(var, ty) {
            return Err(UnifyError::Occurs {
                var: Type::var(var),
                ty: self.resolve(ty),
            });
        }
        self.bindings.insert(var, ty.clone());
        Ok(())
    }

    /// Unify two types, extending the substitution.
    ///
    /// On failure the substitution may hold bindings made before the
    /// conflict was found; clone it first when a trial must leave no trace.
    pub fn unify(&mut self, expected: &Type, found: &Type) -> Result<(), UnifyError> {
        let a = self.shallow(expected).clone();
        let b = self.shallow(found).clone();

        match (a.kind(), b.kind()) {
            (TypeKind::Var(x), TypeKind::Var(y)) if x == y => Ok(()),
            (TypeKind::Var(x), _) => self.bind(*x, &b),
            (_, TypeKind::Var(y)) => self.bind(*y, &a),
            (TypeKind::Value(x), TypeKind::Value(y)) if x.id == y.id => Ok(()),
            (
                TypeKind::Arrow { captured: c1, returns: r1 },
                TypeKind::Arrow { captured: c2, returns: r2 },
            ) => {
                self.unify(c1, c2)?;
                self.unify(r1, r2)
            }
            _ => Err(UnifyError::Mismatch {
                expected: self.resolve(&a),
                found: self.resolve(&b),
            }),
        }
    }

    /// Whether two types are equal under this substitution, without binding
    pub fn equal(&self, a: &Type, b: &Type) -> bool {
        let a = self.shallow(a);
        let b = self.shallow(b);
        match (a.kind(), b.kind()) {
            (TypeKind::Var(x), TypeKind::Var(y)) => x == y,
            (TypeKind::Value(x), TypeKind::Value(y)) => x.id == y.id,
            (
                TypeKind::Arrow { captured: c1, returns: r1 },
                TypeKind::Arrow { captured: c2, returns: r2 },
            ) => self.equal(c1, c2) && self.equal(r1, r2),
            _ => false,
        }
    }
}

/// Structural equality ignoring tags: value types by UUID, arrows pairwise,
/// variables by id
pub fn same_type(a: &Type, b: &Type) -> bool {
    Substitution::new().equal(a, b)
}

/// Rename every variable in `ty` to a fresh one, consistently
pub fn instantiate(ty: &Type) -> Type {
    let renaming: HashMap<TypeVarId, Type> = ty
        .free_vars()
        .into_iter()
        .map(|id| (id, Type::fresh_var()))
        .collect();
    rename(ty, &renaming)
}

fn rename(ty: &Type, renaming: &HashMap<TypeVarId, Type>) -> Type {
    match ty.kind() {
        TypeKind::Value(_) => ty.clone(),
        TypeKind::Var(id) => renaming.get(id).cloned().unwrap_or_else(|| ty.clone()),
        TypeKind::Arrow { captured, returns } => {
            Type::arrow(rename(captured, renaming), rename(returns, renaming))
        }
        TypeKind::Apply { tag, body } => Type::apply(tag.clone(), rename(body, renaming)),
    }
}

/// Most specific common generalization of a non-empty set of types.
///
/// Positions where the inputs agree keep their shared structure; every
/// distinct disagreement gets one fresh variable, reused when the same
/// disagreement shows up again (`Int -> Int` and `Float -> Float`
/// generalize to `'a -> 'a`).
pub fn generalize(types: &[Type]) -> Option<Type> {
    if types.is_empty() {
        return None;
    }
    let mut disagreements = HashMap::new();
    let refs: Vec<&Type> = types.iter().collect();
    Some(anti_unify(&refs, &mut disagreements))
}

fn anti_unify(types: &[&Type], disagreements: &mut HashMap<Vec<Type>, Type>) -> Type {
    let stripped: Vec<&Type> = types.iter().map(|t| t.strip_tags()).collect();
    let first = stripped[0];

    match first.kind() {
        TypeKind::Value(v) => {
            let all_same = stripped
                .iter()
                .all(|t| matches!(t.kind(), TypeKind::Value(w) if w.id == v.id));
            if all_same {
                return first.clone();
            }
        }
        TypeKind::Var(id) => {
            let all_same = stripped
                .iter()
                .all(|t| matches!(t.kind(), TypeKind::Var(other) if other == id));
            if all_same {
                return first.clone();
            }
        }
        TypeKind::Arrow { .. } => {
            let arrows: Option<Vec<(&Type, &Type)>> = stripped.iter().map(|t| t.as_arrow()).collect();
            if let Some(arrows) = arrows {
                let captured: Vec<&Type> = arrows.iter().map(|(c, _)| *c).collect();
                let returns: Vec<&Type> = arrows.iter().map(|(_, r)| *r).collect();
                return Type::arrow(
                    anti_unify(&captured, disagreements),
                    anti_unify(&returns, disagreements),
                );
            }
        }
        TypeKind::Apply { .. } => unreachable!("tags are stripped"),
    }

    let key: Vec<Type> = stripped.into_iter().cloned().collect();
    disagreements.entry(key).or_insert_with(Type::fresh_var).clone()
}

/// Whether `specific` is obtainable from `general` by substituting
/// `general`'s variables
pub fn specializable(general: &Type, specific: &Type) -> bool {
    let mut assignment = HashMap::new();
    matches_pattern(general, specific, &mut assignment)
}

fn matches_pattern(pattern: &Type, target: &Type, assignment: &mut HashMap<TypeVarId, Type>) -> bool {
    let pattern = pattern.strip_tags();
    let target = target.strip_tags();

    match pattern.kind() {
        TypeKind::Var(id) => match assignment.get(id) {
            Some(bound) => same_type(bound, target),
            None => {
                assignment.insert(*id, target.clone());
                true
            }
        },
        TypeKind::Value(v) => matches!(target.kind(), TypeKind::Value(w) if w.id == v.id),
        TypeKind::Arrow { captured, returns } => match target.as_arrow() {
            Some((c, r)) => {
                matches_pattern(captured, c, assignment) && matches_pattern(returns, r, assignment)
            }
            None => false,
        },
        TypeKind::Apply { .. } => unreachable!("tags are stripped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;
    use uuid::Uuid;

    #[test]
    fn test_unify_binds_variables() {
        let mut subst = Substitution::new();
        let a = Type::fresh_var();
        let b = Type::fresh_var();
        subst
            .unify(&Type::arrow(a.clone(), Type::int()), &Type::arrow(Type::float(), b.clone()))
            .unwrap();
        assert_eq!(subst.resolve(&a), Type::float());
        assert_eq!(subst.resolve(&b), Type::int());
    }

    #[test]
    fn test_unify_mismatch() {
        let mut subst = Substitution::new();
        let err = subst.unify(&Type::int(), &Type::float()).unwrap_err();
        assert!(matches!(err, UnifyError::Mismatch { .. }));
        assert_eq!(err.to_string(), "type mismatch: expected Int, found Float");
    }

    #[test]
    fn test_occurs_check() {
        let mut subst = Substitution::new();
        let a = Type::fresh_var();
        let err = subst.unify(&a, &Type::arrow(a.clone(), Type::int())).unwrap_err();
        assert!(matches!(err, UnifyError::Occurs { .. }));
    }

    #[test]
    fn test_unify_looks_through_tags() {
        let mut subst = Substitution::new();
        let tag = Type::value(ValueType::overload_tag(Uuid::new_v4()));
        let a = Type::fresh_var();
        subst.unify(&Type::apply(tag, a.clone()), &Type::image()).unwrap();
        assert_eq!(subst.resolve(&a), Type::image());
    }

    #[test]
    fn test_equality_under_substitution() {
        let mut subst = Substitution::new();
        let a = Type::fresh_var();
        assert!(!subst.equal(&a, &Type::int()));
        subst.unify(&a, &Type::int()).unwrap();
        assert!(subst.equal(&Type::arrow(a, Type::int()), &Type::arrow(Type::int(), Type::int())));
        assert!(same_type(&Type::int(), &Type::int()));
        assert!(!same_type(&Type::int(), &Type::float()));
    }

    #[test]
    fn test_generalize_disjoint_values_is_a_variable() {
        let ty = generalize(&[Type::int(), Type::float()]).unwrap();
        assert!(ty.as_var().is_some());
    }

    #[test]
    fn test_generalize_keeps_shared_structure() {
        let ty = generalize(&[
            Type::arrow(Type::int(), Type::int()),
            Type::arrow(Type::int(), Type::float()),
        ])
        .unwrap();
        let (captured, returns) = ty.as_arrow().unwrap();
        assert_eq!(captured, &Type::int());
        assert!(returns.as_var().is_some());
    }

    #[test]
    fn test_generalize_reuses_variable_for_same_disagreement() {
        let ty = generalize(&[
            Type::function([Type::int(), Type::int()], Type::int()),
            Type::function([Type::float(), Type::float()], Type::float()),
        ])
        .unwrap();
        assert_eq!(ty.free_vars().len(), 1);
        assert_eq!(ty.arrow_depth(), 2);
        assert!(generalize(&[]).is_none());
    }

    #[test]
    fn test_specializable() {
        let a = Type::fresh_var();
        let identity = Type::arrow(a.clone(), a);
        assert!(specializable(&identity, &Type::arrow(Type::int(), Type::int())));
        assert!(!specializable(&identity, &Type::arrow(Type::int(), Type::float())));
        assert!(!specializable(&Type::arrow(Type::int(), Type::int()), &identity));
        assert!(specializable(&Type::int(), &Type::int()));
    }

    #[test]
    fn test_instantiate_renames_consistently() {
        let a = Type::fresh_var();
        let ty = Type::arrow(a.clone(), a.clone());
        let fresh = instantiate(&ty);
        let (c, r) = fresh.as_arrow().unwrap();
        assert_eq!(c, r);
        assert_ne!(c, &a);
    }
}
