// SPDX-License-Identifier: MIT OR Apache-2.0
//! Semantic analysis: desugaring, type inference and overload resolution.
//!
//! The stage runs in four steps over the parsed term:
//! 1. Curve values are expanded into `curve_eval curve now`.
//! 2. Types are inferred bottom-up, unifying each function with the
//!    argument it is applied to. Every placeholder gets a fresh instance of
//!    its class type and is remembered as an occurrence.
//! 3. Occurrences are resolved against their candidates until no more
//!    progress is made. A candidate matches when its type unifies with the
//!    usage type; a single match is committed. When every remaining
//!    occurrence is ambiguous, a candidate strictly more specific than all
//!    other matches wins. Anything else is an error; ties are never broken
//!    arbitrarily.
//! 4. Placeholders are replaced by the chosen instances.

use crate::builtin::time::{CURVE_EVAL, NOW};
use crate::diagnostic::{CompileError, Diagnostic, Diagnostics};
use crate::location::{Location, LocationMap};
use crate::object::{Object, Value};
use crate::overload::{ClassEnv, ClassId, OverloadClass};
use crate::parse::ParseOutput;
use crate::term::{Argument, Term, TermKey};
use crate::types::{Type, TypeKind};
use crate::unify::{instantiate, specializable, Substitution, UnifyError};
use lumen_graph::Graph;
use std::collections::HashMap;

/// Result of analysis
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Term with every placeholder resolved
    pub term: Term,
    /// Inferred type of the term
    pub ty: Type,
    /// Socket the root term came from
    pub location: Option<Location>,
}

/// Analyze a parsed term. Returns `None` when a type error was reported or
/// the term has holes.
///
/// Holes from parse type check as fresh variables, so every translated part
/// of the graph is still checked. Ambiguity is only reported for a complete
/// term, since a hole may be what leaves an overload undetermined.
pub fn sema(
    graph: &Graph,
    parsed: ParseOutput,
    print_depth: usize,
    diagnostics: &mut Diagnostics,
) -> Option<Analysis> {
    let ParseOutput {
        term,
        holes,
        classes,
        mut locations,
    } = parsed;

    let term = desugar(&term, &mut locations);

    let mut checker = Checker {
        graph,
        classes: &classes,
        locations: &locations,
        diagnostics,
        depth: print_depth,
        subst: Substitution::new(),
        types: HashMap::new(),
        occurrences: Vec::new(),
        partial: holes > 0,
        failed: false,
    };
    let root = checker.infer(&term);
    let resolved = checker.resolve_overloads();
    let ty = erase_tags(&checker.subst.resolve(&root));
    let failed = checker.failed || holes > 0;

    if failed {
        tracing::debug!(ty = %ty, holes, "Sema failed");
        return None;
    }

    let term = rewrite(&term, &mut HashMap::new(), &mut locations, &mut |t| match t {
        Term::Overloaded(o) => resolved.get(&o.class).map(|instance| Term::Value(instance.clone())),
        _ => None,
    });
    let location = locations.term(&term);
    tracing::debug!(ty = %ty, overloads = resolved.len(), "Sema complete");
    Some(Analysis { term, ty, location })
}

/// Expand curve values into their sampling sub-term
pub fn desugar(term: &Term, locations: &mut LocationMap) -> Term {
    rewrite(term, &mut HashMap::new(), locations, &mut |t| match t {
        Term::Value(object) if matches!(object.value(), Value::Curve(_)) => Some(Term::apply_all(
            CURVE_EVAL.instance().into(),
            [t.clone(), NOW.instance().into()],
        )),
        _ => None,
    })
}

/// Rebuild a term bottom-up, replacing subterms for which `f` answers.
/// Unchanged subterms are shared with the input; shared subterms stay
/// shared; new terms inherit the location of the term they replace.
fn rewrite(
    term: &Term,
    memo: &mut HashMap<TermKey, Term>,
    locations: &mut LocationMap,
    f: &mut impl FnMut(&Term) -> Option<Term>,
) -> Term {
    if let Some(done) = memo.get(&term.key()) {
        return done.clone();
    }
    let new = match f(term) {
        Some(replacement) => replacement,
        None => match term {
            Term::Apply(node) => match node.argument() {
                Argument::Term(argument) => {
                    let function = rewrite(node.function(), memo, locations, f);
                    let argument_new = rewrite(argument, memo, locations, f);
                    if function.ptr_eq(node.function()) && argument_new.ptr_eq(argument) {
                        term.clone()
                    } else {
                        Term::apply(function, argument_new)
                    }
                }
                Argument::Recur(_) => term.clone(),
            },
            _ => term.clone(),
        },
    };
    if let Some(location) = locations.term(term) {
        locations.record_term(&new, location);
    }
    memo.insert(term.key(), new.clone());
    new
}

fn erase_tags(ty: &Type) -> Type {
    match ty.kind() {
        TypeKind::Value(_) | TypeKind::Var(_) => ty.clone(),
        TypeKind::Arrow { captured, returns } => Type::arrow(erase_tags(captured), erase_tags(returns)),
        TypeKind::Apply { body, .. } => erase_tags(body),
    }
}

struct Occurrence {
    class: ClassId,
    ty: Type,
}

struct Checker<'a> {
    graph: &'a Graph,
    classes: &'a ClassEnv,
    locations: &'a LocationMap,
    diagnostics: &'a mut Diagnostics,
    depth: usize,
    subst: Substitution,
    types: HashMap<TermKey, Type>,
    occurrences: Vec<Occurrence>,
    partial: bool,
    failed: bool,
}

impl Checker<'_> {
    fn render(&self, ty: &Type) -> String {
        erase_tags(&self.subst.resolve(ty))
            .display_with_depth(self.depth)
            .to_string()
    }

    fn report(&mut self, error: CompileError, location: Option<Location>) {
        self.failed = true;
        self.diagnostics
            .push(Diagnostic::new(error).at(self.graph, location));
    }

    fn infer(&mut self, term: &Term) -> Type {
        if let Some(ty) = self.types.get(&term.key()) {
            return ty.clone();
        }
        let ty = match term {
            Term::Value(object) => instantiate(&object.type_of()),
            Term::Overloaded(placeholder) => {
                let ty = instantiate(&placeholder.ty);
                self.occurrences.push(Occurrence {
                    class: placeholder.class,
                    ty: ty.clone(),
                });
                ty
            }
            Term::Apply(node) => {
                let function = self.infer(node.function());
                let argument = match node.argument() {
                    Argument::Term(argument) => self.infer(argument),
                    Argument::Recur(_) => Type::fresh_var(),
                };
                let result = Type::fresh_var();
                if let Err(err) = self.subst.unify(&function, &Type::arrow(argument, result.clone())) {
                    let (expected, found) = match &err {
                        UnifyError::Mismatch { expected, found } => (expected, found),
                        UnifyError::Occurs { var, ty } => (var, ty),
                    };
                    let error = CompileError::TypeMismatch {
                        expected: self.render(expected),
                        found: self.render(found),
                    };
                    let location = self.locations.term(term);
                    self.report(error, location);
                }
                result
            }
        };
        self.types.insert(term.key(), ty.clone());
        ty
    }

    /// Indices of the candidates whose type unifies with the usage
    fn matching(&self, class: &OverloadClass, usage: &Type) -> Vec<usize> {
        class
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| {
                let mut trial = self.subst.clone();
                trial.unify(usage, &instantiate(&candidate.ty)).is_ok()
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Matching candidate strictly more specific than every other match
    fn most_specific(class: &OverloadClass, matches: &[usize]) -> Option<usize> {
        let mut winners = matches.iter().copied().filter(|&m| {
            let specific = &class.candidates[m].ty;
            matches.iter().copied().filter(|&n| n != m).all(|n| {
                let other = &class.candidates[n].ty;
                specializable(other, specific) && !specializable(specific, other)
            })
        });
        let winner = winners.next()?;
        winners.next().is_none().then_some(winner)
    }

    fn commit(
        &mut self,
        class: &OverloadClass,
        usage: &Type,
        index: usize,
        resolved: &mut HashMap<ClassId, Object>,
    ) {
        let candidate = &class.candidates[index];
        if let Err(err) = self.subst.unify(usage, &instantiate(&candidate.ty)) {
            // The trial unification succeeded on the same substitution
            tracing::warn!(%err, "Committed overload no longer unifies");
        }
        tracing::trace!(node = %class.name, ty = %candidate.ty, "Resolved overload");
        resolved.insert(class.id, candidate.instance.clone());
    }

    fn resolve_overloads(&mut self) -> HashMap<ClassId, Object> {
        let mut resolved = HashMap::new();
        let mut pending: Vec<Occurrence> = std::mem::take(&mut self.occurrences);
        let classes = self.classes;

        while !pending.is_empty() {
            let mut progress = false;
            let mut ambiguous = Vec::new();

            for occurrence in pending {
                let Some(class) = classes.get(occurrence.class) else {
                    continue;
                };
                let usage = self.subst.resolve(&occurrence.ty);
                let matches = self.matching(class, &usage);
                match matches.as_slice() {
                    [] => {
                        let error = CompileError::NoValidOverloading {
                            node: class.name.clone(),
                            socket: self.socket_name(class),
                            usage: self.render(&usage),
                        };
                        self.report(error, Some(Location { node: class.node, socket: class.socket }));
                    }
                    [index] => {
                        self.commit(class, &usage, *index, &mut resolved);
                        progress = true;
                    }
                    _ => ambiguous.push((occurrence, matches)),
                }
            }

            if progress {
                pending = ambiguous.into_iter().map(|(o, _)| o).collect();
                continue;
            }

            // Stuck: only a strictly most specific candidate may break a tie
            let mut stuck = Vec::new();
            for (occurrence, matches) in ambiguous {
                let Some(class) = classes.get(occurrence.class) else {
                    continue;
                };
                match (progress, Self::most_specific(class, &matches)) {
                    (false, Some(index)) => {
                        let usage = self.subst.resolve(&occurrence.ty);
                        self.commit(class, &usage, index, &mut resolved);
                        progress = true;
                    }
                    _ => stuck.push((occurrence, matches)),
                }
            }

            if progress {
                pending = stuck.into_iter().map(|(o, _)| o).collect();
                continue;
            }

            if self.partial && !stuck.is_empty() {
                tracing::debug!(unresolved = stuck.len(), "Overloads left open by holes");
                self.failed = true;
                break;
            }

            for (occurrence, matches) in stuck {
                let Some(class) = classes.get(occurrence.class) else {
                    continue;
                };
                let usage = self.subst.resolve(&occurrence.ty);
                let candidates = matches
                    .iter()
                    .map(|&i| class.candidates[i].ty.display_with_depth(self.depth).to_string())
                    .collect();
                let error = CompileError::AmbiguousOverloading {
                    node: class.name.clone(),
                    socket: self.socket_name(class),
                    usage: self.render(&usage),
                    candidates,
                };
                self.report(error, Some(Location { node: class.node, socket: class.socket }));
            }
            break;
        }
        resolved
    }

    fn socket_name(&self, class: &OverloadClass) -> String {
        self.graph
            .port(class.socket)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| class.socket.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{register_std, std_catalog};
    use crate::catalog::{Catalog, NodeDeclaration, NodeDefinition};
    use crate::closure::{NativeFn, Reduced};
    use crate::eval::{Demand, Machine, RuntimeError};
    use crate::parse::parse;
    use lumen_curve::{Curve, Keyframe};
    use lumen_graph::{NodeId, PortId, PortValue};

    fn analyze(graph: &Graph, out: PortId) -> (Option<Analysis>, Diagnostics) {
        analyze_with(&std_catalog("cpu").unwrap(), graph, out)
    }

    fn analyze_with(catalog: &Catalog, graph: &Graph, out: PortId) -> (Option<Analysis>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let parsed = parse(graph, out, catalog, "cpu", None, &mut diagnostics);
        let analysis = sema(graph, parsed, 48, &mut diagnostics);
        (analysis, diagnostics)
    }

    fn binary(graph: &mut Graph, name: &str, a: PortValue, b: PortValue) -> (NodeId, PortId) {
        let catalog = std_catalog("cpu").unwrap();
        let op = catalog.create_node(name).unwrap();
        let kind = |v: &PortValue| match v {
            PortValue::Int(_) => "Std.Num.Int",
            PortValue::Bool(_) => "Std.Num.Bool",
            _ => "Std.Num.Float",
        };
        let lhs = catalog.create_node(kind(&a)).unwrap().with_default("value", a);
        let rhs = catalog.create_node(kind(&b)).unwrap().with_default("value", b);
        let (op_id, op_a, op_b, out) = (op.id, op.inputs[0].id, op.inputs[1].id, op.outputs[0].id);
        let (lhs_id, lhs_out, rhs_id, rhs_out) = (lhs.id, lhs.outputs[0].id, rhs.id, rhs.outputs[0].id);
        graph.add_node(op);
        graph.add_node(lhs);
        graph.add_node(rhs);
        graph.connect(lhs_id, lhs_out, op_id, op_a).unwrap();
        graph.connect(rhs_id, rhs_out, op_id, op_b).unwrap();
        (op_id, out)
    }

    #[test]
    fn test_overload_resolved_by_argument_types() {
        let mut graph = Graph::new("test");
        let (_, out) = binary(&mut graph, "Std.Num.Add", PortValue::Float(1.5), PortValue::Float(2.0));
        let (analysis, diagnostics) = analyze(&graph, out);
        assert!(diagnostics.is_empty(), "{diagnostics}");
        let analysis = analysis.unwrap();
        assert_eq!(analysis.ty, Type::float());
        assert!(!analysis.term.has_placeholders());
        let value = Machine::new(Demand::default()).eval(&analysis.term).unwrap();
        assert_eq!(value, Object::float(3.5));
    }

    #[test]
    fn test_no_valid_overloading_names_socket() {
        let mut graph = Graph::new("test");
        let (op, out) = binary(&mut graph, "Std.Num.LessThan", PortValue::Bool(true), PortValue::Bool(false));
        let (analysis, diagnostics) = analyze(&graph, out);
        assert!(analysis.is_none());
        let diagnostic = diagnostics
            .iter()
            .find(|d| matches!(d.error, CompileError::NoValidOverloading { .. }))
            .unwrap();
        assert_eq!(diagnostic.node, Some(op));
        assert_eq!(diagnostic.socket, Some(out));
        assert_eq!(diagnostic.origin.as_deref(), Some("LessThan.out"));
    }

    #[test]
    fn test_mismatched_connection_is_type_error() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let opacity = catalog.create_node("Std.Image.Opacity").unwrap();
        let int = catalog.create_node("Std.Num.Int").unwrap();
        let (op_id, image_in, out) = (opacity.id, opacity.inputs[0].id, opacity.outputs[0].id);
        let (int_id, int_out) = (int.id, int.outputs[0].id);
        graph.add_node(opacity);
        graph.add_node(int);
        graph.connect(int_id, int_out, op_id, image_in).unwrap();

        let (analysis, diagnostics) = analyze(&graph, out);
        assert!(analysis.is_none());
        assert!(diagnostics.any(|e| matches!(
            e,
            CompileError::TypeMismatch { expected, found } if expected == "Image" && found == "Int"
        )));
    }

    #[test]
    fn test_curve_default_is_sampled_at_demand() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let curve = Curve::from_keyframes([Keyframe::new(0.0, 0.0), Keyframe::new(10.0, 5.0)]).unwrap();
        let node = catalog
            .create_node("Std.Num.Float")
            .unwrap()
            .with_default("value", PortValue::Curve(curve));
        let out = node.outputs[0].id;
        graph.add_node(node);

        let (analysis, diagnostics) = analyze(&graph, out);
        assert!(diagnostics.is_empty(), "{diagnostics}");
        let analysis = analysis.unwrap();
        assert_eq!(analysis.ty, Type::float());
        let at = |t| Machine::new(Demand::at(t)).eval(&analysis.term).unwrap();
        assert_eq!(at(5.0), Object::float(2.5));
        assert_eq!(at(20.0), Object::float(5.0));
    }

    #[test]
    fn test_desugar_keeps_sharing() {
        let curve = Term::value(Object::curve(Curve::constant(1.0)));
        let pair = Term::apply(curve.clone(), curve);
        let out = desugar(&pair, &mut LocationMap::new());
        let Term::Apply(node) = &out else {
            panic!("expected apply node");
        };
        let argument = node.argument().term().unwrap();
        assert!(node.function().ptr_eq(&argument));
    }

    fn identity(args: &[Term], _: &mut Machine) -> Result<Reduced, RuntimeError> {
        Ok(Reduced::Term(args[0].clone()))
    }

    fn increment(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
        Ok(Reduced::Value(Object::int(m.force_int(&args[0])? + 1)))
    }

    const IDENTITY: NativeFn = NativeFn {
        name: "identity",
        arity: 1,
        signature: || {
            let a = Type::fresh_var();
            Type::arrow(a.clone(), a)
        },
        body: identity,
    };

    const INCREMENT: NativeFn = NativeFn {
        name: "increment",
        arity: 1,
        signature: || Type::arrow(Type::int(), Type::int()),
        body: increment,
    };

    #[test]
    fn test_most_specific_candidate_wins() {
        let mut catalog = Catalog::new();
        register_std(&mut catalog, "cpu").unwrap();
        let a = Type::fresh_var();
        catalog
            .declare(NodeDeclaration::new("Test.Id").input("x").output("out", Type::arrow(a.clone(), a)))
            .unwrap();
        catalog.define(NodeDefinition::primitive("Test.Id", "out", "cpu", IDENTITY)).unwrap();
        catalog.define(NodeDefinition::primitive("Test.Id", "out", "cpu", INCREMENT)).unwrap();

        let mut graph = Graph::new("test");
        let id = catalog.create_node("Test.Id").unwrap();
        let int = catalog.create_node("Std.Num.Int").unwrap().with_default("value", PortValue::Int(4));
        let (id_id, x, out) = (id.id, id.inputs[0].id, id.outputs[0].id);
        let (int_id, int_out) = (int.id, int.outputs[0].id);
        graph.add_node(id);
        graph.add_node(int);
        graph.connect(int_id, int_out, id_id, x).unwrap();

        let (analysis, diagnostics) = analyze_with(&catalog, &graph, out);
        assert!(diagnostics.is_empty(), "{diagnostics}");
        let analysis = analysis.unwrap();
        assert_eq!(analysis.ty, Type::int());
        let value = Machine::new(Demand::default()).eval(&analysis.term).unwrap();
        assert_eq!(value, Object::int(5));
    }

    #[test]
    fn test_equally_specific_candidates_are_ambiguous() {
        let mut catalog = Catalog::new();
        catalog
            .declare(NodeDeclaration::new("Test.Pick").output("out", Type::fresh_var()))
            .unwrap();
        catalog
            .define(NodeDefinition::new("Test.Pick", "out", "cpu", Type::int(), || Object::int(1)))
            .unwrap();
        catalog
            .define(NodeDefinition::new("Test.Pick", "out", "cpu", Type::int(), || Object::int(2)))
            .unwrap();

        let mut graph = Graph::new("test");
        let pick = catalog.create_node("Test.Pick").unwrap();
        let out = pick.outputs[0].id;
        graph.add_node(pick);

        let (analysis, diagnostics) = analyze_with(&catalog, &graph, out);
        assert!(analysis.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics.any(|e| matches!(
            e,
            CompileError::AmbiguousOverloading { candidates, .. } if candidates == &["Int", "Int"]
        )));
    }
}
