// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile pipeline.
//!
//! Stages run in a fixed order, enforced by the type of the pipeline:
//!
//! ```text
//! init -> input -> parse -> sema -> verify -> optimize -> finish
//! ```
//!
//! Each stage consumes the result of the one before it, so data a stage
//! has subsumed is dropped as it goes. Compile problems never abort a
//! stage: they are appended to the diagnostics and set the sticky failed
//! flag, and later stages still run on whatever partial result exists.

use crate::cache::SocketInstanceCache;
use crate::catalog::Catalog;
use crate::config::CompilerConfig;
use crate::diagnostic::{CompileError, Diagnostic, Diagnostics};
use crate::executable::Executable;
use crate::optimize::optimize;
use crate::parse::{parse, ParseOutput};
use crate::sema::{sema, Analysis};
use crate::verify::verify;
use lumen_graph::{Graph, PortId};

/// Everything a compile reads
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Source graph
    pub graph: &'a Graph,
    /// Output socket to compile
    pub output: PortId,
    /// Declarations and definitions
    pub catalog: &'a Catalog,
    /// Instance cache shared across compiles
    pub cache: Option<&'a SocketInstanceCache>,
    /// Compiler settings
    pub config: &'a CompilerConfig,
}

/// Result of a full compile
#[derive(Debug)]
pub struct CompileOutcome {
    /// The executable, present only when no stage failed
    pub executable: Option<Executable>,
    /// Every diagnostic, in the order found
    pub diagnostics: Diagnostics,
}

impl CompileOutcome {
    /// Whether an executable was produced
    pub fn is_success(&self) -> bool {
        self.executable.is_some()
    }
}

/// Freshly created pipeline
#[derive(Debug)]
pub struct Init;

/// After `input`
#[derive(Debug)]
pub struct Loaded<'a> {
    request: CompileRequest<'a>,
    valid_output: bool,
}

/// After `parse`
#[derive(Debug)]
pub struct Parsed<'a> {
    request: CompileRequest<'a>,
    parsed: Option<ParseOutput>,
}

/// After `sema`
#[derive(Debug)]
pub struct Analyzed<'a> {
    request: CompileRequest<'a>,
    analysis: Option<Analysis>,
}

/// After `verify`
#[derive(Debug)]
pub struct Verified<'a> {
    request: CompileRequest<'a>,
    executable: Option<Executable>,
}

/// After `optimize`
#[derive(Debug)]
pub struct Optimized {
    executable: Option<Executable>,
}

/// A compile in progress
#[derive(Debug)]
pub struct Pipeline<S> {
    diagnostics: Diagnostics,
    failed: bool,
    state: S,
}

impl<S> Pipeline<S> {
    /// Diagnostics so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether any stage has failed
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Run a stage, setting the failed flag if it added diagnostics
    fn stage<T>(mut self, name: &str, run: impl FnOnce(S, &mut Diagnostics) -> T) -> Pipeline<T> {
        let before = self.diagnostics.len();
        let state = run(self.state, &mut self.diagnostics);
        let added = self.diagnostics.len() - before;
        self.failed |= added > 0;
        tracing::debug!(stage = name, diagnostics = added, failed = self.failed, "Stage finished");
        Pipeline {
            diagnostics: self.diagnostics,
            failed: self.failed,
            state,
        }
    }
}

impl Pipeline<Init> {
    /// Start with empty diagnostics
    pub fn init() -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            failed: false,
            state: Init,
        }
    }

    /// Load the request. Fails fast when the output is not an output
    /// socket of the graph.
    pub fn input<'a>(self, request: CompileRequest<'a>) -> Pipeline<Loaded<'a>> {
        self.stage("input", |_, diagnostics| {
            let valid_output = request
                .graph
                .port(request.output)
                .is_some_and(|port| !port.is_input());
            if !valid_output {
                diagnostics.push(Diagnostic::new(CompileError::InvalidOutputSocket(request.output)));
            }
            Loaded { request, valid_output }
        })
    }
}

impl<'a> Pipeline<Loaded<'a>> {
    /// Translate the graph into a term
    pub fn parse(self) -> Pipeline<Parsed<'a>> {
        self.stage("parse", |Loaded { request, valid_output }, diagnostics| {
            let parsed = valid_output.then(|| {
                parse(
                    request.graph,
                    request.output,
                    request.catalog,
                    &request.config.backend,
                    request.cache,
                    diagnostics,
                )
            });
            Parsed { request, parsed }
        })
    }
}

impl<'a> Pipeline<Parsed<'a>> {
    /// Desugar, infer types and resolve overloads
    pub fn sema(self) -> Pipeline<Analyzed<'a>> {
        self.stage("sema", |Parsed { request, parsed }, diagnostics| {
            let analysis = parsed.and_then(|parsed| {
                sema(request.graph, parsed, request.config.type_print_depth, diagnostics)
            });
            Analyzed { request, analysis }
        })
    }
}

impl<'a> Pipeline<Analyzed<'a>> {
    /// Check the output type
    pub fn verify(self) -> Pipeline<Verified<'a>> {
        self.stage("verify", |Analyzed { request, analysis }, diagnostics| {
            let expected = request.config.output.ty();
            let executable = analysis.and_then(|analysis| {
                verify(
                    request.graph,
                    analysis,
                    &expected,
                    request.config.type_print_depth,
                    diagnostics,
                )
            });
            Verified { request, executable }
        })
    }
}

impl Pipeline<Verified<'_>> {
    /// Run the optimizer hook
    pub fn optimize(self) -> Pipeline<Optimized> {
        self.stage("optimize", |Verified { request, executable }, _| {
            let enabled = request.config.optimize;
            let executable = executable.map(|e| optimize(e, enabled));
            Optimized { executable }
        })
    }
}

impl Pipeline<Optimized> {
    /// Final result. The executable is withheld if any stage failed.
    pub fn finish(self) -> CompileOutcome {
        let executable = if self.failed { None } else { self.state.executable };
        CompileOutcome {
            executable,
            diagnostics: self.diagnostics,
        }
    }
}

/// Run every stage in order
pub fn compile(request: CompileRequest<'_>) -> CompileOutcome {
    let span = tracing::debug_span!("compile", output = %request.output);
    let _guard = span.enter();
    Pipeline::init()
        .input(request)
        .parse()
        .sema()
        .verify()
        .optimize()
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{register_std, std_catalog};
    use crate::catalog::{NodeDeclaration, NodeDefinition};
    use crate::closure::{NativeFn, Reduced};
    use crate::config::OutputContract;
    use crate::eval::{Demand, Machine, RuntimeError};
    use crate::frame::Transform;
    use crate::object::Object;
    use crate::term::Term;
    use crate::types::Type;
    use lumen_graph::PortValue;

    fn run(catalog: &Catalog, graph: &Graph, output: PortId, contract: OutputContract) -> CompileOutcome {
        let config = CompilerConfig {
            output: contract,
            ..CompilerConfig::default()
        };
        compile(CompileRequest {
            graph,
            output,
            catalog,
            cache: None,
            config: &config,
        })
    }

    #[test]
    fn test_invalid_output_fails_fast() {
        let catalog = std_catalog("cpu").unwrap();
        let config = CompilerConfig::default();
        let mut graph = Graph::new("test");
        let node = catalog.create_node("Std.Image.Solid").unwrap();
        let input = node.inputs[0].id;
        graph.add_node(node);

        let request = CompileRequest {
            graph: &graph,
            output: input,
            catalog: &catalog,
            cache: None,
            config: &config,
        };
        let loaded = Pipeline::init().input(request);
        assert!(loaded.failed());
        let outcome = loaded.parse().sema().verify().optimize().finish();
        assert!(outcome.executable.is_none());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics.any(|e| matches!(e, CompileError::InvalidOutputSocket(_))));
    }

    #[test]
    fn test_stages_run_in_order() {
        let catalog = std_catalog("cpu").unwrap();
        let config = CompilerConfig {
            output: OutputContract::Int,
            ..CompilerConfig::default()
        };
        let mut graph = Graph::new("test");
        let node = catalog
            .create_node("Std.Num.Int")
            .unwrap()
            .with_default("value", PortValue::Int(5));
        let out = node.outputs[0].id;
        graph.add_node(node);

        let request = CompileRequest {
            graph: &graph,
            output: out,
            catalog: &catalog,
            cache: None,
            config: &config,
        };
        let parsed = Pipeline::init().input(request).parse();
        assert!(!parsed.failed());
        let verified = parsed.sema().verify();
        assert!(verified.diagnostics().is_empty());
        let outcome = verified.optimize().finish();
        let exe = outcome.executable.unwrap();
        assert_eq!(exe.execute_at(0.0).unwrap(), Object::int(5));
    }

    #[test]
    fn test_constant_graph_ignores_demand() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let node = catalog.create_node("Std.Transform.Identity").unwrap();
        let out = node.outputs[0].id;
        graph.add_node(node);

        let exe = run(&catalog, &graph, out, OutputContract::Transform).executable.unwrap();
        for time in [0.0, 1.5, 100.0] {
            assert_eq!(exe.execute_at(time).unwrap(), Object::transform(Transform::IDENTITY));
        }
    }

    #[test]
    fn test_recompiling_gives_equal_results() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let add = catalog.create_node("Std.Num.Add").unwrap();
        let lhs = catalog.create_node("Std.Num.Float").unwrap().with_default("value", PortValue::Float(0.25));
        let (add_id, a, b, out) = (add.id, add.inputs[0].id, add.inputs[1].id, add.outputs[0].id);
        let (lhs_id, lhs_out) = (lhs.id, lhs.outputs[0].id);
        graph.add_node(add);
        graph.add_node(lhs);
        graph.connect(lhs_id, lhs_out, add_id, a).unwrap();
        graph.connect(lhs_id, lhs_out, add_id, b).unwrap();

        let first = run(&catalog, &graph, out, OutputContract::Float).executable.unwrap();
        let second = run(&catalog, &graph, out, OutputContract::Float).executable.unwrap();
        assert_eq!(first.ty(), second.ty());
        assert_eq!(first.execute_at(2.0).unwrap(), second.execute_at(2.0).unwrap());
        assert_eq!(first.execute_at(2.0).unwrap(), Object::float(0.5));
    }

    #[test]
    fn test_declaration_defaults_fill_unconnected_inputs() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let node = catalog.create_node("Std.Image.Solid").unwrap();
        let out = node.outputs[0].id;
        graph.add_node(node);

        let outcome = run(&catalog, &graph, out, OutputContract::Image);
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);
        let image = outcome.executable.unwrap().execute_at(0.0).unwrap();
        let image = image.as_image().unwrap();
        assert_eq!((image.width(), image.height()), (16, 16));
        assert_eq!(image.pixel(0, 0), Some([1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_output_contract_mismatch_withholds_executable() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let node = catalog.create_node("Std.Time.Now").unwrap();
        let out = node.outputs[0].id;
        graph.add_node(node);

        let outcome = run(&catalog, &graph, out, OutputContract::Image);
        assert!(!outcome.is_success());
        assert!(outcome.diagnostics.any(|e| matches!(e, CompileError::InvalidOutputType { .. })));
    }

    // (Int -> Int) -> Int -> Int
    fn factorial_step(args: &[Term], m: &mut Machine) -> Result<Reduced, RuntimeError> {
        let n = m.force_int(&args[1])?;
        if n <= 1 {
            return Ok(Reduced::Value(Object::int(1)));
        }
        let rest = m.force_int(&Term::apply(args[0].clone(), Term::value(Object::int(n - 1))))?;
        Ok(Reduced::Value(Object::int(n * rest)))
    }

    const FACTORIAL_STEP: NativeFn = NativeFn {
        name: "factorial_step",
        arity: 2,
        signature: || {
            let int_fn = Type::arrow(Type::int(), Type::int());
            Type::arrow(int_fn.clone(), int_fn)
        },
        body: factorial_step,
    };

    #[test]
    fn test_fix_node_builds_recursive_function() {
        let mut catalog = Catalog::new();
        register_std(&mut catalog, "cpu").unwrap();
        catalog
            .declare(NodeDeclaration::new("Test.FactorialStep").output("step", (FACTORIAL_STEP.signature)()))
            .unwrap();
        catalog
            .define(NodeDefinition::primitive("Test.FactorialStep", "step", "cpu", FACTORIAL_STEP))
            .unwrap();

        let mut graph = Graph::new("test");
        let step = catalog.create_node("Test.FactorialStep").unwrap();
        let fix = catalog.create_node("Std.Flow.Fix").unwrap();
        let (step_id, step_out) = (step.id, step.outputs[0].id);
        let (fix_id, generator, out) = (fix.id, fix.inputs[0].id, fix.outputs[0].id);
        graph.add_node(step);
        graph.add_node(fix);
        graph.connect(step_id, step_out, fix_id, generator).unwrap();

        let outcome = run(&catalog, &graph, out, OutputContract::Any);
        assert!(outcome.diagnostics.is_empty(), "{}", outcome.diagnostics);
        let exe = outcome.executable.unwrap();
        assert_eq!(exe.ty(), &Type::arrow(Type::int(), Type::int()));

        let int = |v| Term::value(Object::int(v));
        let mut m = Machine::new(Demand::default());
        let direct = m.eval(&Term::apply(exe.term().clone(), int(5))).unwrap();
        assert_eq!(direct, Object::int(120));

        let step: Term = FACTORIAL_STEP.instance().into();
        let mut unrolled = exe.term().clone();
        for _ in 0..3 {
            unrolled = Term::apply(step.clone(), unrolled);
            assert_eq!(m.eval(&Term::apply(unrolled.clone(), int(5))).unwrap(), direct);
        }
    }

    #[test]
    fn test_type_errors_are_reported_alongside_missing_inputs() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let choose = catalog.create_node("Std.Flow.If").unwrap();
        let less = catalog.create_node("Std.Num.LessThan").unwrap();
        let lhs = catalog.create_node("Std.Num.Bool").unwrap().with_default("value", PortValue::Bool(true));
        let rhs = catalog.create_node("Std.Num.Bool").unwrap().with_default("value", PortValue::Bool(false));
        let solid = catalog.create_node("Std.Image.Solid").unwrap();
        let over = catalog.create_node("Std.Image.Over").unwrap();

        let (choose_id, out) = (choose.id, choose.outputs[0].id);
        let (condition, then, otherwise) = (choose.inputs[0].id, choose.inputs[1].id, choose.inputs[2].id);
        let (less_id, less_a, less_b, less_out) =
            (less.id, less.inputs[0].id, less.inputs[1].id, less.outputs[0].id);
        let (lhs_id, lhs_out, rhs_id, rhs_out) = (lhs.id, lhs.outputs[0].id, rhs.id, rhs.outputs[0].id);
        let (solid_id, solid_out, over_id, over_out) = (solid.id, solid.outputs[0].id, over.id, over.outputs[0].id);
        for node in [choose, less, lhs, rhs, solid, over] {
            graph.add_node(node);
        }
        graph.connect(lhs_id, lhs_out, less_id, less_a).unwrap();
        graph.connect(rhs_id, rhs_out, less_id, less_b).unwrap();
        graph.connect(less_id, less_out, choose_id, condition).unwrap();
        graph.connect(solid_id, solid_out, choose_id, then).unwrap();
        graph.connect(over_id, over_out, choose_id, otherwise).unwrap();

        let outcome = run(&catalog, &graph, out, OutputContract::Image);
        assert!(!outcome.is_success());
        let missing = outcome
            .diagnostics
            .iter()
            .filter(|d| matches!(d.error, CompileError::MissingInput { .. }))
            .count();
        assert_eq!(missing, 2);
        let overload = outcome
            .diagnostics
            .iter()
            .find(|d| matches!(d.error, CompileError::NoValidOverloading { .. }))
            .unwrap();
        assert_eq!(overload.origin.as_deref(), Some("LessThan.out"));
        assert!(!outcome.diagnostics.any(|e| matches!(e, CompileError::AmbiguousOverloading { .. })));
    }

    #[test]
    fn test_open_overload_behind_a_hole_is_not_ambiguous() {
        let catalog = std_catalog("cpu").unwrap();
        let mut graph = Graph::new("test");
        let add = catalog.create_node("Std.Num.Add").unwrap();
        let out = add.outputs[0].id;
        graph.add_node(add);

        let outcome = run(&catalog, &graph, out, OutputContract::Any);
        assert!(!outcome.is_success());
        assert_eq!(outcome.diagnostics.len(), 2);
        assert!(outcome.diagnostics.iter().all(|d| matches!(d.error, CompileError::MissingInput { .. })));
    }
}
