// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph compiler and lazy evaluation runtime for Lumen.
//!
//! A compositing graph built in the editor is compiled into an
//! [`Executable`]: a term of closures and applications that is evaluated
//! lazily, once per frame demand.
//!
//! ## Architecture
//!
//! The compiler runs a fixed sequence of stages over a [`Pipeline`]:
//! - `input`: validate the requested output socket
//! - `parse`: translate sockets into terms, looking up definitions in the
//!   [`Catalog`] and emitting overload placeholders where several apply
//! - `sema`: desugar animated values, infer types and resolve overloads
//! - `verify`: check the output against the configured contract
//! - `optimize`: hook for term rewrites
//!
//! Problems are collected as [`Diagnostics`] rather than aborting the
//! compile. The [`Compiler`] service keeps the last good executable live
//! while a broken graph is being edited.

pub mod builtin;
pub mod cache;
pub mod catalog;
pub mod closure;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod eval;
pub mod executable;
pub mod frame;
pub mod location;
pub mod object;
pub mod optimize;
pub mod overload;
pub mod parse;
pub mod pipeline;
pub mod sema;
pub mod term;
pub mod types;
pub mod unify;
pub mod verify;

pub use builtin::{register_std, std_catalog};
pub use cache::SocketInstanceCache;
pub use catalog::{Catalog, CatalogError, DefinitionId, NodeDeclaration, NodeDefinition};
pub use closure::{Closure, NativeFn, Primitive, Reduced};
pub use compiler::{CompileReport, Compiler};
pub use config::{CompilerConfig, ConfigError, OutputContract};
pub use diagnostic::{CompileError, Diagnostic, Diagnostics};
pub use eval::{Demand, Machine, RuntimeError};
pub use executable::Executable;
pub use frame::{Image, Transform};
pub use object::{Object, Value};
pub use pipeline::{compile, CompileOutcome, CompileRequest, Pipeline};
pub use term::Term;
pub use types::{Type, TypeKind, ValueType};
pub use unify::{generalize, specializable, Substitution, UnifyError};
