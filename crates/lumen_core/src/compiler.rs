// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiler service.
//!
//! Owns the catalog, the configuration and the instance cache, and holds
//! the executable currently in use. Overlapping compile requests are
//! serialized. The current executable is replaced only by a compile that
//! produced no diagnostics; a failed compile leaves the previous one live.

use crate::builtin::register_std;
use crate::cache::SocketInstanceCache;
use crate::catalog::{Catalog, CatalogError};
use crate::config::CompilerConfig;
use crate::diagnostic::Diagnostics;
use crate::eval::{Demand, RuntimeError};
use crate::executable::Executable;
use crate::object::Object;
use crate::pipeline::{compile, CompileRequest};
use lumen_graph::{Graph, PortId};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of one compile through the service
#[derive(Debug)]
pub struct CompileReport {
    /// Diagnostics of this compile
    pub diagnostics: Diagnostics,
    /// Whether the current executable was replaced
    pub swapped: bool,
    /// Sequence number of the compile
    pub generation: u64,
}

/// Long-lived compiler for one graph editor
#[derive(Debug)]
pub struct Compiler {
    catalog: Arc<Catalog>,
    config: CompilerConfig,
    cache: SocketInstanceCache,
    compile_lock: Mutex<()>,
    current: RwLock<Option<Arc<Executable>>>,
    generation: AtomicU64,
}

impl Compiler {
    /// Create a compiler over a catalog
    pub fn new(catalog: Arc<Catalog>, config: CompilerConfig) -> Self {
        Self {
            catalog,
            config,
            cache: SocketInstanceCache::new(),
            compile_lock: Mutex::new(()),
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a compiler with the standard library for the configured backend
    pub fn with_std(config: CompilerConfig) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::new();
        register_std(&mut catalog, &config.backend)?;
        Ok(Self::new(Arc::new(catalog), config))
    }

    /// The catalog
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// The instance cache
    pub fn cache(&self) -> &SocketInstanceCache {
        &self.cache
    }

    /// Compile `output`, swapping in the result if it succeeded
    pub fn compile(&self, graph: &Graph, output: PortId) -> CompileReport {
        let _serialized = self.compile_lock.lock();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let outcome = compile(CompileRequest {
            graph,
            output,
            catalog: &self.catalog,
            cache: Some(&self.cache),
            config: &self.config,
        });

        let swapped = match outcome.executable {
            Some(executable) => {
                *self.current.write() = Some(Arc::new(executable));
                tracing::info!(generation, "Executable swapped");
                true
            }
            None => {
                tracing::warn!(
                    generation,
                    diagnostics = outcome.diagnostics.len(),
                    kept_previous = self.current.read().is_some(),
                    "Compile failed"
                );
                false
            }
        };

        CompileReport {
            diagnostics: outcome.diagnostics,
            swapped,
            generation,
        }
    }

    /// The executable in use, if any compile has succeeded
    pub fn executable(&self) -> Option<Arc<Executable>> {
        self.current.read().clone()
    }

    /// Execute the current executable. `None` before the first success.
    pub fn execute(&self, demand: Demand) -> Option<Result<Object, RuntimeError>> {
        self.executable().map(|e| e.execute(demand))
    }

    /// Drop cached instances for sockets no longer in the graph
    pub fn purge_cache(&self, graph: &Graph) {
        self.cache.retain_sockets(|socket| graph.contains_port(socket));
    }
}
