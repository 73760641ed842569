// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard node library.
//!
//! Every node is declared once and defined for the requested backend.
//! Arithmetic nodes carry one definition per numeric type, so a graph using
//! them exercises overload resolution.

pub mod flow;
pub mod image;
pub mod num;
pub mod time;

use crate::catalog::{Catalog, CatalogError, NodeDeclaration, NodeDefinition};
use crate::closure::NativeFn;

/// Register the standard library for one backend
pub fn register_std(catalog: &mut Catalog, backend: &str) -> Result<(), CatalogError> {
    num::register(catalog, backend)?;
    time::register(catalog, backend)?;
    flow::register(catalog, backend)?;
    image::register(catalog, backend)?;
    tracing::debug!(backend, declarations = catalog.len(), "Registered standard library");
    Ok(())
}

/// A catalog holding only the standard library
pub fn std_catalog(backend: &str) -> Result<Catalog, CatalogError> {
    let mut catalog = Catalog::new();
    register_std(&mut catalog, backend)?;
    Ok(catalog)
}

/// Declare a node and define one output with each primitive
fn declare_with(
    catalog: &mut Catalog,
    backend: &str,
    declaration: NodeDeclaration,
    output: &str,
    primitives: &[NativeFn],
) -> Result<(), CatalogError> {
    let name = declaration.name().to_string();
    catalog.declare(declaration)?;
    for primitive in primitives {
        catalog.define(NodeDefinition::primitive(name.as_str(), output, backend, *primitive))?;
    }
    Ok(())
}
