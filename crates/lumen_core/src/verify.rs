// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output type postcondition.

use crate::diagnostic::{CompileError, Diagnostic, Diagnostics};
use crate::executable::Executable;
use crate::sema::Analysis;
use crate::types::Type;
use crate::unify::{instantiate, Substitution};
use lumen_graph::Graph;

/// Check that the analyzed term produces the expected output type.
///
/// On success the term and its type are passed through unchanged.
pub fn verify(
    graph: &Graph,
    analysis: Analysis,
    expected: &Type,
    print_depth: usize,
    diagnostics: &mut Diagnostics,
) -> Option<Executable> {
    let mut subst = Substitution::new();
    match subst.unify(&instantiate(expected), &analysis.ty) {
        Ok(()) => {
            tracing::debug!(ty = %analysis.ty, "Output type verified");
            Some(Executable::new(analysis.term, analysis.ty))
        }
        Err(_) => {
            diagnostics.push(
                Diagnostic::new(CompileError::InvalidOutputType {
                    expected: expected.display_with_depth(print_depth).to_string(),
                    found: analysis.ty.display_with_depth(print_depth).to_string(),
                })
                .at(graph, analysis.location),
            );
            None
        }
    }
}
