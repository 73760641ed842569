// SPDX-License-Identifier: MIT OR Apache-2.0
//! Term-level rewrite point. No rewrites are performed yet.

use crate::executable::Executable;

/// Run the optimizer over an executable
pub fn optimize(executable: Executable, enabled: bool) -> Executable {
    tracing::trace!(enabled, "Optimize pass");
    executable
}
