//! Enumerate the dependency modules of a Go project.
//!
//! - [`gomod`]: reads `require` directives straight from `go.mod`.
//! - [`golist`]: asks the Go toolchain via `go list -m -json all`.

use std::path::Path;

use anyhow::Result;
use tracing::warn;

use crate::models::Module;

pub mod golist;
pub mod gomod;

pub trait ModuleLoader {
    fn load(&self, path: &Path) -> Result<Vec<Module>>;
}

/// Drop modules marked `// indirect`.
pub fn remove_indirect(modules: Vec<Module>) -> Vec<Module> {
    modules.into_iter().filter(|m| !m.indirect).collect()
}

/// Drop modules the loader could not resolve, logging each one.
pub fn remove_errored(modules: Vec<Module>) -> Vec<Module> {
    modules
        .into_iter()
        .filter(|m| match &m.error {
            Some(err) => {
                let detail = serde_json::to_string(err).unwrap_or_else(|_| err.err.clone());
                warn!("Got error from {} {} {}", m.path, m.version, detail);
                false
            }
            None => true,
        })
        .collect()
}
