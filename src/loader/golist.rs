use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::models::Module;

/// Loader asking the Go toolchain for the full module graph.
///
/// Requires `go` on `PATH`. Per-module resolution failures are kept in
/// [`Module::error`] rather than failing the load.
pub struct GoListLoader;

impl GoListLoader {
    pub fn new() -> Self {
        Self
    }
}

impl super::ModuleLoader for GoListLoader {
    fn load(&self, path: &Path) -> Result<Vec<Module>> {
        debug!("Load modules from go list");

        let output = Command::new("go")
            .args(["list", "-m", "-json", "all"])
            .current_dir(path)
            .output()
            .context("failed to run go list")?;

        if !output.status.success() {
            bail!(
                "go list exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let modules = parse_module_stream(&output.stdout)?;
        debug!(
            "{} modules loaded (go list {} bytes)",
            modules.len(),
            output.stdout.len()
        );
        Ok(modules)
    }
}

/// `go list -json` prints one object after another without separators.
fn parse_module_stream(bytes: &[u8]) -> Result<Vec<Module>> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<Module>()
        .collect::<Result<Vec<_>, _>>()
        .context("failed to load modules")
}
