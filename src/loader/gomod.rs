use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::models::Module;

/// Loader reading the `require` directives of `go.mod`.
///
/// Handles both `require path version` and parenthesised blocks. A trailing
/// `// indirect` comment marks the module indirect. Other directives are
/// ignored.
pub struct GoModLoader;

impl GoModLoader {
    pub fn new() -> Self {
        Self
    }
}

impl super::ModuleLoader for GoModLoader {
    fn load(&self, path: &Path) -> Result<Vec<Module>> {
        debug!("Load modules from go.mod");

        let mod_path = path.join("go.mod");
        let content = std::fs::read_to_string(&mod_path)
            .with_context(|| format!("failed to read {}", mod_path.display()))?;
        let modules = parse_requires(&content)?;

        debug!(
            "{} modules loaded (go.mod {} bytes)",
            modules.len(),
            content.len()
        );
        Ok(modules)
    }
}

fn parse_requires(content: &str) -> Result<Vec<Module>> {
    let spec = Regex::new(r#"^"?([^\s"]+)"?\s+([^\s/]+)\s*(?://\s*(.*))?$"#)?;
    let mut modules = Vec::new();
    let mut in_block = false;

    for line in content.lines() {
        let line = line.trim();

        let entry = if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            line
        } else if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim_start();
            if rest.starts_with('(') {
                in_block = true;
                continue;
            }
            if rest.len() == line.len() - "require".len() {
                // `requirefoo`, not a directive
                continue;
            }
            rest
        } else {
            continue;
        };

        if entry.is_empty() || entry.starts_with("//") {
            continue;
        }
        if let Some(caps) = spec.captures(entry) {
            let indirect = caps
                .get(3)
                .and_then(|c| c.as_str().split(';').next())
                .is_some_and(|w| w.trim() == "indirect");
            modules.push(Module::new(&caps[1], &caps[2], indirect));
        }
    }

    Ok(modules)
}
