use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::models::LicenseResult;

/// Render a colored terminal report. `results` are sorted by module path.
pub fn render(results: &mut [LicenseResult], path: &Path, quiet: bool) -> Result<()> {
    results.sort_by(|a, b| a.module().path.cmp(&b.module().path));

    let total = results.len();
    let found = results.iter().filter(|r| r.is_success()).count();
    let failed = total - found;
    let cancelled = results
        .iter()
        .filter(|r| r.error().is_some_and(|e| e.is_cancelled()))
        .count();

    if quiet {
        println!(
            "Total: {}  Found: {}  Failed: {}  Cancelled: {}",
            total,
            found.to_string().green(),
            failed.to_string().red(),
            cancelled,
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "go-license-checkr".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(" Scanning: {}\n", path.display());

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    println!(" │  {:<48} │", format!("Total modules   : {}", total));
    println!(
        " │  {:<48} │",
        format!(
            "{}  Found         : {:>4}  {}",
            "✓".green(),
            found,
            summarize_types(results)
        )
    );
    println!(
        " │  {:<48} │",
        format!(
            "{}  Failed        : {:>4}  ({} cancelled)",
            "✗".red(),
            failed,
            cancelled
        )
    );
    println!(" └────────────────────────────────────────────────────┘\n");

    if total > 0 {
        println!("{}", build_table(results));
    }

    Ok(())
}

fn build_table(results: &[LicenseResult]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Module").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("License").add_attribute(Attribute::Bold),
            Cell::new("Source / Error").add_attribute(Attribute::Bold),
        ]);

    for result in results {
        let module = result.module();
        let (license, detail) = match result {
            LicenseResult::Success { license, .. } if license.license_type.is_empty() => {
                (Cell::new("(none)").fg(Color::DarkGrey), Cell::new(&license.source))
            }
            LicenseResult::Success { license, .. } => (
                Cell::new(&license.license_type).fg(Color::Green),
                Cell::new(&license.source),
            ),
            LicenseResult::Failure { error, .. } => (
                Cell::new("✗ failed").fg(Color::Red),
                Cell::new(error.to_string()).fg(Color::Red),
            ),
        };

        table.add_row(vec![
            Cell::new(&module.path),
            Cell::new(&module.version),
            license,
            detail,
        ]);
    }

    table
}

/// Top three license types among successful lookups, e.g. `[MIT (4), BSD-3-Clause (2)]`.
fn summarize_types(results: &[LicenseResult]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for license in results.iter().filter_map(LicenseResult::license) {
        let name = if license.license_type.is_empty() {
            "(none)"
        } else {
            license.license_type.as_str()
        };
        *counts.entry(name).or_insert(0) += 1;
    }

    let mut pairs: Vec<(&str, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let summary: Vec<String> = pairs
        .iter()
        .take(3)
        .map(|(name, cnt)| format!("{} ({})", name, cnt))
        .collect();

    if summary.is_empty() {
        String::new()
    } else {
        format!("[{}]", summary.join(", "))
    }
}
