use std::io::Write;

use anyhow::Result;

use crate::models::LicenseResult;

/// Write one result as a single JSON line.
pub fn write_line<W: Write>(out: &mut W, result: &LicenseResult) -> Result<()> {
    serde_json::to_writer(&mut *out, result)?;
    writeln!(out)?;
    Ok(())
}
