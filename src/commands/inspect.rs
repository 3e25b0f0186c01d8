//! Commands that inspect previously written output.

use anyhow::{Context, Result};
use profile_convert::output::read_records;
use std::collections::BTreeMap;
use std::path::Path;

/// Validate a records JSON file and print a short summary
pub fn validate_records_file(file_path: &Path) -> Result<()> {
    println!("Validating records: {}", file_path.display());

    let records = read_records(file_path)
        .with_context(|| format!("Invalid records file {}", file_path.display()))?;

    let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
    let mut stacks = std::collections::HashSet::new();
    for record in &records {
        *by_type.entry(record.get("valueTypes").unwrap_or("?")).or_default() += 1;
        if let Some(id) = record.get("stackID") {
            stacks.insert(id);
        }
    }

    println!("✓ Valid records JSON");
    println!("  Records: {}", records.len());
    println!("  Unique stacks: {}", stacks.len());
    for (value_type, count) in by_type {
        println!("  {}: {}", value_type, count);
    }

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("profile-convert v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Converts pprof and JFR profiler uploads into per-stack sample records.");
}
