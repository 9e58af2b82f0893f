//! Command handlers.

pub mod config;
pub mod reset;
pub mod scan;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Expand `~` and canonicalize a library root, so the same folder always maps
/// to the same snapshot store.
pub fn resolve_root(root: &Path) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::tilde(&root.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    let resolved = std::fs::canonicalize(&path).with_context(|| {
        format!("Library folder does not exist: {path:?}\n\n  Hint: Check the path and try again.")
    })?;
    if !resolved.is_dir() {
        anyhow::bail!("Not a folder: {resolved:?}");
    }
    Ok(resolved)
}

/// Human-readable byte count with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
