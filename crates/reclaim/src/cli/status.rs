//! The `reclaim status` command.

use std::path::PathBuf;

use clap::Args;
use reclaim_core::{Config, Phase, PhaseState, SnapshotStore};

use super::{format_bytes, resolve_root};

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Library folder that was scanned
    #[arg(required = true)]
    pub root: PathBuf,

    /// Print the dashboard as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

fn describe(state: PhaseState, total: usize) -> String {
    match state {
        PhaseState::NotStarted => "not started".to_string(),
        PhaseState::InProgress { offset } => {
            let percent = offset as f64 * 100.0 / total.max(1) as f64;
            format!("{offset}/{total} ({percent:.0}%)")
        }
        PhaseState::Complete => "complete".to_string(),
    }
}

/// Execute the status command.
pub fn execute(args: StatusArgs, config: &Config) -> anyhow::Result<()> {
    let root = resolve_root(&args.root)?;
    let store = SnapshotStore::open(config.store_dir_for(&root))?;
    if !store.has_collection() {
        println!("No scan recorded for {}. Run `reclaim scan` first.", root.display());
        return Ok(());
    }

    let dashboard = store.dashboard();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    let total = store.total_items();
    println!("Library:  {}", root.display());
    println!("Items:    {total} (chunks of {})", store.chunk_size());
    println!();
    for phase in Phase::ALL {
        println!("  {:<12} {}", phase.as_str(), describe(store.phase_state(phase), total));
    }
    println!();
    for cell in dashboard.cells.iter().filter(|c| c.count > 0) {
        println!(
            "  {:<18} {:>6} items {:>11}",
            cell.category.label(),
            cell.count,
            format_bytes(cell.bytes)
        );
    }
    println!("  {:<18} {:>24}", "Total", format_bytes(dashboard.total_bytes));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_phase_states() {
        assert_eq!(describe(PhaseState::NotStarted, 10), "not started");
        assert_eq!(describe(PhaseState::InProgress { offset: 5 }, 20), "5/20 (25%)");
        assert_eq!(describe(PhaseState::Complete, 10), "complete");
    }
}
