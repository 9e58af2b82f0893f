//! The `reclaim reset` command.

use std::path::PathBuf;

use clap::Args;
use reclaim_core::{Config, SnapshotStore};

use super::resolve_root;

/// Arguments for the `reset` command.
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Library folder whose recorded scan should be discarded
    #[arg(required = true)]
    pub root: PathBuf,
}

/// Execute the reset command.
pub fn execute(args: ResetArgs, config: &Config) -> anyhow::Result<()> {
    let root = resolve_root(&args.root)?;
    let store_dir = config.store_dir_for(&root);
    if !store_dir.exists() {
        println!("Nothing recorded for {}.", root.display());
        return Ok(());
    }

    let mut store = SnapshotStore::open(&store_dir)?;
    store.clear()?;
    tracing::info!("Cleared snapshot store at {}", store_dir.display());
    println!("Reset {}; the next scan starts from scratch.", root.display());
    Ok(())
}
