//! The `reclaim config` command.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use reclaim_core::{Config, SnapshotStore};

use super::resolve_root;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings as TOML
    Show,

    /// Print where settings and scan records live
    Locate {
        /// Also print the record directory of this library folder
        library: Option<PathBuf>,
    },

    /// Parse and validate the config file without scanning
    Check,

    /// Write a config file holding every default
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Write the default settings to `path`, creating parent folders.
fn write_defaults(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "A config file is already present at {}\n\n  Hint: Pass --force to replace it.",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}

/// One line per location: config file, store root and, for a library, its
/// record directory and whether a scan is recorded there.
fn locations(config: &Config, library: Option<&Path>) -> anyhow::Result<Vec<(&'static str, String)>> {
    let mut lines = vec![
        ("config file", Config::default_path().display().to_string()),
        ("store root", config.store_dir().display().to_string()),
    ];
    if let Some(library) = library {
        let root = resolve_root(library)?;
        let records = config.store_dir_for(&root);
        let recorded = records.is_dir() && SnapshotStore::open(&records)?.has_collection();
        lines.push(("library", root.display().to_string()));
        lines.push(("records", records.display().to_string()));
        lines.push(("scanned", if recorded { "yes" } else { "no" }.to_string()));
    }
    Ok(lines)
}

pub fn execute(args: ConfigArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => print!("{}", config.to_toml()?),
        ConfigCommand::Locate { library } => {
            for (label, value) in locations(config, library.as_deref())? {
                println!("{label:<12} {value}");
            }
        }
        ConfigCommand::Check => {
            let path = Config::default_path();
            if !path.exists() {
                println!("No config file at {}; defaults apply.", path.display());
                return Ok(());
            }
            Config::load_from(&path)?;
            println!("{} is valid.", path.display());
        }
        ConfigCommand::Init { force } => {
            let path = Config::default_path();
            write_defaults(&path, force)?;
            tracing::info!(path = %path.display(), "Wrote default config");
            println!("Wrote defaults to {}", path.display());
        }
    }
    Ok(())
}
