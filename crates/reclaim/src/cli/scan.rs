//! The `reclaim scan` command.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, ValueEnum};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reclaim_core::{
    Analyzer, CancellationToken, ChunkProgress, Config, Dashboard, FsLibrary, NullRecognizer,
    OutputFormat as CoreOutputFormat, Phase, ProgressObserver, ReportWriter, RunSummary,
};

use super::{format_bytes, resolve_root};

/// Report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON object
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<ReportFormat> for CoreOutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => CoreOutputFormat::Json,
            ReportFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `scan` command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Library folder to analyze
    #[arg(required = true)]
    pub root: PathBuf,

    /// Items per chunk (changing it restarts the scan)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Concurrent decodes per chunk
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Size in MiB at which a video counts as oversized
    #[arg(long)]
    pub large_video_mb: Option<u64>,

    /// Skip blur detection
    #[arg(long)]
    pub no_blur: bool,

    /// Skip text detection
    #[arg(long)]
    pub no_text: bool,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format (defaults to `output.format` from the config)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Fold command-line overrides into the loaded config.
fn apply_overrides(mut config: Config, args: &ScanArgs) -> anyhow::Result<Config> {
    if let Some(chunk_size) = args.chunk_size {
        config.scan.chunk_size = chunk_size;
    }
    if let Some(parallel) = args.parallel {
        config.scan.parallel_workers = parallel;
    }
    if let Some(mb) = args.large_video_mb {
        config.video.large_threshold_mb = mb;
    }
    if args.no_blur {
        config.blur.enabled = false;
    }
    if args.no_text {
        config.text.enabled = false;
    }
    config.validate()?;
    Ok(config)
}

fn report_format(args: &ScanArgs, config: &Config) -> anyhow::Result<CoreOutputFormat> {
    if let Some(format) = args.format {
        return Ok(format.into());
    }
    CoreOutputFormat::parse(&config.output.format).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown output.format {:?} in config (expected \"json\" or \"jsonl\")",
            config.output.format
        )
    })
}

/// Execute the scan command.
pub async fn execute(args: ScanArgs, config: Config) -> anyhow::Result<()> {
    let root = resolve_root(&args.root)?;
    let config = apply_overrides(config, &args)?;
    let format = report_format(&args, &config)?;
    let pretty = config.output.pretty;
    let store_dir = config.store_dir_for(&root);
    tracing::info!("Scanning {:?} (store: {:?})", root, store_dir);

    let analyzer = Analyzer::open(
        Arc::new(FsLibrary::new(&root)),
        Arc::new(NullRecognizer),
        config,
        &store_dir,
    )?;
    let status = analyzer.sync_collection().await?;
    tracing::info!(?status, items = analyzer.total_items(), "Collection ready");

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current chunk");
            signal_token.cancel();
        }
    });

    let bars = PhaseBars::new(&analyzer);
    let start_time = Instant::now();
    let summary = analyzer.run_to_completion(&token, &bars).await?;
    bars.clear();

    let dashboard = analyzer.dashboard();
    print_summary(&summary, &dashboard, start_time.elapsed());

    let maps = analyzer.snapshot();
    if let Some(ref output_path) = args.output {
        let file = File::create(output_path)?;
        let mut writer = ReportWriter::new(BufWriter::new(file), format, pretty);
        writer.write_report(&maps)?;
        tracing::info!("Report written to {:?}", output_path);
    } else {
        let mut writer = ReportWriter::new(std::io::stdout().lock(), format, pretty);
        writer.write_report(&maps)?;
    }

    if summary.cancelled {
        eprintln!("  Scan interrupted; run the same command again to resume.");
    }
    Ok(())
}

/// One progress bar per phase.
struct PhaseBars {
    multi: MultiProgress,
    bars: HashMap<Phase, ProgressBar>,
}

impl PhaseBars {
    fn new(analyzer: &Analyzer) -> Self {
        let multi = MultiProgress::new();
        let total = analyzer.total_items() as u64;
        let style = ProgressStyle::default_bar()
            .template("{prefix:>11} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        let bars = analyzer
            .phase_states()
            .into_iter()
            .map(|(phase, state)| {
                let bar = multi.add(ProgressBar::new(total));
                bar.set_style(style.clone());
                bar.set_prefix(phase.as_str());
                bar.set_position(state.offset(total as usize) as u64);
                (phase, bar)
            })
            .collect();
        Self { multi, bars }
    }

    fn clear(&self) {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
        // Nothing useful to do if the terminal went away.
        let _ = self.multi.clear();
    }
}

impl ProgressObserver for PhaseBars {
    fn on_chunk(&self, progress: &ChunkProgress) {
        let Some(bar) = self.bars.get(&progress.phase) else {
            return;
        };
        bar.set_length(progress.total as u64);
        bar.set_position(progress.processed as u64);
        if progress.newly_classified > 0 {
            bar.set_message(format!("+{}", progress.newly_classified));
        }
    }
}

/// Print a formatted summary table after the run.
fn print_summary(summary: &RunSummary, dashboard: &Dashboard, elapsed: std::time::Duration) {
    eprintln!();
    eprintln!("  ==============================================");
    eprintln!("                  Reclaimable");
    eprintln!("  ==============================================");
    for cell in &dashboard.cells {
        if cell.count == 0 {
            continue;
        }
        let groups = if cell.groups > 0 {
            format!(" in {} groups", cell.groups)
        } else {
            String::new()
        };
        eprintln!(
            "    {:<18} {:>6} items {:>11}{}",
            cell.category.label(),
            cell.count,
            format_bytes(cell.bytes),
            groups
        );
    }
    eprintln!("  ----------------------------------------------");
    eprintln!("    Total:            {:>18}", format_bytes(summary.total_bytes));
    let processed: usize = summary.phases.iter().map(|p| p.items_processed).sum();
    eprintln!("    Items analyzed:   {:>18}", processed);
    let skipped: Vec<&str> = summary
        .phases
        .iter()
        .filter(|p| p.skipped)
        .map(|p| p.phase.as_str())
        .collect();
    if !skipped.is_empty() {
        eprintln!("    Skipped phases:   {:>18}", skipped.join(", "));
    }
    eprintln!("    Duration:         {:>17.1}s", elapsed.as_secs_f64());
    eprintln!("  ==============================================");
}
