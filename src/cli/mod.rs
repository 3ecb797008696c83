//! # CLI Module
//!
//! Command-line interface for the export reconciler.
//!
//! ## Usage
//! ```bash
//! # Show what would happen to an export
//! reconcile-export plan ~/Downloads/mydata
//!
//! # Machine-readable plan
//! reconcile-export plan ~/Downloads/mydata --output json
//!
//! # Preview, then build the dated library
//! reconcile-export apply ~/Downloads/mydata --dest ~/Pictures/Memories --dry-run
//! reconcile-export apply ~/Downloads/mydata --dest ~/Pictures/Memories
//!
//! # Survey the filename conventions of an unfamiliar export
//! reconcile-export patterns ~/Downloads/mydata --max-depth 2
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_export_reconciler::core::apply::{
    ApplyExecutor, ApplyOutcome, ApplyPlanner, OperationMode,
};
use media_export_reconciler::core::config::ReconcileConfig;
use media_export_reconciler::core::patterns::PatternAnalyzer;
use media_export_reconciler::core::pipeline::{Pipeline, ReconciliationPlan};
use media_export_reconciler::core::report::{export_csv, export_json};
use media_export_reconciler::error::Result;
use media_export_reconciler::events::{
    ApplyEvent, Event, EventChannel, EventSender, HashEvent, InventoryEvent, PipelineEvent,
};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::info;

/// Export Reconciler - Turn a messy export into a dated library
#[derive(Parser, Debug)]
#[command(name = "reconcile-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse an export and print the reconciliation plan
    Plan {
        /// Root of the extracted export
        root: PathBuf,

        /// JSON config file (defaults to the user config dir when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Copy or move kept media into a dated folder tree and delete discards
    Apply {
        /// Root of the extracted export
        root: PathBuf,

        /// Destination library folder
        #[arg(short, long)]
        dest: PathBuf,

        /// Move files instead of copying them
        #[arg(long = "move")]
        move_files: bool,

        /// Show what would happen without touching any file
        #[arg(long)]
        dry_run: bool,

        /// JSON config file (defaults to the user config dir when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the filename shapes found in each folder of an export
    Patterns {
        /// Root of the extracted export
        root: PathBuf,

        /// Folder levels to descend below the root (unlimited when omitted)
        #[arg(long)]
        max_depth: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// Full plan as JSON for scripting
    Json,
    /// One row per kept or discarded file
    Csv,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            root,
            config,
            output,
            verbose,
        } => run_plan(root, config, output, verbose),
        Commands::Apply {
            root,
            dest,
            move_files,
            dry_run,
            config,
        } => {
            let mode = if move_files {
                OperationMode::Move
            } else {
                OperationMode::Copy
            };
            run_apply(root, dest, mode, dry_run, config)
        }
        Commands::Patterns { root, max_depth } => run_patterns(&root, max_depth),
    }
}

/// Explicit config path, else `<config dir>/media-export-reconciler/config.json` if it exists
fn load_config(explicit: Option<PathBuf>) -> Result<ReconcileConfig> {
    let path = explicit.or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("media-export-reconciler").join("config.json"))
            .filter(|path| path.is_file())
    });

    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            Ok(ReconcileConfig::from_json_file(&path)?)
        }
        None => Ok(ReconcileConfig::default()),
    }
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Export Reconciler").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

/// Drive `progress` from pipeline and apply events until the sender is dropped
fn spawn_event_thread(
    progress: Option<ProgressBar>,
    verbose: bool,
) -> (EventSender, JoinHandle<()>) {
    let (sender, receiver) = EventChannel::new();

    let handle = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::StageChanged { stage }) => {
                    pb.set_message(format!("{}", stage));
                }
                Event::Inventory(InventoryEvent::Progress(p)) => {
                    pb.set_length(p.files_found as u64);
                    pb.set_position(p.files_found as u64);
                }
                Event::Inventory(InventoryEvent::Skipped { path, message }) if verbose => {
                    pb.println(format!(
                        "{} {}: {}",
                        style("skipped").yellow(),
                        path.display(),
                        message
                    ));
                }
                Event::Hash(HashEvent::Started { total_files }) => {
                    pb.set_length(total_files as u64);
                    pb.set_position(0);
                }
                Event::Hash(HashEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(format!(
                            "Dedup {}",
                            p.current_path.file_name().unwrap_or_default().to_string_lossy()
                        ));
                    }
                }
                Event::Apply(ApplyEvent::Started { total_actions, .. }) => {
                    pb.set_message("Applying");
                    pb.set_length(total_actions as u64);
                    pb.set_position(0);
                }
                Event::Apply(ApplyEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                }
                Event::Pipeline(PipelineEvent::Failed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
    });

    (sender, handle)
}

fn build_pipeline(root: PathBuf, config: Option<PathBuf>) -> Result<Pipeline> {
    let config = load_config(config)?;
    Pipeline::builder().root(root).config(config).build()
}

fn run_plan(
    root: PathBuf,
    config: Option<PathBuf>,
    output: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);
    if pretty {
        print_header(&term);
    }

    let pipeline = build_pipeline(root, config)?;

    let (sender, event_thread) = spawn_event_thread(pretty.then(progress_bar), verbose);
    let result = pipeline.run_with_events(&sender);
    drop(sender);
    event_thread.join().ok();
    let plan = result?;

    match output {
        OutputFormat::Pretty => print_pretty_plan(&term, &plan, verbose),
        OutputFormat::Json => export_json(&plan, io::stdout().lock())?,
        OutputFormat::Csv => export_csv(&plan.items, &plan.discards, io::stdout().lock())?,
    }

    Ok(())
}

fn run_apply(
    root: PathBuf,
    dest: PathBuf,
    mode: OperationMode,
    dry_run: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let term = Term::stderr();
    print_header(&term);

    let pipeline = build_pipeline(root, config)?;

    let (sender, event_thread) = spawn_event_thread(Some(progress_bar()), false);
    let outcome = pipeline.run_with_events(&sender).and_then(|plan| {
        let actions = ApplyPlanner::plan(&plan, &dest)?;
        let executor = ApplyExecutor::new(pipeline.root());
        Ok(executor.execute_with_events(&actions, mode, dry_run, &sender))
    });
    drop(sender);
    event_thread.join().ok();
    let outcome = outcome?;

    print_apply_outcome(&term, &outcome, &dest, mode);
    Ok(())
}

fn run_patterns(root: &Path, max_depth: Option<usize>) -> Result<()> {
    let mut analyzer = PatternAnalyzer::new();
    if let Some(depth) = max_depth {
        analyzer = analyzer.max_depth(depth);
    }
    let tree = analyzer.analyze(root)?;

    print!("{}", tree);
    Ok(())
}

fn print_pretty_plan(term: &Term, plan: &ReconciliationPlan, verbose: bool) {
    let summary = &plan.summary;

    term.write_line(&format!("{} Plan Ready", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files inventoried in {:.1}s",
        style(summary.files_inventoried).cyan(),
        plan.duration_ms as f64 / 1000.0
    ))
    .ok();
    if verbose {
        for (kind, count) in &summary.kind_counts {
            term.write_line(&format!("    {:<14} {}", kind.to_string(), style(count).dim()))
                .ok();
        }
    }
    term.write_line(&format!(
        "  {} items to keep ({} undated)",
        style(summary.items).cyan(),
        style(summary.undated).yellow()
    ))
    .ok();
    term.write_line(&format!(
        "  {} of {} overlays paired",
        style(summary.overlays_associated).cyan(),
        summary.overlays
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicates and {} thumbnails to delete",
        style(summary.duplicates_discarded).cyan(),
        style(summary.thumbnails_discarded).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} reclaimable",
        style(format_bytes(summary.bytes_reclaimable)).yellow()
    ))
    .ok();
    term.write_line("").ok();

    let flagged: Vec<_> = plan.flagged().collect();
    if !flagged.is_empty() {
        term.write_line(&format!("{}", style("Needs Review:").bold().underlined()))
            .ok();
        for item in flagged {
            term.write_line(&format!(
                "  {} {}",
                style("!").yellow().bold(),
                display_path(&item.base.path)
            ))
            .ok();
            for flag in &item.flags {
                term.write_line(&format!("      {}", style(flag.description()).dim()))
                    .ok();
            }
        }
        term.write_line("").ok();
    }

    if !plan.report.is_empty() {
        term.write_line(&format!("{}", style("Warnings:").bold().underlined()))
            .ok();
        for warning in &plan.report.warnings {
            term.write_line(&format!("  {} {}", style("○").dim(), warning))
                .ok();
        }
        term.write_line("").ok();
    }

    if verbose {
        term.write_line(&format!("{}", style("Items:").bold().underlined()))
            .ok();
        for item in &plan.items {
            let when = item
                .capture_time
                .map(|t| t.to_string())
                .unwrap_or_else(|| "undated".to_string());
            term.write_line(&format!(
                "  {} {} {}",
                style(when).dim(),
                style(item.category).cyan(),
                display_path(&item.base.path)
            ))
            .ok();
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("No files were changed. Run `apply --dry-run` to preview the changes.").dim()
    ))
    .ok();
}

fn print_apply_outcome(term: &Term, outcome: &ApplyOutcome, dest: &Path, mode: OperationMode) {
    let verb = match (outcome.dry_run, mode) {
        (true, OperationMode::Copy) => "would be copied",
        (true, OperationMode::Move) => "would be moved",
        (false, OperationMode::Copy) => "copied",
        (false, OperationMode::Move) => "moved",
    };

    let (mark, title) = if outcome.dry_run {
        (style("○").cyan().bold(), "Dry Run Complete")
    } else if outcome.is_clean() {
        (style("✓").green().bold(), "Apply Complete")
    } else {
        (style("!").yellow().bold(), "Apply Finished With Errors")
    };
    term.write_line(&format!("{} {}", mark, title)).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files {} to {}",
        style(outcome.files_placed).cyan(),
        verb,
        display_path(dest)
    ))
    .ok();
    term.write_line(&format!(
        "  {} discarded files {}",
        style(outcome.files_deleted).cyan(),
        if outcome.dry_run { "would be deleted" } else { "deleted" }
    ))
    .ok();
    if !outcome.dry_run {
        term.write_line(&format!(
            "  {} folders created, {} empty folders removed",
            style(outcome.folders_created).cyan(),
            style(outcome.folders_removed).cyan()
        ))
        .ok();
    }
    term.write_line(&format!(
        "  {} processed in {:.1}s",
        style(format_bytes(outcome.total_size_bytes)).yellow(),
        outcome.duration_ms as f64 / 1000.0
    ))
    .ok();

    if !outcome.failures.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Failures:").bold().underlined()))
            .ok();
        for failure in &outcome.failures {
            term.write_line(&format!(
                "  {} {}: {}",
                style("✗").red(),
                display_path(&failure.path),
                failure.message
            ))
            .ok();
        }
    }
}

/// Abbreviate paths under the home directory with `~`
fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn parses_apply_flags() {
        let cli = Cli::try_parse_from([
            "reconcile-export",
            "apply",
            "/export",
            "--dest",
            "/sorted",
            "--move",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Apply {
                root,
                dest,
                move_files,
                dry_run,
                config,
            } => {
                assert_eq!(root, PathBuf::from("/export"));
                assert_eq!(dest, PathBuf::from("/sorted"));
                assert!(move_files);
                assert!(dry_run);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn plan_defaults_to_pretty() {
        let cli = Cli::try_parse_from(["reconcile-export", "plan", "/export"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plan {
                output: OutputFormat::Pretty,
                ..
            }
        ));
    }

    #[test]
    fn parses_patterns_depth() {
        let cli = Cli::try_parse_from([
            "reconcile-export",
            "patterns",
            "/export",
            "--max-depth",
            "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Patterns { root, max_depth } => {
                assert_eq!(root, PathBuf::from("/export"));
                assert_eq!(max_depth, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let unlimited = Cli::try_parse_from(["reconcile-export", "patterns", "/export"]).unwrap();
        assert!(matches!(
            unlimited.command,
            Commands::Patterns { max_depth: None, .. }
        ));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"allow_mtime_fallback": true}"#).unwrap();

        let config = load_config(Some(path)).unwrap();

        assert!(config.allow_mtime_fallback);
    }
}
