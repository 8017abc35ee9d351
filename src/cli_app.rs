//! Top-level CLI definition and dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::json;

use dircap::core::config::{FolderSpec, parse_folder_pairs};
use dircap::core::errors::Result;
use dircap::inventory::folder::FolderInventory;
use dircap::inventory::sizing::SizeResolver;
use dircap::logger::jsonl::JsonlWriter;
use dircap::platform::pal::detect_platform;
use dircap::watch::router::WatchRouter;
use dircap::watch::signals::ShutdownSignal;

/// dircap — keeps watched drop directories under a byte cap.
#[derive(Debug, Parser)]
#[command(
    name = "dircapd",
    author,
    version,
    about = "dircap - folder size-cap purge daemon",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Watch folders and keep each under its cap. Blocks for the process lifetime.
    Run(RunArgs),
    /// Resolve folder/size pairs to concrete byte caps, print them, and exit.
    Resolve(ResolveArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Alternating folder path and size limit (byte count or percentage like "80%").
    #[arg(value_name = "FOLDER SIZE", required = true, num_args = 1..)]
    pairs: Vec<String>,
    /// JSONL activity log path. Log lines go to stderr when omitted.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ResolveArgs {
    /// Alternating folder path and size limit (byte count or percentage like "80%").
    #[arg(value_name = "FOLDER SIZE", required = true, num_args = 1..)]
    pairs: Vec<String>,
}

/// Dispatch the parsed CLI.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Run(args) => run_daemon(cli, args),
        Command::Resolve(args) => run_resolve(cli, args),
    }
}

fn resolve_specs(specs: &[FolderSpec]) -> Result<Vec<(PathBuf, u64)>> {
    let resolver = SizeResolver::new(detect_platform());
    specs
        .iter()
        .map(|spec| -> Result<(PathBuf, u64)> {
            Ok((spec.path.clone(), resolver.resolve(&spec.path, spec.size)?))
        })
        .collect()
}

fn run_daemon(cli: &Cli, args: &RunArgs) -> Result<()> {
    let specs = parse_folder_pairs(&args.pairs)?;
    let resolved = resolve_specs(&specs)?;

    let mut folders = Vec::with_capacity(resolved.len());
    for (path, capacity) in resolved {
        if !cli.quiet {
            println!(
                "{} {} {} {}",
                "tracking folder:".bold(),
                path.display(),
                "max size:".bold(),
                format_bytes(capacity)
            );
        }
        folders.push(FolderInventory::new(path, capacity));
    }

    let logger = args
        .log
        .clone()
        .map_or_else(JsonlWriter::stderr_only, JsonlWriter::open);

    let router = WatchRouter::new(folders, logger, ShutdownSignal::new());
    // Blocking; the only Ok-shaped outcome is a signal-requested shutdown.
    match router.run() {
        Ok(never) => match never {},
        Err(err) if err.is_clean_shutdown() => {
            if !cli.quiet {
                println!("shutdown requested, exiting");
            }
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn run_resolve(cli: &Cli, args: &ResolveArgs) -> Result<()> {
    let specs = parse_folder_pairs(&args.pairs)?;
    let resolved = resolve_specs(&specs)?;

    if cli.json {
        let folders: Vec<_> = resolved
            .iter()
            .map(|(path, capacity)| {
                json!({
                    "folder": path.display().to_string(),
                    "capacity_bytes": capacity,
                    "capacity_human": format_bytes(*capacity),
                })
            })
            .collect();
        let doc = json!({ "folders": folders });
        println!("{doc:#}");
    } else {
        for (path, capacity) in &resolved {
            println!(
                "{}  {} ({} bytes)",
                path.display(),
                format_bytes(*capacity).bold(),
                capacity
            );
        }
    }
    Ok(())
}

/// Human-readable IEC byte formatting for console output.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    #[allow(clippy::cast_precision_loss)]
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
