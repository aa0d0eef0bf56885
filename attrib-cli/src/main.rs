//! Attrib CLI - reports which function each JavaScript/TypeScript decision point is credited to

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Progress and diagnostics go to stderr, results to stdout

use anyhow::Context;
use attrib_core::config::{self, ResolvedConfig};
use attrib_core::engine::{self, EngineOptions, FileScan};
use attrib_core::{
    build_reports, render_json, render_points_jsonl, render_text, BoundaryIndex, OracleMode,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attrib")]
#[command(about = "Attribute &&, || and default-parameter decision points to their functions")]
#[command(version = env!("ATTRIB_VERSION"))]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan JavaScript/TypeScript sources and report decision points per function
    Scan {
        /// Path to source file or directory
        path: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// JSON file with function boundaries to use instead of the outline scanner
        /// (single source file only)
        #[arg(long)]
        boundaries: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Literal/ternary oracle (overrides config file)
        #[arg(long)]
        oracle: Option<OracleArg>,

        /// Report every record, even repeated sites
        #[arg(long)]
        no_dedupe: bool,

        /// Show only top N functions (overrides config file)
        #[arg(long)]
        top: Option<usize>,

        /// Only report functions with at least N points (overrides config file)
        #[arg(long)]
        min_points: Option<usize>,

        /// Worker threads for multi-file scans (default: one per core)
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Validate or inspect configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without scanning
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Per-function summary table
    Text,
    /// Per-function summaries as a JSON array
    Json,
    /// One decision point per line
    Jsonl,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OracleArg {
    Permissive,
    Lexical,
}

impl From<OracleArg> for OracleMode {
    fn from(arg: OracleArg) -> Self {
        match arg {
            OracleArg::Permissive => OracleMode::Permissive,
            OracleArg::Lexical => OracleMode::Lexical,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan {
            path,
            format,
            boundaries,
            config: config_path,
            oracle,
            no_dedupe,
            top,
            min_points,
            jobs,
        } => {
            // Normalize path to absolute
            let normalized_path = if path.is_relative() {
                std::env::current_dir()?.join(&path)
            } else {
                path
            };

            if !normalized_path.exists() {
                anyhow::bail!("Path does not exist: {}", normalized_path.display());
            }

            if let Some(jobs) = jobs {
                if jobs == 0 {
                    anyhow::bail!("--jobs must be at least 1");
                }
                rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build_global()
                    .context("failed to configure worker threads")?;
            }

            let project_root = find_project_root(&normalized_path);
            let resolved_config = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;

            if let Some(config_path) = &resolved_config.config_path {
                eprintln!("Using config: {}", config_path.display());
            }

            // CLI flags override config file values
            let options = EngineOptions {
                dedupe: resolved_config.dedupe && !no_dedupe,
                oracle: oracle.map(OracleMode::from).unwrap_or(resolved_config.oracle),
            };
            let effective_min_points = min_points.or(resolved_config.min_points);
            let effective_top = top.or(resolved_config.top_n);
            if effective_top == Some(0) {
                anyhow::bail!("--top must be at least 1");
            }

            let mut scans = match boundaries {
                Some(boundary_file) => {
                    scan_with_boundaries(&normalized_path, &boundary_file, &options)?
                }
                None => scan_tree(&normalized_path, &resolved_config, &options)?,
            };
            relativize(&mut scans, &project_root);

            match format {
                OutputFormat::Text => {
                    let reports = build_reports(&scans, effective_min_points, effective_top);
                    print!("{}", render_text(&reports));
                }
                OutputFormat::Json => {
                    let reports = build_reports(&scans, effective_min_points, effective_top);
                    println!("{}", render_json(&reports));
                }
                OutputFormat::Jsonl => {
                    print!("{}", render_points_jsonl(&scans));
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Scan one file against an external boundary list
fn scan_with_boundaries(
    path: &Path,
    boundary_file: &Path,
    options: &EngineOptions,
) -> anyhow::Result<Vec<FileScan>> {
    if !path.is_file() {
        anyhow::bail!("--boundaries requires a single source file, got {}", path.display());
    }
    let index = BoundaryIndex::load_json(boundary_file)?;
    tracing::info!(functions = index.len(), "loaded external boundaries");
    Ok(vec![engine::scan_file_with_boundaries(path, &index, options)?])
}

/// Scan every included source file under `path`, with a progress bar for larger runs
fn scan_tree(
    path: &Path,
    config: &ResolvedConfig,
    options: &EngineOptions,
) -> anyhow::Result<Vec<FileScan>> {
    let files = engine::collect_files(path, config)?;
    tracing::info!(files = files.len(), "scanning");

    let bar = if files.len() > 1 {
        ProgressBar::with_draw_target(Some(files.len() as u64), ProgressDrawTarget::stderr())
    } else {
        ProgressBar::hidden()
    };
    let template = "{bar:40.cyan/blue} {pos}/{len} files [{elapsed_precise}]";
    if let Ok(style) = ProgressStyle::with_template(template) {
        bar.set_style(style);
    }

    let scans = engine::scan_files(&files, options, || bar.inc(1));
    bar.finish_and_clear();
    Ok(scans)
}

/// Show file paths relative to the project root where possible
fn relativize(scans: &mut [FileScan], project_root: &Path) {
    for scan in scans {
        if let Ok(relative) = scan.file.strip_prefix(project_root) {
            if !relative.as_os_str().is_empty() {
                scan.file = relative.to_path_buf();
            }
        }
    }
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Attribution:");
    println!("  dedupe: {}", resolved.dedupe);
    println!("  oracle: {}", resolved.oracle.as_str());
    println!();
    println!("Filters:");
    println!(
        "  min_points: {}",
        resolved
            .min_points
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "  top: {}",
        resolved
            .top_n
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "  include: {}",
        if resolved.include.is_some() {
            "custom"
        } else {
            "all"
        }
    );
    println!("  exclude patterns: {}", resolved.exclude.len());
}

/// Nearest ancestor holding `.git` or `package.json`, else the start directory
fn find_project_root(start_path: &Path) -> PathBuf {
    let start = if start_path.is_file() {
        start_path.parent().unwrap_or(start_path).to_path_buf()
    } else {
        start_path.to_path_buf()
    };

    let mut current = start.as_path();
    loop {
        if current.join(".git").exists() || current.join("package.json").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start,
        }
    }
}
