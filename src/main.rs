use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use dupescan::core::media::{self, MediaKind};
use dupescan::{DedupEngine, DedupResult, ProgressCallback, RawFile};

mod mcp;

/// Find duplicate and near-duplicate files in a directory.
#[derive(Parser, Debug)]
#[command(name = "dupescan", version, about = "Duplicate and near-duplicate file finder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the files a later analysis would consider
    Scan {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,

        /// Glob patterns of paths to skip (repeatable)
        #[arg(long, value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Maximum directory depth to descend
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,
    },

    /// Analyze a directory for exact, partial, and visual duplicates
    Analyze {
        /// Directory to analyze
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,

        /// Minimum shared-chunk ratio for partial matches
        #[arg(long, default_value_t = 0.8)]
        threshold: f64,

        /// Content chunk size in bytes
        #[arg(long, default_value_t = 1024)]
        chunk_size: usize,

        /// Glob patterns of paths to skip (repeatable)
        #[arg(long, value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Maximum directory depth to descend
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Print the full result as JSON instead of a report
        #[arg(long)]
        json: bool,

        /// Write the JSON result to a file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Serve the analysis engine over stdio as MCP tools
    Serve,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan {
            path,
            exclude,
            max_depth,
        } => run_scan(&path, &exclude, max_depth),
        Commands::Analyze {
            path,
            threshold,
            chunk_size,
            exclude,
            max_depth,
            json,
            output,
        } => run_analyze(&path, threshold, chunk_size, &exclude, max_depth, json, output),
        Commands::Serve => {
            let stdin = std::io::stdin();
            mcp::serve(stdin.lock(), std::io::stdout())
        }
    }
}

fn run_scan(path: &Path, exclude: &[String], max_depth: Option<usize>) -> Result<()> {
    let files = discover_files(path, exclude, max_depth)?;
    println!("Found {} file(s) under {}:", files.len(), path.display());

    for file in &files {
        let size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        let kind = match media::classify(&file.to_string_lossy()) {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Other => "other",
        };
        println!(
            " - {:<7} {:>10}  {}",
            kind,
            format_size(size, DECIMAL),
            file.display()
        );
    }
    Ok(())
}

fn run_analyze(
    path: &Path,
    threshold: f64,
    chunk_size: usize,
    exclude: &[String],
    max_depth: Option<usize>,
    json: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let engine = DedupEngine::new(threshold, chunk_size)?;

    let paths = discover_files(path, exclude, max_depth)?;
    println!(
        "▶ Analyzing {} file(s) under {}",
        paths.len(),
        path.display()
    );

    let files = load_files(&paths);

    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {percent}% {msg}",
    )?);
    let progress = bar.clone();
    let callback: ProgressCallback = Box::new(move |event| {
        progress.set_position(event.percent as u64);
        progress.set_message(event.message);
    });

    let result = engine.analyze(files, Some(&callback))?;
    bar.finish_and_clear();

    if let Some(output) = output {
        let encoded = serde_json::to_string_pretty(&result)?;
        fs::write(&output, encoded)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("✅ Result written to {}", output.display());
    } else if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }
    Ok(())
}

/// Walk the directory and return every regular file not matching an exclude
/// pattern, in discovery order.
fn discover_files(dir: &Path, exclude: &[String], max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());

    let patterns: Vec<Pattern> = exclude
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid exclude pattern {:?}", p)))
        .collect::<Result<_>>()?;

    let mut walker = WalkDir::new(dir).follow_links(false);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let path_str = path.to_string_lossy();
        if patterns.iter().any(|pattern| pattern.matches(&path_str)) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    Ok(files)
}

/// Read file contents in parallel, preserving discovery order. Unreadable
/// files are logged and skipped rather than failing the batch.
fn load_files(paths: &[PathBuf]) -> Vec<RawFile> {
    paths
        .par_iter()
        .map(|path| match load_raw_file(path) {
            Ok(file) => Some(file),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                None
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

fn load_raw_file(path: &Path) -> Result<RawFile> {
    let metadata = fs::metadata(path)?;
    let data = fs::read(path)?;
    let mod_time = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());

    Ok(RawFile {
        path: path.to_string_lossy().to_string(),
        name,
        size: data.len() as u64,
        data,
        mod_time,
        video_frame_hashes: Vec::new(),
    })
}

fn print_report(result: &DedupResult) {
    println!();
    println!("🔍 Duplicate analysis at {}", chrono::Utc::now().to_rfc3339());
    println!("{}", "=".repeat(50));
    println!("Total files:        {}", result.total_files);
    println!("Unique files:       {}", result.unique_files);
    println!("Exact duplicates:   {}", result.full_dup_count);
    println!("Partial duplicates: {}", result.partial_dup_count);
    println!("Visual duplicates:  {}", result.visual_dup_count);
    println!(
        "Reclaimable space:  {}",
        format_size(result.space_saved, DECIMAL)
    );
    println!("Processing time:    {:.2}s", result.processing_time);

    if result.duplicate_groups.is_empty() {
        println!("\nNo duplicate groups found.");
        return;
    }

    println!("\n✨ {} duplicate group(s):", result.duplicate_groups.len());
    for (i, group) in result.duplicate_groups.iter().enumerate() {
        println!(
            "\nGroup {} [{}] similarity {:.2}, save {}:",
            i + 1,
            group.group_type,
            group.similarity,
            format_size(group.savings, DECIMAL)
        );
        for file in &group.files {
            println!("   ▶ {}", file);
        }
    }
}
