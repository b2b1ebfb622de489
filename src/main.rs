use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Confirm;
use framecull::executor::{self, Mode, Outcome};
use framecull::fingerprint::HashKind;
use framecull::history;
use framecull::policy::Threshold;
use framecull::watermark::{
    self, FixedRegion, InpaintMethod, PromptRegion, Region, RegionSelector, WatermarkOptions,
};
use framecull::{DedupConfig, plan_directory};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "framecull", version, about = "Cull near-duplicate video frames")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove frames that are perceptual duplicates of the previous kept frame
    Dedup {
        /// Directory containing the frames
        #[arg(value_name = "DIR", default_value = "frames")]
        path: PathBuf,
        /// Max hash distance to treat two frames as the same
        #[arg(long, default_value_t = Threshold::DEFAULT.0)]
        threshold: u32,
        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,
        /// Perceptual hash variant
        #[arg(long, value_enum, default_value_t = HashKind::Perceptual)]
        hash: HashKind,
        /// File extension to include (repeatable, default: jpg and jpeg)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,
        /// Print the plan as JSON
        #[arg(long, requires = "dry_run")]
        json: bool,
        /// Ask before deleting anything
        #[arg(long)]
        confirm: bool,
    },

    /// Work with the deletion history
    History {
        #[command(subcommand)]
        command: HistoryCmd,
    },

    /// Erase a fixed-position watermark by inpainting
    Watermark {
        /// Image file or directory of images
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Watermark region, in pixels from the top-left corner
        #[arg(long, num_args = 4, value_names = ["X", "Y", "W", "H"])]
        coords: Option<Vec<u32>>,
        /// Neighbourhood radius used to fill each pixel
        #[arg(long, default_value_t = 5)]
        radius: u32,
        /// Fill method
        #[arg(long, value_enum, default_value_t = InpaintMethod::Weighted)]
        method: InpaintMethod,
        /// Output directory for cleaned images
        #[arg(long, value_name = "DIR", default_value = "cleaned")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List all deletion records
    List {
        /// Directory containing the frames
        #[arg(value_name = "DIR", default_value = "frames")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Dedup {
            path,
            threshold,
            dry_run,
            hash,
            extensions,
            json,
            confirm,
        } => {
            let mut config = DedupConfig::new(path);
            config.threshold = Threshold(threshold);
            config.hash = hash;
            config.mode = if dry_run { Mode::DryRun } else { Mode::Execute };
            if !extensions.is_empty() {
                config.extensions = extensions;
            }
            let config = config.validate()?;
            dedup(&config, json, confirm)?;
        }

        Commands::History { command } => match command {
            HistoryCmd::List { path } => list_history(&path)?,
        },

        Commands::Watermark {
            input,
            coords,
            radius,
            method,
            out,
        } => {
            let options = WatermarkOptions {
                radius,
                method,
                out_dir: out,
                ..WatermarkOptions::default()
            };
            let mut selector: Box<dyn RegionSelector> = match coords.as_deref() {
                Some(&[x, y, w, h]) => Box::new(FixedRegion(Region::new(x, y, w, h))),
                _ => Box::new(PromptRegion),
            };
            clean_watermarks(&input, selector.as_mut(), &options)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn dedup(config: &DedupConfig, json: bool, confirm: bool) -> Result<()> {
    let dry_run = config.mode == Mode::DryRun;
    if !json {
        println!("▶ Deduplicating frames in: {}", config.directory.display());
        println!(
            "   Threshold: {} (hash distance ≤ {} → duplicate), hash: {:?}",
            config.threshold, config.threshold, config.hash
        );
        println!(
            "   Mode: {}",
            if dry_run {
                "DRY RUN (no files deleted)"
            } else {
                "LIVE (will delete duplicates)"
            }
        );
    }

    let plan = benchmark("hashing and clustering", || plan_directory(config, !json))
        .with_context(|| format!("Failed to plan {}", config.directory.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("No frames found.");
        return Ok(());
    }

    println!("\n   Unique frames to keep : {}", plan.kept_count());
    println!("   Duplicate frames found: {}", plan.dropped_count());

    if !dry_run && plan.dropped_count() == 0 {
        println!("No duplicates found.");
        return Ok(());
    }

    if !dry_run && confirm {
        let proceed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete {} file(s)? There is no undo",
                plan.dropped_count()
            ))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Aborted; no files were changed.");
            return Ok(());
        }
    }

    let report = match executor::run(&plan, config.mode) {
        Outcome::DryRun(text) => {
            println!("\n{}", text);
            return Ok(());
        }
        Outcome::Executed(report) => report,
    };

    for removed in &report.removed {
        println!("   🗑️  Deleted {}", removed.path.display());
    }

    if let Err(e) = history::append(&config.directory, &history::records_for(&report.removed)) {
        log::warn!("could not write history: {}", e);
    }

    println!(
        "\n✅ Removed {} duplicate frame(s); {} unique frame(s) remain in {}",
        report.removed.len(),
        plan.kept_count(),
        config.directory.display()
    );

    for failure in &report.failures {
        eprintln!("⚠️  {}", failure);
    }
    report.check()?;
    Ok(())
}

fn list_history(path: &Path) -> Result<()> {
    let records = history::read(path).with_context(|| {
        format!(
            "Could not open history file {:?}",
            history::history_path(path)
        )
    })?;

    println!("🗂️  Deletion History:");
    for (i, rec) in records.iter().enumerate() {
        let removed: Vec<&str> = rec.removed.iter().map(|r| r.path.as_str()).collect();
        println!(
            "[{}] {}\n     kept: {}\n     removed: {:?}\n     action: {}\n",
            i, rec.timestamp, rec.retained, removed, rec.action
        );
    }
    Ok(())
}

fn clean_watermarks(
    input: &Path,
    selector: &mut dyn RegionSelector,
    options: &WatermarkOptions,
) -> Result<()> {
    let files = watermark::collect_images(input)?;
    println!("▶ Removing watermark from {} image(s)", files.len());

    let Some(report) = watermark::remove_watermark(&files, selector, options)? else {
        println!("No region selected; cancelled.");
        return Ok(());
    };

    println!(
        "\n✅ Processed {} image(s) | Failed: {}",
        report.processed, report.failed
    );
    println!("✅ Clean images saved to: {}", options.out_dir.display());
    Ok(())
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    log::info!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
