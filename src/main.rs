use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use framebank::{AppConfig, FrameBankConverter, Progress, ProgressPhase, StaleFrames};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::PathBuf;
use tracing::{info, Level};

const CONFIG_NAMES: [&str; 2] = ["framebank.toml", "framebank.json"];

fn load_config(explicit: Option<&PathBuf>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::from_file(path);
    }

    // App data dir first, then the current directory, then built-in defaults
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(d) = dirs::data_dir() {
        for name in CONFIG_NAMES {
            tried.push(d.join("framebank").join(name));
        }
    }
    for name in CONFIG_NAMES {
        tried.push(PathBuf::from(name));
    }

    for p in &tried {
        if p.exists() {
            info!("Using config {}", p.display());
            return AppConfig::from_file(p);
        }
    }

    Ok(AppConfig::default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Convert a numbered frame sequence into a deduplicated GBDK frame table.")]
struct Args {
    /// Config file (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the source frames (png1.png, png2.png, ...)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory for the converted frames
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Number of source frames
    #[arg(long)]
    frames: Option<u32>,

    /// Frame rate of the source sequence
    #[arg(long)]
    source_fps: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Gray values below this become black
    #[arg(long)]
    threshold: Option<u8>,

    /// Keep duplicate frames instead of sharing them
    #[arg(long, default_value_t = false)]
    no_dedup: bool,

    /// Path of the generated C source
    #[arg(long)]
    data_source: Option<PathBuf>,

    /// Path of the generated C header
    #[arg(long)]
    data_header: Option<PathBuf>,

    /// Remove frames left by a previous run without asking
    #[arg(long, short, default_value_t = false)]
    yes: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,

    /// Log details to standard output
    #[arg(long, default_value_t = false)]
    log_details: bool,

    /// Per-frame debug logging
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn apply(&self, cfg: &mut AppConfig) {
        if let Some(v) = &self.input_dir {
            cfg.input_dir = v.clone();
        }
        if let Some(v) = &self.output_dir {
            cfg.output_dir = v.clone();
        }
        if let Some(v) = self.width {
            cfg.width = v;
        }
        if let Some(v) = self.height {
            cfg.height = v;
        }
        if let Some(v) = self.frames {
            cfg.frame_count = v;
        }
        if let Some(v) = self.source_fps {
            cfg.source_fps = v;
        }
        if let Some(v) = self.fps {
            cfg.target_fps = v;
        }
        if let Some(v) = self.threshold {
            cfg.threshold = v;
        }
        if self.no_dedup {
            cfg.dedup = false;
        }
        if let Some(v) = &self.data_source {
            cfg.data_source = v.clone();
        }
        if let Some(v) = &self.data_header {
            cfg.data_header = v.clone();
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = load_config(args.config.as_ref())?;
    args.apply(&mut cfg);

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg).context("serializing config")?);
        return Ok(());
    }

    let converter = FrameBankConverter::with_config(cfg)?;
    let cfg = converter.config();

    let stale = framebank::clear_stale_frames(&cfg.output_dir, |paths| {
        if args.yes {
            return Ok(true);
        }
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Output directory {} already contains {} frames. Remove them?",
                cfg.output_dir.display(),
                paths.len()
            ))
            .default(false)
            .interact()?;
        Ok(confirmed)
    })?;
    if let StaleFrames::Kept(_) = stale {
        println!("Operation cancelled.");
        return Ok(());
    }

    // Created on the first progress update, once the frame total is known
    let progress_bar: RefCell<Option<ProgressBar>> = RefCell::new(None);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")?
        .progress_chars("#>-");

    let summary = converter.convert_with_progress(|progress: Progress| {
        let mut pb_guard = progress_bar.borrow_mut();
        match progress.phase {
            ProgressPhase::NormalizingFrames => {
                let pb = pb_guard.get_or_insert_with(|| {
                    let pb = ProgressBar::new(progress.total as u64);
                    pb.set_style(style.clone());
                    pb
                });
                pb.set_position(progress.completed as u64);
            }
            _ => {
                if let Some(pb) = pb_guard.take() {
                    pb.finish();
                }
            }
        }
    })?;

    println!("Total frames converted:           {}", summary.total_frames);
    println!("Duplicated frames found:          {}", summary.duplicate_frames);
    println!("Unique frames after removal:      {}", summary.unique_frames);

    if args.log_details {
        println!("\n--- Generation Details ---");
        println!(
            "Version: {}\nFrame size: {}x{}\nMap size: {}x{}\nFPS: {} (source {}, stride {})\nThreshold: {}\nDedup: {}\nFrames: {}\nHeader: {}\nSource: {}",
            env!("CARGO_PKG_VERSION"),
            cfg.width,
            cfg.height,
            cfg.map_width(),
            cfg.map_height(),
            cfg.target_fps,
            cfg.source_fps,
            cfg.stride(),
            cfg.threshold,
            cfg.dedup,
            cfg.output_dir.display(),
            summary.header_path.display(),
            summary.source_path.display()
        );
    }

    Ok(())
}
