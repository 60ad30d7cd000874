//! # framebank - frame sequence to C asset table converter
//!
//! `framebank` turns a numbered sequence of video frames into the assets a
//! GBDK handheld build needs to play them back:
//!
//! - one 2-colour indexed PNG per unique frame (`f0001.png`, ...)
//! - a C header declaring the frame descriptor type and table
//! - a C source defining the table, one descriptor per sampled frame
//!
//! Byte-identical frames are written once and shared by every descriptor
//! that needs them.
//!
//! ## Example
//!
//! ```no_run
//! use framebank::{AppConfig, FrameBankConverter};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = AppConfig::default();
//! config.target_fps = 15;
//! let converter = FrameBankConverter::with_config(config)?;
//! let summary = converter.convert()?;
//! println!("{} unique of {} frames", summary.unique_frames, summary.total_frames);
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub mod dedup;
pub mod emit;
pub mod normalize;
pub mod sampler;
pub mod writer;

pub use dedup::DuplicateMap;
pub use normalize::{NormalizedFrame, ResizeFilter};
pub use sampler::{FrameSampler, SourceFrame};

/// Tile edge in pixels on the target hardware
pub const TILE_SIZE: u32 = 8;

/// Represents the current phase of a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Loading, normalizing and writing sampled frames
    NormalizingFrames,
    /// Hashing written frames and removing duplicates
    DetectingDuplicates,
    /// Writing the C header and source
    EmittingTables,
    /// Conversion completed successfully
    Complete,
}

/// Progress information for a conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase of the conversion
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if indeterminate)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

impl Progress {
    /// Create a new progress update for frame normalization
    pub fn normalizing_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::NormalizingFrames,
            completed,
            total,
            percentage,
            message: format!("Converting frame {} of {}", completed, total),
        }
    }

    /// Create a new progress update for duplicate detection
    pub fn detecting_duplicates(total: usize) -> Self {
        Self {
            phase: ProgressPhase::DetectingDuplicates,
            completed: 0,
            total,
            percentage: 0.0,
            message: "Finding duplicated frames...".to_string(),
        }
    }

    /// Create a new progress update for header and source generation
    pub fn emitting_tables() -> Self {
        Self {
            phase: ProgressPhase::EmittingTables,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Generating header files...".to_string(),
        }
    }

    /// Create a completion progress update
    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Conversion complete: {} frames", total_frames),
        }
    }
}

/// Conversion settings.
///
/// Every field has a default, so config files only need the values they
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Normalized frame width in pixels
    pub width: u32,
    /// Normalized frame height in pixels
    pub height: u32,
    /// `MAP_WIDTH` in tiles, derived from `width` when unset
    pub map_width: Option<u32>,
    /// `MAP_HEIGHT` in tiles, derived from `height` when unset
    pub map_height: Option<u32>,
    /// Number of source frames on disk
    pub frame_count: u32,
    pub source_fps: u32,
    pub target_fps: u32,
    /// Gray values below this become black
    pub threshold: u8,
    pub filter: ResizeFilter,
    /// Remove byte-identical frames and share their descriptors
    pub dedup: bool,
    pub input_dir: PathBuf,
    pub input_prefix: String,
    pub input_extension: String,
    pub output_dir: PathBuf,
    pub data_source: PathBuf,
    pub data_header: PathBuf,
    /// `#pragma bank` of the generated source
    pub bank: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: 112,
            height: 72,
            map_width: None,
            map_height: None,
            frame_count: 4383,
            source_fps: 60,
            target_fps: 30,
            threshold: 125,
            filter: ResizeFilter::default(),
            dedup: true,
            input_dir: PathBuf::from("pngs"),
            input_prefix: "png".to_string(),
            input_extension: "png".to_string(),
            output_dir: PathBuf::from("res"),
            data_source: PathBuf::from("src/data.c"),
            data_header: PathBuf::from("src/data.h"),
            bank: 0,
        }
    }
}

impl AppConfig {
    /// Load a config file; `.toml` files are read as TOML, anything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let is_toml = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let config: AppConfig = if is_toml {
            toml::from_str(&text).with_context(|| format!("parsing config toml {}", path.display()))?
        } else {
            serde_json::from_str(&text).with_context(|| format!("parsing config json {}", path.display()))?
        };
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!("Frame size must be non-zero (got {}x{})", self.width, self.height));
        }
        if self.source_fps == 0 || self.target_fps == 0 {
            return Err(anyhow!(
                "Frame rates must be non-zero (source {}, target {})",
                self.source_fps,
                self.target_fps
            ));
        }
        if self.map_width.is_none() && self.width % TILE_SIZE != 0 {
            return Err(anyhow!(
                "Width {} is not a multiple of {}; set map_width explicitly",
                self.width,
                TILE_SIZE
            ));
        }
        if self.map_height.is_none() && self.height % TILE_SIZE != 0 {
            return Err(anyhow!(
                "Height {} is not a multiple of {}; set map_height explicitly",
                self.height,
                TILE_SIZE
            ));
        }
        if self.threshold == 0 {
            return Err(anyhow!("Threshold 0 would turn every pixel white"));
        }
        if self.input_prefix.is_empty() {
            return Err(anyhow!("input_prefix cannot be empty"));
        }
        if self.data_header.file_name().is_none() {
            return Err(anyhow!("data_header must name a file: {}", self.data_header.display()));
        }
        Ok(())
    }

    pub fn stride(&self) -> u32 {
        sampler::stride(self.source_fps, self.target_fps)
    }

    pub fn map_width(&self) -> u32 {
        self.map_width.unwrap_or(self.width / TILE_SIZE)
    }

    pub fn map_height(&self) -> u32 {
        self.map_height.unwrap_or(self.height / TILE_SIZE)
    }

    pub fn sampler(&self) -> FrameSampler {
        FrameSampler::new(
            &self.input_dir,
            &self.input_prefix,
            &self.input_extension,
            self.frame_count,
            self.stride(),
        )
    }
}

/// Result of a completed conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    /// Sampled frames, duplicates included
    pub total_frames: usize,
    pub duplicate_frames: usize,
    /// Frames left on disk
    pub unique_frames: usize,
    /// Output names in sequence order
    pub frame_names: Vec<String>,
    pub header_path: PathBuf,
    pub source_path: PathBuf,
}

/// Frame files already present in `output_dir` from an earlier run
pub fn find_stale_frames(output_dir: &Path) -> Vec<PathBuf> {
    if !output_dir.is_dir() {
        return Vec::new();
    }
    let mut stale: Vec<PathBuf> = WalkDir::new(output_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(writer::is_frame_file_name))
        .map(|e| e.into_path())
        .collect();
    stale.sort();
    stale
}

/// Delete the given files, returning how many were removed
pub fn remove_stale_frames(paths: &[PathBuf]) -> Result<usize> {
    for path in paths {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(paths.len())
}

/// Outcome of [`clear_stale_frames`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleFrames {
    /// The output directory held no frames
    None,
    /// Earlier frames were removed
    Removed(usize),
    /// The caller declined; nothing was touched
    Kept(usize),
}

/// Remove frames left by an earlier run once `confirm` agrees.
///
/// `confirm` is only called when stale frames exist and receives their
/// paths. Runs that keep stale frames can leave files no descriptor
/// references, so callers should stop on [`StaleFrames::Kept`].
pub fn clear_stale_frames<F>(output_dir: &Path, confirm: F) -> Result<StaleFrames>
where
    F: FnOnce(&[PathBuf]) -> Result<bool>,
{
    let stale = find_stale_frames(output_dir);
    if stale.is_empty() {
        return Ok(StaleFrames::None);
    }
    if !confirm(&stale)? {
        return Ok(StaleFrames::Kept(stale.len()));
    }
    let removed = remove_stale_frames(&stale)?;
    warn!("Removed {} frames from a previous run", removed);
    Ok(StaleFrames::Removed(removed))
}

/// Runs the full conversion pipeline for one configuration
pub struct FrameBankConverter {
    config: AppConfig,
}

impl FrameBankConverter {
    /// Create a converter with the default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a converter with a custom configuration
    pub fn with_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load and validate configuration from a TOML or JSON file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Self::with_config(AppConfig::from_file(path)?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Convert the configured frame sequence without progress reporting
    ///
    /// # Example
    ///
    /// ```no_run
    /// use framebank::{AppConfig, FrameBankConverter};
    /// use std::path::PathBuf;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = AppConfig {
    ///     input_dir: PathBuf::from("frames"),
    ///     dedup: false,
    ///     ..AppConfig::default()
    /// };
    /// let summary = FrameBankConverter::with_config(config)?.convert()?;
    /// assert_eq!(summary.duplicate_frames, 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert(&self) -> Result<ConversionSummary> {
        self.convert_with_progress(|_| {})
    }

    /// Run sampling, normalization, deduplication and table emission.
    ///
    /// Any error aborts the run; files written before the failure are left
    /// in place.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use framebank::{FrameBankConverter, ProgressPhase};
    ///
    /// let converter = FrameBankConverter::new();
    /// converter.convert_with_progress(|progress| {
    ///     if progress.phase == ProgressPhase::NormalizingFrames {
    ///         println!("Converting: {}/{} ({:.1}%)",
    ///             progress.completed, progress.total, progress.percentage);
    ///     }
    /// }).unwrap();
    /// ```
    pub fn convert_with_progress<F>(&self, progress_callback: F) -> Result<ConversionSummary>
    where
        F: Fn(Progress),
    {
        let cfg = &self.config;
        fs::create_dir_all(&cfg.output_dir)
            .with_context(|| format!("creating output directory {}", cfg.output_dir.display()))?;

        let sampler = cfg.sampler();
        info!(
            "Converting {} frames {}x{}@{}fps (stride {})",
            cfg.frame_count,
            cfg.width,
            cfg.height,
            cfg.target_fps,
            sampler.stride()
        );
        let names = self.write_frames(&sampler, &progress_callback)?;

        let map = if cfg.dedup {
            progress_callback(Progress::detecting_duplicates(names.len()));
            info!("Finding duplicated frames...");
            let map = dedup::detect_duplicates(&cfg.output_dir, &names)?;
            dedup::remove_duplicates(&cfg.output_dir, &map)?;
            map
        } else {
            DuplicateMap::identity(&names)
        };

        progress_callback(Progress::emitting_tables());
        info!("Generating header files...");
        self.write_tables(&names, &map)?;

        progress_callback(Progress::complete(names.len()));
        Ok(ConversionSummary {
            total_frames: names.len(),
            duplicate_frames: map.duplicate_count(),
            unique_frames: map.canonical_count(),
            frame_names: names,
            header_path: cfg.data_header.clone(),
            source_path: cfg.data_source.clone(),
        })
    }

    fn write_frames<F>(&self, sampler: &FrameSampler, progress_callback: &F) -> Result<Vec<String>>
    where
        F: Fn(Progress),
    {
        let cfg = &self.config;
        let total = sampler.len();
        let mut names = Vec::with_capacity(total);
        progress_callback(Progress::normalizing_frames(0, total));

        for source in sampler.iter() {
            let img = image::open(&source.path)
                .with_context(|| format!("opening {}", source.path.display()))?;
            let frame = normalize::normalize_frame(&img, cfg.width, cfg.height, cfg.threshold, cfg.filter);

            let name = writer::frame_name(source.position);
            let out = writer::frame_path(&cfg.output_dir, &name);
            writer::write_frame(&frame, &out)?;
            debug!("{} -> {}", source.path.display(), out.display());

            names.push(name);
            progress_callback(Progress::normalizing_frames(names.len(), total));
        }
        Ok(names)
    }

    fn write_tables(&self, names: &[String], map: &DuplicateMap) -> Result<()> {
        let cfg = &self.config;
        let header_file_name = cfg
            .data_header
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("bad header file name {}", cfg.data_header.display()))?;
        let dims = emit::TableDims {
            map_width: cfg.map_width(),
            map_height: cfg.map_height(),
        };
        let (header, source) = emit::build_tables(names, map, dims, header_file_name, cfg.bank);

        write_text(&cfg.data_header, &header.render())?;
        write_text(&cfg.data_source, &source.render())?;
        Ok(())
    }
}

impl Default for FrameBankConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
