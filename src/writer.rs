use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::normalize::NormalizedFrame;

/// Extension of written frame files
pub const FRAME_EXTENSION: &str = "png";

/// Output name for a 1-based sequence position, e.g. `f0001`.
pub fn frame_name(position: usize) -> String {
    format!("f{:04}", position)
}

/// Path of a frame file inside the output directory
pub fn frame_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", name, FRAME_EXTENSION))
}

/// Returns true for names produced by [`frame_name`]
pub fn is_frame_file_name(file_name: &str) -> bool {
    let Some(stem) = file_name
        .strip_suffix(FRAME_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
    else {
        return false;
    };
    match stem.strip_prefix('f') {
        Some(digits) => digits.len() >= 4 && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Write a frame as an 8-bit indexed PNG carrying the fixed 256-entry palette.
pub fn write_frame(frame: &NormalizedFrame, path: &Path) -> Result<()> {
    let expected = (frame.width as usize) * (frame.height as usize);
    if frame.indices.len() != expected {
        return Err(anyhow!(
            "frame buffer holds {} pixels, expected {}x{}",
            frame.indices.len(),
            frame.width,
            frame.height
        ));
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), frame.width, frame.height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(NormalizedFrame::palette_bytes());

    let mut writer = encoder
        .write_header()
        .with_context(|| format!("writing png header {}", path.display()))?;
    writer
        .write_image_data(&frame.indices)
        .with_context(|| format!("writing png data {}", path.display()))?;
    writer
        .finish()
        .with_context(|| format!("finishing {}", path.display()))?;
    Ok(())
}
