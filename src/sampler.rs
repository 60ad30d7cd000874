use std::path::{Path, PathBuf};

/// A source frame selected by the sampler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    /// 1-based index of the source file (`png<index>.png`)
    pub source_index: u32,
    /// 1-based position in the output sequence (`f<position>.png`)
    pub position: usize,
    /// Path of the source image
    pub path: PathBuf,
}

/// Integer ratio between the source and target frame rates, never below 1.
pub fn stride(source_fps: u32, target_fps: u32) -> u32 {
    if target_fps == 0 {
        return 1;
    }
    (source_fps / target_fps).max(1)
}

/// Walks a numbered source directory at a fixed stride.
///
/// Iteration is lazy and can be restarted by calling [`FrameSampler::iter`]
/// again; nothing is read from disk here.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    input_dir: PathBuf,
    prefix: String,
    extension: String,
    frame_count: u32,
    stride: u32,
}

impl FrameSampler {
    pub fn new(input_dir: &Path, prefix: &str, extension: &str, frame_count: u32, stride: u32) -> Self {
        Self {
            input_dir: input_dir.to_path_buf(),
            prefix: prefix.to_string(),
            extension: extension.trim_start_matches('.').to_string(),
            frame_count,
            stride: stride.max(1),
        }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of frames the sampler yields
    pub fn len(&self) -> usize {
        self.frame_count.div_ceil(self.stride) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the source file with the given 1-based index
    pub fn source_path(&self, source_index: u32) -> PathBuf {
        self.input_dir
            .join(format!("{}{}.{}", self.prefix, source_index, self.extension))
    }

    pub fn iter(&self) -> impl Iterator<Item = SourceFrame> + '_ {
        (0..self.frame_count)
            .step_by(self.stride as usize)
            .enumerate()
            .map(move |(i, zero_based)| SourceFrame {
                source_index: zero_based + 1,
                position: i + 1,
                path: self.source_path(zero_based + 1),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_integer_ratio_with_floor_of_one() {
        assert_eq!(stride(60, 30), 2);
        assert_eq!(stride(60, 60), 1);
        assert_eq!(stride(60, 25), 2);
        assert_eq!(stride(24, 30), 1);
        assert_eq!(stride(30, 0), 1);
    }

    #[test]
    fn samples_every_other_frame() {
        let sampler = FrameSampler::new(Path::new("pngs"), "png", "png", 7, 2);
        let frames: Vec<SourceFrame> = sampler.iter().collect();
        let indices: Vec<u32> = frames.iter().map(|f| f.source_index).collect();
        assert_eq!(indices, vec![1, 3, 5, 7]);
        assert_eq!(sampler.len(), 4);
        assert_eq!(frames[2].position, 3);
        assert_eq!(frames[2].path, Path::new("pngs").join("png5.png"));
    }

    #[test]
    fn iteration_restarts() {
        let sampler = FrameSampler::new(Path::new("in"), "png", ".png", 4, 1);
        let first: Vec<SourceFrame> = sampler.iter().collect();
        let second: Vec<SourceFrame> = sampler.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert_eq!(first[0].path, Path::new("in").join("png1.png"));
    }

    #[test]
    fn empty_source() {
        let sampler = FrameSampler::new(Path::new("in"), "png", "png", 0, 2);
        assert!(sampler.is_empty());
        assert_eq!(sampler.iter().count(), 0);
    }
}
