use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, Rgb};
use serde::{Deserialize, Serialize};

/// Number of entries in the written palette
pub const PALETTE_SIZE: usize = 256;
pub const BLACK_INDEX: u8 = 0;
pub const WHITE_INDEX: u8 = 1;

/// Resampling filter used when scaling source frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// A 2-colour frame ready to be written as an indexed image.
///
/// `indices` is row-major, one byte per pixel, and only ever holds
/// [`BLACK_INDEX`] or [`WHITE_INDEX`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFrame {
    pub width: u32,
    pub height: u32,
    pub indices: Vec<u8>,
}

impl NormalizedFrame {
    /// Palette written alongside every frame: black, white, then black filler.
    pub fn palette() -> [[u8; 3]; PALETTE_SIZE] {
        let mut palette = [[0u8; 3]; PALETTE_SIZE];
        palette[WHITE_INDEX as usize] = [255, 255, 255];
        palette
    }

    /// Flattened RGB palette bytes (`PALETTE_SIZE * 3`)
    pub fn palette_bytes() -> Vec<u8> {
        Self::palette().iter().flat_map(|c| c.iter().copied()).collect()
    }

    /// Palette index at `(x, y)`, `None` outside the frame
    pub fn index_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.indices.get((y * self.width + x) as usize).copied()
    }
}

/// Resize, grayscale, threshold and index a source frame.
pub fn normalize_frame(img: &DynamicImage, width: u32, height: u32, threshold: u8, filter: ResizeFilter) -> NormalizedFrame {
    let resized = img.resize_exact(width, height, filter.into());
    let gray = to_gray(&resized);
    let binary = binarize(&gray, threshold);
    to_indexed(&binary)
}

/// Single-channel gray image using [`luminance`] weights.
pub fn to_gray(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| Luma([luminance(*rgb.get_pixel(x, y))]))
}

/// ITU-R 601 luma in 16-bit fixed point (`0.299 R + 0.587 G + 0.114 B`, rounded).
pub fn luminance(rgb: Rgb<u8>) -> u8 {
    let r = rgb[0] as u32;
    let g = rgb[1] as u32;
    let b = rgb[2] as u32;
    ((r * 19595 + g * 38470 + b * 7471 + 0x8000) >> 16) as u8
}

/// Values below `threshold` become 0, everything else 255.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = gray.clone();
    for px in out.pixels_mut() {
        *px = Luma([if px[0] < threshold { 0 } else { 255 }]);
    }
    out
}

/// Map a binarized image onto the fixed palette.
///
/// Each pixel takes the nearest palette colour among black and white, so
/// index 0 always renders black and index 1 always renders white no matter
/// which colours the frame actually contains.
pub fn to_indexed(binary: &GrayImage) -> NormalizedFrame {
    let (width, height) = binary.dimensions();
    let indices = binary
        .pixels()
        .map(|px| if px[0] < 128 { BLACK_INDEX } else { WHITE_INDEX })
        .collect();
    NormalizedFrame { width, height, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(w: u32, h: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([value, value, value])))
    }

    #[test]
    fn output_has_target_dimensions() {
        let frame = normalize_frame(&solid(480, 360, 200), 112, 72, 125, ResizeFilter::CatmullRom);
        assert_eq!((frame.width, frame.height), (112, 72));
        assert_eq!(frame.indices.len(), 112 * 72);
    }

    #[test]
    fn only_two_indices_are_used() {
        let mut img = RgbImage::new(64, 48);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = ((x * 4 + y * 3) % 256) as u8;
            *px = Rgb([v, v / 2, 255 - v]);
        }
        let frame = normalize_frame(&DynamicImage::ImageRgb8(img), 16, 8, 125, ResizeFilter::Lanczos3);
        assert!(frame.indices.iter().all(|&i| i == BLACK_INDEX || i == WHITE_INDEX));
    }

    #[test]
    fn all_white_frame_is_white_index() {
        let frame = normalize_frame(&solid(32, 32, 255), 8, 8, 125, ResizeFilter::Nearest);
        assert!(frame.indices.iter().all(|&i| i == WHITE_INDEX));
    }

    #[test]
    fn all_black_frame_is_black_index() {
        let frame = normalize_frame(&solid(32, 32, 0), 8, 8, 125, ResizeFilter::Nearest);
        assert!(frame.indices.iter().all(|&i| i == BLACK_INDEX));
    }

    #[test]
    fn threshold_is_strictly_less_than() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(0, 0, Luma([124]));
        gray.put_pixel(1, 0, Luma([125]));
        gray.put_pixel(2, 0, Luma([126]));
        let binary = binarize(&gray, 125);
        assert_eq!(binary.as_raw(), &vec![0, 255, 255]);
    }

    #[test]
    fn palette_is_black_white_then_black() {
        let palette = NormalizedFrame::palette();
        assert_eq!(palette[0], [0, 0, 0]);
        assert_eq!(palette[1], [255, 255, 255]);
        assert!(palette[2..].iter().all(|c| *c == [0, 0, 0]));
        assert_eq!(NormalizedFrame::palette_bytes().len(), PALETTE_SIZE * 3);
    }

    #[test]
    fn split_frame_keeps_layout() {
        let mut img = RgbImage::from_pixel(8, 2, Rgb([0, 0, 0]));
        for x in 4..8 {
            for y in 0..2 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let frame = normalize_frame(&DynamicImage::ImageRgb8(img), 8, 2, 125, ResizeFilter::Nearest);
        assert_eq!(frame.index_at(0, 0), Some(BLACK_INDEX));
        assert_eq!(frame.index_at(7, 1), Some(WHITE_INDEX));
        assert_eq!(frame.index_at(8, 0), None);
        assert_eq!(frame.index_at(0, 2), None);
    }

    #[test]
    fn luminance_uses_rec601_weights() {
        assert_eq!(luminance(Rgb([0, 0, 0])), 0);
        assert_eq!(luminance(Rgb([255, 255, 255])), 255);
        assert_eq!(luminance(Rgb([0, 180, 0])), 106);
        assert_eq!(luminance(Rgb([255, 0, 0])), 76);
        assert_eq!(luminance(Rgb([0, 0, 255])), 29);
    }

    #[test]
    fn mid_green_binarizes_black() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([0, 180, 0])));
        let frame = normalize_frame(&img, 8, 8, 125, ResizeFilter::Nearest);
        assert!(frame.indices.iter().all(|&i| i == BLACK_INDEX));
    }
}
