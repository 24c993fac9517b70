//! Shared global color table construction
use std::collections::HashMap;

use log::{debug, warn};

/// RGBA pixels
pub const N_CHANNELS: usize = 4;
/// GIF palettes are RGB
pub const PLTE_CHANNELS: usize = 3;
/// Maximum number of entries in a GIF color table
pub const MAX_COLORS: usize = 256;
/// Pixels with an alpha value below this are transparent by default
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;

/// Palette key of a pixel
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorKey {
    /// Any pixel below the alpha threshold
    Transparent,
    Rgb([u8; 3]),
}

impl ColorKey {
    fn of(pixel: &[u8], threshold: u8) -> ColorKey {
        if pixel[3] < threshold {
            ColorKey::Transparent
        } else {
            ColorKey::Rgb([pixel[0], pixel[1], pixel[2]])
        }
    }

    fn rgb(self) -> [u8; 3] {
        match self {
            ColorKey::Transparent => [0, 0, 0],
            ColorKey::Rgb(rgb) => rgb,
        }
    }
}

/// Global palette shared by all frames of one animation.
///
/// Entries are ordered by first appearance when scanning the frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    keys: Vec<ColorKey>,
    transparent: Option<u8>,
}

impl Palette {
    /// Number of colors actually in use
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Palette entries in index order
    pub fn keys(&self) -> &[ColorKey] {
        &self.keys
    }

    /// Index reserved for transparent pixels, if any pixel was transparent
    pub fn transparent(&self) -> Option<u8> {
        self.transparent
    }

    /// Bits needed to address the table, never less than 2.
    pub fn table_bits(&self) -> u8 {
        table_bits(self.keys.len())
    }

    /// Number of entries written to the file, a power of two in `4..=256`
    pub fn table_size(&self) -> usize {
        1 << self.table_bits()
    }

    /// The color table as written to the file.
    ///
    /// Padded with black up to `table_size()`; the transparent entry is black as well.
    pub fn color_table(&self) -> Vec<u8> {
        let mut table = Vec::with_capacity(self.table_size() * PLTE_CHANNELS);
        for key in &self.keys {
            table.extend_from_slice(&key.rgb());
        }
        table.resize(self.table_size() * PLTE_CHANNELS, 0);
        table
    }
}

// Color table size converted to table bits
fn table_bits(size: usize) -> u8 {
    match size {
        0..=4 => 2,
        5..=8 => 3,
        9..=16 => 4,
        17..=32 => 5,
        33..=64 => 6,
        65..=128 => 7,
        _ => 8,
    }
}

/// Collects colors across frames and maps pixels to palette indices.
#[derive(Debug)]
pub struct PaletteBuilder {
    lookup: HashMap<ColorKey, u8>,
    keys: Vec<ColorKey>,
    threshold: u8,
    overflowed: bool,
}

impl PaletteBuilder {
    pub fn new(threshold: u8) -> PaletteBuilder {
        PaletteBuilder {
            lookup: HashMap::new(),
            keys: Vec::new(),
            threshold,
            overflowed: false,
        }
    }

    /// Converts one RGBA frame into palette indices, growing the palette as needed.
    ///
    /// Once the palette is full every unseen color maps to index 0.
    pub fn index_frame(&mut self, pixels: &[u8]) -> Vec<u8> {
        pixels
            .chunks_exact(N_CHANNELS)
            .map(|pix| self.index_of(ColorKey::of(pix, self.threshold)))
            .collect()
    }

    fn index_of(&mut self, key: ColorKey) -> u8 {
        if let Some(&idx) = self.lookup.get(&key) {
            return idx;
        }
        if self.keys.len() < MAX_COLORS {
            let idx = self.keys.len() as u8;
            self.lookup.insert(key, idx);
            self.keys.push(key);
            idx
        } else {
            if !self.overflowed {
                warn!("more than {} colors, excess colors use palette index 0", MAX_COLORS);
                self.overflowed = true;
            }
            0
        }
    }

    pub fn finish(self) -> Palette {
        let transparent = self.lookup.get(&ColorKey::Transparent).copied();
        debug!(
            "palette: {} colors, {} table bits, transparent index {:?}",
            self.keys.len(),
            table_bits(self.keys.len()),
            transparent
        );
        Palette {
            keys: self.keys,
            transparent,
        }
    }
}

/// Builds the shared palette of `frames` and the indexed form of every frame.
pub fn quantize<'a, I>(frames: I, threshold: u8) -> (Palette, Vec<Vec<u8>>)
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut builder = PaletteBuilder::new(threshold);
    let indexed = frames
        .into_iter()
        .map(|frame| builder.index_frame(frame))
        .collect();
    (builder.finish(), indexed)
}

#[cfg(test)]
mod test {
    use super::*;

    fn rgba(pixels: &[[u8; 4]]) -> Vec<u8> {
        pixels.iter().flatten().copied().collect()
    }

    #[test]
    fn indices_follow_scan_order() {
        let frame = rgba(&[[9, 9, 9, 255], [1, 2, 3, 255], [9, 9, 9, 255], [4, 5, 6, 200]]);
        let (palette, indexed) = quantize([&frame[..]], DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(indexed, vec![vec![0, 1, 0, 2]]);
        assert_eq!(palette.len(), 3);
        assert_eq!(
            palette.keys(),
            &[ColorKey::Rgb([9, 9, 9]), ColorKey::Rgb([1, 2, 3]), ColorKey::Rgb([4, 5, 6])]
        );
        assert_eq!(palette.transparent(), None);
        assert_eq!(palette.table_size(), 4);
        assert_eq!(
            palette.color_table(),
            [9, 9, 9, 1, 2, 3, 4, 5, 6, 0, 0, 0]
        );
    }

    #[test]
    fn translucent_pixels_share_one_index() {
        let a = rgba(&[[255, 0, 0, 255], [10, 20, 30, 0]]);
        let b = rgba(&[[0, 0, 255, 127], [0, 255, 0, 128]]);
        let (palette, indexed) = quantize([&a[..], &b[..]], DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(indexed, vec![vec![0, 1], vec![1, 2]]);
        assert_eq!(palette.transparent(), Some(1));
        assert_eq!(&palette.color_table()[3..6], &[0, 0, 0]);
    }

    #[test]
    fn threshold_is_configurable() {
        let frame = rgba(&[[1, 1, 1, 200], [2, 2, 2, 255]]);
        let (palette, indexed) = quantize([&frame[..]], 255);
        assert_eq!(indexed, vec![vec![0, 1]]);
        assert_eq!(palette.transparent(), Some(0));
    }

    #[test]
    fn overflow_collapses_to_index_zero() {
        let mut pixels = Vec::new();
        for i in 0..300u32 {
            pixels.extend_from_slice(&[(i >> 8) as u8, i as u8, 7, 255]);
        }
        // Transparency seen only after the table is full is not recorded.
        pixels.extend_from_slice(&[0, 0, 0, 0]);
        let (palette, indexed) = quantize([&pixels[..]], DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(palette.len(), MAX_COLORS);
        assert_eq!(palette.table_bits(), 8);
        assert_eq!(palette.transparent(), None);
        assert_eq!(indexed[0][255], 255);
        assert!(indexed[0][256..].iter().all(|&i| i == 0));
    }

    #[test]
    fn table_size_is_power_of_two_from_four() {
        for (colors, bits) in [(1, 2), (2, 2), (4, 2), (5, 3), (16, 4), (17, 5), (129, 8), (256, 8)] {
            assert_eq!(table_bits(colors), bits, "{} colors", colors);
        }
        let (palette, _) = quantize([&[5u8, 5, 5, 255][..]], DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(palette.table_size(), 4);
        assert_eq!(palette.color_table().len(), 12);
    }
}
