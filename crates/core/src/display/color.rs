//! Palette index to native pixel lookup.
//!
//! The renderer works in 256 palette indices. Before any pixel reaches the
//! device, each index is resolved through a `ColorTable` built from the
//! current 768-byte RGB palette, the active gamma curve, and the device's
//! channel layout.

use super::format::DisplayFormat;
use super::gamma::GammaTable;

pub const PALETTE_SIZE: usize = 256;
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 3;

/// 256 RGB triplets, one byte per channel.
pub type Palette = [u8; PALETTE_BYTES];

/// 256 native pixel words, one per palette index.
///
/// Only the low `bytes_per_pixel` bytes of each word are meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    entries: [u32; PALETTE_SIZE],
    /// The palette this table was built from, before gamma
    source: Palette,
}

impl ColorTable {
    /// All entries zero. Shown until the host installs a palette.
    pub fn black() -> Self {
        Self {
            entries: [0; PALETTE_SIZE],
            source: [0; PALETTE_BYTES],
        }
    }

    /// Build the table for `palette` under gamma `level`.
    ///
    /// Each channel is gamma corrected, truncated to the device field width
    /// and shifted to its offset. Same inputs always give the same table.
    pub fn build(
        palette: &Palette,
        gamma: &GammaTable,
        level: usize,
        format: &DisplayFormat,
    ) -> Self {
        let curve = gamma.curve(level);
        let mut entries = [0u32; PALETTE_SIZE];
        for (entry, rgb) in entries.iter_mut().zip(palette.chunks_exact(3)) {
            let r = curve[rgb[0] as usize];
            let g = curve[rgb[1] as usize];
            let b = curve[rgb[2] as usize];
            *entry = format.red.place(r) | format.green.place(g) | format.blue.place(b);
        }
        Self {
            entries,
            source: *palette,
        }
    }

    #[inline(always)]
    pub fn get(&self, index: u8) -> u32 {
        self.entries[index as usize]
    }

    pub fn entries(&self) -> &[u32; PALETTE_SIZE] {
        &self.entries
    }

    pub fn palette(&self) -> &Palette {
        &self.source
    }

    /// Closest palette index to an RGB color, by squared distance.
    ///
    /// Ties resolve to the lowest index; an exact match stops the search.
    pub fn nearest_index(&self, r: u8, g: u8, b: u8) -> u8 {
        let mut best = 0usize;
        let mut best_diff = i32::MAX;
        for (i, rgb) in self.source.chunks_exact(3).enumerate() {
            let dr = r as i32 - rgb[0] as i32;
            let dg = g as i32 - rgb[1] as i32;
            let db = b as i32 - rgb[2] as i32;
            let diff = dr * dr + dg * dg + db * db;
            if diff < best_diff {
                best = i;
                best_diff = diff;
            }
            if diff == 0 {
                break;
            }
        }
        best as u8
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::black()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::format::ChannelField;

    fn palette_with(entries: &[(usize, [u8; 3])]) -> Palette {
        let mut p = [0u8; PALETTE_BYTES];
        for &(i, rgb) in entries {
            p[i * 3..i * 3 + 3].copy_from_slice(&rgb);
        }
        p
    }

    #[test]
    fn test_red_on_xrgb8888() {
        let format = DisplayFormat::xrgb8888(320, 200);
        let palette = palette_with(&[(5, [255, 0, 0])]);
        let table = ColorTable::build(&palette, &GammaTable::identity(), 0, &format);
        assert_eq!(table.get(5), 0x00FF0000);
    }

    #[test]
    fn test_black_is_zero_for_any_layout() {
        let palette = palette_with(&[(1, [10, 20, 30])]);
        let layouts = [
            DisplayFormat::xrgb8888(320, 200),
            DisplayFormat::rgb565(320, 200),
            {
                let mut f = DisplayFormat::xrgb8888(320, 200);
                f.swap_red_blue();
                f
            },
        ];
        for format in layouts {
            let table = ColorTable::build(&palette, &GammaTable::identity(), 0, &format);
            assert_eq!(table.get(0), 0, "black must pack to zero");
        }
    }

    #[test]
    fn test_rgb565_packing() {
        let format = DisplayFormat::rgb565(320, 200);
        let palette = palette_with(&[(1, [0xFF, 0xFF, 0xFF]), (2, [0x08, 0x04, 0x08])]);
        let table = ColorTable::build(&palette, &GammaTable::identity(), 0, &format);
        assert_eq!(table.get(1), 0xFFFF);
        assert_eq!(table.get(2), (1 << 11) | (1 << 5) | 1);
    }

    #[test]
    fn test_gamma_applied_before_packing() {
        let format = DisplayFormat::xrgb8888(320, 200);
        let mut curve = [0u8; 256];
        curve[100] = 200;
        let gamma = GammaTable::new(vec![[0u8; 256], curve]);
        let palette = palette_with(&[(7, [100, 100, 100])]);

        assert_eq!(ColorTable::build(&palette, &gamma, 0, &format).get(7), 0);
        assert_eq!(
            ColorTable::build(&palette, &gamma, 1, &format).get(7),
            0x00C8C8C8
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let format = DisplayFormat::rgb565(640, 480);
        let mut palette = [0u8; PALETTE_BYTES];
        for (i, b) in palette.iter_mut().enumerate() {
            *b = (i * 7 % 256) as u8;
        }
        let gamma = GammaTable::power_curves(5);
        let a = ColorTable::build(&palette, &gamma, 3, &format);
        let b = ColorTable::build(&palette, &gamma, 3, &format);
        assert_eq!(a, b);
    }

    #[test]
    fn test_alpha_field_left_clear() {
        let format = DisplayFormat::xrgb8888(320, 200).with_alpha(ChannelField::new(24, 8));
        let palette = palette_with(&[(3, [255, 255, 255])]);
        let table = ColorTable::build(&palette, &GammaTable::identity(), 0, &format);
        assert_eq!(table.get(3), 0x00FFFFFF);
    }

    #[test]
    fn test_nearest_index() {
        let palette = palette_with(&[(0, [0, 0, 0]), (10, [200, 10, 10]), (20, [10, 200, 10])]);
        let table = ColorTable::build(
            &palette,
            &GammaTable::identity(),
            0,
            &DisplayFormat::xrgb8888(320, 200),
        );
        assert_eq!(table.nearest_index(190, 0, 0), 10);
        assert_eq!(table.nearest_index(10, 200, 10), 20);
        // Many entries are black; the lowest one wins
        assert_eq!(table.nearest_index(1, 1, 1), 0);
    }
}
