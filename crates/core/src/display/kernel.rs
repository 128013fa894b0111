//! Row expansion kernels.
//!
//! A kernel turns one row of palette indices into one scaled row of native
//! pixels. The kernel is chosen once from the device depth and the scale
//! factor and then reused for every row of every frame.
//!
//! `benches/blit_kernels.rs` compares the variants against each other.
//!
//! All variants produce byte-identical output for the same inputs.

use super::color::ColorTable;
use super::format::DisplayFormat;

/// Selected row expansion routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitKernel {
    /// 32bpp at 1x, four source indices decoded from one word
    Packed32x1,
    /// 32bpp at 2x, four source indices decoded from one word
    Packed32x2,
    /// 32bpp at 3x, four source indices decoded from one word
    Packed32x3,
    /// 32bpp at any scale, one word store per destination pixel
    Wide32 { scale: usize },
    /// Any depth, `bytes_per_pixel` bytes copied per destination pixel
    Generic { bytes_per_pixel: usize, scale: usize },
}

impl BlitKernel {
    /// Pick the fastest kernel for this device and scale.
    ///
    /// The packed kernels need the row width to be a multiple of four;
    /// other widths get the plain 32bpp kernel.
    pub fn select(format: &DisplayFormat, scale: usize, logical_width: usize) -> Self {
        let packable = logical_width % 4 == 0;
        match (format.bits_per_pixel, scale) {
            (32, 1) if packable => BlitKernel::Packed32x1,
            (32, 2) if packable => BlitKernel::Packed32x2,
            (32, 3) if packable => BlitKernel::Packed32x3,
            (32, _) => BlitKernel::Wide32 { scale },
            _ => BlitKernel::Generic {
                bytes_per_pixel: format.bytes_per_pixel(),
                scale,
            },
        }
    }

    pub fn scale(&self) -> usize {
        match *self {
            BlitKernel::Packed32x1 => 1,
            BlitKernel::Packed32x2 => 2,
            BlitKernel::Packed32x3 => 3,
            BlitKernel::Wide32 { scale } | BlitKernel::Generic { scale, .. } => scale,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match *self {
            BlitKernel::Generic {
                bytes_per_pixel, ..
            } => bytes_per_pixel,
            _ => 4,
        }
    }

    /// Bytes written for a source row of `width` pixels
    pub fn output_len(&self, width: usize) -> usize {
        width * self.scale() * self.bytes_per_pixel()
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlitKernel::Packed32x1 => "32bpp packed 1x",
            BlitKernel::Packed32x2 => "32bpp packed 2x",
            BlitKernel::Packed32x3 => "32bpp packed 3x",
            BlitKernel::Wide32 { .. } => "32bpp generic",
            BlitKernel::Generic { .. } => "generic",
        }
    }

    /// Expand `row` into `out`, which must hold at least `output_len(row.len())` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `out` is too short.
    pub fn expand(&self, colors: &ColorTable, out: &mut [u8], row: &[u8]) {
        let out = &mut out[..self.output_len(row.len())];
        match *self {
            BlitKernel::Packed32x1 => expand_packed32::<1>(colors, out, row),
            BlitKernel::Packed32x2 => expand_packed32::<2>(colors, out, row),
            BlitKernel::Packed32x3 => expand_packed32::<3>(colors, out, row),
            BlitKernel::Wide32 { scale } => expand_wide32(colors, out, row, scale),
            BlitKernel::Generic {
                bytes_per_pixel,
                scale,
            } => expand_generic(colors, out, row, bytes_per_pixel, scale),
        }
    }
}

/// Write the low `dst.len()` bytes of `pixel` in host order.
#[inline(always)]
fn store_pixel(dst: &mut [u8], pixel: u32) {
    let bytes = pixel.to_ne_bytes();
    let n = dst.len();
    if cfg!(target_endian = "little") {
        dst.copy_from_slice(&bytes[..n]);
    } else {
        dst.copy_from_slice(&bytes[4 - n..]);
    }
}

fn expand_generic(colors: &ColorTable, out: &mut [u8], row: &[u8], bpp: usize, scale: usize) {
    let mut pixels = out.chunks_exact_mut(bpp);
    for &index in row {
        let pix = colors.get(index);
        for dst in pixels.by_ref().take(scale) {
            store_pixel(dst, pix);
        }
    }
}

// Replica loop outside: fewer branches per store on in-order cores.
fn expand_wide32(colors: &ColorTable, out: &mut [u8], row: &[u8], scale: usize) {
    for k in 0..scale {
        for (i, &index) in row.iter().enumerate() {
            let at = (i * scale + k) * 4;
            out[at..at + 4].copy_from_slice(&colors.get(index).to_ne_bytes());
        }
    }
}

fn expand_packed32<const SCALE: usize>(colors: &ColorTable, out: &mut [u8], row: &[u8]) {
    for (src, dst) in row.chunks_exact(4).zip(out.chunks_exact_mut(16 * SCALE)) {
        // First index in the low byte regardless of host order
        let mut indices = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        for block in dst.chunks_exact_mut(4 * SCALE) {
            let pix = colors.get((indices & 0xff) as u8).to_ne_bytes();
            indices >>= 8;
            for word in block.chunks_exact_mut(4) {
                word.copy_from_slice(&pix);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::color::PALETTE_BYTES;
    use crate::display::gamma::GammaTable;

    fn ramp_table(format: &DisplayFormat) -> ColorTable {
        let mut palette = [0u8; PALETTE_BYTES];
        for (i, rgb) in palette.chunks_exact_mut(3).enumerate() {
            rgb.copy_from_slice(&[i as u8, 255 - i as u8, (i as u8).wrapping_mul(3)]);
        }
        ColorTable::build(&palette, &GammaTable::identity(), 0, format)
    }

    #[test]
    fn test_selection_policy() {
        let fb32 = DisplayFormat::xrgb8888(1280, 720);
        assert_eq!(BlitKernel::select(&fb32, 1, 320), BlitKernel::Packed32x1);
        assert_eq!(BlitKernel::select(&fb32, 2, 320), BlitKernel::Packed32x2);
        assert_eq!(BlitKernel::select(&fb32, 3, 320), BlitKernel::Packed32x3);
        assert_eq!(
            BlitKernel::select(&fb32, 4, 320),
            BlitKernel::Wide32 { scale: 4 }
        );

        let fb16 = DisplayFormat::rgb565(1280, 720);
        assert_eq!(
            BlitKernel::select(&fb16, 2, 320),
            BlitKernel::Generic {
                bytes_per_pixel: 2,
                scale: 2
            }
        );
    }

    #[test]
    fn test_unaligned_width_avoids_packed_kernels() {
        let fb32 = DisplayFormat::xrgb8888(1280, 720);
        assert_eq!(
            BlitKernel::select(&fb32, 2, 318),
            BlitKernel::Wide32 { scale: 2 }
        );
    }

    #[test]
    fn test_output_len() {
        assert_eq!(BlitKernel::Packed32x3.output_len(320), 320 * 3 * 4);
        let k = BlitKernel::Generic {
            bytes_per_pixel: 3,
            scale: 2,
        };
        assert_eq!(k.output_len(320), 320 * 2 * 3);
    }

    #[test]
    fn test_packed_2x_replicates_in_order() {
        let format = DisplayFormat::xrgb8888(16, 1);
        let colors = ramp_table(&format);
        let row = [1u8, 2, 3, 4];
        let mut out = vec![0u8; 32];
        BlitKernel::Packed32x2.expand(&colors, &mut out, &row);

        let words: Vec<u32> = out
            .chunks_exact(4)
            .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        let expected: Vec<u32> = row
            .iter()
            .flat_map(|&i| [colors.get(i), colors.get(i)])
            .collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn test_generic_16bpp_writes_two_bytes_per_pixel() {
        let format = DisplayFormat::rgb565(8, 1);
        let colors = ramp_table(&format);
        let kernel = BlitKernel::select(&format, 1, 2);
        let mut out = vec![0xAAu8; 6];
        kernel.expand(&colors, &mut out, &[7, 9]);

        assert_eq!(&out[0..2], &(colors.get(7) as u16).to_ne_bytes());
        assert_eq!(&out[2..4], &(colors.get(9) as u16).to_ne_bytes());
        // Nothing past the scaled row is touched
        assert_eq!(&out[4..], &[0xAA, 0xAA]);
    }

    #[test]
    fn test_every_32bpp_kernel_matches_generic() {
        let format = DisplayFormat::xrgb8888(1280, 720);
        let colors = ramp_table(&format);
        let row: Vec<u8> = (0..=255u8).collect();

        for scale in 1..=5 {
            let fast = BlitKernel::select(&format, scale, row.len());
            let reference = BlitKernel::Generic {
                bytes_per_pixel: 4,
                scale,
            };
            let mut a = vec![0u8; fast.output_len(row.len())];
            let mut b = vec![0u8; reference.output_len(row.len())];
            fast.expand(&colors, &mut a, &row);
            reference.expand(&colors, &mut b, &row);
            assert_eq!(a, b, "{} differs from generic at {}x", fast.name(), scale);
        }
    }
}
