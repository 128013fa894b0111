//! Stand-in renderer: a test pattern and a few palettes to flash between.

use fbdev_core::display::{Palette, PALETTE_BYTES};
use fbdev_core::types::LogicalFrame;

/// Frames a palette flash stays on screen
pub const FLASH_FRAMES: u32 = 8;

/// Grey ramp on 0..64, then red, green and blue ramps.
pub fn base_palette() -> Palette {
    let mut palette = [0u8; PALETTE_BYTES];
    for (i, rgb) in palette.chunks_exact_mut(3).enumerate() {
        let band = i / 64;
        let level = ((i % 64) * 4) as u8;
        let color = match band {
            0 => [level, level, level],
            1 => [level, 0, 0],
            2 => [0, level, 0],
            _ => [0, 0, level],
        };
        rgb.copy_from_slice(&color);
    }
    palette
}

/// `base` blended towards `tint` by `amount` / 8.
pub fn tinted(base: &Palette, tint: [u8; 3], amount: u8) -> Palette {
    let amount = amount.min(8) as u16;
    let mut out = *base;
    for rgb in out.chunks_exact_mut(3) {
        for (c, t) in rgb.iter_mut().zip(tint) {
            *c = ((*c as u16 * (8 - amount) + t as u16 * amount) / 8) as u8;
        }
    }
    out
}

/// Grey, red and green bands, a scrolling bar, and a blue marker at
/// `cursor_x`.
pub fn draw_pattern(frame: &mut LogicalFrame, tick: u32, cursor_x: usize) {
    let width = frame.width;
    let height = frame.height;
    let bar = (tick as usize) % height.max(1);
    let marker = cursor_x.min(width.saturating_sub(1));
    for y in 0..height {
        let row = frame.row_mut(y);
        if y == bar {
            row.fill(63);
            continue;
        }
        for (x, px) in row.iter_mut().enumerate() {
            *px = ((x * 192) / width.max(1)) as u8;
        }
        row[marker] = 255;
    }
}
