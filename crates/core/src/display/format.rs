//! Destination pixel format as reported by the output device.

use crate::error::FbError;
use serde::{Deserialize, Serialize};

/// Position of one color channel inside a native pixel word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelField {
    pub offset: u32,
    pub length: u32,
}

impl ChannelField {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Bits covered by this field, as a mask over a 64-bit word.
    fn mask(&self) -> u64 {
        if self.length == 0 {
            return 0;
        }
        ((1u64 << self.length) - 1) << self.offset
    }

    /// Place an 8-bit intensity into this field, keeping the top `length` bits.
    #[inline]
    pub fn place(&self, value: u8) -> u32 {
        if self.length == 0 {
            return 0;
        }
        ((value as u32) >> (8 - self.length)) << self.offset
    }
}

/// Resolution and native pixel layout of the physical display.
///
/// Immutable once negotiated. `stride` is the distance in bytes between the
/// starts of two consecutive device rows; it is at least `width * bytes_per_pixel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFormat {
    pub width: usize,
    pub height: usize,
    pub bits_per_pixel: u32,
    pub stride: usize,
    pub red: ChannelField,
    pub green: ChannelField,
    pub blue: ChannelField,
    pub alpha: Option<ChannelField>,
}

impl DisplayFormat {
    /// Build a format with a tightly packed stride and no alpha channel.
    pub fn new(
        width: usize,
        height: usize,
        bits_per_pixel: u32,
        red: ChannelField,
        green: ChannelField,
        blue: ChannelField,
    ) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            stride: width * (bits_per_pixel as usize / 8),
            red,
            green,
            blue,
            alpha: None,
        }
    }

    /// 32bpp, red at 16, green at 8, blue at 0.
    pub fn xrgb8888(width: usize, height: usize) -> Self {
        Self::new(
            width,
            height,
            32,
            ChannelField::new(16, 8),
            ChannelField::new(8, 8),
            ChannelField::new(0, 8),
        )
    }

    /// 16bpp, 5-6-5.
    pub fn rgb565(width: usize, height: usize) -> Self {
        Self::new(
            width,
            height,
            16,
            ChannelField::new(11, 5),
            ChannelField::new(5, 6),
            ChannelField::new(0, 5),
        )
    }

    /// Use the device-reported line length. Zero keeps the packed stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        if stride != 0 {
            self.stride = stride;
        }
        self
    }

    pub fn with_alpha(mut self, alpha: ChannelField) -> Self {
        self.alpha = (alpha.length > 0).then_some(alpha);
        self
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }

    /// Size of the whole device frame in bytes
    pub fn frame_bytes(&self) -> usize {
        self.stride * self.height
    }

    /// Swap red and blue offsets, for devices that report RGB but scan out BGR.
    pub fn swap_red_blue(&mut self) {
        std::mem::swap(&mut self.red.offset, &mut self.blue.offset);
    }

    /// Check that the layout can be packed by the color table.
    ///
    /// Depth must be 8, 16, 24 or 32 bits; every channel must fit inside the
    /// pixel, be at most 8 bits wide, and not overlap any other channel.
    pub fn validate(&self) -> Result<(), FbError> {
        if !matches!(self.bits_per_pixel, 8 | 16 | 24 | 32) {
            return Err(FbError::InvalidFormat(format!(
                "{} bits per pixel",
                self.bits_per_pixel
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(FbError::InvalidFormat(format!(
                "empty resolution {}x{}",
                self.width, self.height
            )));
        }
        if self.stride < self.width * self.bytes_per_pixel() {
            return Err(FbError::InvalidFormat(format!(
                "line length {} shorter than {} pixels",
                self.stride, self.width
            )));
        }

        let mut fields = vec![("red", self.red), ("green", self.green), ("blue", self.blue)];
        if let Some(alpha) = self.alpha {
            fields.push(("alpha", alpha));
        }

        let mut used = 0u64;
        for (name, field) in fields {
            if field.length > 8 {
                return Err(FbError::InvalidFormat(format!(
                    "{} channel is {} bits wide",
                    name, field.length
                )));
            }
            let end = field.offset.checked_add(field.length);
            if end.map_or(true, |end| end > self.bits_per_pixel) {
                return Err(FbError::InvalidFormat(format!(
                    "{} channel at {}+{} exceeds {} bits",
                    name, field.offset, field.length, self.bits_per_pixel
                )));
            }
            if used & field.mask() != 0 {
                return Err(FbError::InvalidFormat(format!(
                    "{} channel overlaps another channel",
                    name
                )));
            }
            used |= field.mask();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_stride() {
        let f = DisplayFormat::xrgb8888(640, 480);
        assert_eq!(f.bytes_per_pixel(), 4);
        assert_eq!(f.stride, 2560);
        assert_eq!(f.frame_bytes(), 2560 * 480);
        assert_eq!(f.with_stride(0).stride, 2560);
        assert_eq!(f.with_stride(4096).stride, 4096);
    }

    #[test]
    fn test_common_formats_validate() {
        assert!(DisplayFormat::xrgb8888(320, 200).validate().is_ok());
        assert!(DisplayFormat::rgb565(320, 240).validate().is_ok());
        let argb = DisplayFormat::xrgb8888(320, 200).with_alpha(ChannelField::new(24, 8));
        assert!(argb.validate().is_ok());
    }

    #[test]
    fn test_overlapping_channels_rejected() {
        let mut f = DisplayFormat::xrgb8888(320, 200);
        f.green = ChannelField::new(12, 8);
        assert!(matches!(f.validate(), Err(FbError::InvalidFormat(_))));
    }

    #[test]
    fn test_channel_past_pixel_width_rejected() {
        let mut f = DisplayFormat::rgb565(320, 200);
        f.red = ChannelField::new(12, 5);
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_huge_channel_offset_rejected() {
        let mut f = DisplayFormat::xrgb8888(320, 200);
        f.red = ChannelField::new(u32::MAX - 2, 8);
        assert!(matches!(f.validate(), Err(FbError::InvalidFormat(_))));
    }

    #[test]
    fn test_odd_depth_rejected() {
        let mut f = DisplayFormat::rgb565(320, 200);
        f.bits_per_pixel = 15;
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_short_stride_rejected() {
        let f = DisplayFormat::xrgb8888(320, 200);
        let f = DisplayFormat { stride: 100, ..f };
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_swap_red_blue() {
        let mut f = DisplayFormat::xrgb8888(320, 200);
        f.swap_red_blue();
        assert_eq!(f.red.offset, 0);
        assert_eq!(f.blue.offset, 16);
        assert_eq!(f.green.offset, 8);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_place_truncates_to_field_width() {
        let field = ChannelField::new(11, 5);
        assert_eq!(field.place(0xFF), 0x1F << 11);
        assert_eq!(field.place(0x07), 0);
        assert_eq!(ChannelField::new(0, 0).place(0xFF), 0);
    }
}
