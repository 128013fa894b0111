//! Per-frame presentation onto the device.
//!
//! Each frame every logical row goes through the selected kernel once and
//! the scaled result is replicated `scale` times downwards. There is no
//! dirty tracking: every frame repaints the whole image.
//!
//! Two permanent modes, decided by the sink handed to `present`:
//!
//! - **Mapped**: the sink is device memory. Rows are expanded into a scratch
//!   row and copied to each replica position.
//! - **Buffered**: the sink is a staging copy of the device frame. The first
//!   replica is expanded in place, the others are copied from it, and the
//!   occupied span is committed with one positioned write.

use super::color::{ColorTable, Palette};
use super::format::DisplayFormat;
use super::gamma::GammaTable;
use super::kernel::BlitKernel;
use crate::error::FbError;
use crate::logging::{log, LogCategory, LogLevel};
use crate::types::LogicalFrame;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    Mapped,
    Buffered,
}

impl PresentMode {
    pub fn name(&self) -> &str {
        match self {
            PresentMode::Mapped => "mmap",
            PresentMode::Buffered => "write",
        }
    }
}

/// Destination of a presented frame.
///
/// `frame_mut` exposes the device frame layout (`stride * height` bytes).
/// `commit` is called once per frame with the byte span that was written.
pub trait FrameSink {
    fn mode(&self) -> PresentMode;

    fn frame_mut(&mut self) -> &mut [u8];

    fn commit(&mut self, span: Range<usize>) -> Result<(), FbError>;
}

/// Placement of the scaled logical image on the device, fixed at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub logical_width: usize,
    pub logical_height: usize,
    pub scale: usize,
    pub bytes_per_pixel: usize,
    pub stride: usize,
    pub device_width: usize,
    pub device_height: usize,
    /// Left margin in bytes
    pub x_offset: usize,
    /// Top margin in device rows
    pub y_offset: usize,
}

impl Geometry {
    /// Largest integer scale at which the logical image fits the device.
    pub fn auto_scale(
        format: &DisplayFormat,
        logical_width: usize,
        logical_height: usize,
    ) -> Result<usize, FbError> {
        check_logical(logical_width, logical_height)?;
        let scale = (format.width / logical_width).min(format.height / logical_height);
        if scale == 0 {
            return Err(FbError::DisplayTooSmall {
                device_width: format.width,
                device_height: format.height,
                scaled_width: logical_width,
                scaled_height: logical_height,
            });
        }
        Ok(scale)
    }

    /// Center the scaled image on the device.
    ///
    /// Fails if the scaled image does not fit; nothing is ever clipped.
    pub fn new(
        format: &DisplayFormat,
        logical_width: usize,
        logical_height: usize,
        scale: usize,
    ) -> Result<Self, FbError> {
        check_logical(logical_width, logical_height)?;
        if scale == 0 {
            return Err(FbError::InvalidScale);
        }
        let scaled_width = logical_width * scale;
        let scaled_height = logical_height * scale;
        if scaled_width > format.width || scaled_height > format.height {
            return Err(FbError::DisplayTooSmall {
                device_width: format.width,
                device_height: format.height,
                scaled_width,
                scaled_height,
            });
        }

        let bytes_per_pixel = format.bytes_per_pixel();
        Ok(Self {
            logical_width,
            logical_height,
            scale,
            bytes_per_pixel,
            stride: format.stride,
            device_width: format.width,
            device_height: format.height,
            x_offset: (format.width - scaled_width) / 2 * bytes_per_pixel,
            y_offset: (format.height - scaled_height) / 2,
        })
    }

    pub fn scaled_width(&self) -> usize {
        self.logical_width * self.scale
    }

    pub fn scaled_height(&self) -> usize {
        self.logical_height * self.scale
    }

    /// Bytes in one scaled row
    pub fn line_bytes(&self) -> usize {
        self.scaled_width() * self.bytes_per_pixel
    }

    /// Byte offset of the image's first pixel on device row `y_offset + row`.
    #[inline]
    pub fn row_start(&self, row: usize) -> usize {
        (self.y_offset + row) * self.stride + self.x_offset
    }

    /// Whole device rows touched by the image, as a byte range.
    pub fn span(&self) -> Range<usize> {
        self.y_offset * self.stride..(self.y_offset + self.scaled_height()) * self.stride
    }

    pub fn frame_bytes(&self) -> usize {
        self.stride * self.device_height
    }
}

fn check_logical(width: usize, height: usize) -> Result<(), FbError> {
    if width == 0 || height == 0 {
        return Err(FbError::InvalidFormat(format!(
            "empty logical resolution {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// Owns the color table and kernel, and pushes logical frames to a sink.
pub struct FramePresenter {
    format: DisplayFormat,
    geometry: Geometry,
    kernel: BlitKernel,
    gamma: GammaTable,
    colors: ColorTable,
    /// Installed at the start of the next `present`
    pending: Option<ColorTable>,
    scratch: Vec<u8>,
}

impl FramePresenter {
    pub fn new(format: DisplayFormat, geometry: Geometry, gamma: GammaTable) -> Self {
        let kernel = BlitKernel::select(&format, geometry.scale, geometry.logical_width);
        log(LogCategory::Video, LogLevel::Info, || {
            format!(
                "{}x scaling, kernel: {}, offsets: {} bytes / {} rows",
                geometry.scale,
                kernel.name(),
                geometry.x_offset,
                geometry.y_offset
            )
        });
        Self {
            format,
            geometry,
            kernel,
            gamma,
            colors: ColorTable::black(),
            pending: None,
            scratch: vec![0; geometry.line_bytes()],
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn kernel(&self) -> BlitKernel {
        self.kernel
    }

    pub fn format(&self) -> &DisplayFormat {
        &self.format
    }

    /// Table used by the most recent (or next, if none yet) frame
    pub fn colors(&self) -> &ColorTable {
        &self.colors
    }

    /// Stage a new palette. It takes effect with the next `present`.
    pub fn set_palette(&mut self, palette: &Palette, gamma_level: usize) {
        log(LogCategory::Palette, LogLevel::Debug, || {
            format!("palette change at gamma level {}", gamma_level)
        });
        self.pending = Some(ColorTable::build(
            palette,
            &self.gamma,
            gamma_level,
            &self.format,
        ));
    }

    /// Closest index in the most recently staged palette
    pub fn nearest_index(&self, r: u8, g: u8, b: u8) -> u8 {
        self.pending
            .as_ref()
            .unwrap_or(&self.colors)
            .nearest_index(r, g, b)
    }

    pub fn present(
        &mut self,
        frame: &LogicalFrame,
        sink: &mut dyn FrameSink,
    ) -> Result<(), FbError> {
        let g = self.geometry;
        if frame.width != g.logical_width || frame.height != g.logical_height {
            return Err(FbError::FrameMismatch {
                width: g.logical_width,
                height: g.logical_height,
                actual_width: frame.width,
                actual_height: frame.height,
            });
        }
        if let Some(colors) = self.pending.take() {
            self.colors = colors;
        }

        let mode = sink.mode();
        let dst = sink.frame_mut();
        if dst.len() < g.frame_bytes() {
            return Err(FbError::InvalidFormat(format!(
                "sink holds {} bytes, frame needs {}",
                dst.len(),
                g.frame_bytes()
            )));
        }

        let line = g.line_bytes();
        match mode {
            PresentMode::Mapped => {
                for (y, row) in frame.rows().enumerate() {
                    self.kernel.expand(&self.colors, &mut self.scratch, row);
                    for r in 0..g.scale {
                        let start = g.row_start(y * g.scale + r);
                        dst[start..start + line].copy_from_slice(&self.scratch);
                    }
                }
            }
            PresentMode::Buffered => {
                for (y, row) in frame.rows().enumerate() {
                    let first = g.row_start(y * g.scale);
                    self.kernel
                        .expand(&self.colors, &mut dst[first..first + line], row);
                    for r in 1..g.scale {
                        dst.copy_within(first..first + line, g.row_start(y * g.scale + r));
                    }
                }
            }
        }

        sink.commit(g.span())
    }
}
