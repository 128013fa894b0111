//! Framebuffer device negotiation.
//!
//! The variable and fixed screen info are queried once at init and turned
//! into a `DisplayFormat`. The device handle is kept open for the sink.

use fbdev_core::display::{ChannelField, DisplayFormat};
use fbdev_core::logging::{log, LogCategory, LogLevel};
use fbdev_core::FbError;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::raw::c_ulong;
use std::path::{Path, PathBuf};

const FBIOGET_VSCREENINFO: c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: c_ulong = 0x4602;

/// `struct fb_bitfield`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FbBitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

impl FbBitfield {
    pub fn new(offset: u32, length: u32) -> Self {
        Self {
            offset,
            length,
            msb_right: 0,
        }
    }

    fn field(&self) -> ChannelField {
        ChannelField::new(self.offset, self.length)
    }
}

/// `struct fb_var_screeninfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbVarScreeninfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: FbBitfield,
    pub green: FbBitfield,
    pub blue: FbBitfield,
    pub transp: FbBitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

/// `struct fb_fix_screeninfo`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbFixScreeninfo {
    pub id: [u8; 16],
    pub smem_start: c_ulong,
    pub smem_len: u32,
    pub kind: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    pub line_length: u32,
    pub mmio_start: c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

impl FbFixScreeninfo {
    /// Driver name, up to the first NUL
    pub fn id(&self) -> String {
        let end = self.id.iter().position(|&b| b == 0).unwrap_or(self.id.len());
        String::from_utf8_lossy(&self.id[..end]).into_owned()
    }
}

/// Build the display format from queried screen info.
///
/// `line_length` becomes the stride when the driver reports one. With
/// `bgra` set, red and blue offsets are swapped after the query.
pub fn format_from_screeninfo(
    var: &FbVarScreeninfo,
    fix: &FbFixScreeninfo,
    bgra: bool,
) -> Result<DisplayFormat, FbError> {
    let mut format = DisplayFormat::new(
        var.xres as usize,
        var.yres as usize,
        var.bits_per_pixel,
        var.red.field(),
        var.green.field(),
        var.blue.field(),
    )
    .with_stride(fix.line_length as usize)
    .with_alpha(var.transp.field());
    if bgra {
        format.swap_red_blue();
    }
    format.validate()?;
    Ok(format)
}

/// Open framebuffer device plus what it reported at init.
#[derive(Debug)]
pub struct Framebuffer {
    file: File,
    path: PathBuf,
    var: FbVarScreeninfo,
    fix: FbFixScreeninfo,
}

impl Framebuffer {
    /// Open `path` read-write and query both screen info blocks.
    pub fn open(path: &Path) -> Result<Self, FbError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| FbError::DeviceOpen {
                path: path.to_path_buf(),
                source,
            })?;

        let mut var = FbVarScreeninfo::default();
        query(&file, FBIOGET_VSCREENINFO, &mut var).map_err(|source| FbError::DeviceQuery {
            what: "variable screen info",
            path: path.to_path_buf(),
            source,
        })?;
        let mut fix = FbFixScreeninfo::default();
        query(&file, FBIOGET_FSCREENINFO, &mut fix).map_err(|source| FbError::DeviceQuery {
            what: "fixed screen info",
            path: path.to_path_buf(),
            source,
        })?;

        log(LogCategory::Device, LogLevel::Info, || {
            format!(
                "{} ({}): {}x{}, virtual {}x{}, {} bpp, grayscale {}, line length {}",
                path.display(),
                fix.id(),
                var.xres,
                var.yres,
                var.xres_virtual,
                var.yres_virtual,
                var.bits_per_pixel,
                var.grayscale,
                fix.line_length
            )
        });

        Ok(Self {
            file,
            path: path.to_path_buf(),
            var,
            fix,
        })
    }

    /// Display format as reported, with the optional red/blue swap applied.
    pub fn negotiate(&self, bgra: bool) -> Result<DisplayFormat, FbError> {
        let format = format_from_screeninfo(&self.var, &self.fix, bgra)?;
        log(LogCategory::Video, LogLevel::Info, || {
            format!(
                "{} layout: r {}@{}, g {}@{}, b {}@{}, a {}",
                if bgra { "BGRA" } else { "RGBA" },
                format.red.length,
                format.red.offset,
                format.green.length,
                format.green.offset,
                format.blue.length,
                format.blue.offset,
                format
                    .alpha
                    .map(|a| format!("{}@{}", a.length, a.offset))
                    .unwrap_or_else(|| "none".to_string())
            )
        });
        Ok(format)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn var_info(&self) -> &FbVarScreeninfo {
        &self.var
    }

    pub fn fix_info(&self) -> &FbFixScreeninfo {
        &self.fix
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

fn query<T>(file: &File, request: c_ulong, out: &mut T) -> io::Result<()> {
    // SAFETY: `out` is a live repr(C) struct matching the kernel's layout for
    // `request`, and the descriptor stays open for the call.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), request as _, out as *mut T) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
