//! The backend context: one value owning every device handle.
//!
//! `FbdevBackend::init` negotiates the display, opens the frame sink and the
//! configured input backend. The host calls `set_palette` / `present` per
//! frame and `poll` per tic. `shutdown` (or drop) restores the terminal.

use crate::evdev::EvdevInput;
use crate::framebuffer::Framebuffer;
use crate::sink::DeviceSink;
use crate::tty::TtyInput;
use fbdev_core::display::{
    DisplayFormat, FramePresenter, FrameSink, GammaTable, Geometry, Palette, PresentMode,
};
use fbdev_core::input::{EventSink, PollStatus};
use fbdev_core::logging::{log, LogCategory, LogLevel};
use fbdev_core::settings::{InputBackendKind, InputSettings, Settings};
use fbdev_core::types::LogicalFrame;
use fbdev_core::FbError;

/// Input source chosen at init
pub enum InputDriver {
    Evdev(EvdevInput),
    Tty(TtyInput),
    Disabled,
}

impl InputDriver {
    pub fn open(settings: &InputSettings) -> Result<Self, FbError> {
        match settings.backend {
            InputBackendKind::Evdev => Ok(InputDriver::Evdev(EvdevInput::open(settings)?)),
            InputBackendKind::Tty if settings.no_keyboard => Ok(InputDriver::Disabled),
            InputBackendKind::Tty => Ok(InputDriver::Tty(TtyInput::open(&settings.tty_candidates)?)),
            InputBackendKind::None => Ok(InputDriver::Disabled),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InputDriver::Evdev(_) => "evdev",
            InputDriver::Tty(_) => "tty",
            InputDriver::Disabled => "none",
        }
    }

    pub fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
        match self {
            InputDriver::Evdev(input) => input.poll(sink),
            InputDriver::Tty(input) => input.poll(sink),
            InputDriver::Disabled => PollStatus::Continue,
        }
    }

    fn restore(&mut self) {
        if let InputDriver::Tty(input) = self {
            input.restore();
        }
    }
}

pub struct FbdevBackend {
    presenter: FramePresenter,
    sink: DeviceSink,
    input: InputDriver,
    frames: u64,
}

impl FbdevBackend {
    /// Bring up display and input. Any failure here is fatal to the host.
    pub fn init(settings: &Settings, gamma: GammaTable) -> Result<Self, FbError> {
        let display = &settings.display;
        let fb = Framebuffer::open(&display.framebuffer)?;
        let format = fb.negotiate(display.bgra)?;

        let scale = match display.scaling {
            Some(s) => s as usize,
            None => Geometry::auto_scale(&format, display.logical_width, display.logical_height)?,
        };
        let geometry = Geometry::new(
            &format,
            display.logical_width,
            display.logical_height,
            scale,
        )?;

        let sink = DeviceSink::open(fb.into_file(), geometry.frame_bytes(), display.use_mmap)?;
        let presenter = FramePresenter::new(format, geometry, gamma);
        let input = InputDriver::open(&settings.input)?;

        let backend = Self::from_parts(presenter, sink, input);
        log(LogCategory::Device, LogLevel::Info, || {
            format!(
                "ready: {} output, {} input",
                backend.mode().name(),
                backend.input.name()
            )
        });
        Ok(backend)
    }

    /// Assemble from already opened pieces
    pub fn from_parts(presenter: FramePresenter, sink: DeviceSink, input: InputDriver) -> Self {
        Self {
            presenter,
            sink,
            input,
            frames: 0,
        }
    }

    pub fn format(&self) -> &DisplayFormat {
        self.presenter.format()
    }

    pub fn geometry(&self) -> &Geometry {
        self.presenter.geometry()
    }

    pub fn mode(&self) -> PresentMode {
        self.sink.mode()
    }

    pub fn presenter(&self) -> &FramePresenter {
        &self.presenter
    }

    pub fn input(&self) -> &InputDriver {
        &self.input
    }

    /// Frames pushed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stage a palette for the next frame
    pub fn set_palette(&mut self, palette: &Palette, gamma_level: usize) {
        self.presenter.set_palette(palette, gamma_level);
    }

    pub fn nearest_index(&self, r: u8, g: u8, b: u8) -> u8 {
        self.presenter.nearest_index(r, g, b)
    }

    /// Push one frame.
    ///
    /// A failed device write is logged and the frame dropped; the next frame
    /// retries. Caller errors such as a wrong frame size are returned.
    pub fn present(&mut self, frame: &LogicalFrame) -> Result<(), FbError> {
        match self.presenter.present(frame, &mut self.sink) {
            Ok(()) => {
                self.frames += 1;
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                log(LogCategory::Video, LogLevel::Error, || {
                    format!("frame {} not written: {}", self.frames, e)
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Translate everything pending into `events`
    pub fn poll(&mut self, events: &mut dyn EventSink) -> PollStatus {
        self.input.poll(events)
    }

    /// Restore the terminal and release every handle.
    pub fn shutdown(mut self) {
        self.input.restore();
        log(LogCategory::Device, LogLevel::Info, || {
            format!("shut down after {} frames", self.frames)
        });
    }
}
