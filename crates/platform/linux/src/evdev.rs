//! Event-stream input: keyboard and mouse `eventN` nodes.

use fbdev_core::input::discovery;
use fbdev_core::input::evdev::{EvdevDecoder, RECORD_LEN};
use fbdev_core::input::{EventSink, PollStatus};
use fbdev_core::logging::{log, LogCategory, LogLevel};
use fbdev_core::settings::InputSettings;
use fbdev_core::FbError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Records fetched per `read` call
const READ_BATCH: usize = 64;

/// One non-blocking input event node.
#[derive(Debug)]
pub struct EventDevice {
    file: File,
    path: PathBuf,
}

impl EventDevice {
    pub fn open(path: &Path) -> Result<Self, FbError> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| FbError::DeviceOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append everything readable right now to `out`.
    ///
    /// Would-block and end of file both end the drain quietly. On any other
    /// error the bytes read so far stay in `out`.
    pub fn read_available(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let mut chunk = [0u8; RECORD_LEN * READ_BATCH];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => out.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Keyboard and mouse nodes found through the device registry.
pub struct EvdevInput {
    keyboard: Option<EventDevice>,
    mouse: Option<EventDevice>,
    decoder: EvdevDecoder,
    buf: Vec<u8>,
}

impl EvdevInput {
    /// Locate and open both virtual devices. Either one missing is fatal;
    /// `no_keyboard` skips the keyboard lookup.
    pub fn open(settings: &InputSettings) -> Result<Self, FbError> {
        let keyboard = if settings.no_keyboard {
            None
        } else {
            Some(open_named(settings, &settings.keyboard_name, LogCategory::Keyboard)?)
        };
        let mouse = open_named(settings, &settings.mouse_name, LogCategory::Mouse)?;
        Ok(Self::from_devices(keyboard, Some(mouse), settings.mouse_gain))
    }

    pub fn from_devices(
        keyboard: Option<EventDevice>,
        mouse: Option<EventDevice>,
        mouse_gain: i32,
    ) -> Self {
        Self {
            keyboard,
            mouse,
            decoder: EvdevDecoder::new(mouse_gain),
            buf: Vec::with_capacity(RECORD_LEN * READ_BATCH),
        }
    }

    pub fn decoder(&self) -> &EvdevDecoder {
        &self.decoder
    }

    /// Drain the keyboard, then the mouse.
    ///
    /// Returns as soon as the quit key is pressed; the mouse is not read
    /// in that case.
    pub fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
        if let Some(keyboard) = self.keyboard.as_mut() {
            self.buf.clear();
            if let Err(e) = keyboard.read_available(&mut self.buf) {
                log(LogCategory::Keyboard, LogLevel::Error, || {
                    format!("failed to read from the keyboard: {}", e)
                });
            }
            if self.decoder.key_records(&self.buf, sink).is_quit() {
                return PollStatus::QuitRequested;
            }
        }

        if let Some(mouse) = self.mouse.as_mut() {
            self.buf.clear();
            if let Err(e) = mouse.read_available(&mut self.buf) {
                log(LogCategory::Mouse, LogLevel::Error, || {
                    format!("failed to read from the mouse: {}", e)
                });
            }
            self.decoder.mouse_records(&self.buf);
            self.decoder.flush_motion(sink);
        }

        PollStatus::Continue
    }
}

fn open_named(
    settings: &InputSettings,
    name: &str,
    category: LogCategory,
) -> Result<EventDevice, FbError> {
    let path = discovery::locate(&settings.registry, &settings.event_dir, name)?;
    log(category, LogLevel::Info, || {
        format!("using `{}` at {}", name, path.display())
    });
    EventDevice::open(&path)
}
