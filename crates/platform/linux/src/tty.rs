//! Virtual terminal keyboard in mediumraw mode.
//!
//! Init saves the terminal's keyboard mode and line settings, disables echo,
//! canonical input and signal generation, switches to `K_MEDIUMRAW` and makes
//! reads non-blocking. Everything saved is put back by `restore`, which also
//! runs on drop.

use fbdev_core::input::mediumraw::{Drain, MediumRawDecoder};
use fbdev_core::input::{EventSink, PollStatus};
use fbdev_core::logging::{log, LogCategory, LogLevel};
use fbdev_core::FbError;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::raw::{c_char, c_int, c_ulong};
use std::path::PathBuf;

const KDGKBTYPE: c_ulong = 0x4B33;
const KDGKBMODE: c_ulong = 0x4B44;
const KDSKBMODE: c_ulong = 0x4B45;

const KB_84: u8 = 0x01;
const KB_101: u8 = 0x02;

const K_MEDIUMRAW: c_int = 0x02;

/// Descriptors probed after the named candidates
const FALLBACK_FDS: std::ops::Range<RawFd> = 0..3;

/// Kind of keyboard attached to a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardKind {
    Kb84,
    Kb101,
}

impl KeyboardKind {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            KB_84 => Some(KeyboardKind::Kb84),
            KB_101 => Some(KeyboardKind::Kb101),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            KeyboardKind::Kb84 => "84-key",
            KeyboardKind::Kb101 => "101-key",
        }
    }
}

fn ioctl_int(fd: RawFd, request: c_ulong, arg: c_int) -> io::Result<()> {
    // SAFETY: the request takes its argument by value.
    let rc = unsafe { libc::ioctl(fd, request as _, arg) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn ioctl_read<T>(fd: RawFd, request: c_ulong, out: &mut T) -> io::Result<()> {
    // SAFETY: `out` is a live value of the type the request writes.
    let rc = unsafe { libc::ioctl(fd, request as _, out as *mut T) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Keyboard type behind `fd`, or `None` if it is not a keyboard terminal.
pub fn keyboard_kind(fd: RawFd) -> Option<KeyboardKind> {
    let mut raw: c_char = 0;
    ioctl_read(fd, KDGKBTYPE, &mut raw).ok()?;
    let kind = KeyboardKind::from_raw(raw as u8);
    match kind {
        Some(k) => log(LogCategory::Keyboard, LogLevel::Info, || {
            format!("{} keyboard found", k.name())
        }),
        None => log(LogCategory::Keyboard, LogLevel::Debug, || {
            format!("KDGKBTYPE = {:#x}", raw as u8)
        }),
    }
    kind
}

/// Terminal state captured before switching to mediumraw
struct SavedTerminal {
    mode: c_int,
    termios: libc::termios,
}

/// A keyboard terminal in mediumraw mode.
pub struct TtyKeyboard {
    file: File,
    source: String,
    saved: Option<SavedTerminal>,
}

impl TtyKeyboard {
    /// Try each candidate path, then the standard descriptors.
    pub fn find(candidates: &[PathBuf]) -> Result<(File, String), FbError> {
        for path in candidates {
            match File::open(path) {
                Ok(file) if keyboard_kind(file.as_raw_fd()).is_some() => {
                    return Ok((file, path.display().to_string()));
                }
                Ok(_) => {}
                Err(e) => log(LogCategory::Keyboard, LogLevel::Debug, || {
                    format!("{}: {}", path.display(), e)
                }),
            }
        }
        // The terminal may still be reachable through an inherited descriptor
        for fd in FALLBACK_FDS {
            if keyboard_kind(fd).is_some() {
                return Ok((dup_fd(fd)?, format!("fd {}", fd)));
            }
        }
        Err(FbError::NoKeyboard)
    }

    pub fn open(candidates: &[PathBuf]) -> Result<Self, FbError> {
        let (file, source) = Self::find(candidates)?;
        Self::configure(file, source)
    }

    /// Switch an already opened keyboard terminal into mediumraw mode.
    pub fn configure(file: File, source: String) -> Result<Self, FbError> {
        let fd = file.as_raw_fd();

        let mut mode: c_int = 0;
        ioctl_read(fd, KDGKBMODE, &mut mode).map_err(|source| FbError::Terminal {
            op: "query keyboard mode",
            source,
        })?;

        // SAFETY: termios is plain old data; tcgetattr fills it in.
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
            return Err(FbError::Terminal {
                op: "query terminal settings",
                source: io::Error::last_os_error(),
            });
        }

        let keyboard = Self {
            file,
            source,
            saved: Some(SavedTerminal { mode, termios }),
        };

        let mut raw = termios;
        raw.c_iflag = 0;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG);
        // Discard unread input along with the change
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
            let e = io::Error::last_os_error();
            log(LogCategory::Keyboard, LogLevel::Warn, || {
                format!("unable to change terminal settings: {}", e)
            });
        }

        // Dropping `keyboard` on error restores what was saved
        ioctl_int(fd, KDSKBMODE, K_MEDIUMRAW).map_err(|source| FbError::Terminal {
            op: "set mediumraw mode",
            source,
        })?;
        set_nonblocking(fd).map_err(|source| FbError::Terminal {
            op: "set non-blocking",
            source,
        })?;

        log(LogCategory::Keyboard, LogLevel::Info, || {
            format!("reading keycodes from {}", keyboard.source)
        });
        Ok(keyboard)
    }

    /// Wrap a file as if it had been configured, without touching it.
    #[cfg(test)]
    fn with_saved_state(file: File, source: &str) -> Self {
        Self {
            file,
            source: source.to_string(),
            saved: Some(SavedTerminal {
                mode: 0x01,
                // SAFETY: an all-zero termios is a valid value.
                termios: unsafe { std::mem::zeroed() },
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_raw(&self) -> bool {
        self.saved.is_some()
    }

    /// One byte if available. Would-block means nothing pending.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.file.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    /// Put back the saved keyboard mode and line settings. Safe to call
    /// more than once.
    pub fn restore(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        let fd = self.file.as_raw_fd();
        if let Err(e) = ioctl_int(fd, KDSKBMODE, saved.mode) {
            log(LogCategory::Keyboard, LogLevel::Error, || {
                format!("could not restore keyboard mode: {}", e)
            });
        }
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &saved.termios) } != 0 {
            let e = io::Error::last_os_error();
            log(LogCategory::Keyboard, LogLevel::Error, || {
                format!("could not restore terminal settings: {}", e)
            });
        }
        log(LogCategory::Keyboard, LogLevel::Info, || {
            "terminal restored".to_string()
        });
    }
}

impl Drop for TtyKeyboard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: plain descriptor flag calls.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Own a duplicate of an inherited descriptor so closing it leaves the
/// original open.
fn dup_fd(fd: RawFd) -> Result<File, FbError> {
    // SAFETY: dup returns a fresh descriptor or -1.
    let new_fd = unsafe { libc::dup(fd) };
    if new_fd < 0 {
        return Err(FbError::Terminal {
            op: "duplicate descriptor",
            source: io::Error::last_os_error(),
        });
    }
    // SAFETY: `new_fd` was just created and is owned by nobody else.
    Ok(File::from(unsafe { OwnedFd::from_raw_fd(new_fd) }))
}

/// The mediumraw keyboard plus its decoder.
pub struct TtyInput {
    keyboard: TtyKeyboard,
    decoder: MediumRawDecoder,
}

impl TtyInput {
    pub fn open(candidates: &[PathBuf]) -> Result<Self, FbError> {
        Ok(Self::new(TtyKeyboard::open(candidates)?))
    }

    pub fn new(keyboard: TtyKeyboard) -> Self {
        Self {
            keyboard,
            decoder: MediumRawDecoder::new(),
        }
    }

    pub fn keyboard(&self) -> &TtyKeyboard {
        &self.keyboard
    }

    /// Read bytes until none are left or the first release is handled.
    ///
    /// The terminal is restored before `QuitRequested` is returned.
    pub fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
        loop {
            let byte = match self.keyboard.read_byte() {
                Ok(Some(b)) => b,
                Ok(None) => return PollStatus::Continue,
                Err(e) => {
                    log(LogCategory::Keyboard, LogLevel::Error, || {
                        format!("failed to read from the keyboard: {}", e)
                    });
                    return PollStatus::Continue;
                }
            };
            match self.decoder.feed(byte, sink) {
                Drain::More => {}
                Drain::Stop => return PollStatus::Continue,
                Drain::Quit => {
                    self.keyboard.restore();
                    return PollStatus::QuitRequested;
                }
            }
        }
    }

    pub fn restore(&mut self) {
        self.keyboard.restore();
    }
}
