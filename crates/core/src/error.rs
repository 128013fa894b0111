//! Error taxonomy shared by the core and the Linux device layer.
//!
//! Every variant here is either a fatal configuration error (surfaced to the
//! top-level init routine) or an unexpected I/O failure that the caller logs
//! and recovers from on the next frame or poll. Would-block conditions and
//! unmapped scancodes never become errors.

use std::io;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum FbError {
    #[error("could not open {}: {source}", path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not query {what} from {}: {source}", path.display())]
    DeviceQuery {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported display format: {0}")]
    InvalidFormat(String),

    #[error(
        "display {device_width}x{device_height} is smaller than the scaled image {scaled_width}x{scaled_height}"
    )]
    DisplayTooSmall {
        device_width: usize,
        device_height: usize,
        scaled_width: usize,
        scaled_height: usize,
    },

    #[error("logical frame is {actual_width}x{actual_height}, presenter expects {width}x{height}")]
    FrameMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("scale factor must be at least 1")]
    InvalidScale,

    #[error("could not map the framebuffer: {0}")]
    Map(#[source] io::Error),

    #[error("could not read input device registry {}: {source}", path.display())]
    RegistryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("did not find any input device for `{0}`")]
    InputDeviceNotFound(String),

    #[error("did not find an event handler for the device `{0}`")]
    MissingEventHandler(String),

    #[error("unable to find a file descriptor associated with the keyboard")]
    NoKeyboard,

    #[error("terminal setup failed ({op}): {source}")]
    Terminal {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot read settings file {}: {source}", path.display())]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FbError {
    /// Whether this error leaves the backend unusable.
    ///
    /// Only frame-commit I/O failures are recoverable; the next frame retries.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FbError::Io(_))
    }
}
