//! Linux device layer: framebuffer, event nodes and the virtual terminal.
//!
//! Everything that touches a file descriptor lives here. The pure parts
//! (formats, kernels, decoders) come from `fbdev_core`.

pub mod backend;
pub mod evdev;
pub mod framebuffer;
pub mod sink;
pub mod tty;

pub use backend::{FbdevBackend, InputDriver};
pub use evdev::{EvdevInput, EventDevice};
pub use framebuffer::Framebuffer;
pub use sink::{BufferedSink, DeviceSink, MappedSink};
pub use tty::{TtyInput, TtyKeyboard};
