//! Presentation pipeline: from a palette-indexed logical frame to native
//! framebuffer pixels.
//!
//! ```text
//! DisplayFormat ──► ColorTable (palette ∘ gamma ─► native words)
//!       │                 │
//!       └──► BlitKernel ──┴──► FramePresenter ──► FrameSink (mapped | buffered)
//! ```

pub mod color;
pub mod format;
pub mod gamma;
pub mod kernel;
pub mod presenter;

pub use color::{ColorTable, Palette, PALETTE_BYTES};
pub use format::{ChannelField, DisplayFormat};
pub use gamma::GammaTable;
pub use kernel::BlitKernel;
pub use presenter::{FramePresenter, FrameSink, Geometry, PresentMode};
