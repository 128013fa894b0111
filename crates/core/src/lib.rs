//! Core presentation and raw-input primitives for a Linux framebuffer backend.
//!
//! Everything in this crate is device independent: it works on byte slices,
//! text and plain records so it can be tested without `/dev/fb0` or
//! `/dev/input`. The Linux device layer lives in `fbdev_linux`.

pub mod display;
pub mod error;
pub mod input;
pub mod logging;
pub mod settings;

pub use error::FbError;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// Default logical resolution produced by the renderer.
    pub const LOGICAL_WIDTH: usize = 320;
    pub const LOGICAL_HEIGHT: usize = 200;

    /// The fixed-size palette-indexed image the renderer draws into.
    ///
    /// One byte per pixel, row-major, no padding between rows.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LogicalFrame {
        pub width: usize,
        pub height: usize,
        pub pixels: Vec<u8>,
    }

    impl LogicalFrame {
        pub fn new(width: usize, height: usize) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; width * height],
            }
        }

        /// Borrow one row of palette indices.
        #[inline]
        pub fn row(&self, y: usize) -> &[u8] {
            let start = y * self.width;
            &self.pixels[start..start + self.width]
        }

        /// Mutable access to one row, for the renderer side.
        #[inline]
        pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
            let start = y * self.width;
            &mut self.pixels[start..start + self.width]
        }

        pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
            self.pixels.chunks_exact(self.width)
        }

        pub fn as_bytes(&self) -> &[u8] {
            &self.pixels
        }

        /// Snapshot the current screen contents into `dest`.
        ///
        /// Copies `min(dest.len(), width * height)` bytes.
        pub fn copy_into(&self, dest: &mut [u8]) -> usize {
            let n = dest.len().min(self.pixels.len());
            dest[..n].copy_from_slice(&self.pixels[..n]);
            n
        }
    }

    impl Default for LogicalFrame {
        fn default() -> Self {
            Self::new(LOGICAL_WIDTH, LOGICAL_HEIGHT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::types::*;

    #[test]
    fn frame_initialization() {
        let f = LogicalFrame::new(10, 10);
        assert_eq!(f.pixels.len(), 100);
        assert_eq!(f.width, 10);
        assert_eq!(f.height, 10);
    }

    #[test]
    fn test_default_frame_is_logical_resolution() {
        let f = LogicalFrame::default();
        assert_eq!(f.width, LOGICAL_WIDTH);
        assert_eq!(f.height, LOGICAL_HEIGHT);
        assert_eq!(f.rows().count(), LOGICAL_HEIGHT);
    }

    #[test]
    fn test_row_access() {
        let mut f = LogicalFrame::new(4, 3);
        f.row_mut(1).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(f.row(0), &[0, 0, 0, 0]);
        assert_eq!(f.row(1), &[1, 2, 3, 4]);
        assert_eq!(&f.as_bytes()[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_copy_into_truncates_to_destination() {
        let mut f = LogicalFrame::new(2, 2);
        f.pixels.copy_from_slice(&[9, 8, 7, 6]);

        let mut small = [0u8; 3];
        assert_eq!(f.copy_into(&mut small), 3);
        assert_eq!(small, [9, 8, 7]);

        let mut big = [0u8; 8];
        assert_eq!(f.copy_into(&mut big), 4);
        assert_eq!(&big[..4], &[9, 8, 7, 6]);
    }
}
