//! Frame sinks backed by the framebuffer device.

use fbdev_core::display::{FrameSink, PresentMode};
use fbdev_core::logging::{log, LogCategory, LogLevel};
use fbdev_core::FbError;
use memmap2::{MmapMut, MmapOptions};
use std::fs::File;
use std::ops::Range;
use std::os::unix::fs::FileExt;

/// Device memory mapped into the process. Writes land directly on screen.
pub struct MappedSink {
    map: MmapMut,
}

impl MappedSink {
    /// Map `len` bytes of `file` and clear them once.
    pub fn new(file: &File, len: usize) -> Result<Self, FbError> {
        // SAFETY: the framebuffer is only written through this mapping while
        // the process runs; nothing else in the process aliases it.
        let mut map = unsafe { MmapOptions::new().len(len).map_mut(file) }.map_err(FbError::Map)?;
        map.fill(0);
        Ok(Self { map })
    }
}

impl FrameSink for MappedSink {
    fn mode(&self) -> PresentMode {
        PresentMode::Mapped
    }

    fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }

    fn commit(&mut self, _span: Range<usize>) -> Result<(), FbError> {
        Ok(())
    }
}

/// Process-owned copy of the device frame, pushed with one positioned write.
pub struct BufferedSink {
    file: File,
    staging: Vec<u8>,
}

impl BufferedSink {
    /// Stage `len` bytes, seeded from the current device contents so that
    /// margins inside committed rows keep what was on screen.
    pub fn new(file: File, len: usize) -> Self {
        let mut staging = vec![0; len];
        if let Err(e) = file.read_exact_at(&mut staging, 0) {
            log(LogCategory::Device, LogLevel::Debug, || {
                format!("could not read back the framebuffer: {}", e)
            });
            staging.fill(0);
        }
        Self { file, staging }
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

impl FrameSink for BufferedSink {
    fn mode(&self) -> PresentMode {
        PresentMode::Buffered
    }

    fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.staging
    }

    fn commit(&mut self, span: Range<usize>) -> Result<(), FbError> {
        self.file
            .write_all_at(&self.staging[span.clone()], span.start as u64)?;
        Ok(())
    }
}

/// Either sink, chosen once at init.
pub enum DeviceSink {
    Mapped(MappedSink),
    Buffered(BufferedSink),
}

impl DeviceSink {
    /// Map the device when `use_mmap` is set, otherwise stage writes.
    pub fn open(file: File, len: usize, use_mmap: bool) -> Result<Self, FbError> {
        if use_mmap {
            Ok(DeviceSink::Mapped(MappedSink::new(&file, len)?))
        } else {
            Ok(DeviceSink::Buffered(BufferedSink::new(file, len)))
        }
    }

    fn inner(&mut self) -> &mut dyn FrameSink {
        match self {
            DeviceSink::Mapped(s) => s as &mut dyn FrameSink,
            DeviceSink::Buffered(s) => s as &mut dyn FrameSink,
        }
    }
}

impl FrameSink for DeviceSink {
    fn mode(&self) -> PresentMode {
        match self {
            DeviceSink::Mapped(s) => s.mode(),
            DeviceSink::Buffered(s) => s.mode(),
        }
    }

    fn frame_mut(&mut self) -> &mut [u8] {
        self.inner().frame_mut()
    }

    fn commit(&mut self, span: Range<usize>) -> Result<(), FbError> {
        self.inner().commit(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::path::PathBuf;

    fn scratch_file(name: &str, contents: &[u8]) -> (PathBuf, File) {
        let path = std::env::temp_dir().join(format!("fbdev_linux_sink_{}", name));
        std::fs::write(&path, contents).unwrap();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        (path, file)
    }

    #[test]
    fn test_mapped_sink_clears_and_writes_through() {
        let (path, file) = scratch_file("mapped", &[0x55; 64]);
        let mut sink = MappedSink::new(&file, 64).unwrap();
        assert!(sink.frame_mut().iter().all(|&b| b == 0));

        sink.frame_mut()[8..12].copy_from_slice(&[1, 2, 3, 4]);
        sink.commit(0..64).unwrap();
        drop(sink);

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(&on_disk[8..12], &[1, 2, 3, 4]);
        assert_eq!(on_disk[0], 0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_buffered_sink_writes_only_the_span() {
        let (path, file) = scratch_file("buffered", &[0x77; 32]);
        let mut sink = BufferedSink::new(file, 32);
        assert!(sink.frame_mut().iter().all(|&b| b == 0x77), "seeded from device");

        sink.frame_mut().fill(0x11);
        sink.commit(8..16).unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(&on_disk[..8], &[0x77; 8]);
        assert_eq!(&on_disk[8..16], &[0x11; 8]);
        assert_eq!(&on_disk[16..], &[0x77; 16]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_short_device_stages_zeros() {
        let (path, file) = scratch_file("short", &[0x99; 4]);
        let mut sink = BufferedSink::new(file, 16);
        assert!(sink.frame_mut().iter().all(|&b| b == 0));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_device_sink_mode() {
        let (path, file) = scratch_file("mode", &[0; 16]);
        let sink = DeviceSink::open(file.try_clone().unwrap(), 16, true).unwrap();
        assert_eq!(sink.mode(), PresentMode::Mapped);
        let sink = DeviceSink::open(file, 16, false).unwrap();
        assert_eq!(sink.mode(), PresentMode::Buffered);
        std::fs::remove_file(&path).ok();
    }
}
