//! Decoding of the tty "mediumraw" keyboard byte stream.
//!
//! Each byte is one key transition: bit 7 set means release, the low seven
//! bits are the scancode. A poll drains bytes until the device runs dry or
//! the first release has been handled.

use super::keymap::KeyTranslator;
use super::{EventSink, QUIT_SCANCODE};

const RELEASE_BIT: u8 = 0x80;

/// What the reader should do after a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Keep reading this poll
    More,
    /// A release was handled; stop for this poll
    Stop,
    /// The quit scancode was pressed
    Quit,
}

/// Split a byte into (released, scancode)
pub fn split_byte(byte: u8) -> (bool, u16) {
    (byte & RELEASE_BIT != 0, (byte & !RELEASE_BIT) as u16)
}

#[derive(Debug, Clone, Default)]
pub struct MediumRawDecoder {
    keys: KeyTranslator,
}

impl MediumRawDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translator(&self) -> &KeyTranslator {
        &self.keys
    }

    pub fn feed(&mut self, byte: u8, sink: &mut dyn EventSink) -> Drain {
        let (released, scancode) = split_byte(byte);
        if !released && scancode == QUIT_SCANCODE {
            return Drain::Quit;
        }
        if let Some(e) = self.keys.key_event(!released, scancode) {
            sink.post(e);
        }
        if released {
            Drain::Stop
        } else {
            Drain::More
        }
    }
}
