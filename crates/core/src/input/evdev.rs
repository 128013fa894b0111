//! Decoding of kernel `input_event` records.
//!
//! A record is the native `struct input_event`: a `timeval` made of two C
//! longs, then `u16 type`, `u16 code`, `i32 value`, all in host byte order.
//! The keyboard and mouse nodes are drained separately; key records are
//! translated immediately, relative motion is summed until the end of the
//! poll.

use super::keymap::KeyTranslator;
use super::{EventSink, InputEvent, PollStatus, QUIT_SCANCODE};
use std::ffi::c_long;
use std::mem::size_of;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;

/// Key record values
pub const KEY_RELEASE: i32 = 0;
pub const KEY_PRESS: i32 = 1;
pub const KEY_REPEAT: i32 = 2;

const TIMESTAMP_LEN: usize = 2 * size_of::<c_long>();

/// Size of one `input_event` on this host
pub const RECORD_LEN: usize = TIMESTAMP_LEN + 8;

/// Default multiplier applied to relative X motion
pub const DEFAULT_MOUSE_GAIN: i32 = 5;

/// The fields of an `input_event` this crate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    /// Parse one record. Returns `None` when `buf` is shorter than a record.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let body = buf.get(TIMESTAMP_LEN..RECORD_LEN)?;
        Some(Self {
            kind: u16::from_ne_bytes([body[0], body[1]]),
            code: u16::from_ne_bytes([body[2], body[3]]),
            value: i32::from_ne_bytes([body[4], body[5], body[6], body[7]]),
        })
    }

    /// Encode as a native record with a zero timestamp.
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[TIMESTAMP_LEN..TIMESTAMP_LEN + 2].copy_from_slice(&self.kind.to_ne_bytes());
        out[TIMESTAMP_LEN + 2..TIMESTAMP_LEN + 4].copy_from_slice(&self.code.to_ne_bytes());
        out[TIMESTAMP_LEN + 4..].copy_from_slice(&self.value.to_ne_bytes());
        out
    }
}

/// Per-poll decoder for the event-stream backend.
#[derive(Debug, Clone)]
pub struct EvdevDecoder {
    keys: KeyTranslator,
    mouse_gain: i32,
    motion: i32,
}

impl EvdevDecoder {
    pub fn new(mouse_gain: i32) -> Self {
        Self {
            keys: KeyTranslator::new(),
            mouse_gain,
            motion: 0,
        }
    }

    pub fn translator(&self) -> &KeyTranslator {
        &self.keys
    }

    /// Handle one record from the keyboard node.
    ///
    /// Non-key records, codes above 0xFF and auto-repeat are dropped.
    /// Pressing the quit scancode returns `QuitRequested` without posting.
    pub fn key_record(&mut self, event: RawEvent, sink: &mut dyn EventSink) -> PollStatus {
        if event.kind != EV_KEY || event.code > 0xff {
            return PollStatus::Continue;
        }
        let pressed = match event.value {
            KEY_RELEASE => false,
            KEY_PRESS => true,
            _ => return PollStatus::Continue,
        };
        if pressed && event.code == QUIT_SCANCODE {
            return PollStatus::QuitRequested;
        }
        if let Some(e) = self.keys.key_event(pressed, event.code) {
            sink.post(e);
        }
        PollStatus::Continue
    }

    /// Handle one record from the mouse node. Only X motion is kept.
    pub fn mouse_record(&mut self, event: RawEvent) {
        if event.kind == EV_REL && event.code == REL_X {
            self.motion = self
                .motion
                .saturating_add(event.value.saturating_mul(self.mouse_gain));
        }
    }

    /// Motion accumulated since the last flush
    pub fn pending_motion(&self) -> i32 {
        self.motion
    }

    /// Post the accumulated motion as one event, if any, and reset it.
    pub fn flush_motion(&mut self, sink: &mut dyn EventSink) {
        let dx = std::mem::take(&mut self.motion);
        if dx != 0 {
            sink.post(InputEvent::MouseMotion { dx });
        }
    }

    /// Decode a whole buffer of keyboard records.
    ///
    /// Trailing bytes that do not form a full record are ignored. Stops at
    /// the first quit request.
    pub fn key_records(&mut self, buf: &[u8], sink: &mut dyn EventSink) -> PollStatus {
        for record in buf.chunks_exact(RECORD_LEN) {
            if let Some(event) = RawEvent::parse(record) {
                if self.key_record(event, sink).is_quit() {
                    return PollStatus::QuitRequested;
                }
            }
        }
        PollStatus::Continue
    }

    /// Accumulate a whole buffer of mouse records
    pub fn mouse_records(&mut self, buf: &[u8]) {
        for record in buf.chunks_exact(RECORD_LEN) {
            if let Some(event) = RawEvent::parse(record) {
                self.mouse_record(event);
            }
        }
    }
}

impl Default for EvdevDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MOUSE_GAIN)
    }
}
