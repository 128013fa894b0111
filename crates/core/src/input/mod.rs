//! Raw input translation.
//!
//! Two raw protocols feed the same abstract event vocabulary:
//!
//! - `evdev`: fixed-size typed records from `/dev/input/eventN`
//! - `mediumraw`: one byte per key transition from a virtual terminal
//!
//! Shift tracking and scancode translation are shared (`keymap`); only the
//! record parsing differs per protocol.

pub mod discovery;
pub mod evdev;
pub mod keymap;
pub mod mediumraw;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub use keymap::{KeyTranslator, ShiftState};

/// Scancode that makes either backend request an orderly shutdown (backspace)
pub const QUIT_SCANCODE: u16 = 0x0E;

/// Event kind as seen by the engine's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    KeyDown,
    KeyUp,
    Mouse,
}

/// Abstract event produced by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// Translated key code and the shift-aware typed character
    KeyDown { key: u8, ch: u8 },
    KeyUp { key: u8 },
    /// Horizontal motion accumulated over one poll, gain applied
    MouseMotion { dx: i32 },
}

impl InputEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            InputEvent::KeyDown { .. } => EventType::KeyDown,
            InputEvent::KeyUp { .. } => EventType::KeyUp,
            InputEvent::MouseMotion { .. } => EventType::Mouse,
        }
    }

    /// The three integer payload fields of the engine's event record.
    ///
    /// Mouse events carry no buttons and no vertical motion.
    pub fn data(&self) -> [i32; 3] {
        match *self {
            InputEvent::KeyDown { key, ch } => [key as i32, ch as i32, 0],
            InputEvent::KeyUp { key } => [key as i32, 0, 0],
            InputEvent::MouseMotion { dx } => [0, dx, 0],
        }
    }
}

/// Append-only destination for translated events
pub trait EventSink {
    fn post(&mut self, event: InputEvent);
}

impl EventSink for Vec<InputEvent> {
    fn post(&mut self, event: InputEvent) {
        self.push(event);
    }
}

impl EventSink for VecDeque<InputEvent> {
    fn post(&mut self, event: InputEvent) {
        self.push_back(event);
    }
}

/// Outcome of one input poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Continue,
    /// The quit scancode was seen; the caller should restore devices and exit
    QuitRequested,
}

impl PollStatus {
    pub fn is_quit(&self) -> bool {
        matches!(self, PollStatus::QuitRequested)
    }
}
