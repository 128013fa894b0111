//! Scancode translation shared by both raw keyboard protocols.
//!
//! Scancodes are Linux keycodes (the low range matches AT set 1). They map
//! onto the engine's key codes: printable keys become their lowercase ASCII
//! character, everything else gets a code from `keys`. Zero means
//! "unmapped" and suppresses the event.

use super::InputEvent;

/// Engine key codes for non-printable keys
pub mod keys {
    pub const RIGHTARROW: u8 = 0xae;
    pub const LEFTARROW: u8 = 0xac;
    pub const UPARROW: u8 = 0xad;
    pub const DOWNARROW: u8 = 0xaf;
    pub const ESCAPE: u8 = 27;
    pub const ENTER: u8 = 13;
    pub const TAB: u8 = 9;
    pub const F1: u8 = 0x80 + 0x3b;
    pub const F2: u8 = 0x80 + 0x3c;
    pub const F3: u8 = 0x80 + 0x3d;
    pub const F4: u8 = 0x80 + 0x3e;
    pub const F5: u8 = 0x80 + 0x3f;
    pub const F6: u8 = 0x80 + 0x40;
    pub const F7: u8 = 0x80 + 0x41;
    pub const F8: u8 = 0x80 + 0x42;
    pub const F9: u8 = 0x80 + 0x43;
    pub const F10: u8 = 0x80 + 0x44;
    pub const F11: u8 = 0x80 + 0x57;
    pub const F12: u8 = 0x80 + 0x58;
    pub const BACKSPACE: u8 = 0x7f;
    pub const PAUSE: u8 = 0xff;
    pub const EQUALS: u8 = 0x3d;
    pub const MINUS: u8 = 0x2d;
    pub const RSHIFT: u8 = 0x80 + 0x36;
    pub const RCTRL: u8 = 0x80 + 0x1d;
    pub const RALT: u8 = 0x80 + 0x38;
    pub const LALT: u8 = RALT;
    pub const CAPSLOCK: u8 = 0x80 + 0x3a;
    pub const NUMLOCK: u8 = 0x80 + 0x45;
    pub const SCRLCK: u8 = 0x80 + 0x46;
    pub const PRTSCR: u8 = 0x80 + 0x59;
    pub const HOME: u8 = 0x80 + 0x47;
    pub const END: u8 = 0x80 + 0x4f;
    pub const PGUP: u8 = 0x80 + 0x49;
    pub const PGDN: u8 = 0x80 + 0x51;
    pub const INS: u8 = 0x80 + 0x52;
    pub const DEL: u8 = 0x80 + 0x53;

    pub const KEYP_0: u8 = 0;
    pub const KEYP_1: u8 = END;
    pub const KEYP_2: u8 = DOWNARROW;
    pub const KEYP_3: u8 = PGDN;
    pub const KEYP_4: u8 = LEFTARROW;
    pub const KEYP_5: u8 = b'5';
    pub const KEYP_6: u8 = RIGHTARROW;
    pub const KEYP_7: u8 = HOME;
    pub const KEYP_8: u8 = UPARROW;
    pub const KEYP_9: u8 = PGUP;
    pub const KEYP_DIVIDE: u8 = b'/';
    pub const KEYP_PLUS: u8 = b'+';
    pub const KEYP_MINUS: u8 = b'-';
    pub const KEYP_MULTIPLY: u8 = b'*';
    pub const KEYP_PERIOD: u8 = 0;
    pub const KEYP_EQUALS: u8 = EQUALS;
    pub const KEYP_ENTER: u8 = ENTER;
}

/// Left and right shift scancodes
pub const SCANCODE_LSHIFT: u16 = 0x2A;
pub const SCANCODE_RSHIFT: u16 = 0x36;

#[rustfmt::skip]
static SCANCODE_TO_KEY: [u8; 128] = [
    // 0x00
    0, keys::ESCAPE, b'1', b'2', b'3', b'4', b'5', b'6',
    b'7', b'8', b'9', b'0', keys::MINUS, keys::EQUALS, keys::BACKSPACE, keys::TAB,
    // 0x10
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i',
    b'o', b'p', b'[', b']', keys::ENTER, keys::RCTRL, b'a', b's',
    // 0x20
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';',
    b'\'', b'`', keys::RSHIFT, b'\\', b'z', b'x', b'c', b'v',
    // 0x30
    b'b', b'n', b'm', b',', b'.', b'/', keys::RSHIFT, keys::KEYP_MULTIPLY,
    keys::LALT, b' ', keys::CAPSLOCK, keys::F1, keys::F2, keys::F3, keys::F4, keys::F5,
    // 0x40
    keys::F6, keys::F7, keys::F8, keys::F9, keys::F10, keys::NUMLOCK, keys::SCRLCK, keys::KEYP_7,
    keys::KEYP_8, keys::KEYP_9, keys::KEYP_MINUS, keys::KEYP_4, keys::KEYP_5, keys::KEYP_6, keys::KEYP_PLUS, keys::KEYP_1,
    // 0x50
    keys::KEYP_2, keys::KEYP_3, keys::KEYP_0, keys::KEYP_PERIOD, 0, 0, 0, keys::F11,
    keys::F12, 0, 0, 0, 0, 0, 0, 0,
    // 0x60
    keys::KEYP_ENTER, keys::RCTRL, keys::KEYP_DIVIDE, keys::PRTSCR, keys::RALT, 0, keys::HOME, keys::UPARROW,
    keys::PGUP, keys::LEFTARROW, keys::RIGHTARROW, keys::END, keys::DOWNARROW, keys::PGDN, keys::INS, keys::DEL,
    // 0x70
    0, 0, 0, 0, 0, keys::KEYP_EQUALS, 0, keys::PAUSE,
    0, 0, 0, 0, 0, 0, 0, 0,
];

/// Character produced by `c` with shift held (US layout)
fn shift_xform(c: u8) -> u8 {
    match c {
        b'a'..=b'z' => c.to_ascii_uppercase(),
        b'1' => b'!',
        b'2' => b'@',
        b'3' => b'#',
        b'4' => b'$',
        b'5' => b'%',
        b'6' => b'^',
        b'7' => b'&',
        b'8' => b'*',
        b'9' => b'(',
        b'0' => b')',
        b'-' => b'_',
        b'=' => b'+',
        b'[' => b'{',
        b']' => b'}',
        b'\\' => b'|',
        b';' => b':',
        b'\'' => b'"',
        b'`' => b'~',
        b',' => b'<',
        b'.' => b'>',
        b'/' => b'?',
        0x80..=0xff => 0,
        _ => c,
    }
}

/// Whether a shift key is currently held.
///
/// Left and right shift are tracked separately, so releasing one while the
/// other is down keeps shift active. Repeated presses do not toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftState {
    left: bool,
    right: bool,
}

impl ShiftState {
    /// Record a key transition; non-shift scancodes are ignored.
    pub fn update(&mut self, pressed: bool, scancode: u16) {
        match scancode {
            SCANCODE_LSHIFT => self.left = pressed,
            SCANCODE_RSHIFT => self.right = pressed,
            _ => {}
        }
    }

    pub fn is_held(&self) -> bool {
        self.left || self.right
    }
}

/// Table-based translation plus the shift state it depends on.
#[derive(Debug, Clone, Default)]
pub struct KeyTranslator {
    shift: ShiftState,
}

impl KeyTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine key code for `scancode`, or 0 when unmapped.
    pub fn translate_key(scancode: u16) -> u8 {
        SCANCODE_TO_KEY
            .get(scancode as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Character typed by `scancode` under the current shift state.
    pub fn typed_char(&self, scancode: u16) -> u8 {
        let key = Self::translate_key(scancode);
        if self.shift.is_held() {
            shift_xform(key)
        } else {
            key
        }
    }

    pub fn update_shift(&mut self, pressed: bool, scancode: u16) {
        self.shift.update(pressed, scancode);
    }

    pub fn shift(&self) -> ShiftState {
        self.shift
    }

    /// Track shift, then translate one transition.
    ///
    /// Returns `None` for unmapped scancodes.
    pub fn key_event(&mut self, pressed: bool, scancode: u16) -> Option<InputEvent> {
        self.update_shift(pressed, scancode);
        let key = Self::translate_key(scancode);
        if key == 0 {
            return None;
        }
        Some(if pressed {
            InputEvent::KeyDown {
                key,
                ch: self.typed_char(scancode),
            }
        } else {
            InputEvent::KeyUp { key }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_common_keys() {
        assert_eq!(KeyTranslator::translate_key(0x1E), b'a');
        assert_eq!(KeyTranslator::translate_key(0x02), b'1');
        assert_eq!(KeyTranslator::translate_key(0x01), keys::ESCAPE);
        assert_eq!(KeyTranslator::translate_key(0x1C), keys::ENTER);
        assert_eq!(KeyTranslator::translate_key(0x39), b' ');
        assert_eq!(KeyTranslator::translate_key(103), keys::UPARROW);
        assert_eq!(KeyTranslator::translate_key(108), keys::DOWNARROW);
        assert_eq!(KeyTranslator::translate_key(105), keys::LEFTARROW);
        assert_eq!(KeyTranslator::translate_key(106), keys::RIGHTARROW);
        assert_eq!(KeyTranslator::translate_key(87), keys::F11);
        assert_eq!(KeyTranslator::translate_key(119), keys::PAUSE);
    }

    #[test]
    fn test_unmapped_scancodes() {
        assert_eq!(KeyTranslator::translate_key(0), 0);
        assert_eq!(KeyTranslator::translate_key(0x54), 0);
        assert_eq!(KeyTranslator::translate_key(0x80), 0);
        assert_eq!(KeyTranslator::translate_key(0xFF), 0);
        assert_eq!(KeyTranslator::translate_key(0x1FF), 0);
    }

    #[test]
    fn test_shift_changes_typed_char_only() {
        let mut t = KeyTranslator::new();
        assert_eq!(t.typed_char(0x1E), b'a');

        t.update_shift(true, SCANCODE_LSHIFT);
        assert_eq!(t.typed_char(0x1E), b'A');
        assert_eq!(t.typed_char(0x03), b'@');
        assert_eq!(KeyTranslator::translate_key(0x1E), b'a');
        // Non-printable keys have no shifted character
        assert_eq!(t.typed_char(103), 0);
    }

    #[test]
    fn test_shift_is_idempotent() {
        let mut s = ShiftState::default();
        s.update(true, SCANCODE_LSHIFT);
        s.update(true, SCANCODE_LSHIFT);
        assert!(s.is_held(), "repeated press must not toggle off");
        s.update(false, SCANCODE_LSHIFT);
        assert!(!s.is_held());
        s.update(false, SCANCODE_LSHIFT);
        assert!(!s.is_held());
    }

    #[test]
    fn test_both_shift_keys() {
        let mut s = ShiftState::default();
        s.update(true, SCANCODE_LSHIFT);
        s.update(true, SCANCODE_RSHIFT);
        s.update(false, SCANCODE_RSHIFT);
        assert!(s.is_held(), "left shift is still down");
        s.update(false, SCANCODE_LSHIFT);
        assert!(!s.is_held());
    }

    #[test]
    fn test_key_event_updates_shift_first() {
        let mut t = KeyTranslator::new();
        assert_eq!(
            t.key_event(true, SCANCODE_RSHIFT),
            Some(InputEvent::KeyDown {
                key: keys::RSHIFT,
                ch: 0
            })
        );
        assert_eq!(
            t.key_event(true, 0x1E),
            Some(InputEvent::KeyDown { key: b'a', ch: b'A' })
        );
        assert_eq!(t.key_event(false, 0x1E), Some(InputEvent::KeyUp { key: b'a' }));
        assert_eq!(t.key_event(true, 0x54), None);
    }
}
