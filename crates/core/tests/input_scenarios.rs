use fbdev_core::input::evdev::{EvdevDecoder, RawEvent, EV_KEY, EV_REL, REL_X};
use fbdev_core::input::keymap::{keys, KeyTranslator, SCANCODE_LSHIFT, SCANCODE_RSHIFT};
use fbdev_core::input::mediumraw::{Drain, MediumRawDecoder};
use fbdev_core::input::{discovery, InputEvent, PollStatus, QUIT_SCANCODE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

#[test]
fn test_evdev_single_press() {
    let mut dec = EvdevDecoder::default();
    let mut queue = VecDeque::new();
    let status = dec.key_record(RawEvent::new(EV_KEY, 0x1E, 1), &mut queue);

    assert_eq!(status, PollStatus::Continue);
    assert_eq!(queue.len(), 1);
    assert_eq!(
        queue[0],
        InputEvent::KeyDown {
            key: KeyTranslator::translate_key(0x1E),
            ch: b'a'
        }
    );
}

#[test]
fn test_mediumraw_release_stops_poll() {
    let mut dec = MediumRawDecoder::new();
    let mut queue = VecDeque::new();
    assert_eq!(dec.feed(0x8E, &mut queue), Drain::Stop);

    assert_eq!(
        queue.into_iter().collect::<Vec<_>>(),
        vec![InputEvent::KeyUp {
            key: KeyTranslator::translate_key(QUIT_SCANCODE)
        }]
    );
}

#[test]
fn test_motion_accumulated_with_gain() {
    for gain in [1, 5, 8] {
        let mut dec = EvdevDecoder::new(gain);
        let mut buf = Vec::new();
        buf.extend_from_slice(&RawEvent::new(EV_REL, REL_X, 3).to_bytes());
        buf.extend_from_slice(&RawEvent::new(EV_REL, REL_X, -1).to_bytes());
        dec.mouse_records(&buf);

        let mut out = Vec::new();
        dec.flush_motion(&mut out);
        assert_eq!(out, vec![InputEvent::MouseMotion { dx: 2 * gain }]);
    }
}

#[test]
fn test_shift_state_follows_latest_transition() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut t = KeyTranslator::new();
    let mut left = false;
    let mut right = false;

    for _ in 0..500 {
        let pressed = rng.gen_bool(0.5);
        let code = if rng.gen_bool(0.5) {
            SCANCODE_LSHIFT
        } else {
            SCANCODE_RSHIFT
        };
        t.update_shift(pressed, code);
        if code == SCANCODE_LSHIFT {
            left = pressed;
        } else {
            right = pressed;
        }
        assert_eq!(t.shift().is_held(), left || right);
        let expected = if left || right { b'Q' } else { b'q' };
        assert_eq!(t.typed_char(0x10), expected);
    }
}

#[test]
fn test_both_backends_agree_on_key_streams() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut evdev = EvdevDecoder::default();
    let mut tty = MediumRawDecoder::new();

    for _ in 0..1000 {
        // Skip the quit key so the stream runs to the end
        let mut code: u8 = rng.gen_range(1..0x80);
        if code as u16 == QUIT_SCANCODE {
            code += 1;
        }
        let pressed = rng.gen_bool(0.6);

        let mut a = Vec::new();
        let mut b = Vec::new();
        evdev.key_record(
            RawEvent::new(EV_KEY, code as u16, if pressed { 1 } else { 0 }),
            &mut a,
        );
        let byte = if pressed { code } else { code | 0x80 };
        tty.feed(byte, &mut b);
        assert_eq!(a, b, "code {:#x} pressed {}", code, pressed);
    }
}

#[test]
fn test_quit_stops_record_buffer() {
    let mut buf = Vec::new();
    for (code, value) in [(0x1E, 1), (QUIT_SCANCODE, 1), (0x30, 1)] {
        buf.extend_from_slice(&RawEvent::new(EV_KEY, code, value).to_bytes());
    }
    let mut dec = EvdevDecoder::default();
    let mut out = Vec::new();
    assert_eq!(dec.key_records(&buf, &mut out), PollStatus::QuitRequested);
    assert_eq!(out, vec![InputEvent::KeyDown { key: b'a', ch: b'a' }]);
}

#[test]
fn test_arrow_keys_have_engine_codes() {
    let mut dec = MediumRawDecoder::new();
    let mut out = Vec::new();
    for byte in [103, 108, 105, 106] {
        assert_eq!(dec.feed(byte, &mut out), Drain::More);
    }
    let keys_seen: Vec<u8> = out
        .iter()
        .map(|e| match e {
            InputEvent::KeyDown { key, .. } => *key,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(
        keys_seen,
        vec![keys::UPARROW, keys::DOWNARROW, keys::LEFTARROW, keys::RIGHTARROW]
    );
}

#[test]
fn test_registry_lookup_for_default_names() {
    let registry = "\
N: Name=\"AT Translated Set 2 keyboard\"
H: Handlers=sysrq kbd event1 leds
N: Name=\"kbdsrv virtual mouse\"
H: Handlers=mouse1 event5
N: Name=\"kbdsrv virtual keyboard\"
H: Handlers=kbd event4
";
    assert_eq!(
        discovery::find_event_number(registry, "kbdsrv virtual keyboard").unwrap(),
        4
    );
    assert_eq!(
        discovery::find_event_number(registry, "kbdsrv virtual mouse").unwrap(),
        5
    );
}
