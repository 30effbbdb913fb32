//! Event decoder: translates raw evdev events into
//! mutations on the slot table, the fake-finger register, and the
//! queued-event bitmask. Also applies the left-handed coordinate
//! rotation.

use evdev_rs::enums::{EventCode, EV_ABS, EV_KEY, EV_MSC, EV_SYN};

use super::bits::{FakeTouches, Queued};
use super::clock::TimeUs;
use super::types::{Point, TouchState};
use super::Touchpad;

/// Outcome of decoding one event: whether a frame pipeline run was
/// triggered (SYN_REPORT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Mutated,
    FrameReady,
}

/// Decodes one evdev event and mutates `tp` accordingly. Returns
/// [`Decoded::FrameReady`] on `SYN_REPORT`; the caller (or
/// `Touchpad::handle_event`) is responsible for invoking the frame
/// pipeline at that point.
pub fn decode_event(tp: &mut Touchpad, code: EventCode, value: i32, time: TimeUs) -> Decoded {
    match code {
        EventCode::EV_ABS(abs) => decode_abs(tp, abs, value, time),
        EventCode::EV_KEY(key) => decode_key(tp, key, value, time),
        EventCode::EV_MSC(EV_MSC::MSC_TIMESTAMP) => {
            // Deferred to `pre_process`, gated on `Queued::TIMESTAMP`,
            // per the frame-pipeline phase split (spec §4.2 item 1):
            // the decoder only records the raw value and mutation
            // bits here, it does not run the jump-repair itself.
            tp.msc.pending = Some(value);
            tp.queued.insert(Queued::TIMESTAMP);
            Decoded::Mutated
        }
        EventCode::EV_SYN(EV_SYN::SYN_REPORT) => Decoded::FrameReady,
        _ => Decoded::Mutated,
    }
}

fn rotate_for_left_handed(tp: &Touchpad, axis_max: i32, axis_min: i32, value: i32) -> i32 {
    if tp.config.rotate_for_left_handed() {
        axis_max - (value - axis_min)
    } else {
        value
    }
}

fn decode_abs(tp: &mut Touchpad, abs: EV_ABS, value: i32, time: TimeUs) -> Decoded {
    match abs {
        EV_ABS::ABS_MT_SLOT => {
            let slot = value as usize;
            if slot < tp.touches.len() {
                tp.slot = slot;
            } else {
                log::warn!("ABS_MT_SLOT {slot} out of range ({} slots)", tp.touches.len());
            }
        }
        EV_ABS::ABS_MT_TRACKING_ID => {
            let slot = tp.slot;
            tp.touches[slot].time = time;
            if value >= 0 {
                begin_tracking(tp, slot);
            } else {
                end_tracking(tp, slot);
            }
        }
        EV_ABS::ABS_MT_POSITION_X | EV_ABS::ABS_X => {
            let slot = if abs == EV_ABS::ABS_X { 0 } else { tp.slot };
            let x = rotate_for_left_handed(tp, tp.config.size.x_max, tp.config.size.x_min, value);
            tp.touches[slot].point.x = x;
            tp.touches[slot].time = time;
            tp.touches[slot].dirty = true;
            tp.queued.insert(Queued::MOTION);
        }
        EV_ABS::ABS_MT_POSITION_Y | EV_ABS::ABS_Y => {
            let slot = if abs == EV_ABS::ABS_Y { 0 } else { tp.slot };
            let y = rotate_for_left_handed(tp, tp.config.size.y_max, tp.config.size.y_min, value);
            tp.touches[slot].point.y = y;
            tp.touches[slot].time = time;
            tp.touches[slot].dirty = true;
            tp.queued.insert(Queued::MOTION);
        }
        EV_ABS::ABS_MT_PRESSURE | EV_ABS::ABS_PRESSURE => {
            let slot = if abs == EV_ABS::ABS_PRESSURE { 0 } else { tp.slot };
            tp.touches[slot].pressure = value;
            tp.touches[slot].time = time;
            tp.touches[slot].dirty = true;
            tp.queued.insert(Queued::OTHERAXIS);
        }
        EV_ABS::ABS_MT_TOUCH_MAJOR => {
            let slot = tp.slot;
            tp.touches[slot].major = value;
            tp.touches[slot].dirty = true;
            tp.queued.insert(Queued::OTHERAXIS);
        }
        EV_ABS::ABS_MT_TOUCH_MINOR => {
            let slot = tp.slot;
            tp.touches[slot].minor = value;
            tp.touches[slot].dirty = true;
            tp.queued.insert(Queued::OTHERAXIS);
        }
        EV_ABS::ABS_MT_TOOL_TYPE => {
            let slot = tp.slot;
            // MT_TOOL_PALM == 2 in the kernel's input-event-codes.h;
            // anything else is treated as a finger.
            tp.touches[slot].is_tool_palm = value == 2;
            tp.touches[slot].dirty = true;
            tp.queued.insert(Queued::OTHERAXIS);
        }
        _ => {}
    }
    Decoded::Mutated
}

fn begin_tracking(tp: &mut Touchpad, slot: usize) {
    match tp.touches[slot].state {
        TouchState::None | TouchState::End => {
            tp.touches[slot].state = TouchState::Hovering;
            tp.touches[slot].has_ended = false;
        }
        TouchState::MaybeEnd => {
            log::warn!(
                "touch {slot}: ended and began in same frame, recovering to update"
            );
            tp.touches[slot].state = TouchState::Update;
            tp.touches[slot].has_ended = false;
        }
        TouchState::Hovering | TouchState::Begin | TouchState::Update => {
            // Re-stating an existing tracking id; nothing to do.
        }
    }
    tp.touches[slot].dirty = true;
}

fn end_tracking(tp: &mut Touchpad, slot: usize) {
    tp.touches[slot].has_ended = true;
    if tp.touches[slot].state.is_live() {
        tp.touches[slot].state = TouchState::MaybeEnd;
    }
    tp.touches[slot].dirty = true;
}

fn decode_key(tp: &mut Touchpad, key: EV_KEY, value: i32, time: TimeUs) -> Decoded {
    match key {
        EV_KEY::BTN_TOUCH => {
            if value != 0 {
                tp.fake_touches.insert(FakeTouches::BTN_TOUCH);
            } else {
                tp.fake_touches.remove(FakeTouches::BTN_TOUCH);
                tp.fake_touches.remove(FakeTouches::OVERFLOW);
            }
            tp.queued.insert(Queued::OTHERAXIS);
        }
        EV_KEY::BTN_TOOL_FINGER => set_fake_finger_bit(tp, FakeTouches::FINGER, value),
        EV_KEY::BTN_TOOL_DOUBLETAP => set_exclusive_fake_finger_bit(tp, FakeTouches::DOUBLETAP, value),
        EV_KEY::BTN_TOOL_TRIPLETAP => set_exclusive_fake_finger_bit(tp, FakeTouches::TRIPLETAP, value),
        EV_KEY::BTN_TOOL_QUADTAP => set_exclusive_fake_finger_bit(tp, FakeTouches::QUADTAP, value),
        EV_KEY::BTN_TOOL_QUINTTAP => {
            if value != 0 {
                tp.fake_touches.insert(FakeTouches::OVERFLOW);
            }
            // Release does nothing: a higher fake-finger report (or
            // BTN_TOUCH release) will clear the overflow bit.
        }
        EV_KEY::BTN_LEFT | EV_KEY::BTN_MIDDLE | EV_KEY::BTN_RIGHT => {
            tp.queued.insert(Queued::BUTTON_PRESS);
            let pressed = value != 0;
            tp.collaborators_buttons_key(key, pressed);
        }
        EV_KEY::BTN_0 | EV_KEY::BTN_1 | EV_KEY::BTN_2 => {
            let mapped = match key {
                EV_KEY::BTN_0 => EV_KEY::BTN_LEFT,
                EV_KEY::BTN_1 => EV_KEY::BTN_RIGHT,
                EV_KEY::BTN_2 => EV_KEY::BTN_MIDDLE,
                _ => unreachable!(),
            };
            tp.forward_to_paired_trackpoint(mapped, value, time);
        }
        _ => {}
    }
    Decoded::Mutated
}

fn set_fake_finger_bit(tp: &mut Touchpad, bit: FakeTouches, value: i32) {
    if value != 0 {
        tp.fake_touches.insert(bit);
    } else {
        tp.fake_touches.remove(bit);
    }
}

/// `BTN_TOOL_DOUBLETAP`/`TRIPLETAP`/`QUADTAP` are mutually exclusive:
/// at most one of bits 2..4 may be set at a time.
fn set_exclusive_fake_finger_bit(tp: &mut Touchpad, bit: FakeTouches, value: i32) {
    if value != 0 {
        let others = (FakeTouches::DOUBLETAP | FakeTouches::TRIPLETAP | FakeTouches::QUADTAP) - bit;
        if tp.fake_touches.intersects(others) {
            log::warn!(
                "hardware bug: multiple exclusive fake-finger bits set simultaneously ({:?})",
                tp.fake_touches
            );
        }
        tp.fake_touches.insert(bit);
    } else {
        tp.fake_touches.remove(bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;
    use evdev_rs::enums::EventCode;

    #[test]
    fn tracking_id_transitions_none_to_hovering() {
        let mut tp = test_touchpad();
        decode_event(
            &mut tp,
            EventCode::EV_ABS(EV_ABS::ABS_MT_TRACKING_ID),
            1234,
            1_000,
        );
        assert_eq!(tp.touches[0].state, TouchState::Hovering);
    }

    #[test]
    fn tracking_id_negative_ends_sequence() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::Update;
        decode_event(
            &mut tp,
            EventCode::EV_ABS(EV_ABS::ABS_MT_TRACKING_ID),
            -1,
            1_000,
        );
        assert_eq!(tp.touches[0].state, TouchState::MaybeEnd);
        assert!(tp.touches[0].has_ended);
    }

    #[test]
    fn ended_and_began_same_frame_recovers_to_update() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::MaybeEnd;
        decode_event(
            &mut tp,
            EventCode::EV_ABS(EV_ABS::ABS_MT_TRACKING_ID),
            5678,
            1_000,
        );
        assert_eq!(tp.touches[0].state, TouchState::Update);
        assert!(!tp.touches[0].has_ended);
    }

    #[test]
    fn exclusive_fake_finger_bits_logged_on_violation() {
        let mut tp = test_touchpad();
        decode_event(&mut tp, EventCode::EV_KEY(EV_KEY::BTN_TOOL_DOUBLETAP), 1, 0);
        decode_event(&mut tp, EventCode::EV_KEY(EV_KEY::BTN_TOOL_TRIPLETAP), 1, 0);
        assert_eq!(tp.fake_touches.multi_bits_set(), 2);
    }

    #[test]
    fn quinttap_press_sets_overflow_release_is_noop() {
        let mut tp = test_touchpad();
        decode_event(&mut tp, EventCode::EV_KEY(EV_KEY::BTN_TOOL_QUINTTAP), 1, 0);
        assert!(tp.fake_touches.contains(FakeTouches::OVERFLOW));
        decode_event(&mut tp, EventCode::EV_KEY(EV_KEY::BTN_TOOL_QUINTTAP), 0, 0);
        assert!(tp.fake_touches.contains(FakeTouches::OVERFLOW));
    }

    #[test]
    fn btn_touch_release_clears_overflow() {
        let mut tp = test_touchpad();
        tp.fake_touches.insert(FakeTouches::OVERFLOW);
        decode_event(&mut tp, EventCode::EV_KEY(EV_KEY::BTN_TOUCH), 0, 0);
        assert!(!tp.fake_touches.contains(FakeTouches::OVERFLOW));
    }

    #[test]
    fn syn_report_signals_frame_ready() {
        let mut tp = test_touchpad();
        let decoded = decode_event(&mut tp, EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 0);
        assert_eq!(decoded, Decoded::FrameReady);
    }
}
