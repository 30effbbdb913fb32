//! Pre-process phase: resolves fake-finger/slot
//! reconciliation, unhovers touches via the configured strategy,
//! commits MAYBE_END touches to END, and snaps lifted touches back to
//! their last sample to suppress lift-off jitter.

use super::bits::{FakeFingerCount, Queued};
use super::clock::TimeUs;
use super::types::TouchState;
use super::Touchpad;

pub fn pre_process(tp: &mut Touchpad, time: TimeUs) {
    if tp.queued.contains(Queued::TIMESTAMP) {
        if let Some(value) = tp.msc.pending.take() {
            super::msc_timestamp::handle_msc_timestamp(tp, value, time);
        }
    }
    reconcile_fake_touches(tp);
    unhover(tp, time);
    commit_maybe_end(tp);
    snap_lifted_touches_to_history(tp);
}

/// Modeled after libinput's `tp_process_fake_touches`.
fn reconcile_fake_touches(tp: &mut Touchpad) {
    let fake_count = match tp.fake_touches.count() {
        FakeFingerCount::Overflow => 5,
        FakeFingerCount::Exact(n) => n as usize,
    };

    if tp.config.quirks.synaptics_serial_touchpad && fake_count >= 3 {
        let slotted = tp
            .touches
            .iter()
            .take(tp.config.num_slots)
            .filter(|t| t.state.is_live())
            .count();
        if slotted != fake_count {
            for touch in tp.touches.iter_mut().take(tp.config.num_slots) {
                if touch.state == TouchState::MaybeEnd {
                    log::debug!(
                        "synaptics-serial quirk: recovering touch {} to update (fake_count={fake_count}, slotted={slotted})",
                        touch.index
                    );
                    touch.state = TouchState::Update;
                    touch.has_ended = false;
                    touch.dirty = true;
                }
            }
        }
    }

    let num_slots = tp.config.num_slots;
    let ntouches = tp.config.ntouches;
    for i in num_slots..ntouches {
        let is_real = i < fake_count;
        let touch = &mut tp.touches[i];
        if is_real {
            if touch.state == TouchState::None || touch.state == TouchState::End {
                touch.state = TouchState::Hovering;
                touch.is_ghost = true;
                touch.dirty = true;
            }
        } else if touch.state.is_live() {
            touch.state = TouchState::MaybeEnd;
            touch.has_ended = true;
            touch.dirty = true;
        }
    }
}

fn unhover(tp: &mut Touchpad, time: TimeUs) {
    if tp.config.quirks.touch_size_range.is_some() {
        unhover_touch_size(tp);
    } else if tp.config.quirks.pressure_range.is_some() {
        unhover_pressure(tp, time);
    } else {
        unhover_fake_finger_fallback(tp);
    }
}

fn unhover_pressure(tp: &mut Touchpad, _time: TimeUs) {
    let range = tp.config.quirks.pressure_range.unwrap();
    for touch in tp.touches.iter_mut() {
        if !touch.dirty {
            continue;
        }
        match touch.state {
            TouchState::Hovering if touch.pressure >= range.high => {
                touch.state = TouchState::Begin;
            }
            TouchState::Begin | TouchState::Update if touch.pressure < range.low => {
                touch.state = TouchState::MaybeEnd;
            }
            _ => {}
        }
    }

    let fake_count = match tp.fake_touches.count() {
        FakeFingerCount::Overflow => usize::MAX,
        FakeFingerCount::Exact(n) => n as usize,
    };
    let num_slots = tp.config.num_slots;
    if fake_count > num_slots {
        let real_down = tp
            .touches
            .iter()
            .take(num_slots)
            .any(|t| t.state.is_live());
        if real_down {
            reconcile_count_with_fake_fingers(tp, fake_count);
        }
    }
}

fn unhover_touch_size(tp: &mut Touchpad) {
    let range = tp.config.quirks.touch_size_range.unwrap();
    for touch in tp.touches.iter_mut() {
        if !touch.dirty {
            continue;
        }
        let (big, small) = if touch.major >= touch.minor {
            (touch.major, touch.minor)
        } else {
            (touch.minor, touch.major)
        };
        match touch.state {
            TouchState::Hovering if big > range.high && small > range.low => {
                touch.state = TouchState::Begin;
            }
            TouchState::Begin | TouchState::Update if big < range.low || small < range.low => {
                touch.state = TouchState::MaybeEnd;
            }
            _ => {}
        }
    }
}

fn unhover_fake_finger_fallback(tp: &mut Touchpad) {
    let touching = tp.fake_touches.contains(super::bits::FakeTouches::BTN_TOUCH);
    let fake_count = match tp.fake_touches.count() {
        FakeFingerCount::Overflow => usize::MAX,
        FakeFingerCount::Exact(n) => n as usize,
    };
    let num_real_wanted = fake_count.min(tp.config.num_slots).max(if touching { 1 } else { 0 });

    let mut currently_down = tp.touches.iter().take(tp.config.num_slots).filter(|t| t.state.is_live()).count();
    if currently_down < num_real_wanted {
        for touch in tp.touches.iter_mut().take(tp.config.num_slots) {
            if currently_down >= num_real_wanted {
                break;
            }
            if touch.state == TouchState::Hovering {
                touch.state = TouchState::Begin;
                currently_down += 1;
            }
        }
    } else if !touching {
        for touch in tp.touches.iter_mut().take(tp.config.num_slots) {
            if touch.state.is_live() {
                touch.state = TouchState::MaybeEnd;
            }
        }
    }
}

/// When the fake-finger count exceeds the number of real slots,
/// promotes HOVERING touches to BEGIN in slot order until
/// `nfingers_down` reaches `fake_count`; if the slot table reports
/// more than `fake_count`, ends the highest-indexed active touches
/// instead.
fn reconcile_count_with_fake_fingers(tp: &mut Touchpad, fake_count: usize) {
    let num_slots = tp.config.num_slots;
    let mut down = tp.touches.iter().take(num_slots).filter(|t| t.state.is_live()).count();

    if down < fake_count {
        for touch in tp.touches.iter_mut().take(num_slots) {
            if down >= fake_count {
                break;
            }
            if touch.state == TouchState::Hovering {
                touch.state = TouchState::Begin;
                down += 1;
            }
        }
    } else if down > fake_count {
        for touch in tp.touches.iter_mut().take(num_slots).rev() {
            if down <= fake_count {
                break;
            }
            if touch.state.is_live() {
                touch.state = TouchState::MaybeEnd;
                down -= 1;
            }
        }
    }
}

fn commit_maybe_end(tp: &mut Touchpad) {
    for touch in tp.touches.iter_mut() {
        if touch.state == TouchState::MaybeEnd {
            touch.state = TouchState::End;
            touch.dirty = true;
        }
    }
}

/// Suppresses spurious lift-off motion by snapping the point back to
/// the most recent history sample.
fn snap_lifted_touches_to_history(tp: &mut Touchpad) {
    for touch in tp.touches.iter_mut() {
        if touch.state == TouchState::End && !touch.history.is_empty() {
            touch.point = touch.history.most_recent().point;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;
    use crate::touchpad::touch::Sample;
    use crate::touchpad::types::Point;

    #[test]
    fn maybe_end_commits_to_end() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::MaybeEnd;
        pre_process(&mut tp, 1_000);
        assert_eq!(tp.touches[0].state, TouchState::End);
    }

    #[test]
    fn lifted_touch_snaps_to_last_history_sample() {
        let mut tp = test_touchpad();
        tp.touches[0].history.push(Sample { point: Point::new(42, 42), time: 900 });
        tp.touches[0].point = Point::new(99, 99);
        tp.touches[0].state = TouchState::MaybeEnd;
        pre_process(&mut tp, 1_000);
        assert_eq!(tp.touches[0].point, Point::new(42, 42));
    }

    #[test]
    fn pressure_unhover_crosses_high_threshold() {
        let mut tp = test_touchpad();
        tp.config.quirks.pressure_range = Some(super::super::config::PressureRange { high: 50, low: 10 });
        tp.touches[0].state = TouchState::Hovering;
        tp.touches[0].pressure = 60;
        tp.touches[0].dirty = true;
        pre_process(&mut tp, 0);
        assert_eq!(tp.touches[0].state, TouchState::Begin);
    }

    #[test]
    fn pressure_unhover_drops_below_low_threshold() {
        let mut tp = test_touchpad();
        tp.config.quirks.pressure_range = Some(super::super::config::PressureRange { high: 50, low: 10 });
        tp.touches[0].state = TouchState::Update;
        tp.touches[0].pressure = 5;
        tp.touches[0].dirty = true;
        pre_process(&mut tp, 0);
        assert_eq!(tp.touches[0].state, TouchState::End);
    }

    #[test]
    fn msc_timestamp_jump_is_only_repaired_once_syn_report_arrives() {
        use evdev_rs::enums::{EventCode, EV_MSC, EV_SYN};

        let mut tp = test_touchpad();
        tp.touches[0].history.push(Sample { point: Point::new(1, 1), time: 500_000 });

        tp.handle_event(EventCode::EV_MSC(EV_MSC::MSC_TIMESTAMP), 0, 0);
        tp.handle_event(EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 0);
        tp.handle_event(EventCode::EV_MSC(EV_MSC::MSC_TIMESTAMP), 7_300, 7_300);
        tp.handle_event(EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 7_300);

        // Queuing the bit alone (decode-time) must not have repaired
        // anything yet; only the pre_process run triggered by
        // SYN_REPORT does.
        assert_eq!(tp.touches[0].history.most_recent().time, 500_000);

        tp.handle_event(EventCode::EV_MSC(EV_MSC::MSC_TIMESTAMP), 123_456, 123_456);
        tp.handle_event(EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 123_456);

        let rewritten = tp.touches[0].history.most_recent().time;
        assert_eq!(rewritten, 500_000u64.saturating_sub(116_156));
    }
}
