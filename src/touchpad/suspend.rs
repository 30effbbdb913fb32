//! Suspend/resume. A bitset of reasons; the first
//! reason to be set clears all touch/button/tap state and the last
//! reason to clear triggers resume. Devices with top-software-buttons
//! stay physically active through suspend, forwarding only
//! trackpoint-sourced button events.

use super::bits::SuspendReason;
use super::clock::TimeUs;
use super::types::TouchState;
use super::Touchpad;

pub fn is_suspended(tp: &Touchpad) -> bool {
    !tp.suspend_reason.is_empty()
}

/// Adds `reason` to the suspend bitset. If the device was not already
/// suspended, runs the "clear state" sequence: releases buttons,
/// releases taps, ends every touch sequence, resets the fake-finger
/// register, and runs the frame pipeline once so collaborators see a
/// clean all-released frame.
pub fn suspend(tp: &mut Touchpad, reason: SuspendReason, now: TimeUs) {
    let was_suspended = is_suspended(tp);
    tp.suspend_reason.insert(reason);

    if was_suspended {
        return;
    }

    log::info!("touchpad suspended: {:?}", tp.suspend_reason);
    clear_state(tp, now);

    if !tp.config.quirks.top_software_buttons {
        log::debug!("notifying outer device layer: touchpad fully suspended");
    } else {
        log::debug!("top-software-button device: staying active for button passthrough");
        tp.collaborators.buttons.enlarge_top_button_area();
    }
}

/// Removes `reason` from the suspend bitset. Once no reasons remain,
/// re-syncs every slot from the kernel's currently cached MT-slot
/// values via `Touchpad::slot_source`, restores the top-button area
/// to its normal size, and notifies collaborators the device has
/// resumed.
pub fn resume(tp: &mut Touchpad, reason: SuspendReason, now: TimeUs) {
    tp.suspend_reason.remove(reason);
    if is_suspended(tp) {
        return;
    }

    log::info!("touchpad resumed");
    resync_slots(tp, now);
    if tp.config.quirks.top_software_buttons {
        tp.collaborators.buttons.restore_top_button_area();
    }
    tp.collaborators.tap.resume();
}

fn resync_slots(tp: &mut Touchpad, now: TimeUs) {
    for slot in 0..tp.config.num_slots {
        let Some(state) = tp.slot_source.read_slot(slot) else {
            continue;
        };
        let touch = &mut tp.touches[slot];
        if !state.active {
            continue;
        }
        touch.point = state.point;
        touch.pressure = state.pressure;
        touch.major = state.major;
        touch.minor = state.minor;
        touch.time = now;
        touch.dirty = true;
        log::debug!("touch {slot}: resynced from kernel on resume");
    }
}

fn clear_state(tp: &mut Touchpad, now: TimeUs) {
    tp.collaborators.buttons.release_all();
    tp.collaborators.tap.suspend();

    for touch in tp.touches.iter_mut() {
        if touch.state.is_live() || touch.state == TouchState::MaybeEnd {
            touch.state = TouchState::MaybeEnd;
            touch.has_ended = true;
            touch.dirty = true;
        }
    }
    tp.fake_touches = super::bits::FakeTouches::empty();

    super::process::run_frame(tp, now);
}
