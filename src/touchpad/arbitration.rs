//! Peripheral arbitration: trackpoint-activity timer,
//! disable-while-typing, lid/tablet-mode switches, external-mouse
//! suspend, and pen arbitration. Paired devices deliver events on the
//! same actor as the touchpad's own frame pipeline and
//! hold only weak back-references via this module's listener traits.

use evdev_rs::enums::EV_KEY;

use super::bits::SuspendReason;
use super::clock::TimeUs;
use super::types::ArbitrationState;
use super::Touchpad;

const TRACKPOINT_ACTIVITY_TIMEOUT_US: TimeUs = 300_000;
const TRACKPOINT_EVENT_TIMEOUT_US: TimeUs = 40_000;
const TRACKPOINT_ARM_THRESHOLD: u32 = 3;

const KEYBOARD_ACTIVITY_TIMEOUT_1_US: TimeUs = 200_000;
const KEYBOARD_ACTIVITY_TIMEOUT_2_US: TimeUs = 500_000;

const PEN_ARBITRATION_TIMEOUT_US: TimeUs = 90_000;

const TIMER_TRACKPOINT: &str = "trackpoint";
const TIMER_DWT: &str = "dwt";
const TIMER_PEN_ARBITRATION: &str = "pen-arbitration";

/// Sink for button events forwarded from the touchpad's `BTN_0/1/2`
/// mapping. A touchpad holds at most one of these; the
/// listener severs the reference on removal rather than the
/// touchpad owning the trackpoint outright, keeping cross-device
/// references weak.
pub trait TrackpointSink {
    fn forward_button(&mut self, button: EV_KEY, pressed: bool);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TrackpointRuntime {
    pub active: bool,
    pub last_event_time: TimeUs,
    pub event_count: u32,
}

bitflags::bitflags! {
    /// Which modifier keys are currently held, used to gate dwt:
    /// modifier keys only populate mod_mask to allow chording.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModMask: u16 {
        const LEFTSHIFT  = 1 << 0;
        const RIGHTSHIFT = 1 << 1;
        const LEFTCTRL   = 1 << 2;
        const RIGHTCTRL  = 1 << 3;
        const LEFTALT    = 1 << 4;
        const RIGHTALT   = 1 << 5;
        const LEFTMETA   = 1 << 6;
        const RIGHTMETA  = 1 << 7;
        const CAPSLOCK   = 1 << 8;
    }
}

fn modifier_bit(key: EV_KEY) -> Option<ModMask> {
    Some(match key {
        EV_KEY::KEY_LEFTSHIFT => ModMask::LEFTSHIFT,
        EV_KEY::KEY_RIGHTSHIFT => ModMask::RIGHTSHIFT,
        EV_KEY::KEY_LEFTCTRL => ModMask::LEFTCTRL,
        EV_KEY::KEY_RIGHTCTRL => ModMask::RIGHTCTRL,
        EV_KEY::KEY_LEFTALT => ModMask::LEFTALT,
        EV_KEY::KEY_RIGHTALT => ModMask::RIGHTALT,
        EV_KEY::KEY_LEFTMETA => ModMask::LEFTMETA,
        EV_KEY::KEY_RIGHTMETA => ModMask::RIGHTMETA,
        EV_KEY::KEY_CAPSLOCK => ModMask::CAPSLOCK,
        _ => return None,
    })
}

/// F-keys and above are ignored for dwt purposes.
fn is_ignored_key(key: EV_KEY) -> bool {
    matches!(
        key,
        EV_KEY::KEY_F1
            | EV_KEY::KEY_F2
            | EV_KEY::KEY_F3
            | EV_KEY::KEY_F4
            | EV_KEY::KEY_F5
            | EV_KEY::KEY_F6
            | EV_KEY::KEY_F7
            | EV_KEY::KEY_F8
            | EV_KEY::KEY_F9
            | EV_KEY::KEY_F10
            | EV_KEY::KEY_F11
            | EV_KEY::KEY_F12
            | EV_KEY::KEY_F13
            | EV_KEY::KEY_F14
            | EV_KEY::KEY_F15
            | EV_KEY::KEY_F16
            | EV_KEY::KEY_F17
            | EV_KEY::KEY_F18
            | EV_KEY::KEY_F19
            | EV_KEY::KEY_F20
            | EV_KEY::KEY_F21
            | EV_KEY::KEY_F22
            | EV_KEY::KEY_F23
            | EV_KEY::KEY_F24
    )
}

#[derive(Debug, Clone)]
pub struct DwtRuntime {
    pub keyboard_active: bool,
    pub held_keys: std::collections::HashSet<u16>,
    pub mod_mask: ModMask,
    pub last_press_time: TimeUs,
    /// Keys whose press was ignored because a modifier was already
    /// held before them — tracked per held key so the matching release
    /// doesn't retroactively count.
    pub ignored_while_held: std::collections::HashSet<u16>,
}

impl Default for DwtRuntime {
    fn default() -> Self {
        DwtRuntime {
            keyboard_active: false,
            held_keys: Default::default(),
            mod_mask: ModMask::empty(),
            last_press_time: 0,
            ignored_while_held: Default::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PenArbitrationRuntime {
    pub state: ArbitrationState,
}

#[derive(Debug, Default, Clone)]
pub struct ExternalMouseRuntime {
    present: std::collections::HashSet<String>,
}

impl ExternalMouseRuntime {
    pub fn is_present(&self) -> bool {
        !self.present.is_empty()
    }
}

// --- Trackpoint watcher -----------------------------------------------

/// A non-button pointer event (motion or scroll) from the paired
/// trackpoint.
pub fn trackpoint_pointer_event(tp: &mut Touchpad, now: TimeUs) {
    tp.trackpoint.last_event_time = now;
    tp.trackpoint.event_count += 1;

    if tp.trackpoint.event_count < TRACKPOINT_ARM_THRESHOLD {
        tp.timers.arm(TIMER_TRACKPOINT, now, TRACKPOINT_EVENT_TIMEOUT_US);
        return;
    }

    if !tp.trackpoint.active {
        tp.trackpoint.active = true;
        log::debug!("trackpoint active: suppressing touchpad actions");
        tp.collaborators.edge_scroll.stop();
        tp.collaborators.gesture.cancel();
        tp.collaborators.tap.suspend();
    }
    tp.timers.arm(TIMER_TRACKPOINT, now, TRACKPOINT_ACTIVITY_TIMEOUT_US);
}

fn trackpoint_timer_fired(tp: &mut Touchpad) {
    if tp.trackpoint.active {
        tp.trackpoint.active = false;
        tp.trackpoint.event_count = 0;
        log::debug!("trackpoint inactive: resuming touchpad actions");
        tp.collaborators.tap.resume();
    } else {
        // Timed out before reaching the activity threshold.
        tp.trackpoint.event_count = 0;
    }
}

// --- Disable-while-typing ----------------------------------------------

/// A keyboard key event from a paired keyboard.
pub fn keyboard_key_event(tp: &mut Touchpad, key: EV_KEY, pressed: bool, now: TimeUs) {
    let code = key as u16;

    if let Some(bit) = modifier_bit(key) {
        if pressed {
            tp.dwt.mod_mask.insert(bit);
        } else {
            tp.dwt.mod_mask.remove(bit);
        }
        return;
    }

    if !pressed {
        tp.dwt.held_keys.remove(&code);
        let was_ignored = tp.dwt.ignored_while_held.remove(&code);
        if was_ignored {
            return;
        }
        if tp.dwt.held_keys.is_empty() {
            if tp.timers.is_armed(TIMER_DWT) {
                tp.timers.arm(TIMER_DWT, now, KEYBOARD_ACTIVITY_TIMEOUT_2_US);
                tp.dwt.last_press_time = now;
            }
        }
        return;
    }

    if is_ignored_key(key) {
        return;
    }

    // "Keys are ignored if a modifier was down before them."
    if !tp.dwt.mod_mask.is_empty() {
        tp.dwt.ignored_while_held.insert(code);
        tp.dwt.held_keys.insert(code);
        return;
    }

    tp.dwt.held_keys.insert(code);
    tp.dwt.last_press_time = now;

    if !tp.dwt.keyboard_active {
        tp.dwt.keyboard_active = true;
        log::debug!("keyboard active: suppressing touchpad actions");
        tp.collaborators.edge_scroll.stop();
        tp.collaborators.gesture.cancel();
        tp.collaborators.tap.suspend();
        tp.timers.arm(TIMER_DWT, now, KEYBOARD_ACTIVITY_TIMEOUT_1_US);
    } else {
        tp.timers.arm(TIMER_DWT, now, KEYBOARD_ACTIVITY_TIMEOUT_2_US);
    }
}

fn dwt_timer_fired(tp: &mut Touchpad, now: TimeUs) {
    if !tp.dwt.held_keys.is_empty() {
        tp.timers.arm(TIMER_DWT, now, KEYBOARD_ACTIVITY_TIMEOUT_2_US);
        tp.dwt.last_press_time = now;
        return;
    }
    tp.dwt.keyboard_active = false;
    log::debug!("keyboard inactive: resuming touchpad actions");
    tp.collaborators.tap.resume();
}

// --- Lid / tablet-mode switches -----------------------------------------

pub fn lid_switch(tp: &mut Touchpad, closed: bool, now: TimeUs) {
    if closed {
        super::suspend::suspend(tp, SuspendReason::LID, now);
    } else {
        super::suspend::resume(tp, SuspendReason::LID, now);
    }
}

pub fn tablet_mode_switch(tp: &mut Touchpad, engaged: bool, now: TimeUs) {
    if engaged {
        super::suspend::suspend(tp, SuspendReason::TABLET_MODE, now);
    } else {
        super::suspend::resume(tp, SuspendReason::TABLET_MODE, now);
    }
}

// --- External mouse -------------------------------------------------------

pub fn external_mouse_added(tp: &mut Touchpad, id: &str, now: TimeUs) {
    let was_present = tp.external_mouse.is_present();
    tp.external_mouse.present.insert(id.to_owned());
    if !was_present && tp.config.send_events_mode == super::types::SendEventsMode::DisabledOnExternalMouse {
        super::suspend::suspend(tp, SuspendReason::EXTERNAL_MOUSE, now);
    }
}

pub fn external_mouse_removed(tp: &mut Touchpad, id: &str, now: TimeUs) {
    tp.external_mouse.present.remove(id);
    if !tp.external_mouse.is_present() {
        super::suspend::resume(tp, SuspendReason::EXTERNAL_MOUSE, now);
    }
}

// --- Pen arbitration -------------------------------------------------------

/// The pen dispatcher's arbitration state toggled.
/// Going active cancels and clears immediately; going back to
/// `NotActive` arms a 90ms timer and only actually releases then, to
/// absorb the spurious touch-begin that follows pen lift-off.
pub fn pen_arbitration_changed(tp: &mut Touchpad, new_state: ArbitrationState, now: TimeUs) {
    match new_state {
        ArbitrationState::IgnoreAll | ArbitrationState::IgnoreRect => {
            tp.timers.cancel(TIMER_PEN_ARBITRATION);
            tp.pen_arbitration.state = new_state;
        }
        ArbitrationState::NotActive => {
            tp.timers.arm(TIMER_PEN_ARBITRATION, now, PEN_ARBITRATION_TIMEOUT_US);
        }
    }
}

fn pen_arbitration_timer_fired(tp: &mut Touchpad) {
    tp.pen_arbitration.state = ArbitrationState::NotActive;
}

// --- Timer dispatch --------------------------------------------------------

/// Dispatches one fired timer name to its handler. Called by the
/// event pump once an armed timer's deadline has passed.
pub fn timer_fired(tp: &mut Touchpad, name: &str, now: TimeUs) {
    match name {
        TIMER_TRACKPOINT => trackpoint_timer_fired(tp),
        TIMER_DWT => dwt_timer_fired(tp, now),
        TIMER_PEN_ARBITRATION => pen_arbitration_timer_fired(tp),
        other => log::warn!("unknown timer fired: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;

    #[test]
    fn trackpoint_arms_but_does_not_activate_below_threshold() {
        let mut tp = test_touchpad();
        trackpoint_pointer_event(&mut tp, 0);
        trackpoint_pointer_event(&mut tp, 10_000);
        assert!(!tp.trackpoint.active);
        assert!(tp.timers.is_armed(TIMER_TRACKPOINT));
    }

    #[test]
    fn trackpoint_activates_at_threshold_and_times_out() {
        let mut tp = test_touchpad();
        trackpoint_pointer_event(&mut tp, 0);
        trackpoint_pointer_event(&mut tp, 10_000);
        trackpoint_pointer_event(&mut tp, 20_000);
        assert!(tp.trackpoint.active);

        let fired = tp.timers.expire(20_000 + TRACKPOINT_ACTIVITY_TIMEOUT_US);
        for name in fired {
            timer_fired(&mut tp, name, 20_000 + TRACKPOINT_ACTIVITY_TIMEOUT_US);
        }
        assert!(!tp.trackpoint.active);
    }

    #[test]
    fn dwt_ignores_keys_chorded_after_a_modifier() {
        let mut tp = test_touchpad();
        keyboard_key_event(&mut tp, EV_KEY::KEY_LEFTCTRL, true, 0);
        keyboard_key_event(&mut tp, EV_KEY::KEY_A, true, 100);
        assert!(!tp.dwt.keyboard_active);
    }

    #[test]
    fn dwt_activates_on_plain_keypress_and_rearms_on_repeat() {
        let mut tp = test_touchpad();
        keyboard_key_event(&mut tp, EV_KEY::KEY_A, true, 0);
        assert!(tp.dwt.keyboard_active);
        keyboard_key_event(&mut tp, EV_KEY::KEY_B, true, 50_000);
        assert_eq!(tp.dwt.last_press_time, 50_000);
    }

    #[test]
    fn f_keys_never_trigger_dwt() {
        let mut tp = test_touchpad();
        keyboard_key_event(&mut tp, EV_KEY::KEY_F5, true, 0);
        assert!(!tp.dwt.keyboard_active);
    }

    #[test]
    fn pen_arbitration_release_is_delayed() {
        let mut tp = test_touchpad();
        pen_arbitration_changed(&mut tp, ArbitrationState::IgnoreAll, 0);
        assert_eq!(tp.pen_arbitration.state, ArbitrationState::IgnoreAll);
        pen_arbitration_changed(&mut tp, ArbitrationState::NotActive, 1_000);
        // Still active until the timer actually fires.
        assert_eq!(tp.pen_arbitration.state, ArbitrationState::IgnoreAll);
        let fired = tp.timers.expire(1_000 + PEN_ARBITRATION_TIMEOUT_US);
        for name in fired {
            timer_fired(&mut tp, name, 1_000 + PEN_ARBITRATION_TIMEOUT_US);
        }
        assert_eq!(tp.pen_arbitration.state, ArbitrationState::NotActive);
    }
}
