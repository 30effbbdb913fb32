//! Touchpad multi-touch input core: decodes evdev-style
//! frames into semantic touch lifecycles, applies palm/thumb
//! classification and noise filtering, and arbitrates with paired
//! peripherals. See each submodule for its phase of the pipeline.

pub mod analyzers;
pub mod arbitration;
pub mod bits;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod decode;
pub mod geometry;
pub mod msc_timestamp;
pub mod post;
pub mod pre_process;
pub mod process;
pub mod suspend;
pub mod touch;
pub mod types;

use evdev_rs::enums::{EventCode, EV_KEY};

use arbitration::{DwtRuntime, ExternalMouseRuntime, PenArbitrationRuntime, TrackpointRuntime, TrackpointSink};
use bits::{FakeTouches, Queued, SuspendReason};
use clock::{Clock, TimeUs, TimerWheel};
use collaborators::{Collaborators, FilterMotion, NoopSlotSource, SlotSource};
use config::TouchpadConfig;
use decode::Decoded;
use msc_timestamp::MscTimestamp;
use touch::Touch;
use types::ArbitrationState;

/// One physical touchpad device's worth of state. Everything the
/// analyzer/process/post phases and the arbitration/suspend modules
/// read or mutate lives here; `touchpad::Touchpad` is deliberately a
/// single struct rather than split across owning objects, matching a
/// single-actor model.
pub struct Touchpad {
    pub config: TouchpadConfig,
    pub touches: Vec<Touch>,
    /// Current `ABS_MT_SLOT` target.
    pub slot: usize,
    pub fake_touches: FakeTouches,
    pub queued: Queued,
    pub nfingers_down: usize,
    pub old_nfingers_down: usize,
    pub msc: MscTimestamp,
    pub trackpoint: TrackpointRuntime,
    pub dwt: DwtRuntime,
    pub pen_arbitration: PenArbitrationRuntime,
    pub external_mouse: ExternalMouseRuntime,
    pub suspend_reason: SuspendReason,
    pub timers: TimerWheel,
    pub collaborators: Collaborators,
    /// Queried on resume to re-sync slot state from the kernel's
    /// currently cached MT-slot values. Defaults to a no-op that
    /// reports every slot as unreadable (standalone/test use).
    pub slot_source: Box<dyn SlotSource + Send>,
    /// Latched once by [`analyzers::wobble`]; never unlatched for the
    /// life of the device.
    pub hysteresis_enabled: bool,
    /// Per-axis (x, y) hysteresis margin, derived from `axis_x`/`axis_y`
    /// at construction.
    pub hysteresis_margin: (i32, i32),
    /// Device-level timestamp of the last wobble-eligible call or
    /// touch-begin, used by [`analyzers::wobble`] to detect a stale
    /// gap; distinct from any single touch's own history.
    pub hysteresis_last_motion_time: TimeUs,
    /// Consecutive OTHERAXIS-without-MOTION frame count, used only by
    /// the Lenovo T450 firmware quirk.
    pub t450_otheraxis_only_count: u32,
    pub frame_filter_motion: FilterMotion,
    /// Weak back-reference to a paired trackpoint, fed by `BTN_0/1/2`
    /// remapping.
    pub paired_trackpoint: Option<Box<dyn TrackpointSink + Send>>,
    clock: Box<dyn Clock + Send>,
}

impl Touchpad {
    pub fn new(config: TouchpadConfig, clock: Box<dyn Clock + Send>) -> Self {
        if config.num_slots > config.ntouches {
            log::warn!(
                "config bug: num_slots ({}) exceeds ntouches ({}); construction will likely panic on first fake-finger frame",
                config.num_slots,
                config.ntouches
            );
        }
        if config.ntouches == 0 {
            log::warn!("config bug: ntouches is zero; no slots will exist");
        }

        let touches = (0..config.ntouches).map(Touch::new).collect();
        let hysteresis_margin = (config.axis_x.hysteresis_margin(), config.axis_y.hysteresis_margin());

        Touchpad {
            config,
            touches,
            slot: 0,
            fake_touches: FakeTouches::empty(),
            queued: Queued::empty(),
            nfingers_down: 0,
            old_nfingers_down: 0,
            msc: MscTimestamp::default(),
            trackpoint: TrackpointRuntime::default(),
            dwt: DwtRuntime::default(),
            pen_arbitration: PenArbitrationRuntime::default(),
            external_mouse: ExternalMouseRuntime::default(),
            suspend_reason: SuspendReason::empty(),
            timers: TimerWheel::new(),
            collaborators: Collaborators::noop(),
            slot_source: Box::new(NoopSlotSource),
            hysteresis_enabled: false,
            hysteresis_margin,
            hysteresis_last_motion_time: 0,
            t450_otheraxis_only_count: 0,
            frame_filter_motion: FilterMotion::NONE,
            paired_trackpoint: None,
            clock,
        }
    }

    pub fn now(&self) -> TimeUs {
        self.clock.now()
    }

    /// Decodes one evdev event and, on `SYN_REPORT`, runs the full
    /// frame pipeline.
    pub fn handle_event(&mut self, code: EventCode, value: i32, time: TimeUs) {
        if let Decoded::FrameReady = decode::decode_event(self, code, value, time) {
            process::run_frame(self, time);
        }
    }

    /// Polls the timer wheel and dispatches any timer whose deadline
    /// has passed. Called by the event pump whenever it wakes on its
    /// epoll timeout rather than a new event.
    pub fn expire_timers(&mut self, now: TimeUs) {
        for name in self.timers.expire(now) {
            arbitration::timer_fired(self, name, now);
        }
    }

    pub fn trackpoint_pointer_event(&mut self, now: TimeUs) {
        arbitration::trackpoint_pointer_event(self, now);
    }

    pub fn keyboard_key_event(&mut self, key: EV_KEY, pressed: bool, now: TimeUs) {
        arbitration::keyboard_key_event(self, key, pressed, now);
    }

    pub fn lid_switch(&mut self, closed: bool, now: TimeUs) {
        arbitration::lid_switch(self, closed, now);
    }

    pub fn tablet_mode_switch(&mut self, engaged: bool, now: TimeUs) {
        arbitration::tablet_mode_switch(self, engaged, now);
    }

    pub fn external_mouse_added(&mut self, id: &str, now: TimeUs) {
        arbitration::external_mouse_added(self, id, now);
    }

    pub fn external_mouse_removed(&mut self, id: &str, now: TimeUs) {
        arbitration::external_mouse_removed(self, id, now);
    }

    pub fn pen_arbitration_changed(&mut self, state: ArbitrationState, now: TimeUs) {
        arbitration::pen_arbitration_changed(self, state, now);
    }

    pub fn set_paired_trackpoint(&mut self, sink: Option<Box<dyn TrackpointSink + Send>>) {
        self.paired_trackpoint = sink;
    }

    pub fn set_slot_source(&mut self, source: Box<dyn SlotSource + Send>) {
        self.slot_source = source;
    }

    pub fn suspend(&mut self, reason: SuspendReason, now: TimeUs) {
        suspend::suspend(self, reason, now);
    }

    pub fn resume(&mut self, reason: SuspendReason, now: TimeUs) {
        suspend::resume(self, reason, now);
    }

    /// Called from [`decode::decode_key`] for `BTN_LEFT`/`MIDDLE`/`RIGHT`.
    pub(crate) fn collaborators_buttons_key(&mut self, key: EV_KEY, pressed: bool) {
        self.collaborators.buttons.button_event(key, pressed);
    }

    /// Called from [`decode::decode_key`] for the `BTN_0/1/2` mapping
    /// that forwards trackpoint-style buttons to a paired trackpoint
    /// device.
    pub(crate) fn forward_to_paired_trackpoint(&mut self, button: EV_KEY, value: i32, _time: TimeUs) {
        if let Some(sink) = self.paired_trackpoint.as_mut() {
            sink.forward_button(button, value != 0);
        } else {
            log::trace!("no paired trackpoint to forward {button:?} to");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::clock::FakeClock;
    use super::config::{Dwt, LeftHanded, Quirks, TouchpadConfig};
    use super::geometry::{AxisInfo, DeviceSize};
    use super::types::{ScrollMethod, SendEventsMode};
    use super::Touchpad;

    /// A small, consistent 100mm-wide / 60mm-tall five-slot device
    /// used across every touchpad-module unit test. 100 device units
    /// per physical millimeter on both axes, chosen so test deltas are
    /// easy to reason about in mm.
    pub fn test_touchpad() -> Touchpad {
        let config = TouchpadConfig {
            send_events_mode: SendEventsMode::Enabled,
            scroll_method: ScrollMethod::TwoFinger,
            dwt: Dwt::Enabled,
            left_handed: LeftHanded::Disabled,
            reversible: true,
            is_internal: true,
            num_slots: 5,
            ntouches: 5,
            has_mt: true,
            semi_mt: false,
            size: DeviceSize {
                width_mm: 100.0,
                height_mm: 60.0,
                x_min: 0,
                x_max: 10_000,
                y_min: 0,
                y_max: 6_000,
            },
            quirks: Quirks::default(),
            axis_x: AxisInfo::default(),
            axis_y: AxisInfo::default(),
            monitor_trackpoint: true,
            thumb_detect: true,
        };
        Touchpad::new(config, Box::new(FakeClock(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::test_touchpad;
    use super::types::TouchState;
    use evdev_rs::enums::{EventCode, EV_ABS, EV_KEY, EV_SYN};

    fn begin_slot0(tp: &mut super::Touchpad, time: u64) {
        tp.handle_event(EventCode::EV_ABS(EV_ABS::ABS_MT_SLOT), 0, time);
        tp.handle_event(EventCode::EV_ABS(EV_ABS::ABS_MT_TRACKING_ID), 42, time);
        tp.handle_event(EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X), 1000, time);
        tp.handle_event(EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_Y), 1000, time);
        tp.handle_event(EventCode::EV_KEY(EV_KEY::BTN_TOOL_FINGER), 1, time);
        tp.handle_event(EventCode::EV_KEY(EV_KEY::BTN_TOUCH), 1, time);
    }

    #[test]
    fn begin_tracking_then_syn_report_runs_a_frame_and_promotes_to_update() {
        // Begin only exists while the frame's analyzers run (that's
        // when collaborators.tap.begin() fires); post-process always
        // promotes it to Update by the time the frame finishes.
        let mut tp = test_touchpad();
        begin_slot0(&mut tp, 0);
        tp.handle_event(EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 0);
        assert_eq!(tp.touches[0].state, TouchState::Update);
        assert_eq!(tp.old_nfingers_down, 1);
    }

    #[test]
    fn a_second_frame_accumulates_motion_history() {
        let mut tp = test_touchpad();
        begin_slot0(&mut tp, 0);
        tp.handle_event(EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 0);
        assert_eq!(tp.touches[0].history.count(), 0);
        tp.handle_event(EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X), 1010, 12_000);
        tp.handle_event(EventCode::EV_SYN(EV_SYN::SYN_REPORT), 0, 12_000);
        assert_eq!(tp.touches[0].history.count(), 1);
    }
}
