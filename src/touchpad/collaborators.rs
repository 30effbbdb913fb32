//! The narrow, non-re-entrant interface to the out-of-scope
//! tap/button/edge-scroll/gesture/pointer-acceleration collaborators.
//! The core invokes these at fixed points in the
//! frame pipeline and only consumes their suppression signals; their
//! internals live elsewhere.

use super::touch::Touch;
use super::types::Point;

/// Bitmask of motion suppression a collaborator asks for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterMotion(pub u32);

impl FilterMotion {
    pub const NONE: FilterMotion = FilterMotion(0);

    pub fn any(self) -> bool {
        self.0 != 0
    }
}

impl std::ops::BitOr for FilterMotion {
    type Output = FilterMotion;
    fn bitor(self, rhs: FilterMotion) -> FilterMotion {
        FilterMotion(self.0 | rhs.0)
    }
}

/// The tap state machine's hooks. Out of scope here; the
/// core only needs to know whether it wants motion suppressed and to
/// forward begin/end/suspend/resume notifications.
pub trait TapHandler {
    fn begin(&mut self, touch: &Touch);
    fn end(&mut self, touch: &Touch);
    /// Runs once per frame after analyzers, before post-events.
    fn process(&mut self, touches: &[Touch]) -> FilterMotion;
    fn post_process(&mut self);
    fn suspend(&mut self);
    fn resume(&mut self);
}

/// The physical/clickpad button state machine's hooks.
pub trait ButtonHandler {
    /// A `BTN_LEFT`/`BTN_MIDDLE`/`BTN_RIGHT` key event.
    fn button_event(&mut self, button: evdev_rs::enums::EV_KEY, pressed: bool);
    fn process(&mut self, touches: &[Touch]) -> FilterMotion;
    /// True this frame if a clickpad press was queued
    /// (`Queued::BUTTON_PRESS`); the core uses this to decide whether
    /// to pin touches.
    fn is_clickpad_pressed(&self) -> bool;
    fn release_all(&mut self);
    /// On a top-software-button device, grows the top-button strip's
    /// y-threshold for the duration of a suspend so the still-active
    /// passthrough area is easier to hit blind. Only called while
    /// `Quirks::top_software_buttons` is set.
    fn enlarge_top_button_area(&mut self) {
        log::trace!("buttons: top-button area enlarged for suspend");
    }
    /// Restores the top-button area to its normal size on resume.
    fn restore_top_button_area(&mut self) {
        log::trace!("buttons: top-button area restored");
    }
}

/// Raw per-slot axis values as currently cached by the kernel for a
/// multitouch slot, independent of whatever the core's own touch
/// record holds. Used only to re-sync slot state across a
/// suspend/resume window.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelSlotState {
    pub point: Point,
    pub pressure: i32,
    pub major: i32,
    pub minor: i32,
    /// `false` if the slot's tracking id is currently unset (no
    /// physical contact in this slot right now).
    pub active: bool,
}

/// Re-syncs touch slots directly from the kernel's current MT-slot
/// state, bypassing the event stream entirely. Needed on resume since
/// events delivered while suspended are not applied to the slot
/// table, so it can otherwise go stale. Out of scope for the core
/// itself (it needs a live device fd via `EVIOCGMTSLOTS`); the core
/// only calls through this trait.
pub trait SlotSource {
    fn read_slot(&self, slot: usize) -> Option<KernelSlotState>;
}

pub struct NoopSlotSource;
impl SlotSource for NoopSlotSource {
    fn read_slot(&self, _slot: usize) -> Option<KernelSlotState> {
        None
    }
}

/// Edge-scroll collaborator.
pub trait EdgeScrollHandler {
    fn process(&mut self, touches: &[Touch]);
    fn stop(&mut self);
    fn post_process(&mut self);
}

/// Gesture recognizer collaborator.
pub trait GestureHandler {
    fn process(&mut self, touches: &[Touch]);
    fn cancel(&mut self);
    fn post_process(&mut self);
}

/// Pointer-acceleration filter collaborator: the core only ever asks
/// it to restart.
pub trait PointerAccelFilter {
    fn restart(&mut self, time: super::clock::TimeUs);
}

/// Bundles every collaborator the dispatch holds. Each field is
/// `Box<dyn _>` so a caller can substitute any combination (or the
/// no-op defaults below) without the core needing to know the
/// concrete gesture/tap/button stack.
pub struct Collaborators {
    pub tap: Box<dyn TapHandler + Send>,
    pub buttons: Box<dyn ButtonHandler + Send>,
    pub edge_scroll: Box<dyn EdgeScrollHandler + Send>,
    pub gesture: Box<dyn GestureHandler + Send>,
    pub pointer_accel: Box<dyn PointerAccelFilter + Send>,
}

impl Collaborators {
    /// Wires up the logging no-op implementation of every
    /// collaborator, so the core is runnable standalone.
    pub fn noop() -> Self {
        Collaborators {
            tap: Box::new(NoopTap),
            buttons: Box::new(NoopButtons),
            edge_scroll: Box::new(NoopEdgeScroll),
            gesture: Box::new(NoopGesture),
            pointer_accel: Box::new(NoopPointerAccel),
        }
    }
}

pub struct NoopTap;
impl TapHandler for NoopTap {
    fn begin(&mut self, touch: &Touch) {
        log::trace!("tap: touch {} began", touch.index);
    }
    fn end(&mut self, touch: &Touch) {
        log::trace!("tap: touch {} ended", touch.index);
    }
    fn process(&mut self, _touches: &[Touch]) -> FilterMotion {
        FilterMotion::NONE
    }
    fn post_process(&mut self) {}
    fn suspend(&mut self) {
        log::debug!("tap: suspended");
    }
    fn resume(&mut self) {
        log::debug!("tap: resumed");
    }
}

pub struct NoopButtons;
impl ButtonHandler for NoopButtons {
    fn button_event(&mut self, button: evdev_rs::enums::EV_KEY, pressed: bool) {
        log::trace!("buttons: {button:?} {}", if pressed { "down" } else { "up" });
    }
    fn process(&mut self, _touches: &[Touch]) -> FilterMotion {
        FilterMotion::NONE
    }
    fn is_clickpad_pressed(&self) -> bool {
        false
    }
    fn release_all(&mut self) {}
}

pub struct NoopEdgeScroll;
impl EdgeScrollHandler for NoopEdgeScroll {
    fn process(&mut self, _touches: &[Touch]) {}
    fn stop(&mut self) {
        log::trace!("edge-scroll: stopped");
    }
    fn post_process(&mut self) {}
}

pub struct NoopGesture;
impl GestureHandler for NoopGesture {
    fn process(&mut self, _touches: &[Touch]) {}
    fn cancel(&mut self) {
        log::trace!("gesture: cancelled");
    }
    fn post_process(&mut self) {}
}

pub struct NoopPointerAccel;
impl PointerAccelFilter for NoopPointerAccel {
    fn restart(&mut self, time: super::clock::TimeUs) {
        log::trace!("pointer-accel: restart at {time}");
    }
}
