//! Named-accessor bitsets for the small hardware-facing registers:
//! `fake_touches`, the per-frame `queued` event mask,
//! and `suspend_reason`. Modeled with `bitflags` rather than raw
//! shifts.

use bitflags::bitflags;

bitflags! {
    /// Non-slotted finger-count indicators reported via `BTN_TOOL_*`
    /// and `BTN_TOUCH`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FakeTouches: u8 {
        /// `BTN_TOUCH`: any contact at all.
        const BTN_TOUCH = 1 << 0;
        const FINGER    = 1 << 1;
        const DOUBLETAP = 1 << 2;
        const TRIPLETAP = 1 << 3;
        const QUADTAP   = 1 << 4;
        /// `BTN_TOOL_QUINTTAP` or higher: more fingers than can be
        /// individually reported.
        const OVERFLOW  = 1 << 7;
    }
}

/// How many fingers the fake-touch register claims are down, as
/// distinct from the slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeFingerCount {
    Exact(u8),
    Overflow,
}

impl FakeTouches {
    /// Count of bits 2..4 that are simultaneously set. Should never
    /// exceed one; the caller logs a hardware bug if it does.
    pub fn multi_bits_set(self) -> u32 {
        (self & (FakeTouches::DOUBLETAP | FakeTouches::TRIPLETAP | FakeTouches::QUADTAP))
            .bits()
            .count_ones()
    }

    /// Resolves the fake-finger count: overflow
    /// sentinel if the overflow bit is set, else the ordinal of the
    /// highest bit among FINGER..QUADTAP, else zero fingers.
    pub fn count(self) -> FakeFingerCount {
        if self.contains(FakeTouches::OVERFLOW) {
            return FakeFingerCount::Overflow;
        }
        if self.contains(FakeTouches::QUADTAP) {
            FakeFingerCount::Exact(4)
        } else if self.contains(FakeTouches::TRIPLETAP) {
            FakeFingerCount::Exact(3)
        } else if self.contains(FakeTouches::DOUBLETAP) {
            FakeFingerCount::Exact(2)
        } else if self.contains(FakeTouches::FINGER) {
            FakeFingerCount::Exact(1)
        } else {
            FakeFingerCount::Exact(0)
        }
    }
}

bitflags! {
    /// What kind of axes changed this frame, accumulated by the
    /// decoder and consumed/cleared by post-process.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Queued: u8 {
        const MOTION        = 1 << 0;
        const OTHERAXIS     = 1 << 1;
        const BUTTON_PRESS  = 1 << 2;
        const TIMESTAMP     = 1 << 3;
    }
}

bitflags! {
    /// Why the device is currently suspended. More
    /// than one reason can be latched at once; resume only happens
    /// once all bits clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SuspendReason: u8 {
        const SENDEVENTS     = 1 << 0;
        const LID            = 1 << 1;
        const TABLET_MODE     = 1 << 2;
        const EXTERNAL_MOUSE = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_finger_count_resolves_highest_bit() {
        let f = FakeTouches::FINGER | FakeTouches::DOUBLETAP;
        assert_eq!(f.count(), FakeFingerCount::Exact(2));
    }

    #[test]
    fn fake_finger_overflow_wins() {
        let f = FakeTouches::DOUBLETAP | FakeTouches::OVERFLOW;
        assert_eq!(f.count(), FakeFingerCount::Overflow);
    }

    #[test]
    fn multi_bits_set_detects_hardware_bug() {
        let f = FakeTouches::DOUBLETAP | FakeTouches::TRIPLETAP;
        assert_eq!(f.multi_bits_set(), 2);
    }

    #[test]
    fn no_fingers_is_exact_zero() {
        assert_eq!(FakeTouches::empty().count(), FakeFingerCount::Exact(0));
    }
}
