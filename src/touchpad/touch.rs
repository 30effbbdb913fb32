//! Per-slot touch record and its motion history ring buffer.

use super::clock::TimeUs;
use super::types::{Octant, PalmState, Point, ThumbState, TouchState};

/// Samples kept per touch for jump/speed/wobble analysis.
/// Enough for ~0.75s of history at the reference 12ms sample interval.
pub const HISTORY_SIZE: usize = 64;

/// One motion sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sample {
    pub point: Point,
    pub time: TimeUs,
}

/// Fixed-capacity ring buffer of motion samples, newest first at
/// `index`. `count` saturates at [`HISTORY_SIZE`].
#[derive(Debug, Clone)]
pub struct History {
    samples: [Sample; HISTORY_SIZE],
    /// Index of the most recently pushed sample.
    index: usize,
    count: usize,
}

impl Default for History {
    fn default() -> Self {
        History {
            samples: [Sample::default(); HISTORY_SIZE],
            index: 0,
            count: 0,
        }
    }
}

impl History {
    pub fn clear(&mut self) {
        self.count = 0;
        self.index = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Appends a new head sample.
    pub fn push(&mut self, sample: Sample) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.samples[self.index] = sample;
        self.count = (self.count + 1).min(HISTORY_SIZE);
    }

    /// `history[0]`: the most recent sample.
    /// Panics if empty; callers must check [`History::is_empty`]
    /// first, matching the analyzers' "skip if history empty"
    /// contract.
    pub fn most_recent(&self) -> Sample {
        self.samples[self.index]
    }

    /// `history[n]` counting back from the most recent sample.
    /// Returns `None` if fewer than `n + 1` samples have been pushed.
    pub fn get(&self, n: usize) -> Option<Sample> {
        if n >= self.count {
            return None;
        }
        let idx = (self.index + HISTORY_SIZE - n) % HISTORY_SIZE;
        Some(self.samples[idx])
    }

    /// Rewrites every sample's timestamp backwards, used by the
    /// MSC_TIMESTAMP jump repair.
    pub fn rewrite_times(&mut self, mut f: impl FnMut(usize, TimeUs) -> TimeUs) {
        for i in 0..self.count {
            let idx = (self.index + HISTORY_SIZE - i) % HISTORY_SIZE;
            self.samples[idx].time = f(i, self.samples[idx].time);
        }
    }
}

/// Palm sub-state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Palm {
    pub state: PalmState,
    /// Point at which the touch first entered `state`.
    pub first: Point,
    /// Time at which the touch first entered `state`.
    pub time: TimeUs,
}

/// Thumb sub-state.
#[derive(Debug, Clone, Copy)]
pub struct Thumb {
    pub state: ThumbState,
    pub initial: Point,
    pub first_touch_time: TimeUs,
}

impl Default for Thumb {
    fn default() -> Self {
        Thumb {
            state: ThumbState::Maybe,
            initial: Point::default(),
            first_touch_time: 0,
        }
    }
}

/// Hysteresis sub-state. `x_motion_history`
/// is a 3-bit shift register used by the wobble detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hysteresis {
    pub center: Point,
    pub x_motion_history: u8,
}

/// Pinning sub-state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pinned {
    pub is_pinned: bool,
    pub center: Point,
}

/// Speed sub-state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Speed {
    pub last_speed: f64,
    pub exceeded_count: u8,
}

/// Jump-detector sub-state.
#[derive(Debug, Default, Clone, Copy)]
pub struct Jumps {
    pub last_delta_mm: f64,
}

/// Flags consumed (and reset) by the tap collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct TapFlags {
    pub is_thumb: bool,
    pub is_palm: bool,
}

/// One per-slot touch record.
#[derive(Debug, Clone)]
pub struct Touch {
    /// Fixed identity, 0..ntouches-1. Never reassigned.
    pub index: usize,
    pub state: TouchState,
    pub point: Point,
    pub time: TimeUs,
    pub pressure: i32,
    pub major: i32,
    pub minor: i32,
    pub is_tool_palm: bool,
    pub dirty: bool,
    pub has_ended: bool,
    pub was_down: bool,
    pub history: History,
    pub palm: Palm,
    pub thumb: Thumb,
    pub hysteresis: Hysteresis,
    pub pinned: Pinned,
    pub speed: Speed,
    pub jumps: Jumps,
    pub tap: TapFlags,
    /// True if this slot index is beyond the device's real hardware
    /// slots (fake-finger-derived "ghost" touch).
    pub is_ghost: bool,
}

impl Touch {
    pub fn new(index: usize) -> Self {
        Touch {
            index,
            state: TouchState::None,
            point: Point::default(),
            time: 0,
            pressure: 0,
            major: 0,
            minor: 0,
            is_tool_palm: false,
            dirty: false,
            has_ended: false,
            was_down: false,
            history: History::default(),
            palm: Palm::default(),
            thumb: Thumb::default(),
            hysteresis: Hysteresis::default(),
            pinned: Pinned::default(),
            speed: Speed::default(),
            jumps: Jumps::default(),
            tap: TapFlags::default(),
            is_ghost: false,
        }
    }

    /// Resets everything but `index`, as if the slot had never been
    /// touched. Used when a touch sequence fully ends and the slot is
    /// reclaimed, and by suspend's "clear state".
    pub fn reset(&mut self) {
        let index = self.index;
        *self = Touch::new(index);
    }

    pub fn is_active(&self) -> bool {
        self.state.is_live()
    }

    /// Direction from `palm.first` to the current point, used by the
    /// edge-release direction check.
    pub fn direction_from_palm_first(&self) -> Option<Octant> {
        let (dx, dy) = self.point.delta(self.palm.first);
        Octant::from_delta(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_saturates_at_capacity() {
        let mut h = History::default();
        for i in 0..HISTORY_SIZE + 10 {
            h.push(Sample {
                point: Point::new(i as i32, 0),
                time: i as u64,
            });
        }
        assert_eq!(h.count(), HISTORY_SIZE);
        assert_eq!(h.most_recent().point.x, (HISTORY_SIZE + 9) as i32);
    }

    #[test]
    fn history_get_walks_backwards() {
        let mut h = History::default();
        h.push(Sample { point: Point::new(1, 0), time: 10 });
        h.push(Sample { point: Point::new(2, 0), time: 20 });
        h.push(Sample { point: Point::new(3, 0), time: 30 });
        assert_eq!(h.get(0).unwrap().point.x, 3);
        assert_eq!(h.get(1).unwrap().point.x, 2);
        assert_eq!(h.get(2).unwrap().point.x, 1);
        assert!(h.get(3).is_none());
    }

    #[test]
    fn touch_reset_preserves_index() {
        let mut t = Touch::new(3);
        t.point = Point::new(5, 5);
        t.was_down = true;
        t.reset();
        assert_eq!(t.index, 3);
        assert_eq!(t.point, Point::default());
        assert!(!t.was_down);
    }
}
