//! Monotonic microsecond clock and named one-shot timers.
//!
//! The real device pump stamps every evdev event with a kernel
//! monotonic timestamp; tests and the MSC_TIMESTAMP repair path both
//! need to drive time explicitly, so the clock is a trait rather than
//! a direct `clock_gettime` call site.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microsecond monotonic timestamp, matching the evdev event
/// timestamp unit used throughout the core.
pub type TimeUs = u64;

/// Source of monotonic time. The kernel-backed implementation is used
/// in production; tests drive a fake clock so timer math is
/// deterministic.
pub trait Clock {
    fn now(&self) -> TimeUs;
}

/// `CLOCK_MONOTONIC`-backed clock for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> TimeUs {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            // Fall back to the wall clock; this only ever happens if
            // CLOCK_MONOTONIC is unsupported, which does not occur on
            // any Linux kernel we target.
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO);
            return now.as_micros() as TimeUs;
        }
        ts.tv_sec as TimeUs * 1_000_000 + (ts.tv_nsec as TimeUs) / 1_000
    }
}

/// A fake clock for tests: time only advances when told to.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeClock(pub TimeUs);

impl Clock for FakeClock {
    fn now(&self) -> TimeUs {
        self.0
    }
}

impl FakeClock {
    pub fn advance(&mut self, us: TimeUs) {
        self.0 += us;
    }
}

/// A single named one-shot timer: fires at `deadline` unless
/// cancelled first. The arbitration layer keys timers by a fixed set
/// of names (`"trackpoint"`, `"dwt"`, `"pen-arbitration"`).
#[derive(Debug, Clone, Copy)]
struct Timer {
    deadline: TimeUs,
}

/// A small named-timer wheel. Not a priority queue: the timer
/// count per device is fixed and tiny (three), so a linear scan on
/// `expire` is simpler and just as fast.
#[derive(Debug, Default)]
pub struct TimerWheel {
    timers: HashMap<&'static str, Timer>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
        }
    }

    /// Arms (or re-arms) the named timer to fire at `now + delay_us`.
    pub fn arm(&mut self, name: &'static str, now: TimeUs, delay_us: TimeUs) {
        self.timers.insert(
            name,
            Timer {
                deadline: now.saturating_add(delay_us),
            },
        );
    }

    /// Cancels the named timer. Idempotent: cancelling an unarmed
    /// timer is a no-op.
    pub fn cancel(&mut self, name: &str) {
        self.timers.remove(name);
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.timers.contains_key(name)
    }

    /// Returns every timer whose deadline has passed as of `now`,
    /// removing them from the wheel. A cancelled timer never appears
    /// here since `cancel` removes it outright.
    pub fn expire(&mut self, now: TimeUs) -> Vec<&'static str> {
        let fired: Vec<&'static str> = self
            .timers
            .iter()
            .filter(|(_, t)| t.deadline <= now)
            .map(|(name, _)| *name)
            .collect();
        for name in &fired {
            self.timers.remove(name);
        }
        fired
    }

    /// Earliest deadline across all armed timers, if any — useful for
    /// the event pump to compute an epoll timeout.
    pub fn next_deadline(&self) -> Option<TimeUs> {
        self.timers.values().map(|t| t.deadline).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_after_deadline() {
        let mut wheel = TimerWheel::new();
        wheel.arm("trackpoint", 1_000, 300_000);
        assert!(wheel.expire(1_000).is_empty());
        assert!(wheel.expire(300_999).is_empty());
        assert_eq!(wheel.expire(301_000), vec!["trackpoint"]);
        // Once fired, it's gone.
        assert!(!wheel.is_armed("trackpoint"));
    }

    #[test]
    fn cancel_is_idempotent_and_prevents_firing() {
        let mut wheel = TimerWheel::new();
        wheel.arm("dwt", 0, 200_000);
        wheel.cancel("dwt");
        wheel.cancel("dwt");
        assert!(wheel.expire(1_000_000).is_empty());
    }

    #[test]
    fn rearming_replaces_deadline() {
        let mut wheel = TimerWheel::new();
        wheel.arm("dwt", 0, 200_000);
        wheel.arm("dwt", 100_000, 500_000);
        assert!(wheel.expire(250_000).is_empty());
        assert_eq!(wheel.expire(600_000), vec!["dwt"]);
    }
}
