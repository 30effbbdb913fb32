//! MSC_TIMESTAMP jump repair: corrects i2c-sleep
//! induced event loss when the touchpad firmware's free-running
//! timestamp counter resets, which otherwise reads as a pointer jump.
//!
//! Modeled after libinput's `tp_mt_process_msc_timestamp`.

use super::clock::TimeUs;
use super::types::MscTimestampState;
use super::Touchpad;

const EXPECT_FIRST_TIMEOUT_US: TimeUs = 20_000;

#[derive(Debug, Clone, Copy)]
pub struct MscTimestamp {
    pub state: MscTimestampState,
    pub now: TimeUs,
    pub interval: TimeUs,
    /// Raw value from the most recent `MSC_TIMESTAMP` this frame,
    /// consumed by `pre_process` once `SYN_REPORT` arrives; `None` on
    /// any frame that carried no `MSC_TIMESTAMP` event.
    pub pending: Option<i32>,
}

impl Default for MscTimestamp {
    fn default() -> Self {
        MscTimestamp {
            state: MscTimestampState::ExpectFirst,
            now: 0,
            interval: 0,
            pending: None,
        }
    }
}

/// Handles one MSC_TIMESTAMP value. `time` is the
/// evdev event's own monotonic timestamp, used to restart the
/// pointer-accel filter and as the base for history rewriting.
pub fn handle_msc_timestamp(tp: &mut Touchpad, value: i32, time: TimeUs) {
    let value = value as TimeUs;

    match tp.msc.state {
        MscTimestampState::ExpectFirst => {
            if value == 0 {
                // Still waiting for the first nonzero sample; stay in
                // ExpectFirst.
                tp.msc.now = value;
                return;
            }
            if value > EXPECT_FIRST_TIMEOUT_US {
                tp.msc.state = MscTimestampState::Ignore;
                return;
            }
            tp.msc.interval = value;
            tp.msc.now = value;
            tp.msc.state = MscTimestampState::ExpectDelay;
        }
        MscTimestampState::ExpectDelay => {
            if value > 2 * tp.msc.interval {
                repair_jump(tp, value, time);
            }
            tp.msc.now = value;
            tp.msc.state = MscTimestampState::Ignore;
        }
        MscTimestampState::Ignore => {
            tp.msc.now = value;
        }
    }
}

fn repair_jump(tp: &mut Touchpad, value: TimeUs, time: TimeUs) {
    let tdelta = value - tp.msc.interval;
    let interval = tp.msc.interval;

    log::warn!(
        "MSC_TIMESTAMP jump detected: tdelta={tdelta}us interval={interval}us, rewriting history"
    );

    for touch in tp.touches.iter_mut() {
        touch.history.rewrite_times(|i, t| {
            t.saturating_sub(tdelta).saturating_sub(interval * i as TimeUs)
        });
    }

    let restart_time = time.saturating_sub(tdelta);
    tp.collaborators.pointer_accel.restart(restart_time);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;

    #[test]
    fn full_repair_sequence_rewrites_history() {
        let mut tp = test_touchpad();
        // Give slot 0 some history to rewrite.
        tp.touches[0].history.push(super::super::touch::Sample {
            point: Default::default(),
            time: 500_000,
        });

        handle_msc_timestamp(&mut tp, 0, 0);
        assert_eq!(tp.msc.state, MscTimestampState::ExpectFirst);

        handle_msc_timestamp(&mut tp, 7300, 7_300);
        assert_eq!(tp.msc.state, MscTimestampState::ExpectDelay);
        assert_eq!(tp.msc.interval, 7_300);

        handle_msc_timestamp(&mut tp, 123_456, 123_456);
        assert_eq!(tp.msc.state, MscTimestampState::Ignore);
        // tdelta = 123456 - 7300 = 116156.
        let rewritten = tp.touches[0].history.most_recent().time;
        assert_eq!(rewritten, 500_000u64.saturating_sub(116_156));
    }

    #[test]
    fn small_delay_is_not_a_jump() {
        let mut tp = test_touchpad();
        handle_msc_timestamp(&mut tp, 0, 0);
        handle_msc_timestamp(&mut tp, 10_000, 10_000);
        let original = tp.touches[0].history.most_recent().time;
        handle_msc_timestamp(&mut tp, 15_000, 15_000);
        assert_eq!(tp.touches[0].history.most_recent().time, original);
        assert_eq!(tp.msc.state, MscTimestampState::Ignore);
    }

    #[test]
    fn large_first_value_goes_straight_to_ignore() {
        let mut tp = test_touchpad();
        handle_msc_timestamp(&mut tp, 0, 0);
        handle_msc_timestamp(&mut tp, 25_000, 25_000);
        assert_eq!(tp.msc.state, MscTimestampState::Ignore);
    }
}
