//! Wobble detection: a single finger oscillating
//! right/left/right within a short window on hardware that reports
//! jittery X before hysteresis is otherwise warranted latches
//! hysteresis on for the rest of the device's lifetime.

use crate::touchpad::clock::TimeUs;
use crate::touchpad::Touchpad;

const MAX_WOBBLE_INTERVAL_US: TimeUs = 40_000;
const RIGHT_LEFT_RIGHT: u8 = 0b101;

/// Only called for single-finger `MOTION` frames while hysteresis is
/// not yet latched on; see the process-phase orchestrator's call site.
///
/// The staleness check is against the device-level
/// `hysteresis_last_motion_time`, not this touch's own history: that
/// field is frozen for as long as a second finger is down (this
/// function isn't called while `nfingers_down != 1`), so a multi-finger
/// interlude correctly reads as a large, stale gap here, rather than a
/// fresh delta taken from the just-repopulated per-touch history.
pub fn detect_wobble(tp: &mut Touchpad, i: usize, time: TimeUs) {
    let touch = &tp.touches[i];
    if touch.history.is_empty() {
        return;
    }
    let prev = touch.history.most_recent();
    let dx = touch.point.x - prev.point.x;
    let dy = touch.point.y - prev.point.y;
    let dtime = time.saturating_sub(tp.hysteresis_last_motion_time);

    let mut reg = touch.hysteresis.x_motion_history;
    if (dx == 0 && dy != 0) || dtime > MAX_WOBBLE_INTERVAL_US {
        reg = 0;
    } else {
        reg >>= 1;
        if dx > 0 {
            reg |= 1 << 2;
        }
    }
    tp.touches[i].hysteresis.x_motion_history = reg;
    tp.hysteresis_last_motion_time = time;

    if reg == RIGHT_LEFT_RIGHT {
        tp.hysteresis_enabled = true;
        log::info!("touch {i}: right/left/right wobble detected, latching hysteresis on");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;
    use crate::touchpad::touch::Sample;
    use crate::touchpad::types::Point;

    fn push(tp: &mut Touchpad, i: usize, x: i32, t: TimeUs) {
        tp.touches[i].history.push(Sample { point: Point::new(x, 0), time: t });
    }

    #[test]
    fn right_left_right_latches_hysteresis() {
        let mut tp = test_touchpad();
        push(&mut tp, 0, 0, 0);
        tp.touches[0].point = Point::new(10, 0);
        detect_wobble(&mut tp, 0, 1_000);
        push(&mut tp, 0, 10, 1_000);

        tp.touches[0].point = Point::new(0, 0);
        detect_wobble(&mut tp, 0, 2_000);
        push(&mut tp, 0, 0, 2_000);

        tp.touches[0].point = Point::new(10, 0);
        detect_wobble(&mut tp, 0, 3_000);

        assert!(tp.hysteresis_enabled);
    }

    #[test]
    fn vertical_only_motion_resets_register() {
        let mut tp = test_touchpad();
        push(&mut tp, 0, 0, 0);
        tp.touches[0].hysteresis.x_motion_history = 0b110;
        tp.touches[0].point = Point::new(0, 10);
        detect_wobble(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].hysteresis.x_motion_history, 0);
    }

    #[test]
    fn stale_gap_resets_register() {
        let mut tp = test_touchpad();
        push(&mut tp, 0, 0, 0);
        tp.touches[0].hysteresis.x_motion_history = 0b110;
        tp.touches[0].point = Point::new(5, 0);
        detect_wobble(&mut tp, 0, 100_000);
        assert_eq!(tp.touches[0].hysteresis.x_motion_history, 0);
    }
}
