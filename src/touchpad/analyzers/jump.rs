//! Jump detection: a touch moving implausibly
//! far in one frame resets its motion history rather than feeding a
//! garbage sample to the rest of the pipeline.

use crate::touchpad::clock::TimeUs;
use crate::touchpad::Touchpad;

const REFERENCE_INTERVAL_US: TimeUs = 12_000;
const ABSOLUTE_THRESHOLD_MM: f64 = 20.0;
const RELATIVE_THRESHOLD_MM: f64 = 7.0;

/// Compares the incoming point against the last history sample,
/// normalized to a 12ms reference interval. Returns true (and clears
/// the touch's history) if the normalized jump exceeds either the
/// absolute or relative threshold.
pub fn detect_jump(tp: &mut Touchpad, i: usize, time: TimeUs) -> bool {
    let touch = &tp.touches[i];
    if touch.history.is_empty() {
        return false;
    }
    let prev = touch.history.most_recent();
    let tdelta = time.saturating_sub(prev.time);
    if tdelta == 0 || tdelta > REFERENCE_INTERVAL_US * 2 {
        return false;
    }

    let (dx, dy) = touch.point.delta(prev.point);
    let (dx_mm, dy_mm) = tp.config.size.delta_units_to_mm(dx, dy);
    let normalized = dx_mm.hypot(dy_mm) * (REFERENCE_INTERVAL_US as f64 / tdelta as f64);
    let last = touch.jumps.last_delta_mm;

    let is_jump = normalized > ABSOLUTE_THRESHOLD_MM || (normalized - last) > RELATIVE_THRESHOLD_MM;

    tp.touches[i].jumps.last_delta_mm = normalized;
    if is_jump {
        if !tp.config.semi_mt {
            log::warn!(
                "touch {i}: jump detected ({normalized:.1}mm in {tdelta}us), resetting motion history"
            );
        }
        tp.touches[i].history.clear();
    }
    is_jump
}
