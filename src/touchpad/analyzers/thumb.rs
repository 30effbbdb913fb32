//! Thumb detection. Only evaluated while a
//! touch's thumb state is still `Maybe`; once it resolves to `No` or
//! `Yes` it is terminal for the touch's lifetime.

use crate::touchpad::clock::TimeUs;
use crate::touchpad::types::{ScrollMethod, ThumbState, TouchState};
use crate::touchpad::Touchpad;

const MAX_DRIFT_FROM_INITIAL_MM: f64 = 7.0;
const LOWER_LINE_DWELL_US: TimeUs = 300_000;
const SIZE_MINOR_FRACTION: f64 = 0.6;

pub fn detect_thumb(tp: &mut Touchpad, i: usize, time: TimeUs) {
    if !tp.config.thumb_detect {
        return;
    }
    if tp.touches[i].thumb.state != ThumbState::Maybe {
        return;
    }
    let lines = tp.config.thumb_lines();
    if !lines.enabled {
        return;
    }

    if tp.touches[i].state == TouchState::Begin {
        tp.touches[i].thumb.initial = tp.touches[i].point;
        tp.touches[i].thumb.first_touch_time = time;
    }

    let point = tp.touches[i].point;

    if point.y < lines.upper_thumb_line {
        tp.touches[i].thumb.state = ThumbState::No;
        return;
    }

    if tp.touches[i].state == TouchState::Update {
        let (dx, dy) = point.delta(tp.touches[i].thumb.initial);
        let (dx_mm, dy_mm) = tp.config.size.delta_units_to_mm(dx, dy);
        if dx_mm.hypot(dy_mm) > MAX_DRIFT_FROM_INITIAL_MM {
            tp.touches[i].thumb.state = ThumbState::No;
            return;
        }
    }

    if point.y > lines.upper_thumb_line {
        let other = tp
            .touches
            .iter()
            .enumerate()
            .find(|(j, t)| *j != i && t.state.is_live() && t.point.y > lines.upper_thumb_line)
            .map(|(j, _)| j);
        if let Some(j) = other {
            tp.touches[i].thumb.state = ThumbState::No;
            tp.touches[j].thumb.state = ThumbState::No;
            return;
        }
    }

    let pressure_yes = tp
        .config
        .quirks
        .thumb_pressure_threshold
        .map_or(false, |th| tp.touches[i].pressure > th);
    let size_yes = tp.config.quirks.thumb_size_threshold.map_or(false, |th| {
        tp.touches[i].major > th && (tp.touches[i].minor as f64) < SIZE_MINOR_FRACTION * th as f64
    });
    let slow_lower_yes = tp.config.scroll_method != ScrollMethod::Edge
        && point.y > lines.lower_thumb_line
        && time.saturating_sub(tp.touches[i].thumb.first_touch_time) > LOWER_LINE_DWELL_US;

    if pressure_yes || size_yes || slow_lower_yes {
        tp.touches[i].thumb.state = ThumbState::Yes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;

    #[test]
    fn above_upper_line_is_never_a_thumb() {
        let mut tp = test_touchpad();
        let lines = tp.config.thumb_lines();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].point.y = lines.upper_thumb_line - 1;
        detect_thumb(&mut tp, 0, 0);
        assert_eq!(tp.touches[0].thumb.state, ThumbState::No);
    }

    #[test]
    fn resolved_state_is_sticky() {
        let mut tp = test_touchpad();
        tp.touches[0].thumb.state = ThumbState::No;
        tp.touches[0].point.y = 0;
        detect_thumb(&mut tp, 0, 0);
        assert_eq!(tp.touches[0].thumb.state, ThumbState::No);
    }

    #[test]
    fn high_pressure_resolves_yes() {
        let mut tp = test_touchpad();
        tp.config.quirks.thumb_pressure_threshold = Some(100);
        let lines = tp.config.thumb_lines();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].point.y = lines.upper_thumb_line + 10;
        tp.touches[0].pressure = 150;
        detect_thumb(&mut tp, 0, 0);
        assert_eq!(tp.touches[0].thumb.state, ThumbState::Yes);
    }

    #[test]
    fn dwelling_below_lower_line_resolves_yes_without_edge_scroll() {
        let mut tp = test_touchpad();
        tp.config.scroll_method = ScrollMethod::TwoFinger;
        let lines = tp.config.thumb_lines();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].point.y = lines.lower_thumb_line + 5;
        detect_thumb(&mut tp, 0, 0);
        assert_eq!(tp.touches[0].thumb.state, ThumbState::Maybe);
        tp.touches[0].state = TouchState::Update;
        detect_thumb(&mut tp, 0, LOWER_LINE_DWELL_US + 1);
        assert_eq!(tp.touches[0].thumb.state, ThumbState::Yes);
    }
}
