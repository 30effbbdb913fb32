//! Palm detection. Rules are evaluated in a
//! fixed order and latch as soon as one fires; pressure is
//! re-evaluated first (it can never be released once triggered) and
//! every other rule owns both its own entry and release condition.

use crate::touchpad::clock::TimeUs;
use crate::touchpad::types::{ArbitrationState, PalmState, TouchState};
use crate::touchpad::Touchpad;

const PALM_TIMEOUT_US: TimeUs = 200_000;

pub fn detect_palm(tp: &mut Touchpad, i: usize, time: TimeUs) {
    if pressure_triggered(tp, i) {
        latch(tp, i, PalmState::Pressure, time);
        return;
    }

    if tp.pen_arbitration.state != ArbitrationState::NotActive {
        latch(tp, i, PalmState::Arbitration, time);
        return;
    }

    if detect_dwt(tp, i, time) {
        return;
    }
    if detect_trackpoint(tp, i, time) {
        return;
    }
    if detect_tool_palm(tp, i, time) {
        return;
    }
    if touch_size_triggered(tp, i) {
        latch(tp, i, PalmState::TouchSize, time);
        return;
    }
    detect_edge(tp, i, time);

    // Pressure is highest priority and can never be released once
    // latched, so it gets checked once before anything else above and
    // again here in case one of the other rules just released but the
    // touch is now over the pressure threshold.
    if pressure_triggered(tp, i) {
        latch(tp, i, PalmState::Pressure, time);
    }
}

/// Only fires from `None` or an existing `Pressure` latch; never
/// stomps a latch owned by one of the other rules.
fn pressure_triggered(tp: &Touchpad, i: usize) -> bool {
    let state = tp.touches[i].palm.state;
    if state != PalmState::None && state != PalmState::Pressure {
        return false;
    }
    let threshold = tp.config.quirks.palm_pressure_threshold;
    threshold > 0 && tp.touches[i].pressure > threshold
}

fn touch_size_triggered(tp: &Touchpad, i: usize) -> bool {
    match tp.config.quirks.palm_size_threshold {
        Some(threshold) => tp.touches[i].major > threshold || tp.touches[i].minor > threshold,
        None => false,
    }
}

fn latch(tp: &mut Touchpad, i: usize, state: PalmState, time: TimeUs) {
    let touch = &mut tp.touches[i];
    if touch.palm.state != state {
        log::debug!("touch {i}: palm {:?} -> {state:?}", touch.palm.state);
    }
    touch.palm.state = state;
    touch.palm.first = touch.point;
    touch.palm.time = time;
}

fn release(tp: &mut Touchpad, i: usize, time: TimeUs) {
    log::debug!("touch {i}: palm {:?} -> none", tp.touches[i].palm.state);
    tp.touches[i].palm.state = PalmState::None;
    tp.touches[i].palm.time = time;
}

fn detect_dwt(tp: &mut Touchpad, i: usize, time: TimeUs) -> bool {
    if tp.dwt.keyboard_active {
        if tp.touches[i].state == TouchState::Begin {
            latch(tp, i, PalmState::Typing, time);
            return true;
        }
    } else if tp.touches[i].palm.state == PalmState::Typing
        && tp.touches[i].palm.time > tp.dwt.last_press_time
    {
        release(tp, i, time);
    }
    false
}

fn detect_trackpoint(tp: &mut Touchpad, i: usize, time: TimeUs) -> bool {
    if tp.trackpoint.active {
        if tp.touches[i].state == TouchState::Begin {
            latch(tp, i, PalmState::Trackpoint, time);
            return true;
        }
    } else if tp.touches[i].palm.state == PalmState::Trackpoint
        && tp.touches[i].palm.time > tp.trackpoint.last_event_time
    {
        release(tp, i, time);
    }
    false
}

/// `ToolPalm` only ever transitions to/from `None`; any other current
/// state (a higher-priority rule already latched) is left untouched.
fn detect_tool_palm(tp: &mut Touchpad, i: usize, time: TimeUs) -> bool {
    let state = tp.touches[i].palm.state;
    if state != PalmState::None && state != PalmState::ToolPalm {
        return false;
    }
    if tp.touches[i].is_tool_palm {
        if state != PalmState::ToolPalm {
            latch(tp, i, PalmState::ToolPalm, time);
        }
        true
    } else {
        if state == PalmState::ToolPalm {
            release(tp, i, time);
        }
        false
    }
}

fn in_software_button_area(_tp: &Touchpad, _i: usize) -> bool {
    // Button-area geometry belongs to the button collaborator
    // (out of scope here).
    false
}

fn in_edge_zone(tp: &Touchpad, i: usize) -> (bool, bool) {
    let edges = tp.config.palm_edges();
    if !edges.enabled {
        return (false, false);
    }
    let p = tp.touches[i].point;
    let side = p.x < edges.left_edge || p.x > edges.right_edge;
    let top = edges.upper_edge.map_or(false, |ue| p.y < ue);
    (side, top)
}

fn was_in_side_edge(tp: &Touchpad, i: usize) -> bool {
    let edges = tp.config.palm_edges();
    let p = tp.touches[i].palm.first;
    p.x < edges.left_edge || p.x > edges.right_edge
}

fn was_in_top_edge(tp: &Touchpad, i: usize) -> bool {
    let edges = tp.config.palm_edges();
    edges.upper_edge.map_or(false, |ue| tp.touches[i].palm.first.y < ue)
}

fn multifinger_present(tp: &Touchpad, i: usize) -> bool {
    tp.touches.iter().enumerate().any(|(j, t)| j != i && t.state.is_live())
}

fn moved_out_of_edge_in_allowed_direction(tp: &Touchpad, i: usize, time: TimeUs) -> bool {
    let entered = tp.touches[i].palm.time;
    if time >= entered + PALM_TIMEOUT_US {
        return false;
    }
    let (side, top) = in_edge_zone(tp, i);
    if side || top {
        return false;
    }
    let dir = match tp.touches[i].direction_from_palm_first() {
        Some(d) => d,
        None => return false,
    };
    if was_in_side_edge(tp, i) {
        dir.allowed_from_side_edge()
    } else if was_in_top_edge(tp, i) {
        dir.allowed_from_top_edge()
    } else {
        false
    }
}

fn detect_edge(tp: &mut Touchpad, i: usize, time: TimeUs) -> bool {
    if tp.touches[i].palm.state == PalmState::Edge {
        if multifinger_present(tp, i) || moved_out_of_edge_in_allowed_direction(tp, i, time) {
            release(tp, i, time);
        }
        return tp.touches[i].palm.state == PalmState::Edge;
    }

    if tp.touches[i].state != TouchState::Begin {
        return false;
    }
    let (side, top) = in_edge_zone(tp, i);
    if !(side || top) {
        return false;
    }
    if in_software_button_area(tp, i) {
        return false;
    }
    let edges = tp.config.palm_edges();
    if tp.touches[i].point.x > edges.right_edge {
        // The right edge is reserved for right-click on clickpads; it
        // is part of the release geometry but never an entry trigger.
        return false;
    }

    latch(tp, i, PalmState::Edge, time);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;
    use crate::touchpad::types::Point;

    #[test]
    fn high_pressure_latches_pressure_palm() {
        let mut tp = test_touchpad();
        tp.touches[0].pressure = 200;
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::Pressure);
    }

    #[test]
    fn pressure_palm_never_releases_through_this_function() {
        let mut tp = test_touchpad();
        tp.touches[0].pressure = 200;
        detect_palm(&mut tp, 0, 1_000);
        tp.touches[0].pressure = 0;
        detect_palm(&mut tp, 0, 2_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::Pressure);
    }

    #[test]
    fn typing_latches_on_begin_while_keyboard_active() {
        let mut tp = test_touchpad();
        tp.dwt.keyboard_active = true;
        tp.touches[0].state = TouchState::Begin;
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::Typing);
    }

    #[test]
    fn typing_releases_once_keyboard_goes_inactive_after_latch_time() {
        let mut tp = test_touchpad();
        // Keep the touch well clear of the palm edge zones so the edge
        // rule doesn't re-latch it once typing releases.
        tp.touches[0].point = Point::new(5_000, 3_000);
        tp.dwt.keyboard_active = true;
        tp.touches[0].state = TouchState::Begin;
        detect_palm(&mut tp, 0, 1_000);
        tp.dwt.keyboard_active = false;
        tp.dwt.last_press_time = 500;
        detect_palm(&mut tp, 0, 2_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::None);
    }

    #[test]
    fn edge_begin_latches_inside_left_edge() {
        let mut tp = test_touchpad();
        let edges = tp.config.palm_edges();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].point = Point::new(edges.left_edge - 1, 3000);
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::Edge);
    }

    #[test]
    fn edge_does_not_latch_at_right_edge() {
        let mut tp = test_touchpad();
        let edges = tp.config.palm_edges();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].point = Point::new(edges.right_edge + 1, 3000);
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::None);
    }

    #[test]
    fn edge_releases_when_second_finger_present() {
        let mut tp = test_touchpad();
        tp.touches[0].palm.state = PalmState::Edge;
        tp.touches[0].palm.time = 0;
        tp.touches[1].state = TouchState::Update;
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::None);
    }

    #[test]
    fn pressure_crossing_does_not_stomp_an_existing_edge_latch() {
        let mut tp = test_touchpad();
        let edges = tp.config.palm_edges();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].point = Point::new(edges.left_edge - 1, 3000);
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::Edge);

        // Pressure now crosses the threshold on a later frame, but the
        // touch is still inside the edge zone (no release condition
        // fires), so the pre-existing Edge latch must survive.
        tp.touches[0].pressure = 200;
        detect_palm(&mut tp, 0, 1_100);
        assert_eq!(tp.touches[0].palm.state, PalmState::Edge);
    }

    #[test]
    fn pressure_latches_after_another_rule_releases_in_the_same_call() {
        let mut tp = test_touchpad();
        tp.touches[0].palm.state = PalmState::Edge;
        tp.touches[0].palm.time = 0;
        tp.touches[1].state = TouchState::Update;
        tp.touches[0].pressure = 200;
        detect_palm(&mut tp, 0, 1_000);
        assert_eq!(tp.touches[0].palm.state, PalmState::Pressure);
    }
}
