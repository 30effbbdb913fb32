//! Process phase: the per-touch analyzer pipeline, run
//! in a fixed order for every touch dirtied this frame, followed by
//! the speed-based thumb override and the collaborator dispatch.
//! [`run_frame`] is the single entry point tying pre-process, process,
//! and post-events/post-process together; it is what every event
//! handler in [`super::mod`] and the suspend/arbitration runtimes call
//! after mutating touch state.

use super::analyzers::{hysteresis, jump, palm, speed, thumb, wobble};
use super::bits::{FakeFingerCount, Queued};
use super::clock::TimeUs;
use super::touch::Sample;
use super::types::{ScrollMethod, ThumbState, TouchState};
use super::Touchpad;

const PIN_RELEASE_DISTANCE_MM: f64 = 1.5;
const FORCE_THUMB_SPEED_EXCEEDED_THRESHOLD: u8 = 5;
const FORCE_THUMB_CLOSE_DX_MM: f64 = 25.0;
const FORCE_THUMB_CLOSE_DY_MM: f64 = 15.0;
const T450_OTHERAXIS_ONLY_LIMIT: u32 = 10;

/// Runs the full frame pipeline: pre-process, process, post-events,
/// post-process. Every place that mutates touch/button/device state
/// outside of a `SYN_REPORT`-driven decode (suspend, arbitration
/// timers) still needs a frame to run so collaborators see a
/// consistent snapshot.
pub fn run_frame(tp: &mut Touchpad, time: TimeUs) {
    super::pre_process::pre_process(tp, time);
    process_phase(tp, time);
    super::post::post_events(tp);
    super::post::post_process(tp);
}

fn process_phase(tp: &mut Touchpad, time: TimeUs) {
    recompute_nfingers_down(tp);
    topmost_fake_touch_positioning(tp);
    motion_history_reset_policy(tp);

    let dirty: Vec<usize> = tp
        .touches
        .iter()
        .enumerate()
        .filter(|(_, t)| t.dirty)
        .map(|(i, _)| i)
        .collect();

    let mut newest_begin: Option<usize> = None;

    for i in dirty {
        jump::detect_jump(tp, i, time);
        thumb::detect_thumb(tp, i, time);
        palm::detect_palm(tp, i, time);

        let single_finger_motion = tp.nfingers_down == 1 && tp.queued.contains(Queued::MOTION);
        if single_finger_motion && !tp.hysteresis_enabled {
            wobble::detect_wobble(tp, i, time);
        }

        hysteresis::apply_hysteresis(tp, i);

        if tp.touches[i].state == TouchState::Update {
            let point = tp.touches[i].point;
            tp.touches[i].history.push(Sample { point, time });
        }

        speed::calculate_speed(tp, i, time);
        speed::update_exceeded_counter(tp, i);

        maintain_pin(tp, i);

        if tp.touches[i].state == TouchState::Begin {
            newest_begin = Some(i);
            tp.hysteresis_last_motion_time = time;
            tp.collaborators.pointer_accel.restart(time);
            let touch = tp.touches[i].clone();
            tp.collaborators.tap.begin(&touch);
        }
    }

    if let Some(newest) = newest_begin {
        if tp.nfingers_down == 2 {
            let max_exceeded = tp.touches.iter().map(|t| t.speed.exceeded_count).max().unwrap_or(0);
            if max_exceeded > FORCE_THUMB_SPEED_EXCEEDED_THRESHOLD {
                maybe_force_thumb(tp, newest);
            }
        }
    }

    let filter_tap = tp.collaborators.tap.process(&tp.touches);
    let filter_buttons = tp.collaborators.buttons.process(&tp.touches);
    tp.frame_filter_motion = filter_tap | filter_buttons;

    // Suspend only gates the later post-events calls (see `post.rs`);
    // the state-update calls here must keep running even while
    // suspended so these collaborators don't wake up to stale state.
    tp.collaborators.edge_scroll.process(&tp.touches);
    tp.collaborators.gesture.process(&tp.touches);

    if tp.queued.contains(Queued::BUTTON_PRESS) && tp.collaborators.buttons.is_clickpad_pressed() {
        pin_all_touches(tp);
    }
}

fn recompute_nfingers_down(tp: &mut Touchpad) {
    tp.nfingers_down = tp.touches.iter().filter(|t| t.state.is_live()).count();
}

/// Ghost touches beyond `num_slots` are
/// positioned at the topmost real touch so a consuming gesture layer
/// sees a plausible point rather than (0, 0).
fn topmost_fake_touch_positioning(tp: &mut Touchpad) {
    let fake_count = match tp.fake_touches.count() {
        FakeFingerCount::Overflow => usize::MAX,
        FakeFingerCount::Exact(n) => n as usize,
    };
    if fake_count <= tp.config.num_slots || tp.nfingers_down == 0 {
        return;
    }

    let num_slots = tp.config.num_slots;
    let topmost = tp
        .touches
        .iter()
        .take(num_slots)
        .filter(|t| t.state != TouchState::End && t.state != TouchState::None)
        .min_by_key(|t| t.point.y)
        .map(|t| (t.point, t.pressure));

    match topmost {
        Some((point, pressure)) => {
            for touch in tp.touches.iter_mut().skip(num_slots) {
                if touch.is_ghost {
                    touch.point = point;
                    touch.pressure = pressure;
                }
            }
        }
        None => log::warn!("no topmost real touch found despite fake_count > num_slots"),
    }
}

/// A change in the number of fingers down resets
/// every touch's motion history outright; on Lenovo T450 firmware,
/// repeated frames that only carry `ABS_MT_PRESSURE`/size noise
/// without real motion (`OTHERAXIS` without `MOTION`) also eventually
/// force a reset to keep a stuck reading from pinning speed/jump
/// detection on garbage history.
fn motion_history_reset_policy(tp: &mut Touchpad) {
    if tp.nfingers_down != tp.old_nfingers_down {
        for touch in tp.touches.iter_mut() {
            touch.history.clear();
        }
        tp.t450_otheraxis_only_count = 0;
        return;
    }

    if !tp.config.quirks.lenovo_t450_touchpad_fw {
        return;
    }

    if tp.queued.contains(Queued::OTHERAXIS) && !tp.queued.contains(Queued::MOTION) {
        tp.t450_otheraxis_only_count += 1;
        if tp.t450_otheraxis_only_count > T450_OTHERAXIS_ONLY_LIMIT {
            for touch in tp.touches.iter_mut() {
                touch.history.clear();
            }
            tp.t450_otheraxis_only_count = 0;
        }
    } else {
        tp.t450_otheraxis_only_count = 0;
    }
}

fn maintain_pin(tp: &mut Touchpad, i: usize) {
    if !tp.touches[i].pinned.is_pinned {
        return;
    }
    let center = tp.touches[i].pinned.center;
    let point = tp.touches[i].point;
    let (dx, dy) = point.delta(center);
    let (dx_mm, dy_mm) = tp.config.size.delta_units_to_mm(dx, dy);
    if dx_mm.hypot(dy_mm) > PIN_RELEASE_DISTANCE_MM {
        tp.touches[i].pinned.is_pinned = false;
    }
}

fn pin_all_touches(tp: &mut Touchpad) {
    for touch in tp.touches.iter_mut() {
        if touch.state.is_live() {
            touch.pinned.center = touch.point;
            touch.pinned.is_pinned = true;
        }
    }
}

/// At the end of the process phase: a new touch beginning
/// mid-fast-swipe is usually an accidental second contact, not an
/// intentional two-finger gesture, unless the two touches sit close
/// together and two-finger scrolling is the active method (in which
/// case it plausibly *is* a deliberate second finger joining a scroll).
fn maybe_force_thumb(tp: &mut Touchpad, newest: usize) {
    let other = tp
        .touches
        .iter()
        .enumerate()
        .find(|(j, t)| *j != newest && t.state.is_live())
        .map(|(j, _)| j);

    if let Some(other) = other {
        let (dx, dy) = tp.touches[newest].point.delta(tp.touches[other].point);
        let (dx_mm, dy_mm) = tp.config.size.delta_units_to_mm(dx, dy);
        let close_enough = dx_mm.abs() <= FORCE_THUMB_CLOSE_DX_MM && dy_mm.abs() <= FORCE_THUMB_CLOSE_DY_MM;
        if close_enough && tp.config.scroll_method == ScrollMethod::TwoFinger {
            return;
        }
    }

    tp.touches[newest].thumb.state = ThumbState::Yes;
    log::debug!("touch {newest}: forced thumb (speed-exceeded heuristic)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;
    use crate::touchpad::types::Point;

    #[test]
    fn nfingers_down_counts_live_touches() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::Update;
        tp.touches[1].state = TouchState::Begin;
        recompute_nfingers_down(&mut tp);
        assert_eq!(tp.nfingers_down, 2);
    }

    #[test]
    fn fingers_down_change_clears_all_history() {
        let mut tp = test_touchpad();
        tp.touches[0].history.push(Sample { point: Point::new(1, 1), time: 1 });
        tp.nfingers_down = 1;
        tp.old_nfingers_down = 0;
        motion_history_reset_policy(&mut tp);
        assert!(tp.touches[0].history.is_empty());
    }

    #[test]
    fn pin_releases_beyond_threshold_distance() {
        let mut tp = test_touchpad();
        tp.touches[0].pinned.is_pinned = true;
        tp.touches[0].pinned.center = Point::new(0, 0);
        // 100 units/mm; 200 units = 2mm > 1.5mm release distance.
        tp.touches[0].point = Point::new(200, 0);
        maintain_pin(&mut tp, 0);
        assert!(!tp.touches[0].pinned.is_pinned);
    }

    #[test]
    fn pin_holds_within_threshold_distance() {
        let mut tp = test_touchpad();
        tp.touches[0].pinned.is_pinned = true;
        tp.touches[0].pinned.center = Point::new(0, 0);
        tp.touches[0].point = Point::new(100, 0);
        maintain_pin(&mut tp, 0);
        assert!(tp.touches[0].pinned.is_pinned);
    }
}
