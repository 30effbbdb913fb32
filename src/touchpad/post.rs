//! Post-events and post-process: decides whether
//! edge-scroll/gesture collaborators get to emit this frame, then
//! commits the touch state machine's end-of-frame transitions and
//! clears every per-frame scratch flag.

use super::types::TouchState;
use super::Touchpad;

/// Suspended devices only ever emit button events (already dispatched
/// through the button collaborator during the process phase); nothing
/// else posts. Otherwise, any collaborator-requested motion filter, or
/// an active trackpoint/keyboard, suppresses edge-scroll and gesture
/// output for the frame instead of letting them post.
pub fn post_events(tp: &mut Touchpad) {
    if super::suspend::is_suspended(tp) {
        return;
    }

    let suppress = tp.frame_filter_motion.any() || tp.trackpoint.active || tp.dwt.keyboard_active;
    if suppress {
        tp.collaborators.edge_scroll.stop();
        tp.collaborators.gesture.cancel();
    } else {
        tp.collaborators.edge_scroll.post_process();
        tp.collaborators.gesture.post_process();
    }
}

/// Commits `BEGIN -> UPDATE` and `END -> NONE | HOVERING`, notifies the
/// tap collaborator of the touches that ended, snapshots
/// `nfingers_down` for next frame's reset-policy comparison, and clears
/// every per-frame flag (`dirty`, `queued`).
pub fn post_process(tp: &mut Touchpad) {
    let ended: Vec<usize> = tp
        .touches
        .iter()
        .enumerate()
        .filter(|(_, t)| t.dirty && t.state == TouchState::End)
        .map(|(i, _)| i)
        .collect();

    for i in ended {
        let touch = tp.touches[i].clone();
        tp.collaborators.tap.end(&touch);
        if tp.touches[i].has_ended {
            tp.touches[i].reset();
        } else {
            tp.touches[i].state = TouchState::Hovering;
        }
    }

    for touch in tp.touches.iter_mut() {
        if touch.dirty && touch.state == TouchState::Begin {
            touch.state = TouchState::Update;
            touch.was_down = true;
        }
        touch.dirty = false;
    }

    tp.old_nfingers_down = tp.nfingers_down;
    tp.queued = super::bits::Queued::empty();
    tp.collaborators.tap.post_process();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;

    #[test]
    fn begin_promotes_to_update() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::Begin;
        tp.touches[0].dirty = true;
        post_process(&mut tp);
        assert_eq!(tp.touches[0].state, TouchState::Update);
        assert!(tp.touches[0].was_down);
    }

    #[test]
    fn fully_ended_touch_resets_to_none() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::End;
        tp.touches[0].has_ended = true;
        tp.touches[0].dirty = true;
        post_process(&mut tp);
        assert_eq!(tp.touches[0].state, TouchState::None);
    }

    #[test]
    fn end_without_has_ended_returns_to_hovering() {
        let mut tp = test_touchpad();
        tp.touches[0].state = TouchState::End;
        tp.touches[0].has_ended = false;
        tp.touches[0].dirty = true;
        post_process(&mut tp);
        assert_eq!(tp.touches[0].state, TouchState::Hovering);
    }

    #[test]
    fn post_process_clears_dirty_and_queued() {
        let mut tp = test_touchpad();
        tp.touches[0].dirty = true;
        tp.queued = super::super::bits::Queued::MOTION;
        post_process(&mut tp);
        assert!(!tp.touches[0].dirty);
        assert!(tp.queued.is_empty());
    }
}
