//! Motion hysteresis: once latched on (by
//! [`super::wobble`] or a configured default margin), snaps small
//! moves back to a sticky center point per axis.

use crate::touchpad::types::Point;
use crate::touchpad::Touchpad;

pub fn apply_hysteresis(tp: &mut Touchpad, i: usize) {
    if !tp.hysteresis_enabled {
        return;
    }

    let touch = &tp.touches[i];
    if touch.history.is_empty() {
        tp.touches[i].hysteresis.center = touch.point;
        return;
    }

    let center = touch.hysteresis.center;
    let point = touch.point;
    let margin = tp.hysteresis_margin;

    let snapped = Point::new(
        snap_axis(point.x, center.x, margin.0),
        snap_axis(point.y, center.y, margin.1),
    );

    tp.touches[i].point = snapped;
    tp.touches[i].hysteresis.center = snapped;
}

fn snap_axis(value: i32, center: i32, margin: i32) -> i32 {
    let delta = value - center;
    if delta.abs() <= margin {
        center
    } else {
        center + delta - margin * delta.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touchpad::tests_support::test_touchpad;
    use crate::touchpad::touch::Sample;

    #[test]
    fn disabled_hysteresis_is_a_no_op() {
        let mut tp = test_touchpad();
        tp.touches[0].point = Point::new(50, 0);
        apply_hysteresis(&mut tp, 0);
        assert_eq!(tp.touches[0].point, Point::new(50, 0));
    }

    #[test]
    fn small_move_snaps_to_center() {
        let mut tp = test_touchpad();
        tp.hysteresis_enabled = true;
        tp.hysteresis_margin = (10, 10);
        tp.touches[0].history.push(Sample { point: Point::new(0, 0), time: 0 });
        tp.touches[0].hysteresis.center = Point::new(0, 0);
        tp.touches[0].point = Point::new(5, 0);
        apply_hysteresis(&mut tp, 0);
        assert_eq!(tp.touches[0].point, Point::new(0, 0));
    }

    #[test]
    fn large_move_advances_center_by_margin_discounted_delta() {
        let mut tp = test_touchpad();
        tp.hysteresis_enabled = true;
        tp.hysteresis_margin = (10, 10);
        tp.touches[0].history.push(Sample { point: Point::new(0, 0), time: 0 });
        tp.touches[0].hysteresis.center = Point::new(0, 0);
        tp.touches[0].point = Point::new(30, 0);
        apply_hysteresis(&mut tp, 0);
        assert_eq!(tp.touches[0].point, Point::new(20, 0));
        assert_eq!(tp.touches[0].hysteresis.center, Point::new(20, 0));
    }
}
