//! Derives the palm/thumb geometry constants from physical device
//! size, matching the defaults libinput's
//! `tp_init_palmdetect_edges` / `tp_init_thumb` compute.

/// A touchpad's device-unit ↔ millimeter mapping and physical size,
/// supplied at init time since live capability probing is out of this
/// core's scope.
#[derive(Debug, Clone, Copy)]
pub struct DeviceSize {
    pub width_mm: f64,
    pub height_mm: f64,
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl DeviceSize {
    pub fn units_per_mm_x(&self) -> f64 {
        (self.x_max - self.x_min) as f64 / self.width_mm
    }

    pub fn units_per_mm_y(&self) -> f64 {
        (self.y_max - self.y_min) as f64 / self.height_mm
    }

    pub fn mm_to_units_x(&self, mm: f64) -> i32 {
        (mm * self.units_per_mm_x()).round() as i32
    }

    pub fn mm_to_units_y(&self, mm: f64) -> i32 {
        (mm * self.units_per_mm_y()).round() as i32
    }

    pub fn delta_units_to_mm(&self, dx: i32, dy: i32) -> (f64, f64) {
        (
            dx as f64 / self.units_per_mm_x(),
            dy as f64 / self.units_per_mm_y(),
        )
    }
}

/// Palm/thumb edges in device units, derived once at init.
#[derive(Debug, Clone, Copy)]
pub struct PalmEdges {
    pub left_edge: i32,
    pub right_edge: i32,
    pub upper_edge: Option<i32>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ThumbLines {
    pub upper_thumb_line: i32,
    pub lower_thumb_line: i32,
    pub enabled: bool,
}

/// Side/top palm edges are 8% of the pad's width/height from each
/// edge, capped at 8mm; disabled entirely below 70mm width. The top
/// edge additionally requires the pad to be at least 55mm tall and
/// not have top software buttons (those already own that strip).
pub fn palm_edges(size: &DeviceSize, has_top_software_buttons: bool) -> PalmEdges {
    const PALM_EDGE_FRACTION: f64 = 0.08;
    const PALM_EDGE_CAP_MM: f64 = 8.0;
    const MIN_WIDTH_FOR_PALM_EDGE_MM: f64 = 70.0;
    const MIN_HEIGHT_FOR_TOP_EDGE_MM: f64 = 55.0;
    const TOP_EDGE_FRACTION: f64 = 0.05;

    if size.width_mm < MIN_WIDTH_FOR_PALM_EDGE_MM {
        return PalmEdges {
            left_edge: size.x_min,
            right_edge: size.x_max,
            upper_edge: None,
            enabled: false,
        };
    }

    let side_mm = (size.width_mm * PALM_EDGE_FRACTION).min(PALM_EDGE_CAP_MM);
    let side_units = size.mm_to_units_x(side_mm);

    let upper_edge = if size.height_mm >= MIN_HEIGHT_FOR_TOP_EDGE_MM && !has_top_software_buttons {
        Some(size.y_min + size.mm_to_units_y(size.height_mm * TOP_EDGE_FRACTION))
    } else {
        None
    };

    PalmEdges {
        left_edge: size.x_min + side_units,
        right_edge: size.x_max - side_units,
        upper_edge,
        enabled: true,
    }
}

/// Thumb detection lines at 85%/92% of pad height; disabled entirely
/// below 50mm height.
pub fn thumb_lines(size: &DeviceSize) -> ThumbLines {
    const MIN_HEIGHT_FOR_THUMB_MM: f64 = 50.0;
    const UPPER_FRACTION: f64 = 0.85;
    const LOWER_FRACTION: f64 = 0.92;

    if size.height_mm < MIN_HEIGHT_FOR_THUMB_MM {
        return ThumbLines {
            upper_thumb_line: size.y_max,
            lower_thumb_line: size.y_max,
            enabled: false,
        };
    }

    ThumbLines {
        upper_thumb_line: size.y_min + size.mm_to_units_y(size.height_mm * UPPER_FRACTION),
        lower_thumb_line: size.y_min + size.mm_to_units_y(size.height_mm * LOWER_FRACTION),
        enabled: true,
    }
}

/// Per-axis hysteresis margin info reported by the kernel for an abs
/// axis: `fuzz` (if nonzero, used directly) else `resolution / 4`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisInfo {
    pub fuzz: i32,
    pub resolution: i32,
}

impl AxisInfo {
    pub fn hysteresis_margin(&self) -> i32 {
        if self.fuzz > 0 {
            self.fuzz
        } else {
            self.resolution / 4
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad_70x50() -> DeviceSize {
        DeviceSize {
            width_mm: 70.0,
            height_mm: 50.0,
            x_min: 0,
            x_max: 7000,
            y_min: 0,
            y_max: 5000,
        }
    }

    #[test]
    fn palm_edge_capped_at_8mm() {
        // 8% of 70mm is 5.6mm, under the 8mm cap, so it should use 5.6mm.
        let size = pad_70x50();
        let edges = palm_edges(&size, false);
        assert!(edges.enabled);
        let side_units = size.mm_to_units_x(5.6);
        assert_eq!(edges.left_edge, side_units);
    }

    #[test]
    fn palm_edge_disabled_below_70mm() {
        let mut size = pad_70x50();
        size.width_mm = 65.0;
        let edges = palm_edges(&size, false);
        assert!(!edges.enabled);
    }

    #[test]
    fn top_edge_requires_55mm_and_no_top_buttons() {
        let size = pad_70x50();
        assert!(palm_edges(&size, false).upper_edge.is_some());
        assert!(palm_edges(&size, true).upper_edge.is_none());

        let mut short = size;
        short.height_mm = 50.0;
        assert!(palm_edges(&short, false).upper_edge.is_none());
    }

    #[test]
    fn thumb_disabled_below_50mm() {
        let mut size = pad_70x50();
        size.height_mm = 49.0;
        assert!(!thumb_lines(&size).enabled);
    }

    #[test]
    fn hysteresis_prefers_fuzz_over_resolution() {
        let a = AxisInfo { fuzz: 8, resolution: 40 };
        assert_eq!(a.hysteresis_margin(), 8);
        let b = AxisInfo { fuzz: 0, resolution: 40 };
        assert_eq!(b.hysteresis_margin(), 10);
    }
}
