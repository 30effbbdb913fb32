//! Per-device configuration: the knobs a client can set at runtime, plus
//! the quirk-sourced attributes and geometry the pre-process/process
//! phases consult. Distinct from the top-level `crate::config`, which
//! is the on-disk device-list-plus-overrides file; this struct is
//! what that file is parsed *into* for a single device.

use super::geometry::{palm_edges, thumb_lines, AxisInfo, DeviceSize, PalmEdges, ThumbLines};
use super::types::{ConfigResult, ScrollMethod, SendEventsMode};

/// Whether pressure or touch-size (major/minor) drives hover→touch
/// promotion. At most one is active; touch-size takes precedence over
/// pressure when its range is usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PressureRange {
    pub high: i32,
    pub low: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TouchSizeRange {
    pub high: i32,
    pub low: i32,
}

/// Quirk-sourced thresholds, named after the udev hwdb `QUIRK_ATTR_*`
/// entries they're read from (device discovery / quirks DB access is
/// out of this core's scope; these values are supplied at construction).
#[derive(Debug, Clone, Copy)]
pub struct Quirks {
    pub palm_pressure_threshold: i32,
    pub palm_size_threshold: Option<i32>,
    pub thumb_pressure_threshold: Option<i32>,
    pub thumb_size_threshold: Option<i32>,
    pub pressure_range: Option<PressureRange>,
    pub touch_size_range: Option<TouchSizeRange>,
    pub synaptics_serial_touchpad: bool,
    pub lenovo_t450_touchpad_fw: bool,
    pub top_software_buttons: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        // 130 is libinput's DEFAULT_PALM_PRESSURE_THRESHOLD.
        Quirks {
            palm_pressure_threshold: 130,
            palm_size_threshold: None,
            thumb_pressure_threshold: None,
            thumb_size_threshold: None,
            pressure_range: None,
            touch_size_range: None,
            synaptics_serial_touchpad: false,
            lenovo_t450_touchpad_fw: false,
            top_software_buttons: false,
        }
    }
}

/// `dwt` (disable-while-typing) knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dwt {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeftHanded {
    Enabled,
    Disabled,
}

/// Full per-device configuration.
#[derive(Debug, Clone)]
pub struct TouchpadConfig {
    pub send_events_mode: SendEventsMode,
    pub scroll_method: ScrollMethod,
    pub dwt: Dwt,
    pub left_handed: LeftHanded,
    /// Whether the device is tagged reversible: coordinate rotation
    /// for left-handed mode only applies on such devices.
    pub reversible: bool,
    /// Whether this is an internal (built-in) touchpad: gates the
    /// `DisabledOnExternalMouse` mode and the default for `dwt`.
    pub is_internal: bool,
    pub num_slots: usize,
    pub ntouches: usize,
    pub has_mt: bool,
    pub semi_mt: bool,
    pub size: DeviceSize,
    pub quirks: Quirks,
    pub axis_x: AxisInfo,
    pub axis_y: AxisInfo,
    pub monitor_trackpoint: bool,
    pub thumb_detect: bool,
}

impl TouchpadConfig {
    pub fn palm_edges(&self) -> PalmEdges {
        palm_edges(&self.size, self.quirks.top_software_buttons)
    }

    pub fn thumb_lines(&self) -> ThumbLines {
        thumb_lines(&self.size)
    }

    /// Sets `send_events_mode`. `DisabledOnExternalMouse` requires an
    /// internal touchpad tag; everything else is always
    /// valid. Re-setting the current value is a no-op success.
    pub fn set_send_events_mode(&mut self, mode: SendEventsMode) -> ConfigResult {
        if mode == self.send_events_mode {
            return ConfigResult::Success;
        }
        if mode == SendEventsMode::DisabledOnExternalMouse && !self.is_internal {
            return ConfigResult::Unsupported;
        }
        self.send_events_mode = mode;
        ConfigResult::Success
    }

    /// Sets `scroll_method`. `TwoFinger` is unsupported below two
    /// touches; the default already picks `Edge` in that case,
    /// but an explicit client request for 2fg on a single-touch
    /// device is a client bug.
    pub fn set_scroll_method(&mut self, method: ScrollMethod) -> ConfigResult {
        if method == self.scroll_method {
            return ConfigResult::Success;
        }
        if method == ScrollMethod::TwoFinger && self.ntouches < 2 {
            return ConfigResult::Unsupported;
        }
        self.scroll_method = method;
        ConfigResult::Success
    }

    pub fn set_dwt(&mut self, dwt: Dwt) -> ConfigResult {
        if dwt == self.dwt {
            return ConfigResult::Success;
        }
        self.dwt = dwt;
        ConfigResult::Success
    }

    pub fn set_left_handed(&mut self, lh: LeftHanded) -> ConfigResult {
        if lh == self.left_handed {
            return ConfigResult::Success;
        }
        self.left_handed = lh;
        ConfigResult::Success
    }

    /// Whether coordinates should be rotated 180° for left-handed
    /// mode this frame. Only applies on reversible devices.
    pub fn rotate_for_left_handed(&self) -> bool {
        self.left_handed == LeftHanded::Enabled && self.reversible
    }

    /// Default `scroll_method`: 2fg when the device can report ≥2
    /// touches, else edge.
    pub fn default_scroll_method(ntouches: usize) -> ScrollMethod {
        if ntouches >= 2 {
            ScrollMethod::TwoFinger
        } else {
            ScrollMethod::Edge
        }
    }

    /// Default `dwt`: enabled only for internal touchpads.
    pub fn default_dwt(is_internal: bool) -> Dwt {
        if is_internal {
            Dwt::Enabled
        } else {
            Dwt::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> TouchpadConfig {
        TouchpadConfig {
            send_events_mode: SendEventsMode::Enabled,
            scroll_method: ScrollMethod::TwoFinger,
            dwt: Dwt::Enabled,
            left_handed: LeftHanded::Disabled,
            reversible: true,
            is_internal: true,
            num_slots: 5,
            ntouches: 5,
            has_mt: true,
            semi_mt: false,
            size: DeviceSize {
                width_mm: 100.0,
                height_mm: 60.0,
                x_min: 0,
                x_max: 10000,
                y_min: 0,
                y_max: 6000,
            },
            quirks: Quirks::default(),
            axis_x: AxisInfo::default(),
            axis_y: AxisInfo::default(),
            monitor_trackpoint: true,
            thumb_detect: true,
        }
    }

    #[test]
    fn reapplying_same_value_is_idempotent() {
        let mut cfg = base_config();
        assert_eq!(
            cfg.set_send_events_mode(SendEventsMode::Enabled),
            ConfigResult::Success
        );
        assert_eq!(cfg.send_events_mode, SendEventsMode::Enabled);
    }

    #[test]
    fn external_mouse_mode_requires_internal_tag() {
        let mut cfg = base_config();
        cfg.is_internal = false;
        assert_eq!(
            cfg.set_send_events_mode(SendEventsMode::DisabledOnExternalMouse),
            ConfigResult::Unsupported
        );
    }

    #[test]
    fn two_finger_scroll_requires_two_touches() {
        let mut cfg = base_config();
        cfg.ntouches = 1;
        assert_eq!(
            cfg.set_scroll_method(ScrollMethod::TwoFinger),
            ConfigResult::Unsupported
        );
    }
}
