//! Device-capability probing: turns a live `evdev_rs::Device` plus the
//! on-disk overrides (`config::DeviceOverrides`) into the
//! `touchpad::config::TouchpadConfig` a `Touchpad` is constructed
//! with. This is deliberately kept out of `touchpad::config` itself —
//! the core's scope stops at consuming already-resolved config
//! so only the binary layer reaches for a kernel fd.

use crate::config::DeviceOverrides;
use touchpad_core::touchpad::config::{LeftHanded, Quirks, TouchpadConfig};
use touchpad_core::touchpad::geometry::{AxisInfo, DeviceSize};
#[allow(unused)]
use log::{debug, error, info, trace, warn};

use evdev_rs::enums::{EventCode, EV_ABS, EV_KEY};
use evdev_rs::Device as EvDevice;

/// Falls back to a plausible 100x60mm pad when the kernel doesn't
/// report a resolution for an axis (some virtual/serial touchpads
/// don't), matching `evdev-mt-touchpad.c`'s own fallback of treating
/// an unset resolution as "unknown, assume a sane default" rather than
/// refusing the device outright.
const FALLBACK_WIDTH_MM: f64 = 100.0;
const FALLBACK_HEIGHT_MM: f64 = 60.0;

fn axis_info(device: &EvDevice, code: EV_ABS) -> Option<evdev_rs::AbsInfo> {
    device.abs_info(&EventCode::EV_ABS(code))
}

fn max_touches(device: &EvDevice) -> usize {
    for (code, n) in [
        (EV_KEY::BTN_TOOL_QUINTTAP, 5),
        (EV_KEY::BTN_TOOL_QUADTAP, 4),
        (EV_KEY::BTN_TOOL_TRIPLETAP, 3),
        (EV_KEY::BTN_TOOL_DOUBLETAP, 2),
    ] {
        if device.has_event_code(&EventCode::EV_KEY(code)) {
            return n;
        }
    }
    1
}

/// Builds a `TouchpadConfig` for `device`, or `None` if it doesn't
/// look like a touchpad at all (missing `ABS_MT_POSITION_X/Y` and
/// `BTN_TOUCH`). Geometry is derived from the axes' reported
/// resolution the way libinput's `tp_init_accel`/`tp_init_range` do;
/// hysteresis margins come straight from
/// `AxisInfo::hysteresis_margin`.
pub(crate) fn probe_touchpad_config(device: &EvDevice, overrides: &DeviceOverrides) -> Option<TouchpadConfig> {
    let x = axis_info(device, EV_ABS::ABS_MT_POSITION_X).or_else(|| axis_info(device, EV_ABS::ABS_X))?;
    let y = axis_info(device, EV_ABS::ABS_MT_POSITION_Y).or_else(|| axis_info(device, EV_ABS::ABS_Y))?;
    if !device.has_event_code(&EventCode::EV_KEY(EV_KEY::BTN_TOUCH)) {
        return None;
    }
    // Missing ABS_X, BTN_TOUCH, or BTN_TOOL_FINGER fails init
    // outright rather than registering a partial device.
    if !device.has_event_code(&EventCode::EV_KEY(EV_KEY::BTN_TOOL_FINGER)) {
        return None;
    }

    let width_mm = if x.resolution > 0 {
        (x.maximum - x.minimum) as f64 / x.resolution as f64
    } else {
        FALLBACK_WIDTH_MM
    };
    let height_mm = if y.resolution > 0 {
        (y.maximum - y.minimum) as f64 / y.resolution as f64
    } else {
        FALLBACK_HEIGHT_MM
    };

    let size = DeviceSize {
        width_mm,
        height_mm,
        x_min: x.minimum,
        x_max: x.maximum,
        y_min: y.minimum,
        y_max: y.maximum,
    };

    let slot = axis_info(device, EV_ABS::ABS_MT_SLOT);
    let num_slots = slot.map_or(1, |s| (s.maximum - s.minimum + 1).max(1) as usize);
    let ntouches = max_touches(device).max(num_slots);
    let has_mt = device.has_event_code(&EventCode::EV_ABS(EV_ABS::ABS_MT_POSITION_X));
    let semi_mt = has_mt && slot.is_none();

    let is_internal = device
        .phys()
        .map_or(true, |phys| !phys.to_lowercase().contains("usb"));

    let quirks = overrides.apply_quirks(Quirks::default());

    let scroll_method = overrides
        .scroll_method
        .unwrap_or_else(|| TouchpadConfig::default_scroll_method(ntouches));
    let dwt = overrides.dwt.unwrap_or_else(|| TouchpadConfig::default_dwt(is_internal));

    Some(TouchpadConfig {
        send_events_mode: overrides.send_events_mode.unwrap_or_default(),
        scroll_method,
        dwt,
        left_handed: overrides.left_handed.unwrap_or(LeftHanded::Disabled),
        reversible: true,
        is_internal,
        num_slots,
        ntouches,
        has_mt,
        semi_mt,
        size,
        quirks,
        axis_x: AxisInfo { fuzz: x.fuzz, resolution: x.resolution },
        axis_y: AxisInfo { fuzz: y.fuzz, resolution: y.resolution },
        monitor_trackpoint: overrides.monitor_trackpoint.unwrap_or(true),
        thumb_detect: overrides.thumb_detect.unwrap_or(true),
    })
}
