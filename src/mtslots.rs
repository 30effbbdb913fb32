//! Implements `touchpad_core::touchpad::collaborators::SlotSource`
//! against a live device fd via the `EVIOCGMTSLOTS` ioctl, so
//! `Touchpad::resume` can re-sync slot state straight from the kernel
//! rather than from whatever events happened to arrive (or not)
//! while the device was suspended.

use std::os::fd::RawFd;

use touchpad_core::touchpad::collaborators::{KernelSlotState, SlotSource};
use touchpad_core::touchpad::types::Point;

// linux/input-event-codes.h; stable kernel ABI, not exposed as a raw
// u16 by evdev-rs's enum wrapper.
const ABS_MT_TOUCH_MAJOR: u16 = 0x30;
const ABS_MT_TOUCH_MINOR: u16 = 0x31;
const ABS_MT_POSITION_X: u16 = 0x35;
const ABS_MT_POSITION_Y: u16 = 0x36;
const ABS_MT_PRESSURE: u16 = 0x3a;
const ABS_MT_TRACKING_ID: u16 = 0x39;

const EVIOC_TYPE: u32 = b'E' as u32;
const EVIOCGMTSLOTS_NR: u32 = 0x0a;
const IOC_READ: u32 = 2;

fn ioc_read(nr: u32, size: u32) -> libc::c_ulong {
    ((IOC_READ << 30) | (size << 16) | (EVIOC_TYPE << 8) | nr) as libc::c_ulong
}

pub struct EvdevSlotSource {
    fd: RawFd,
    num_slots: usize,
}

impl EvdevSlotSource {
    pub fn new(fd: RawFd, num_slots: usize) -> Self {
        EvdevSlotSource { fd, num_slots }
    }

    /// Reads one axis code's current value for every slot via
    /// `EVIOCGMTSLOTS`. Index 0 of the returned buffer echoes the
    /// requested code back; slot values start at index 1.
    fn read_axis(&self, code: u16) -> Option<Vec<i32>> {
        let mut buf = vec![0i32; self.num_slots + 1];
        buf[0] = code as i32;
        let size = (buf.len() * std::mem::size_of::<i32>()) as u32;
        let req = ioc_read(EVIOCGMTSLOTS_NR, size);
        let ret = unsafe { libc::ioctl(self.fd, req, buf.as_mut_ptr()) };
        if ret < 0 {
            log::trace!("EVIOCGMTSLOTS(code={code:#x}) failed: {}", std::io::Error::last_os_error());
            None
        } else {
            Some(buf)
        }
    }
}

impl SlotSource for EvdevSlotSource {
    fn read_slot(&self, slot: usize) -> Option<KernelSlotState> {
        if slot >= self.num_slots {
            return None;
        }
        let at = |values: &[i32]| values.get(slot + 1).copied().unwrap_or(0);

        let x = self.read_axis(ABS_MT_POSITION_X)?;
        let y = self.read_axis(ABS_MT_POSITION_Y)?;
        let tracking_id = self.read_axis(ABS_MT_TRACKING_ID)?;
        let pressure = self.read_axis(ABS_MT_PRESSURE).unwrap_or_default();
        let major = self.read_axis(ABS_MT_TOUCH_MAJOR).unwrap_or_default();
        let minor = self.read_axis(ABS_MT_TOUCH_MINOR).unwrap_or_default();

        Some(KernelSlotState {
            point: Point::new(at(&x), at(&y)),
            pressure: at(&pressure),
            major: at(&major),
            minor: at(&minor),
            active: at(&tracking_id) >= 0,
        })
    }
}
