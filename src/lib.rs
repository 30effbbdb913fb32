//! Core touchpad frame state machine: decodes evdev-style multi-touch
//! reports into semantic touch lifecycles, applies palm/thumb
//! classification and noise filtering, and arbitrates with paired
//! peripherals (trackpoint, keyboard, lid/tablet-mode, pen).
//!
//! The gesture/tap/button/scroll layer that consumes this crate's
//! output is out of scope here; see [`touchpad::collaborators`] for
//! the hooks it is invoked through.

pub mod touchpad;

pub use touchpad::Touchpad;
