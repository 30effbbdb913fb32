//! Per-touch analyzers, run in the fixed order the
//! process-phase orchestrator (`touchpad::process`) specifies.

pub mod hysteresis;
pub mod jump;
pub mod palm;
pub mod speed;
pub mod thumb;
pub mod wobble;
