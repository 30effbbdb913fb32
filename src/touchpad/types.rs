//! Tagged-variant state machines for the touchpad core.
//!
//! Every state machine gets an exhaustive enum here instead of
//! function-pointer dispatch: transitions are `match` arms the
//! compiler can check for completeness.

/// Integer (x, y) in device units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn delta(self, other: Point) -> (i32, i32) {
        (self.x - other.x, self.y - other.y)
    }
}

/// Lifecycle of a single tracked touch; each arm below names the
/// phase that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchState {
    /// No tracking id assigned to this slot.
    None,
    /// Tracking id assigned but pressure/size hasn't crossed the touch
    /// threshold yet (decoder / pre-process).
    Hovering,
    /// Just became a touch this frame (pre-process / decoder).
    Begin,
    /// Steady-state touch (post-process promotes Begin here).
    Update,
    /// Sequence terminator seen or pressure dropped, pending commit
    /// (decoder / pre-process).
    MaybeEnd,
    /// Committed end, pending demotion to None or Hovering
    /// (post-process).
    End,
}

impl Default for TouchState {
    fn default() -> Self {
        TouchState::None
    }
}

impl TouchState {
    pub fn is_live(self) -> bool {
        matches!(self, TouchState::Begin | TouchState::Update)
    }
}

/// Why a touch is classified as a palm. Latches in the order the
/// palm-detection rules evaluate them; pressure is special-cased as
/// unreleasable once triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmState {
    None,
    Edge,
    Typing,
    Trackpoint,
    ToolPalm,
    Pressure,
    TouchSize,
    Arbitration,
}

impl Default for PalmState {
    fn default() -> Self {
        PalmState::None
    }
}

/// Thumb classification for a touch. Only ever tightens: No and Yes
/// are terminal for the life of the touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbState {
    No,
    Maybe,
    Yes,
}

impl Default for ThumbState {
    fn default() -> Self {
        ThumbState::Maybe
    }
}

/// Pen-arbitration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationState {
    NotActive,
    IgnoreAll,
    IgnoreRect,
}

impl Default for ArbitrationState {
    fn default() -> Self {
        ArbitrationState::NotActive
    }
}

/// MSC_TIMESTAMP jump-repair state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MscTimestampState {
    ExpectFirst,
    ExpectDelay,
    Ignore,
}

impl Default for MscTimestampState {
    fn default() -> Self {
        MscTimestampState::ExpectFirst
    }
}

/// Eight-octant compass direction, used by edge-palm release direction
/// checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Octant {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Octant {
    /// Bins the vector `(dx, dy)` into one of eight 45° octants.
    /// `dy` grows downward (device/screen coordinates), so "N" is
    /// negative `dy`.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Octant> {
        if dx == 0 && dy == 0 {
            return None;
        }
        let angle = (dy as f64).atan2(dx as f64);
        let octant = ((angle / (std::f64::consts::PI / 4.0)).round() as i64).rem_euclid(8);
        Some(match octant {
            0 => Octant::E,
            1 => Octant::SE,
            2 => Octant::S,
            3 => Octant::SW,
            4 => Octant::W,
            5 => Octant::NW,
            6 => Octant::N,
            7 => Octant::NE,
            _ => unreachable!(),
        })
    }

    /// True if this direction is an allowed release direction for a
    /// touch that entered palm state from the pad's side edge.
    pub fn allowed_from_side_edge(self) -> bool {
        matches!(
            self,
            Octant::N
                | Octant::NE
                | Octant::E
                | Octant::SE
                | Octant::SW
                | Octant::W
                | Octant::NW
        )
    }

    /// True if this direction is an allowed release direction for a
    /// touch that entered palm state from the pad's top edge.
    pub fn allowed_from_top_edge(self) -> bool {
        matches!(self, Octant::S | Octant::SE | Octant::SW)
    }
}

/// `send_events_mode` knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendEventsMode {
    Enabled,
    Disabled,
    DisabledOnExternalMouse,
}

impl Default for SendEventsMode {
    fn default() -> Self {
        SendEventsMode::Enabled
    }
}

/// `scroll_method` knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollMethod {
    TwoFinger,
    Edge,
    NoScroll,
}

/// Result of a configuration-setter call: this is the
/// crate's three-way `libinput_config_status` equivalent, never a
/// Rust `Result` — invalid/unsupported values are a client bug, not
/// an exceptional control-flow event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigResult {
    Success,
    Invalid,
    Unsupported,
}

/// Which touch-begin-threshold strategy is active. At most one of
/// pressure/touch-size is ever active; the
/// fallback is used when neither axis range is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhoverStrategy {
    Pressure,
    TouchSize,
    FakeFingerFallback,
}
