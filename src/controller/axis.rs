//! Axis normalization
//!
//! Dead-zone clamping and per-axis inversion for a single raw sample, plus the
//! fixed slot layout of the primary axis vector.

use serde::{Deserialize, Serialize};

/// Number of slots in the primary axis vector.
pub const AXIS_COUNT: usize = 6;

/// Slot order of the primary axis vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisSlot {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl AxisSlot {
    pub const ALL: [AxisSlot; AXIS_COUNT] = [
        AxisSlot::LeftX,
        AxisSlot::LeftY,
        AxisSlot::RightX,
        AxisSlot::RightY,
        AxisSlot::LeftTrigger,
        AxisSlot::RightTrigger,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short label used in log lines
    pub fn label(self) -> &'static str {
        match self {
            AxisSlot::LeftX => "Lx",
            AxisSlot::LeftY => "Ly",
            AxisSlot::RightX => "Rx",
            AxisSlot::RightY => "Ry",
            AxisSlot::LeftTrigger => "LT",
            AxisSlot::RightTrigger => "RT",
        }
    }
}

/// One simultaneous reading of every raw channel the device reports.
///
/// Hat channels carry the D-pad as an analog value, conventionally -1, 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawAxisSample {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub hat_x: f32,
    pub hat_y: f32,
}

impl RawAxisSample {
    /// Raw value feeding the given primary slot
    pub fn value(&self, slot: AxisSlot) -> f32 {
        match slot {
            AxisSlot::LeftX => self.left_x,
            AxisSlot::LeftY => self.left_y,
            AxisSlot::RightX => self.right_x,
            AxisSlot::RightY => self.right_y,
            AxisSlot::LeftTrigger => self.left_trigger,
            AxisSlot::RightTrigger => self.right_trigger,
        }
    }
}

/// Applies the dead zone, then the inversion, to one raw value.
///
/// Values inside the closed band `[-dead_zone, dead_zone]` become exactly 0.0.
/// The comparison is literal: a negative `dead_zone` clamps nothing and NaN
/// passes through untouched.
pub fn process_axis(raw: f32, invert: bool, dead_zone: f32) -> f32 {
    let value = if (-dead_zone..=dead_zone).contains(&raw) {
        0.0
    } else {
        raw
    };
    if invert {
        -value
    } else {
        value
    }
}
