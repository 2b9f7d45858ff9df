//! Button mapping
//!
//! Fixed lookup between physical key codes (Linux evdev numbering) and the
//! logical buttons of the outgoing button vector, plus the D-pad synthesis
//! from the two hat axes.

use serde::{Deserialize, Serialize};

/// Number of slots in the primary button vector.
pub const BUTTON_COUNT: usize = 15;

// Linux evdev key codes (input-event-codes.h), named by their gamepad aliases
pub const BTN_A: u16 = 0x130;
pub const BTN_B: u16 = 0x131;
pub const BTN_X: u16 = 0x133;
pub const BTN_Y: u16 = 0x134;
pub const BTN_TL: u16 = 0x136;
pub const BTN_TR: u16 = 0x137;
pub const BTN_SELECT: u16 = 0x13a;
pub const BTN_START: u16 = 0x13b;
pub const BTN_MODE: u16 = 0x13c;
pub const BTN_THUMBL: u16 = 0x13d;
pub const BTN_THUMBR: u16 = 0x13e;
pub const BTN_DPAD_UP: u16 = 0x220;
pub const BTN_DPAD_DOWN: u16 = 0x221;
pub const BTN_DPAD_LEFT: u16 = 0x222;
pub const BTN_DPAD_RIGHT: u16 = 0x223;

/// Logical buttons, declared in button-vector slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalButton {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    Back,
    Start,
    Guide,
    LeftStick,
    RightStick,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

impl LogicalButton {
    pub const ALL: [LogicalButton; BUTTON_COUNT] = [
        LogicalButton::A,
        LogicalButton::B,
        LogicalButton::X,
        LogicalButton::Y,
        LogicalButton::L1,
        LogicalButton::R1,
        LogicalButton::Back,
        LogicalButton::Start,
        LogicalButton::Guide,
        LogicalButton::LeftStick,
        LogicalButton::RightStick,
        LogicalButton::DPadUp,
        LogicalButton::DPadDown,
        LogicalButton::DPadLeft,
        LogicalButton::DPadRight,
    ];

    /// Slot of this button in the button vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            LogicalButton::A => "A",
            LogicalButton::B => "B",
            LogicalButton::X => "X",
            LogicalButton::Y => "Y",
            LogicalButton::L1 => "L1",
            LogicalButton::R1 => "R1",
            LogicalButton::Back => "BACK",
            LogicalButton::Start => "START",
            LogicalButton::Guide => "GUIDE",
            LogicalButton::LeftStick => "LEFT_STICK",
            LogicalButton::RightStick => "RIGHT_STICK",
            LogicalButton::DPadUp => "DPAD_UP",
            LogicalButton::DPadDown => "DPAD_DOWN",
            LogicalButton::DPadLeft => "DPAD_LEFT",
            LogicalButton::DPadRight => "DPAD_RIGHT",
        }
    }
}

// Button state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    /// Value written into the button vector (1 pressed, 0 released)
    pub fn value(self) -> i32 {
        match self {
            ButtonState::Pressed => 1,
            ButtonState::Released => 0,
        }
    }

    pub fn from_value(value: i32) -> Self {
        if value == 0 {
            ButtonState::Released
        } else {
            ButtonState::Pressed
        }
    }
}

/// Looks up the logical button for a physical key code.
///
/// `None` means the code is not a gamepad button; the caller forwards the
/// event to its regular input handling.
pub fn from_physical_code(code: u16) -> Option<LogicalButton> {
    match code {
        BTN_A => Some(LogicalButton::A),
        BTN_B => Some(LogicalButton::B),
        BTN_X => Some(LogicalButton::X),
        BTN_Y => Some(LogicalButton::Y),
        BTN_TL => Some(LogicalButton::L1),
        BTN_TR => Some(LogicalButton::R1),
        BTN_SELECT => Some(LogicalButton::Back),
        BTN_START => Some(LogicalButton::Start),
        BTN_MODE => Some(LogicalButton::Guide),
        BTN_THUMBL => Some(LogicalButton::LeftStick),
        BTN_THUMBR => Some(LogicalButton::RightStick),
        BTN_DPAD_UP => Some(LogicalButton::DPadUp),
        BTN_DPAD_DOWN => Some(LogicalButton::DPadDown),
        BTN_DPAD_LEFT => Some(LogicalButton::DPadLeft),
        BTN_DPAD_RIGHT => Some(LogicalButton::DPadRight),
        _ => None,
    }
}

/// D-pad button states synthesized from the hat axes.
///
/// Only exact -1.0 / 1.0 count as a press; any other value, including partial
/// diagonals, releases both directions of that axis.
pub fn dpad_from_hat(hat_x: f32, hat_y: f32) -> [(LogicalButton, ButtonState); 4] {
    let (left, right) = hat_pair(hat_x);
    let (up, down) = hat_pair(hat_y);
    [
        (LogicalButton::DPadLeft, left),
        (LogicalButton::DPadRight, right),
        (LogicalButton::DPadUp, up),
        (LogicalButton::DPadDown, down),
    ]
}

#[allow(clippy::float_cmp)]
fn hat_pair(value: f32) -> (ButtonState, ButtonState) {
    use ButtonState::{Pressed, Released};
    if value == -1.0 {
        (Pressed, Released)
    } else if value == 1.0 {
        (Released, Pressed)
    } else {
        (Released, Released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_of(update: &[(LogicalButton, ButtonState); 4], button: LogicalButton) -> ButtonState {
        update
            .iter()
            .find(|(b, _)| *b == button)
            .map(|(_, s)| *s)
            .unwrap()
    }

    #[test]
    fn test_slot_order() {
        assert_eq!(LogicalButton::A.index(), 0);
        assert_eq!(LogicalButton::Back.index(), 6);
        assert_eq!(LogicalButton::DPadRight.index(), BUTTON_COUNT - 1);
        for (i, button) in LogicalButton::ALL.iter().enumerate() {
            assert_eq!(LogicalButton::from_index(i), Some(*button));
        }
        assert_eq!(LogicalButton::from_index(BUTTON_COUNT), None);
    }

    #[test]
    fn test_physical_codes() {
        assert_eq!(from_physical_code(BTN_A), Some(LogicalButton::A));
        assert_eq!(from_physical_code(BTN_X), Some(LogicalButton::X));
        assert_eq!(from_physical_code(BTN_MODE), Some(LogicalButton::Guide));
        assert_eq!(from_physical_code(BTN_DPAD_LEFT), Some(LogicalButton::DPadLeft));
        // KEY_A on a keyboard
        assert_eq!(from_physical_code(30), None);
        assert_eq!(from_physical_code(0x132), None);
    }

    #[test]
    fn test_hat_x_left_and_right() {
        let left = dpad_from_hat(-1.0, 0.0);
        assert_eq!(state_of(&left, LogicalButton::DPadLeft), ButtonState::Pressed);
        assert_eq!(state_of(&left, LogicalButton::DPadRight), ButtonState::Released);

        let right = dpad_from_hat(1.0, 0.0);
        assert_eq!(state_of(&right, LogicalButton::DPadLeft), ButtonState::Released);
        assert_eq!(state_of(&right, LogicalButton::DPadRight), ButtonState::Pressed);
    }

    #[test]
    fn test_hat_partial_values_release_both() {
        for value in [0.0, 0.5, -0.5, 0.999] {
            let update = dpad_from_hat(value, value);
            for (_, state) in update {
                assert_eq!(state, ButtonState::Released);
            }
        }
    }

    #[test]
    fn test_hat_axes_are_independent() {
        let update = dpad_from_hat(1.0, -1.0);
        assert_eq!(state_of(&update, LogicalButton::DPadRight), ButtonState::Pressed);
        assert_eq!(state_of(&update, LogicalButton::DPadUp), ButtonState::Pressed);
        assert_eq!(state_of(&update, LogicalButton::DPadDown), ButtonState::Released);
    }

    #[test]
    fn test_button_state_values() {
        assert_eq!(ButtonState::Pressed.value(), 1);
        assert_eq!(ButtonState::Released.value(), 0);
        assert_eq!(ButtonState::from_value(1), ButtonState::Pressed);
        assert_eq!(ButtonState::from_value(0), ButtonState::Released);
    }
}
