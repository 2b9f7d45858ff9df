//! Input ingestion surface
//!
//! `InputCapture` receives key and axis events from whatever delivers device
//! input, normalizes them with the current [`DeviceConfig`] and writes the
//! result into [`InputState`]. Each entry point reports whether the event was
//! consumed; unconsumed events belong to the host's regular input handling.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::axis::{process_axis, AxisSlot, RawAxisSample, AXIS_COUNT};
use super::button_map::{self, dpad_from_hat, ButtonState};
use super::input_state::InputState;
use crate::config::DeviceConfig;

#[derive(Clone, Debug)]
pub struct InputCapture {
    config: Arc<watch::Sender<DeviceConfig>>,
    state: InputState,
}

impl InputCapture {
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_state(config, InputState::new())
    }

    pub fn with_state(config: DeviceConfig, state: InputState) -> Self {
        info!("Creating input capture with {:?}", config);
        let (config, _) = watch::channel(config);
        Self {
            config: Arc::new(config),
            state,
        }
    }

    /// Replaces the device configuration used for every following sample
    pub fn apply_config(&self, config: DeviceConfig) {
        info!("Applying device config: {:?}", config);
        self.config.send_replace(config);
    }

    pub fn config(&self) -> DeviceConfig {
        self.config.borrow().clone()
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn on_key_down(&self, code: u16) -> bool {
        self.on_key(code, ButtonState::Pressed)
    }

    pub fn on_key_up(&self, code: u16) -> bool {
        self.on_key(code, ButtonState::Released)
    }

    fn on_key(&self, code: u16, state: ButtonState) -> bool {
        match button_map::from_physical_code(code) {
            Some(button) => {
                self.state.update_button(button, state);
                true
            }
            None => {
                debug!("Key code {:#x} is not a gamepad button, forwarding", code);
                false
            }
        }
    }

    /// Normalizes a full raw sample into a new axis vector and synthesizes the
    /// D-pad buttons from the hat channels.
    pub fn on_axis_sample(&self, sample: &RawAxisSample) -> bool {
        let config = self.config();
        let mut axes = [0.0; AXIS_COUNT];
        for slot in AxisSlot::ALL {
            axes[slot.index()] =
                process_axis(sample.value(slot), config.inverted(slot), config.dead_zone);
        }
        self.state.update_axes(axes);

        for (button, state) in dpad_from_hat(sample.hat_x, sample.hat_y) {
            self.state.update_button(button, state);
        }
        true
    }
}
