use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::axis::RawAxisSample;
use super::button_map::{
    BTN_A, BTN_B, BTN_DPAD_DOWN, BTN_DPAD_LEFT, BTN_DPAD_RIGHT, BTN_DPAD_UP, BTN_MODE,
    BTN_SELECT, BTN_START, BTN_THUMBL, BTN_THUMBR, BTN_TL, BTN_TR, BTN_X, BTN_Y,
};
use super::capture::InputCapture;

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    /// Pause between two polls of an empty event queue
    pub poll_interval_ms: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Collector thread error: {0}")]
    ThreadError(String),
}

// Define collector states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,

    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    // Normalization and state updates happen behind the capture surface
    capture: InputCapture,

    // Last value of every raw channel; each change is delivered as a full sample
    sample: RawAxisSample,

    cancel: CancellationToken,
}

impl<S: CollectionState> EventCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        capture: InputCapture,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(
            gilrs,
            None,
            settings,
            capture,
            RawAxisSample::default(),
            cancel,
        ))
    }

    // Pick the gamepad to follow and transition to Collecting state
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one to appear");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!(
                    "  [{}] ID: {}, Name: {}, UUID: {:?}",
                    idx,
                    id,
                    gamepad.name(),
                    gamepad.uuid()
                );
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl EventCollector<Collecting> {
    pub fn run_collection_loop(&mut self) {
        info!("Starting Event Collector loop");
        let idle = Duration::from_millis(self.settings.poll_interval_ms);

        while !self.cancel.is_cancelled() {
            let mut handled_any = false;
            while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
                handled_any = true;
                self.handle_event(id, event);
            }
            if !handled_any {
                std::thread::sleep(idle);
            }
        }
        info!("Event Collector loop stopped");
    }

    fn handle_event(&mut self, id: GamepadId, event: EventType) {
        match event {
            EventType::Connected => {
                let name = self.gilrs.gamepad(id).name().to_string();
                info!("Controller connected: {} ({})", name, id);
                if self.active_gamepad.is_none() {
                    info!("Selected gamepad: {} ({})", name, id);
                    self.active_gamepad = Some(id);
                }
                return;
            }
            EventType::Disconnected if self.active_gamepad == Some(id) => {
                warn!("Active controller {} disconnected, releasing all input", id);
                self.active_gamepad = None;
                self.release_all();
                return;
            }
            _ => {}
        }

        if self.active_gamepad != Some(id) {
            debug!("Skipping event from non-active gamepad: {:?}", id);
            return;
        }

        match event {
            EventType::AxisChanged(axis, value, _) => {
                if apply_axis(&mut self.sample, axis, value) {
                    self.capture.on_axis_sample(&self.sample);
                } else {
                    debug!("Ignoring unsupported axis: {:?}", axis);
                }
            }
            EventType::ButtonChanged(button, value, _) => {
                // analog triggers; digital buttons arrive as pressed/released
                if apply_analog_trigger(&mut self.sample, button, value) {
                    self.capture.on_axis_sample(&self.sample);
                }
            }
            EventType::ButtonPressed(button, _) => {
                if apply_dpad_button(&mut self.sample, button, true) {
                    self.capture.on_axis_sample(&self.sample);
                    return;
                }
                match physical_code(button) {
                    Some(code) => {
                        self.capture.on_key_down(code);
                    }
                    None => debug!("Button {:?} has no key code, ignored", button),
                }
            }
            EventType::ButtonReleased(button, _) => {
                if apply_dpad_button(&mut self.sample, button, false) {
                    self.capture.on_axis_sample(&self.sample);
                    return;
                }
                match physical_code(button) {
                    Some(code) => {
                        self.capture.on_key_up(code);
                    }
                    None => debug!("Button {:?} has no key code, ignored", button),
                }
            }
            EventType::ButtonRepeated(button, _) => {
                debug!("Button repeat ignored: {:?}", button);
            }
            _ => {
                debug!("Unhandled event type: {:?}", event);
            }
        }
    }

    // Centered sticks, released triggers and buttons
    fn release_all(&mut self) {
        self.sample = RawAxisSample::default();
        self.capture.on_axis_sample(&self.sample);
        for code in KNOWN_CODES {
            self.capture.on_key_up(code);
        }
    }
}

const KNOWN_CODES: [u16; 15] = [
    BTN_A,
    BTN_B,
    BTN_X,
    BTN_Y,
    BTN_TL,
    BTN_TR,
    BTN_SELECT,
    BTN_START,
    BTN_MODE,
    BTN_THUMBL,
    BTN_THUMBR,
    BTN_DPAD_UP,
    BTN_DPAD_DOWN,
    BTN_DPAD_LEFT,
    BTN_DPAD_RIGHT,
];

/// Handle to the collector thread
pub struct CollectorHandle {
    cancel: CancellationToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CollectorHandle {
    /// Starts polling on a dedicated thread and waits until gilrs is up
    pub async fn spawn(
        settings: Option<CollectorSettings>,
        capture: InputCapture,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let token = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("gamepad-collector".to_string())
            .spawn(move || {
                let collector = match EventCollector::create(settings, capture, token) {
                    Ok(collector) => {
                        let _ = ready_tx.send(Ok(()));
                        collector
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let mut collecting = collector.initialize();
                collecting.run_collection_loop();
            })
            .map_err(|e| CollectorError::ThreadError(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => info!("Event Collector successfully started"),
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(CollectorError::ThreadError(e.to_string())),
        }

        Ok(Self {
            cancel,
            thread: Some(thread),
        })
    }

    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Event Collector thread panicked");
            }
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        self.stop_thread();
    }
}

/// Physical key code reported for a gilrs button
pub fn physical_code(button: Button) -> Option<u16> {
    match button {
        Button::South => Some(BTN_A),
        Button::East => Some(BTN_B),
        Button::West => Some(BTN_X),
        Button::North => Some(BTN_Y),
        Button::LeftTrigger => Some(BTN_TL),
        Button::RightTrigger => Some(BTN_TR),
        Button::Select => Some(BTN_SELECT),
        Button::Start => Some(BTN_START),
        Button::Mode => Some(BTN_MODE),
        Button::LeftThumb => Some(BTN_THUMBL),
        Button::RightThumb => Some(BTN_THUMBR),
        Button::DPadUp => Some(BTN_DPAD_UP),
        Button::DPadDown => Some(BTN_DPAD_DOWN),
        Button::DPadLeft => Some(BTN_DPAD_LEFT),
        Button::DPadRight => Some(BTN_DPAD_RIGHT),
        _ => None,
    }
}

/// Writes a gilrs axis value into its raw channel. Returns false for axes
/// that feed no channel.
pub fn apply_axis(sample: &mut RawAxisSample, axis: Axis, value: f32) -> bool {
    match axis {
        Axis::LeftStickX => sample.left_x = value,
        Axis::LeftStickY => sample.left_y = value,
        Axis::RightStickX => sample.right_x = value,
        Axis::RightStickY => sample.right_y = value,
        Axis::LeftZ => sample.left_trigger = value,
        Axis::RightZ => sample.right_trigger = value,
        Axis::DPadX => sample.hat_x = value,
        // gilrs reports up as positive, the hat convention is up = -1
        Axis::DPadY => sample.hat_y = -value,
        _ => return false,
    }
    true
}

/// Writes a D-pad button into the hat channels, so the hat stays the only
/// source of D-pad state. Returns false for non D-pad buttons.
///
/// A release only centers the hat if it still points that way.
#[allow(clippy::float_cmp)]
pub fn apply_dpad_button(sample: &mut RawAxisSample, button: Button, pressed: bool) -> bool {
    let (channel, direction) = match button {
        Button::DPadUp => (&mut sample.hat_y, -1.0),
        Button::DPadDown => (&mut sample.hat_y, 1.0),
        Button::DPadLeft => (&mut sample.hat_x, -1.0),
        Button::DPadRight => (&mut sample.hat_x, 1.0),
        _ => return false,
    };
    if pressed {
        *channel = direction;
    } else if *channel == direction {
        *channel = 0.0;
    }
    true
}

fn apply_analog_trigger(sample: &mut RawAxisSample, button: Button, value: f32) -> bool {
    match button {
        Button::LeftTrigger2 => sample.left_trigger = value,
        Button::RightTrigger2 => sample.right_trigger = value,
        _ => return false,
    }
    true
}
