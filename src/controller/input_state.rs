//! Shared input snapshot
//!
//! Holds the current axis and button vectors as immutable `Arc` snapshots in
//! watch channels. Writers always publish a complete new vector, so a reader
//! that clones the current `Arc` out sees one consistent sample and never
//! holds the channel across its own work.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::axis::AXIS_COUNT;
use super::button_map::{ButtonState, LogicalButton, BUTTON_COUNT};

pub type AxisSnapshot = Arc<[f32]>;
pub type ButtonSnapshot = Arc<[i32]>;

/// Current device axes and buttons, shared between the ingestion path and
/// any number of readers.
#[derive(Clone, Debug)]
pub struct InputState {
    axes: Arc<watch::Sender<AxisSnapshot>>,
    buttons: Arc<watch::Sender<ButtonSnapshot>>,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        let (axes, _) = watch::channel(AxisSnapshot::from(vec![0.0; AXIS_COUNT]));
        let (buttons, _) = watch::channel(ButtonSnapshot::from(vec![0; BUTTON_COUNT]));
        Self {
            axes: Arc::new(axes),
            buttons: Arc::new(buttons),
        }
    }

    /// Replaces the whole axis vector with a freshly computed one
    pub fn update_axes(&self, axes: [f32; AXIS_COUNT]) {
        self.axes.send_replace(AxisSnapshot::from(axes));
    }

    /// Publishes a copy of the button vector with one slot changed.
    ///
    /// Readers holding the previous snapshot keep it untouched. Writing the
    /// value a slot already has produces no new snapshot.
    pub fn update_button(&self, button: LogicalButton, state: ButtonState) {
        let value = state.value();
        let changed = self.buttons.send_if_modified(|current| {
            if current[button.index()] == value {
                return false;
            }
            let mut next = current.to_vec();
            next[button.index()] = value;
            *current = ButtonSnapshot::from(next);
            true
        });
        if changed {
            debug!("Button {} -> {}", button.name(), value);
        }
    }

    pub fn axes(&self) -> AxisSnapshot {
        self.axes.borrow().clone()
    }

    pub fn buttons(&self) -> ButtonSnapshot {
        self.buttons.borrow().clone()
    }

    pub fn button(&self, button: LogicalButton) -> ButtonState {
        ButtonState::from_value(self.buttons.borrow()[button.index()])
    }

    /// Change notifications for observers such as a status display
    pub fn subscribe_axes(&self) -> watch::Receiver<AxisSnapshot> {
        self.axes.subscribe()
    }

    pub fn subscribe_buttons(&self) -> watch::Receiver<ButtonSnapshot> {
        self.buttons.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_zeroed_with_fixed_lengths() {
        let state = InputState::new();
        assert_eq!(&*state.axes(), &[0.0; AXIS_COUNT]);
        assert_eq!(&*state.buttons(), &[0; BUTTON_COUNT]);
    }

    #[test]
    fn test_two_buttons_pressed() {
        let state = InputState::new();
        state.update_button(LogicalButton::A, ButtonState::Pressed);
        state.update_button(LogicalButton::B, ButtonState::Pressed);

        let buttons = state.buttons();
        assert_eq!(buttons.len(), BUTTON_COUNT);
        assert_eq!(buttons.iter().filter(|v| **v == 1).count(), 2);
        assert_eq!(buttons[LogicalButton::A.index()], 1);
        assert_eq!(buttons[LogicalButton::B.index()], 1);
    }

    #[test]
    fn test_update_button_is_idempotent() {
        let state = InputState::new();
        state.update_button(LogicalButton::Start, ButtonState::Pressed);
        let once = state.buttons();
        state.update_button(LogicalButton::Start, ButtonState::Pressed);
        let twice = state.buttons();
        assert_eq!(&*once, &*twice);
        assert_eq!(state.button(LogicalButton::Start), ButtonState::Pressed);
    }

    #[test]
    fn test_old_snapshot_is_not_mutated() {
        let state = InputState::new();
        let before = state.buttons();
        state.update_button(LogicalButton::X, ButtonState::Pressed);
        assert_eq!(before[LogicalButton::X.index()], 0);
        assert_eq!(state.buttons()[LogicalButton::X.index()], 1);

        let axes_before = state.axes();
        state.update_axes([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(&*axes_before, &[0.0; AXIS_COUNT]);
        assert_eq!(&*state.axes(), &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_release_after_press() {
        let state = InputState::new();
        state.update_button(LogicalButton::L1, ButtonState::Pressed);
        state.update_button(LogicalButton::L1, ButtonState::Released);
        assert_eq!(&*state.buttons(), &[0; BUTTON_COUNT]);
    }

    #[tokio::test]
    async fn test_subscribers_see_new_snapshot() {
        let state = InputState::new();
        let mut rx = state.subscribe_buttons();
        state.update_button(LogicalButton::Guide, ButtonState::Pressed);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow()[LogicalButton::Guide.index()], 1);
    }

    #[test]
    fn test_concurrent_writer_and_readers() {
        let state = InputState::new();
        let writer = {
            let state = state.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    let v = (i % 2) as f32;
                    state.update_axes([v; AXIS_COUNT]);
                }
            })
        };
        for _ in 0..1000 {
            let axes = state.axes();
            // every snapshot is one complete sample
            assert!(axes.iter().all(|v| *v == axes[0]));
        }
        writer.join().unwrap();
    }
}
