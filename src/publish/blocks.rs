//! Manual override and extra block
//!
//! Both are owned by whoever edits them (typically a UI) and read by the
//! publish loop at tick time. Every edit publishes a new snapshot; the loop
//! never sees a half-applied change.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::frame::ControlVectors;
use crate::config::ExtraConfig;
use crate::controller::axis::AXIS_COUNT;
use crate::controller::button_map::BUTTON_COUNT;

fn set_slot<T: Copy>(slots: &mut [T], index: usize, value: T, what: &str) -> bool {
    match slots.get_mut(index) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => {
            warn!("{} index {} out of range ({} slots)", what, index, slots.len());
            false
        }
    }
}

/// User-driven replacement for the device axes and buttons
#[derive(Clone, Debug)]
pub struct ManualOverride {
    vectors: Arc<watch::Sender<Arc<ControlVectors>>>,
}

impl Default for ManualOverride {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualOverride {
    /// Same shape as the device vectors, all zero
    pub fn new() -> Self {
        let (vectors, _) = watch::channel(Arc::new(ControlVectors::zeroed(
            AXIS_COUNT,
            BUTTON_COUNT,
        )));
        Self {
            vectors: Arc::new(vectors),
        }
    }

    pub fn snapshot(&self) -> Arc<ControlVectors> {
        self.vectors.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ControlVectors>> {
        self.vectors.subscribe()
    }

    pub fn set_axis(&self, index: usize, value: f32) -> bool {
        self.vectors.send_if_modified(|current| {
            set_slot(&mut Arc::make_mut(current).axes, index, value, "Manual axis")
        })
    }

    pub fn set_button(&self, index: usize, value: i32) -> bool {
        self.vectors.send_if_modified(|current| {
            set_slot(&mut Arc::make_mut(current).buttons, index, value, "Manual button")
        })
    }

    pub fn toggle_button(&self, index: usize) -> bool {
        self.vectors.send_if_modified(|current| {
            let Some(value) = current.buttons.get(index).copied() else {
                warn!("Manual button index {} out of range", index);
                return false;
            };
            let next = if value == 1 { 0 } else { 1 };
            debug!("Manual button {} -> {}", index, next);
            Arc::make_mut(current).buttons[index] = next;
            true
        })
    }

    /// Zeroes every slot, keeping the lengths
    pub fn reset(&self) {
        self.vectors.send_modify(|current| {
            *current = Arc::new(ControlVectors::zeroed(current.axes.len(), current.buttons.len()));
        });
        info!("Manual override reset");
    }
}

/// Snapshot of the extra block: its vectors plus the enabled flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraSnapshot {
    pub vectors: ControlVectors,
    pub enabled: bool,
}

/// Optional auxiliary axes and buttons appended to every frame while enabled
#[derive(Clone, Debug)]
pub struct ExtraBlock {
    state: Arc<watch::Sender<Arc<ExtraSnapshot>>>,
}

impl Default for ExtraBlock {
    fn default() -> Self {
        Self::from_config(&ExtraConfig::default())
    }
}

impl ExtraBlock {
    pub fn new(axes: usize, buttons: usize, enabled: bool) -> Self {
        let (state, _) = watch::channel(Arc::new(ExtraSnapshot {
            vectors: ControlVectors::zeroed(axes, buttons),
            enabled,
        }));
        Self {
            state: Arc::new(state),
        }
    }

    pub fn from_config(config: &ExtraConfig) -> Self {
        Self::new(config.axes, config.buttons, config.enabled)
    }

    pub fn snapshot(&self) -> Arc<ExtraSnapshot> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ExtraSnapshot>> {
        self.state.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        let changed = self.state.send_if_modified(|current| {
            if current.enabled == enabled {
                return false;
            }
            Arc::make_mut(current).enabled = enabled;
            true
        });
        if changed {
            info!("Extra block {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn set_axis(&self, index: usize, value: f32) -> bool {
        self.state.send_if_modified(|current| {
            set_slot(&mut Arc::make_mut(current).vectors.axes, index, value, "Extra axis")
        })
    }

    pub fn set_button(&self, index: usize, value: i32) -> bool {
        self.state.send_if_modified(|current| {
            set_slot(&mut Arc::make_mut(current).vectors.buttons, index, value, "Extra button")
        })
    }

    pub fn toggle_button(&self, index: usize) -> bool {
        self.state.send_if_modified(|current| {
            let Some(value) = current.vectors.buttons.get(index).copied() else {
                warn!("Extra button index {} out of range", index);
                return false;
            };
            Arc::make_mut(current).vectors.buttons[index] = if value == 1 { 0 } else { 1 };
            true
        })
    }

    /// Changes the slot counts; new slots start at zero, surplus slots are dropped
    pub fn resize(&self, axes: usize, buttons: usize) {
        self.state.send_if_modified(|current| {
            if current.vectors.axes.len() == axes && current.vectors.buttons.len() == buttons {
                return false;
            }
            let next = Arc::make_mut(current);
            next.vectors.axes.resize(axes, 0.0);
            next.vectors.buttons.resize(buttons, 0);
            info!("Extra block resized to {} axes, {} buttons", axes, buttons);
            true
        });
    }
}
