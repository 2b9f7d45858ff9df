//! Frame model
//!
//! The outgoing frame is rebuilt on every tick from whichever source is
//! authoritative, optionally followed by the extra block.

use serde::{Deserialize, Serialize};

/// Which source provides the primary axes and buttons of a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceMode {
    #[default]
    Device,
    Manual,
}

/// An axis vector and a button vector owned together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlVectors {
    pub axes: Vec<f32>,
    pub buttons: Vec<i32>,
}

impl ControlVectors {
    pub fn zeroed(axes: usize, buttons: usize) -> Self {
        Self {
            axes: vec![0.0; axes],
            buttons: vec![0; buttons],
        }
    }
}

/// Axes and buttons handed to the sink for one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutgoingFrame {
    pub axes: Vec<f32>,
    pub buttons: Vec<i32>,
}

impl OutgoingFrame {
    /// Picks the primary vectors for `mode` and appends `extra` when given.
    pub fn merge(
        mode: SourceMode,
        device_axes: &[f32],
        device_buttons: &[i32],
        manual: &ControlVectors,
        extra: Option<&ControlVectors>,
    ) -> Self {
        let (axes, buttons) = match mode {
            SourceMode::Device => (device_axes, device_buttons),
            SourceMode::Manual => (manual.axes.as_slice(), manual.buttons.as_slice()),
        };

        match extra {
            Some(extra) => Self {
                axes: [axes, extra.axes.as_slice()].concat(),
                buttons: [buttons, extra.buttons.as_slice()].concat(),
            },
            None => Self {
                axes: axes.to_vec(),
                buttons: buttons.to_vec(),
            },
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} axes {:?} | {} buttons {:?}",
            self.axes.len(),
            self.axes,
            self.buttons.len(),
            self.buttons
        )
    }
}
