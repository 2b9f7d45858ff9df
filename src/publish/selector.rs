//! Source selection
//!
//! Decides per tick which source is authoritative and whether the extra
//! block is appended. Every read is a snapshot taken at call time, so a mode
//! or extra change made between ticks is picked up by the next tick.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::blocks::{ExtraBlock, ManualOverride};
use super::frame::{OutgoingFrame, SourceMode};
use crate::controller::input_state::InputState;

#[derive(Clone, Debug)]
pub struct SourceSelector {
    input: InputState,
    manual: ManualOverride,
    extra: ExtraBlock,
    mode: Arc<watch::Sender<SourceMode>>,
}

impl SourceSelector {
    pub fn new(input: InputState, manual: ManualOverride, extra: ExtraBlock) -> Self {
        let (mode, _) = watch::channel(SourceMode::default());
        Self {
            input,
            manual,
            extra,
            mode: Arc::new(mode),
        }
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn manual(&self) -> &ManualOverride {
        &self.manual
    }

    pub fn extra(&self) -> &ExtraBlock {
        &self.extra
    }

    pub fn mode(&self) -> SourceMode {
        *self.mode.borrow()
    }

    pub fn set_mode(&self, mode: SourceMode) {
        let previous = self.mode.send_replace(mode);
        if previous != mode {
            info!("Source mode {:?} -> {:?}", previous, mode);
        }
    }

    pub fn set_extra_enabled(&self, enabled: bool) {
        self.extra.set_enabled(enabled);
    }

    /// Builds the frame for the current instant
    pub fn frame(&self) -> OutgoingFrame {
        let mode = self.mode();
        let axes = self.input.axes();
        let buttons = self.input.buttons();
        let manual = self.manual.snapshot();
        let extra = self.extra.snapshot();

        OutgoingFrame::merge(
            mode,
            &axes,
            &buttons,
            &manual,
            extra.enabled.then_some(&extra.vectors),
        )
    }

    /// Index of the first extra axis and the first extra button in a frame
    pub fn extra_offsets(&self) -> (usize, usize) {
        let (axes, buttons) = match self.mode() {
            SourceMode::Device => (self.input.axes().len(), self.input.buttons().len()),
            SourceMode::Manual => {
                let manual = self.manual.snapshot();
                (manual.axes.len(), manual.buttons.len())
            }
        };
        (axes, buttons)
    }
}
