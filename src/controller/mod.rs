//! Controller subsystem for gamepad input handling
//!
//! Normalizes raw device input into the shared input snapshot:
//!
//! 1. [`event_collector`] - gilrs polling, raw key and axis events
//! 2. [`capture`] - ingestion surface (`on_key_down`, `on_key_up`, `on_axis_sample`)
//! 3. [`axis`] / [`button_map`] - dead zone, inversion, key lookup, D-pad synthesis
//! 4. [`input_state`] - current axis and button vectors
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► Collector ──► InputCapture ──► InputState
//!             (Raw Events)  (Normalized)     (Snapshots)
//! ```

pub mod axis;
pub mod button_map;
pub mod capture;
pub mod event_collector;
pub mod input_state;

pub use axis::{process_axis, AxisSlot, RawAxisSample, AXIS_COUNT};
pub use button_map::{ButtonState, LogicalButton, BUTTON_COUNT};
pub use capture::InputCapture;
pub use event_collector::{CollectorError, CollectorHandle};
pub use input_state::InputState;
