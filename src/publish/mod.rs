//! Publish subsystem
//!
//! Turns the current input snapshots into one outgoing frame per tick and
//! hands it to a [`PublisherSink`]:
//!
//! ```text
//! InputState ─┐
//! Manual ─────┼──► SourceSelector ──► OutgoingFrame ──► PublisherSink
//! Extra ──────┘         ▲
//!                       │ every period_ms
//!                PublishScheduler
//! ```
//!
//! - [`frame`] - frame model and the merge rule
//! - [`blocks`] - manual override and extra block state
//! - [`selector`] - per-tick source selection
//! - [`sink`] - the sink seam and a logging sink
//! - [`scheduler`] - the periodic loop and its lifecycle
//! - [`mock`] - a recording sink

pub mod blocks;
pub mod frame;
pub mod mock;
pub mod scheduler;
pub mod selector;
pub mod sink;

pub use blocks::{ExtraBlock, ExtraSnapshot, ManualOverride};
pub use frame::{ControlVectors, OutgoingFrame, SourceMode};
pub use scheduler::{PublishScheduler, SchedulerError, SchedulerStatus};
pub use selector::SourceSelector;
pub use sink::{PublisherSink, SinkError, TracingSink};
