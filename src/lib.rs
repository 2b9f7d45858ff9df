//! Gamepad-to-middleware bridge
//!
//! Normalizes raw gamepad input (dead zone, inversion, D-pad synthesis) into a
//! shared snapshot and publishes a merged axis/button frame on a fixed period
//! to a pluggable [`publish::PublisherSink`].

pub mod config;
pub mod controller;
pub mod publish;
pub mod session;

pub use config::{AppConfig, DeviceConfig, ExtraConfig, PublishParams};
pub use session::BridgeSession;
