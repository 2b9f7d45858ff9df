//! Bridge session
//!
//! Owns the device configuration and publish parameters and wires the input
//! side to the publish loop. Settings changes go through
//! [`BridgeSession::apply_settings`]: device settings apply to the next raw
//! sample, publish parameter changes restart the loop.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::controller::capture::InputCapture;
use crate::publish::blocks::{ExtraBlock, ManualOverride};
use crate::publish::frame::SourceMode;
use crate::publish::scheduler::{PublishScheduler, SchedulerError};
use crate::publish::selector::SourceSelector;
use crate::publish::sink::PublisherSink;

pub struct BridgeSession {
    config: AppConfig,
    capture: InputCapture,
    scheduler: PublishScheduler,
}

impl BridgeSession {
    pub fn new(config: AppConfig, sink: Arc<dyn PublisherSink>) -> Self {
        let capture = InputCapture::new(config.device.clone());
        let selector = SourceSelector::new(
            capture.state().clone(),
            ManualOverride::new(),
            ExtraBlock::from_config(&config.extra),
        );
        let scheduler = PublishScheduler::new(sink, selector);
        Self {
            config,
            capture,
            scheduler,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Ingestion surface for the raw device events
    pub fn capture(&self) -> &InputCapture {
        &self.capture
    }

    pub fn selector(&self) -> &SourceSelector {
        self.scheduler.selector()
    }

    pub fn scheduler(&self) -> &PublishScheduler {
        &self.scheduler
    }

    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.scheduler.start(&self.config.publish)
    }

    pub fn set_mode(&self, mode: SourceMode) {
        self.selector().set_mode(mode);
    }

    pub fn set_extra_enabled(&self, enabled: bool) {
        self.selector().set_extra_enabled(enabled);
    }

    /// Applies a new configuration.
    ///
    /// The publish loop is restarted only when it is running and the publish
    /// parameters changed.
    pub async fn apply_settings(&mut self, config: AppConfig) -> Result<(), SchedulerError> {
        if config.device != self.config.device {
            self.capture.apply_config(config.device.clone());
        }

        if config.extra != self.config.extra {
            let extra = self.selector().extra();
            extra.resize(config.extra.axes, config.extra.buttons);
            if config.extra.enabled != self.config.extra.enabled {
                extra.set_enabled(config.extra.enabled);
            }
        }

        let publish_changed = config.publish != self.config.publish;
        self.config = config;

        if publish_changed && self.scheduler.is_running() {
            info!("Publish parameters changed, restarting publish loop");
            self.scheduler.restart(&self.config.publish).await?;
        } else {
            debug!("Settings applied without restart");
        }
        Ok(())
    }

    pub async fn shutdown(&mut self) {
        self.scheduler.stop().await;
    }
}
