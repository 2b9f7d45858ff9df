//! Recording sink for tests
//!
//! Keeps every call it receives in order so lifecycle guarantees (create
//! before publish, publish before destroy) can be checked from the outside.
//! Individual calls can be made to fail. The log is never trimmed, so it
//! is meant for short test sessions only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::sink::{PublisherSink, SinkError};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Create { domain_id: i32, namespace: String },
    Publish { axes: Vec<f32>, buttons: Vec<i32> },
    Destroy,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    fail_create: AtomicBool,
    fail_publish: AtomicBool,
    fail_destroy: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn publish_count(&self) -> usize {
        self.count(|call| matches!(call, SinkCall::Publish { .. }))
    }

    pub fn create_count(&self) -> usize {
        self.count(|call| matches!(call, SinkCall::Create { .. }))
    }

    pub fn destroy_count(&self) -> usize {
        self.count(|call| matches!(call, SinkCall::Destroy))
    }

    /// Frames published so far, oldest first
    pub fn frames(&self) -> Vec<(Vec<f32>, Vec<i32>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Publish { axes, buttons } => Some((axes, buttons)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&SinkCall) -> bool) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.iter().filter(|c| pred(*c)).count())
            .unwrap_or(0)
    }

    fn record(&self, call: SinkCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl PublisherSink for RecordingSink {
    fn create_publisher(&self, domain_id: i32, namespace: &str) -> Result<(), SinkError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(SinkError::CreateError("injected failure".to_string()));
        }
        self.record(SinkCall::Create {
            domain_id,
            namespace: namespace.to_string(),
        });
        Ok(())
    }

    fn publish(&self, axes: &[f32], buttons: &[i32]) -> Result<(), SinkError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(SinkError::PublishError("injected failure".to_string()));
        }
        self.record(SinkCall::Publish {
            axes: axes.to_vec(),
            buttons: buttons.to_vec(),
        });
        Ok(())
    }

    fn destroy_publisher(&self) -> Result<(), SinkError> {
        // the call is recorded even when it fails
        self.record(SinkCall::Destroy);
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(SinkError::DestroyError("injected failure".to_string()));
        }
        Ok(())
    }
}
