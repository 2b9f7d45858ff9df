//! Publisher sink
//!
//! The destination of the merged frames, usually a middleware client living
//! outside this crate. The scheduler only needs these three calls and treats
//! them as fire-and-forget.

use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Failed to create publisher: {0}")]
    CreateError(String),

    #[error("Failed to publish frame: {0}")]
    PublishError(String),

    #[error("Failed to destroy publisher: {0}")]
    DestroyError(String),

    #[error("Publisher not created")]
    NotCreated,
}

/// Destination for the outgoing frames.
///
/// `publish` is called from the publish loop's task and must not block; a
/// sink that talks to slow transports is responsible for bounding the call.
pub trait PublisherSink: Send + Sync + 'static {
    fn create_publisher(&self, domain_id: i32, namespace: &str) -> Result<(), SinkError>;

    fn publish(&self, axes: &[f32], buttons: &[i32]) -> Result<(), SinkError>;

    fn destroy_publisher(&self) -> Result<(), SinkError>;
}

/// Session parameters recorded by [`TracingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSession {
    pub domain_id: i32,
    pub namespace: String,
}

/// Sink that only logs what it receives. Used when no middleware client is
/// linked into the binary.
#[derive(Debug, Default)]
pub struct TracingSink {
    session: Mutex<Option<SinkSession>>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<SinkSession> {
        self.session.lock().ok().and_then(|guard| guard.clone())
    }
}

impl PublisherSink for TracingSink {
    fn create_publisher(&self, domain_id: i32, namespace: &str) -> Result<(), SinkError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| SinkError::CreateError(e.to_string()))?;
        if let Some(previous) = session.as_ref() {
            warn!("Replacing publisher session {:?}", previous);
        }
        info!(
            "Publisher created (domain {}, namespace '{}')",
            domain_id, namespace
        );
        *session = Some(SinkSession {
            domain_id,
            namespace: namespace.to_string(),
        });
        Ok(())
    }

    fn publish(&self, axes: &[f32], buttons: &[i32]) -> Result<(), SinkError> {
        let session = self
            .session
            .lock()
            .map_err(|e| SinkError::PublishError(e.to_string()))?;
        match session.as_ref() {
            Some(session) => {
                debug!(
                    "[{}/{}] axes={:?} buttons={:?}",
                    session.domain_id, session.namespace, axes, buttons
                );
                Ok(())
            }
            None => Err(SinkError::NotCreated),
        }
    }

    fn destroy_publisher(&self) -> Result<(), SinkError> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| SinkError::DestroyError(e.to_string()))?;
        match session.take() {
            Some(previous) => {
                info!("Publisher destroyed ({:?})", previous);
                Ok(())
            }
            None => Err(SinkError::NotCreated),
        }
    }
}
