use std::sync::Arc;

use crate::builder::UMessageBuilder;
use crate::callback::{ListenCallback, ListenHandle};
use crate::error::Result;
use crate::message::UMessage;
use crate::payload::{UPayload, UPayloadFormat};
use crate::transport::UTransport;
use crate::uri::UUri;
use crate::validator;

/// Sends notifications from one origin topic to one target uEntity.
pub struct NotificationSource {
    transport: Arc<dyn UTransport>,
    builder: UMessageBuilder,
}

impl NotificationSource {
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for an invalid origin or target uri.
    pub fn new(
        transport: Arc<dyn UTransport>,
        source: UUri,
        sink: UUri,
        format: Option<UPayloadFormat>,
    ) -> Result<Self> {
        let mut builder = UMessageBuilder::notification(source, sink)?;
        if let Some(format) = format {
            builder = builder.with_payload_format(format);
        }
        Ok(Self { transport, builder })
    }

    /// Sends one notification, optionally carrying `payload`.
    ///
    /// # Errors
    pub fn notify(&self, payload: Option<UPayload>) -> Result<()> {
        let message = match payload {
            Some(payload) => self.builder.build_with_payload(payload)?,
            None => self.builder.build()?,
        };
        self.transport.send(&message)
    }
}

/// Receives notifications addressed to the transport's local uEntity.
///
/// Dropping the sink deregisters its listener.
pub struct NotificationSink {
    _registration: ListenHandle,
}

impl NotificationSink {
    /// Registers `callback` for notifications from sources matching
    /// `source_filter` (use [`UUri::any`] for all sources).
    ///
    /// Envelopes that are not well-formed notifications are dropped before
    /// the callback sees them.
    ///
    /// # Errors
    pub fn create(
        transport: Arc<dyn UTransport>,
        source_filter: UUri,
        callback: ListenCallback,
    ) -> Result<Self> {
        let sink = transport.local_uri().clone();
        let listener = Arc::new(move |message: UMessage| {
            if let Err(status) = validator::validate_notification(&message) {
                tracing::warn!("dropping invalid notification: {status}");
                return;
            }
            callback(message);
        });
        let registration = transport.register_listener(&source_filter, Some(&sink), listener)?;
        Ok(Self {
            _registration: registration,
        })
    }
}

impl std::fmt::Debug for NotificationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSource").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSink").finish_non_exhaustive()
    }
}
