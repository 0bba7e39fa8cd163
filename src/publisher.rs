use std::sync::Arc;

use crate::builder::UMessageBuilder;
use crate::error::Result;
use crate::payload::{UPayload, UPayloadFormat};
use crate::transport::UTransport;
use crate::uri::UUri;

/// Publishes messages to one topic.
pub struct Publisher {
    transport: Arc<dyn UTransport>,
    builder: UMessageBuilder,
}

impl Publisher {
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if `topic` is not a valid publish topic.
    pub fn new(
        transport: Arc<dyn UTransport>,
        topic: UUri,
        format: Option<UPayloadFormat>,
    ) -> Result<Self> {
        let mut builder = UMessageBuilder::publish(topic)?;
        if let Some(format) = format {
            builder = builder.with_payload_format(format);
        }
        Ok(Self { transport, builder })
    }

    /// Builds and sends one publish message carrying `payload`.
    ///
    /// # Errors
    pub fn publish(&self, payload: UPayload) -> Result<()> {
        let message = self.builder.build_with_payload(payload)?;
        self.transport.send(&message)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").finish_non_exhaustive()
    }
}
