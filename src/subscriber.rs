use std::sync::Arc;

use crate::callback::{ListenCallback, ListenHandle};
use crate::error::{Result, UCode, UStatus};
use crate::message::UMessage;
use crate::transport::UTransport;
use crate::uri::UUri;
use crate::validator;

/// Receives messages published to one topic, or to a wildcard topic pattern.
///
/// Dropping the subscriber deregisters its listener.
pub struct Subscriber {
    topic: UUri,
    _registration: ListenHandle,
}

impl Subscriber {
    /// Registers `callback` for messages published to `topic`.
    ///
    /// The topic may carry wildcards in any field as long as its resource id
    /// stays in the topic range. Envelopes that are not well-formed publish
    /// messages are dropped before the callback sees them.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if `topic` is not a valid subscription
    /// pattern, or with the transport's status if registration fails.
    pub fn subscribe(
        transport: Arc<dyn UTransport>,
        topic: UUri,
        callback: ListenCallback,
    ) -> Result<Self> {
        if !topic.is_subscription_pattern() {
            return Err(UStatus::new(
                UCode::InvalidArgument,
                "topic is not a valid subscription pattern",
            ));
        }
        let listener = Arc::new(move |message: UMessage| {
            if let Err(status) = validator::validate_publish(&message) {
                tracing::warn!("dropping invalid publish message: {status}");
                return;
            }
            callback(message);
        });
        let registration = transport.register_listener(&topic, None, listener)?;
        Ok(Self {
            topic,
            _registration: registration,
        })
    }

    #[must_use]
    pub fn topic(&self) -> &UUri {
        &self.topic
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
