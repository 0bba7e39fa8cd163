use std::time::Duration;

use uuid::Uuid;

use crate::error::{Result, UCode, UStatus};
use crate::message::{UAttributes, UMessage, UMessageType, UPriority};
use crate::payload::{UPayload, UPayloadFormat};
use crate::uri::UUri;
use crate::validator;

/// Builder for uProtocol message envelopes.
///
/// A builder is configured once with the fixed attributes of a message
/// stream (addressing, priority, ttl) and reused: every call to
/// [`UMessageBuilder::build`] or [`UMessageBuilder::build_with_payload`]
/// produces a message with a fresh UUIDv7 id.
#[derive(Clone, Debug)]
pub struct UMessageBuilder {
    attributes: UAttributes,
    expected_format: Option<UPayloadFormat>,
    fixed_id: Option<Uuid>,
}

fn invalid(reason: &str) -> UStatus {
    UStatus::new(UCode::InvalidArgument, reason)
}

impl UMessageBuilder {
    /// Starts a "publish" message to `topic`.
    ///
    /// # Errors
    pub fn publish(topic: UUri) -> Result<Self> {
        if !topic.is_publish_topic() {
            return Err(invalid("topic is not a valid publish topic"));
        }
        Ok(Self::with_type(UMessageType::Publish, topic, None, UPriority::Cs1))
    }

    /// Starts a "notification" message from `source` to `sink`.
    ///
    /// # Errors
    pub fn notification(source: UUri, sink: UUri) -> Result<Self> {
        if !source.is_notification_source() {
            return Err(invalid("source is not a valid notification origin"));
        }
        if !sink.is_notification_sink() {
            return Err(invalid("sink is not a valid notification target"));
        }
        Ok(Self::with_type(
            UMessageType::Notification,
            source,
            Some(sink),
            UPriority::Cs1,
        ))
    }

    /// Starts an RPC "request" message invoking `method`, with responses
    /// returned to `reply_to`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` for an invalid uri or a zero ttl.
    pub fn request(method: UUri, reply_to: UUri, ttl: Duration) -> Result<Self> {
        if !method.is_rpc_method() {
            return Err(invalid("method is not a valid rpc method uri"));
        }
        if !reply_to.is_rpc_response() {
            return Err(invalid("reply-to is not a valid rpc reply-to uri"));
        }
        if ttl.is_zero() {
            return Err(invalid("ttl must be greater than zero"));
        }
        let mut builder =
            Self::with_type(UMessageType::Request, reply_to, Some(method), UPriority::Cs4);
        builder.attributes.ttl = Some(ttl);
        Ok(builder)
    }

    /// Starts an RPC "response" message answering `request`.
    ///
    /// The response inherits the request's priority and ttl, swaps source
    /// and sink, and sets `reqid` to the request's id.
    ///
    /// # Errors
    pub fn response_to(request: &UMessage) -> Result<Self> {
        validator::validate_rpc_request(request)?;
        let method = request
            .attributes
            .sink
            .clone()
            .ok_or_else(|| invalid("rpc requests must set a sink"))?;
        let mut builder = Self::with_type(
            UMessageType::Response,
            method,
            Some(request.attributes.source.clone()),
            request.attributes.priority,
        );
        builder.attributes.ttl = request.attributes.ttl;
        builder.attributes.reqid = Some(request.attributes.id);
        Ok(builder)
    }

    fn with_type(
        r#type: UMessageType,
        source: UUri,
        sink: Option<UUri>,
        priority: UPriority,
    ) -> Self {
        Self {
            attributes: UAttributes {
                r#type,
                source,
                sink,
                priority,
                ..UAttributes::default()
            },
            expected_format: None,
            fixed_id: None,
        }
    }

    fn is_rpc(&self) -> bool {
        matches!(
            self.attributes.r#type,
            UMessageType::Request | UMessageType::Response
        )
    }

    /// # Errors
    ///
    /// Fails with `OutOfRange` when setting a priority below CS4 on a
    /// request or response builder.
    pub fn with_priority(mut self, priority: UPriority) -> Result<Self> {
        if self.is_rpc() && priority < UPriority::Cs4 {
            return Err(UStatus::new(
                UCode::OutOfRange,
                "rpc messages must use priority CS4 or above",
            ));
        }
        self.attributes.priority = priority;
        Ok(self)
    }

    /// # Errors
    pub fn with_ttl(mut self, ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(invalid("ttl must be greater than zero"));
        }
        self.attributes.ttl = Some(ttl);
        Ok(self)
    }

    /// Declares the payload format expected by every subsequent build call.
    ///
    /// Once set, `build()` without a payload and `build_with_payload()` with
    /// a differently-tagged payload are rejected before anything is sent.
    #[must_use]
    pub fn with_payload_format(mut self, format: UPayloadFormat) -> Self {
        self.attributes.payload_format = format;
        self.expected_format = Some(format);
        self
    }

    /// Sets the `commstatus` attribute on a response, reporting a delivery
    /// or processing failure to the requester.
    #[must_use]
    pub fn with_commstatus(mut self, code: UCode) -> Self {
        self.attributes.commstatus = Some(code);
        self
    }

    #[must_use]
    pub fn with_permission_level(mut self, level: u32) -> Self {
        self.attributes.permission_level = Some(level);
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.attributes.token = Some(token.into());
        self
    }

    /// Pins the message id instead of generating a fresh UUIDv7 per build.
    ///
    /// # Errors
    pub fn with_message_id(mut self, id: Uuid) -> Result<Self> {
        if id.is_nil() {
            return Err(invalid("message id is not a valid UUID"));
        }
        self.fixed_id = Some(id);
        Ok(self)
    }

    /// Builds a message without a payload.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if a payload format was declared, since
    /// the receiver would then expect a payload in that format.
    pub fn build(&self) -> Result<UMessage> {
        if let Some(expected) = self.expected_format {
            return Err(invalid(&format!(
                "unexpected payload format: expected {expected:?}, got no payload"
            )));
        }
        Ok(self.assemble(None, UPayloadFormat::Unspecified))
    }

    /// Builds a message carrying `payload`, consuming its bytes.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` if the payload's format differs from the
    /// declared expected format, or `FailedPrecondition` if the payload was
    /// already moved. Neither failure leaves any state behind.
    pub fn build_with_payload(&self, mut payload: UPayload) -> Result<UMessage> {
        let format = payload.format()?;
        if let Some(expected) = self.expected_format {
            if format != expected {
                return Err(invalid(&format!(
                    "unexpected payload format: expected {expected:?}, got {format:?}"
                )));
            }
        }
        let (data, format) = payload.take()?;
        Ok(self.assemble(Some(data), format))
    }

    fn assemble(&self, payload: Option<bytes::Bytes>, format: UPayloadFormat) -> UMessage {
        let mut attributes = self.attributes.clone();
        attributes.id = self.fixed_id.unwrap_or_else(Uuid::now_v7);
        attributes.payload_format = format;
        UMessage::new(attributes, payload)
    }
}
