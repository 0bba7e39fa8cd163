//! Shape checks for message envelopes.
//!
//! These run inside [`UTransport::send`](crate::UTransport::send) and in the
//! L2 listeners before a message is acted on. They reject with
//! `InvalidArgument` and a reason text; they never panic.

use std::time::Duration;

use crate::error::{Result, UCode, UStatus};
use crate::message::{UMessage, UMessageType, UPriority};

fn invalid(reason: &str) -> UStatus {
    UStatus::new(UCode::InvalidArgument, reason)
}

/// Checks attributes common to every message kind.
///
/// # Errors
pub fn validate_common(message: &UMessage) -> Result<()> {
    if message.attributes.id.is_nil() {
        return Err(invalid("message id is not a valid UUID"));
    }
    if let Some(ttl) = message.attributes.ttl {
        if ttl.is_zero() {
            return Err(invalid("ttl must be greater than zero"));
        }
    }
    Ok(())
}

/// Checks that a message is valid for some message kind.
///
/// # Errors
pub fn validate(message: &UMessage) -> Result<()> {
    match message.attributes.r#type {
        UMessageType::Publish => validate_publish(message),
        UMessageType::Notification => validate_notification(message),
        UMessageType::Request => validate_rpc_request(message),
        UMessageType::Response => validate_rpc_response(message),
        UMessageType::Unspecified => Err(invalid("message type is unspecified")),
    }
}

/// # Errors
pub fn validate_publish(message: &UMessage) -> Result<()> {
    validate_common(message)?;
    if message.attributes.r#type != UMessageType::Publish {
        return Err(invalid("wrong message type for publish"));
    }
    if !message.attributes.source.is_publish_topic() {
        return Err(invalid("source is not a valid publish topic"));
    }
    if message.attributes.sink.is_some() {
        return Err(invalid("publish messages must not set a sink"));
    }
    Ok(())
}

/// # Errors
pub fn validate_notification(message: &UMessage) -> Result<()> {
    validate_common(message)?;
    if message.attributes.r#type != UMessageType::Notification {
        return Err(invalid("wrong message type for notification"));
    }
    if !message.attributes.source.is_notification_source() {
        return Err(invalid("source is not a valid notification origin"));
    }
    match &message.attributes.sink {
        Some(sink) if sink.is_notification_sink() => Ok(()),
        Some(_) => Err(invalid("sink is not a valid notification target")),
        None => Err(invalid("notification messages must set a sink")),
    }
}

/// # Errors
pub fn validate_rpc_request(message: &UMessage) -> Result<()> {
    validate_common(message)?;
    if message.attributes.r#type != UMessageType::Request {
        return Err(invalid("wrong message type for rpc request"));
    }
    if !message.attributes.source.is_rpc_response() {
        return Err(invalid("source is not a valid rpc reply-to uri"));
    }
    match &message.attributes.sink {
        Some(sink) if sink.is_rpc_method() => {}
        Some(_) => return Err(invalid("sink is not a valid rpc method uri")),
        None => return Err(invalid("rpc requests must set a sink")),
    }
    if message.attributes.ttl.unwrap_or(Duration::ZERO).is_zero() {
        return Err(invalid("rpc requests must set a ttl greater than zero"));
    }
    if message.attributes.priority < UPriority::Cs4 {
        return Err(invalid("rpc requests must use priority CS4 or above"));
    }
    Ok(())
}

/// # Errors
pub fn validate_rpc_response(message: &UMessage) -> Result<()> {
    validate_common(message)?;
    if message.attributes.r#type != UMessageType::Response {
        return Err(invalid("wrong message type for rpc response"));
    }
    if !message.attributes.source.is_rpc_method() {
        return Err(invalid("source is not a valid rpc method uri"));
    }
    match &message.attributes.sink {
        Some(sink) if sink.is_rpc_response() => {}
        Some(_) => return Err(invalid("sink is not a valid rpc reply-to uri")),
        None => return Err(invalid("rpc responses must set a sink")),
    }
    match message.attributes.reqid {
        Some(reqid) if !reqid.is_nil() => {}
        _ => return Err(invalid("rpc responses must carry the request id")),
    }
    if message.attributes.priority < UPriority::Cs4 {
        return Err(invalid("rpc responses must use priority CS4 or above"));
    }
    Ok(())
}
