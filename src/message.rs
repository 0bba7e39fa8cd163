use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UCode;
use crate::payload::UPayloadFormat;
use crate::uri::UUri;

/// Message kinds defined by uProtocol.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UMessageType {
    #[default]
    Unspecified,
    Publish,
    Request,
    Response,
    Notification,
}

/// Message priority classes. RPC traffic must use CS4 or above.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum UPriority {
    Cs0,
    #[default]
    Cs1,
    Cs2,
    Cs3,
    Cs4,
    Cs5,
    Cs6,
}

/// Attribute set shared by all message kinds.
///
/// `reqid` correlates a response with its originating request: a response's
/// `reqid` equals the request's `id`. `commstatus` carries a transport-level
/// delivery status inside a response envelope.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UAttributes {
    pub id: Uuid,
    pub r#type: UMessageType,
    pub source: UUri,
    pub sink: Option<UUri>,
    pub priority: UPriority,
    #[serde(default, with = "humantime_serde")]
    pub ttl: Option<Duration>,
    pub permission_level: Option<u32>,
    pub commstatus: Option<UCode>,
    pub reqid: Option<Uuid>,
    pub token: Option<String>,
    pub payload_format: UPayloadFormat,
}

/// A uProtocol message envelope: attributes plus an optional serialized
/// payload.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UMessage {
    pub attributes: UAttributes,
    pub payload: Option<Bytes>,
}

impl UMessage {
    #[must_use]
    pub fn new(attributes: UAttributes, payload: Option<Bytes>) -> Self {
        Self {
            attributes,
            payload,
        }
    }

    #[must_use]
    pub fn is_request(&self) -> bool {
        self.attributes.r#type == UMessageType::Request
    }

    #[must_use]
    pub fn is_response(&self) -> bool {
        self.attributes.r#type == UMessageType::Response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(UPriority::Cs4 >= UPriority::Cs4);
        assert!(UPriority::Cs6 > UPriority::Cs4);
        assert!(UPriority::Cs3 < UPriority::Cs4);
        assert_eq!(UPriority::default(), UPriority::Cs1);
    }

    #[test]
    fn test_priority_serde() {
        assert_eq!(
            serde_json::to_string(&UPriority::Cs4).unwrap(),
            "\"CS4\"".to_string()
        );
        let priority: UPriority = serde_json::from_str("\"CS6\"").unwrap();
        assert_eq!(priority, UPriority::Cs6);
    }

    #[test]
    fn test_attributes_roundtrip() {
        let attributes = UAttributes {
            id: Uuid::now_v7(),
            r#type: UMessageType::Request,
            source: UUri::new("vehicle", 0x10001, 2, 0),
            sink: Some(UUri::new("vehicle", 0x20002, 1, 0x00AB)),
            priority: UPriority::Cs4,
            ttl: Some(Duration::from_millis(250)),
            payload_format: UPayloadFormat::Json,
            ..UAttributes::default()
        };

        let json = serde_json::to_string(&attributes).unwrap();
        let parsed: UAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, attributes);
    }
}
