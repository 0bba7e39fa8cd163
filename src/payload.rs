use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UCode, UStatus};

/// Serialization format tag carried alongside payload bytes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UPayloadFormat {
    #[default]
    Unspecified,
    ProtobufWrappedInAny,
    Protobuf,
    Json,
    SomeIp,
    SomeIpTlv,
    Raw,
    Text,
}

impl TryFrom<u32> for UPayloadFormat {
    type Error = UStatus;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(UPayloadFormat::Unspecified),
            1 => Ok(UPayloadFormat::ProtobufWrappedInAny),
            2 => Ok(UPayloadFormat::Protobuf),
            3 => Ok(UPayloadFormat::Json),
            4 => Ok(UPayloadFormat::SomeIp),
            5 => Ok(UPayloadFormat::SomeIpTlv),
            6 => Ok(UPayloadFormat::Raw),
            7 => Ok(UPayloadFormat::Text),
            other => Err(UStatus::new(
                UCode::OutOfRange,
                format!("invalid payload format: {other}"),
            )),
        }
    }
}

/// Serialized payload staged for inclusion in a [`UMessage`](crate::UMessage).
///
/// The bytes can be borrowed any number of times with [`UPayload::parts`],
/// but extracted by move at most once with [`UPayload::take`]. Every access
/// after a `take` fails with `FailedPrecondition`.
#[derive(Clone, Debug, Default)]
pub struct UPayload {
    inner: Option<(Bytes, UPayloadFormat)>,
}

impl UPayload {
    #[must_use]
    pub fn new(data: impl Into<Bytes>, format: UPayloadFormat) -> Self {
        Self {
            inner: Some((data.into(), format)),
        }
    }

    /// Serializes `value` as JSON payload bytes.
    ///
    /// # Errors
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value)?;
        Ok(Self::new(data, UPayloadFormat::Json))
    }

    /// # Errors
    pub fn format(&self) -> Result<UPayloadFormat> {
        self.parts().map(|(_, format)| format)
    }

    /// Borrows the payload bytes and format.
    ///
    /// # Errors
    ///
    /// Fails with `FailedPrecondition` after [`UPayload::take`] was called.
    pub fn parts(&self) -> Result<(&Bytes, UPayloadFormat)> {
        match &self.inner {
            Some((data, format)) => Ok((data, *format)),
            None => Err(Self::moved()),
        }
    }

    /// Moves the payload bytes and format out of this wrapper.
    ///
    /// # Errors
    ///
    /// Fails with `FailedPrecondition` if the payload was already taken.
    pub fn take(&mut self) -> Result<(Bytes, UPayloadFormat)> {
        self.inner.take().ok_or_else(Self::moved)
    }

    fn moved() -> UStatus {
        UStatus::new(UCode::FailedPrecondition, "payload has already been moved")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_range() {
        assert_eq!(UPayloadFormat::try_from(3).unwrap(), UPayloadFormat::Json);
        assert_eq!(UPayloadFormat::try_from(7).unwrap(), UPayloadFormat::Text);
        let status = UPayloadFormat::try_from(8).unwrap_err();
        assert_eq!(status.code, UCode::OutOfRange);
    }

    #[test]
    fn test_move_once() {
        let mut payload = UPayload::new(&b"{\"doors\":\"locked\"}"[..], UPayloadFormat::Json);

        // Borrowing does not consume.
        assert!(payload.parts().is_ok());
        assert!(payload.parts().is_ok());
        assert_eq!(payload.format().unwrap(), UPayloadFormat::Json);

        let (data, format) = payload.take().unwrap();
        assert_eq!(&data[..], b"{\"doors\":\"locked\"}");
        assert_eq!(format, UPayloadFormat::Json);

        assert_eq!(payload.take().unwrap_err().code, UCode::FailedPrecondition);
        assert_eq!(payload.parts().unwrap_err().code, UCode::FailedPrecondition);
        assert_eq!(payload.format().unwrap_err().code, UCode::FailedPrecondition);
    }

    #[test]
    fn test_json_constructor() {
        let payload = UPayload::json(&serde_json::json!({ "speed": 42 })).unwrap();
        let (data, format) = payload.parts().unwrap();
        assert_eq!(format, UPayloadFormat::Json);
        assert_eq!(&data[..], b"{\"speed\":42}");
    }
}
