use serde::{Deserialize, Serialize};

/// uProtocol status codes, as carried in `UStatus` and in the `commstatus`
/// attribute of response messages.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
}

/// Status record returned by transports and delivered through RPC completion
/// channels.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UStatus {
    pub code: UCode,
    pub message: String,
}

impl UStatus {
    #[must_use]
    pub fn new(code: UCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(code: UCode) -> Self {
        Self {
            code,
            message: String::default(),
        }
    }
}

impl std::error::Error for UStatus {}

impl From<UCode> for UStatus {
    fn from(code: UCode) -> Self {
        Self::code(code)
    }
}

impl From<serde_json::Error> for UStatus {
    fn from(value: serde_json::Error) -> Self {
        Self {
            code: UCode::InvalidArgument,
            message: value.to_string(),
        }
    }
}

impl std::fmt::Display for UStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}

pub type Result<T> = std::result::Result<T, UStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ucode_status() {
        let code = UCode::DeadlineExceeded;
        let status: UStatus = code.into();
        assert_eq!(status.to_string(), "DeadlineExceeded");

        let status = UStatus::new(UCode::InvalidArgument, "ttl must be greater than zero");
        assert_eq!(
            status.to_string(),
            "InvalidArgument: ttl must be greater than zero"
        );

        let status: UStatus = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(status.code, UCode::InvalidArgument);
    }

    #[test]
    fn test_ucode_serde() {
        let json = serde_json::to_string(&UCode::PermissionDenied).unwrap();
        assert_eq!(json, "\"PERMISSION_DENIED\"");
        let code: UCode = serde_json::from_str("\"DEADLINE_EXCEEDED\"").unwrap();
        assert_eq!(code, UCode::DeadlineExceeded);
    }
}
