use serde::{Deserialize, Serialize};

/// Outcome of one adapter submission.
///
/// A success never carries an error message and a failure always does; the
/// status code is absent when no HTTP exchange took place (pre-flight
/// rejections, transport failures).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub ok: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn success(status: u16) -> Self {
        Self {
            ok: true,
            status_code: Some(status),
            error: None,
        }
    }

    /// The destination answered and said no.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status_code: Some(status),
            error: Some(message.into()),
        }
    }

    /// Pre-flight validation failure; no network call was made.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status_code: None,
            error: Some(message.into()),
        }
    }

    /// Transport-level failure (timeout, DNS, connection reset), carrying the
    /// transport error's own message verbatim.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status_code: None,
            error: Some(message.into()),
        }
    }
}

/// Delivery status normalized across upstream status vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Ok,
    Fail,
}

impl DeliveryStatus {
    pub fn from_upstream(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sent" | "ok" => DeliveryStatus::Ok,
            _ => DeliveryStatus::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Ok => "ok",
            DeliveryStatus::Fail => "fail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_vocabularies_normalize() {
        assert_eq!(DeliveryStatus::from_upstream("sent"), DeliveryStatus::Ok);
        assert_eq!(DeliveryStatus::from_upstream("OK"), DeliveryStatus::Ok);
        assert_eq!(DeliveryStatus::from_upstream("failed"), DeliveryStatus::Fail);
        assert_eq!(DeliveryStatus::from_upstream("error"), DeliveryStatus::Fail);
        assert_eq!(DeliveryStatus::from_upstream(""), DeliveryStatus::Fail);
    }

    #[test]
    fn success_carries_no_error() {
        let result = DeliveryResult::success(200);
        assert!(result.ok);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error.is_none());
    }

    #[test]
    fn failures_always_carry_a_message() {
        assert!(DeliveryResult::rejected(400, "bad request").error.is_some());
        assert!(DeliveryResult::invalid("missing field").error.is_some());
        assert!(DeliveryResult::transport("timed out").error.is_some());
        assert!(DeliveryResult::invalid("missing field").status_code.is_none());
    }
}
