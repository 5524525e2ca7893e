//! The `{code, message, data}` envelope every backend endpoint answers with.

use serde::{Deserialize, Serialize};

/// Response envelope. `code == 0` means success; a missing `code` counts as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code == 0
    }

    /// The payload, only when the call succeeded and carried one.
    #[must_use]
    pub fn success_data(&self) -> Option<&T> {
        if self.is_success() {
            self.data.as_ref()
        } else {
            None
        }
    }

    /// Consume the envelope, keeping the payload of a successful call.
    #[must_use]
    pub fn into_success_data(self) -> Option<T> {
        if self.is_success() { self.data } else { None }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_with_data() {
        let resp: ApiResponse<u32> =
            serde_json::from_str(r#"{"code":0,"message":"success","data":3}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.success_data(), Some(&3));
    }

    #[test]
    fn test_failure_hides_data() {
        let resp: ApiResponse<u32> =
            serde_json::from_str(r#"{"code":1,"message":"X","data":3}"#).unwrap();
        assert!(!resp.is_success());
        assert_eq!(resp.success_data(), None);
        assert_eq!(resp.message, "X");
    }

    #[test]
    fn test_message_and_data_are_optional() {
        let resp: ApiResponse<u32> = serde_json::from_str(r#"{"code":0}"#).unwrap();
        assert!(resp.message.is_empty());
        assert_eq!(resp.into_success_data(), None);
    }

    #[derive(Debug, PartialEq, Eq, Deserialize)]
    struct Token {
        value: String,
    }

    fn decode<T: serde::de::DeserializeOwned>(text: &str) -> ApiResponse<T> {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_payload_needs_no_default() {
        let resp: ApiResponse<Token> = decode(r#"{"code":0,"data":{"value":"t"}}"#);
        assert_eq!(resp.data, Some(Token { value: "t".to_owned() }));

        let empty: ApiResponse<Token> = decode(r#"{"code":1,"message":"X"}"#);
        assert_eq!(empty.data, None);
    }
}
