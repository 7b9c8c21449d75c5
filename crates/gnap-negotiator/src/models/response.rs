//! Transaction response body. Absent fields are omitted, never null.

use serde::{Deserialize, Serialize};

use crate::config::protocol::BEARER_TOKEN_TYPE;

/// Body returned from `POST /transaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    #[serde(rename = "interactionURL", default, skip_serializing_if = "Option::is_none")]
    pub interaction_url: Option<String>,
    #[serde(rename = "serverNonce", default, skip_serializing_if = "Option::is_none")]
    pub server_nonce: Option<String>,
    /// Seconds to wait before polling again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
    #[serde(rename = "userCode", default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<UserCodePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<Token>,
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<Token>,
}

/// A bearer value with its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl Token {
    #[must_use]
    pub fn bearer(value: impl Into<String>) -> Self {
        Self { value: value.into(), token_type: BEARER_TOKEN_TYPE.to_string() }
    }
}

/// Where and what to type for the device interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCodePayload {
    pub url: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_fields_are_omitted() {
        let res = TransactionResponse {
            handle: Some(Token::bearer("H")),
            ..TransactionResponse::default()
        };
        assert_eq!(
            serde_json::to_value(&res).unwrap(),
            json!({ "handle": { "value": "H", "type": "Bearer" } })
        );
    }

    #[test]
    fn test_field_names() {
        let res = TransactionResponse {
            interaction_url: Some("https://as/interact/K".into()),
            server_nonce: Some("SN".into()),
            wait: Some(30),
            user_code: Some(UserCodePayload { url: "https://as/interact/device".into(), code: "C".into() }),
            handle: Some(Token::bearer("H")),
            access_token: Some(Token::bearer("AT")),
        };
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["interactionURL"], "https://as/interact/K");
        assert_eq!(value["serverNonce"], "SN");
        assert_eq!(value["wait"], 30);
        assert_eq!(value["userCode"]["code"], "C");
        assert_eq!(value["accessToken"]["type"], "Bearer");
    }
}
