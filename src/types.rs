//! Wire types for the portal auth endpoints, plus handler outcome types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend-owned user snapshot.
///
/// Treated as opaque: replaced wholesale on login/validation, never mutated
/// field-by-field. Unknown backend fields survive a round trip via `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response from POST /auth/login and POST /auth/signup.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Response from POST /auth/validate-token.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Body for POST /auth/signup.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by_code: Option<String>,
}

/// Result of a login, registration, or portal-token validation.
///
/// Handlers resolve with this value on every path; they never surface an
/// error to the caller.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub success: bool,
    /// Display-ready failure message when `success` is false
    pub message: Option<String>,
    /// True when the failure was connectivity/5xx rather than a rejection
    pub is_network_error: bool,
    pub user: Option<UserSummary>,
}

impl LoginOutcome {
    pub(crate) fn succeeded(user: UserSummary) -> Self {
        Self {
            success: true,
            message: None,
            is_network_error: false,
            user: Some(user),
        }
    }

    pub(crate) fn failed(message: impl Into<String>, is_network_error: bool) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            is_network_error,
            user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_summary_keeps_unknown_fields() {
        let raw = json!({
            "id": 7,
            "username": "bob",
            "display_name": "Bob",
            "role": "admin",
            "referral_code": "BOB7",
            "wallet_balance": "12.50",
            "vip_tier": 2
        });

        let user: UserSummary = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.extra.get("vip_tier"), Some(&json!(2)));

        // Round trip preserves the whole snapshot
        let back = serde_json::to_value(&user).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_auth_response_missing_success_is_false() {
        let resp: AuthResponse = serde_json::from_value(json!({
            "message": "maintenance"
        }))
        .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("maintenance"));
        assert!(resp.access_token.is_none());
    }

    #[test]
    fn test_register_request_omits_absent_referral() {
        let body = serde_json::to_value(RegisterRequest {
            username: "alice".into(),
            password: "pw".into(),
            display_name: "Alice".into(),
            referred_by_code: None,
        })
        .unwrap();
        assert!(body.get("referred_by_code").is_none());
    }
}
