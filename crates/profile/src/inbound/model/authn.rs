use app_core::identity::VerifiedIdentity;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub auth_time: Option<i64>,
}

impl From<VerifiedIdentity> for UserResponse {
    fn from(identity: VerifiedIdentity) -> Self {
        Self {
            uid: identity.uid,
            email: identity.email,
            email_verified: identity.email_verified,
            auth_time: identity.auth_time,
        }
    }
}

// ╔════════════════════════════╗
// ║    Verify Auth             ║
// ╚════════════════════════════╝

#[derive(Serialize)]
pub struct VerifyAuthResponse {
    pub authenticated: bool,
    pub user: UserResponse,
}

// ╔════════════════════════════╗
// ║    Check Token             ║
// ╚════════════════════════════╝

#[derive(Deserialize, Default)]
pub struct CheckTokenRequest {
    pub token: Option<String>,
}

impl CheckTokenRequest {
    /// A body that is absent, not JSON, or lacks a string `token` yields an
    /// empty request.
    pub fn from_bytes(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

#[derive(Serialize)]
pub struct CheckTokenResponse {
    pub valid: bool,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_token_request_from_bytes() {
        assert_eq!(CheckTokenRequest::from_bytes(br#"{"token":"abc"}"#).token.as_deref(), Some("abc"));
        assert!(CheckTokenRequest::from_bytes(b"").token.is_none());
        assert!(CheckTokenRequest::from_bytes(b"not json").token.is_none());
        assert!(CheckTokenRequest::from_bytes(br#"{"token":42}"#).token.is_none());
        assert!(CheckTokenRequest::from_bytes(b"{}").token.is_none());
    }
}
