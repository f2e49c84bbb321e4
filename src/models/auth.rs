//! Authentication-related models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Forgot-password request; the service mails a reset link
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
}

/// Reset-password request carrying the mailed token
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "reset token is required"))]
    pub token: String,
    #[serde(rename = "newPassword")]
    #[validate(length(min = 1, message = "new password is required"))]
    pub new_password: String,
}

/// Token refresh request
#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Identity service response wrapper: `{ "data": ..., "messenger": ... }`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: Option<T>,
    #[serde(default, alias = "Messenger")]
    pub messenger: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "responseCode")]
    pub response_code: Option<i64>,
}

impl<T> ApiEnvelope<T> {
    /// Server-provided failure text, if any
    pub fn error_text(&self) -> Option<&str> {
        [self.messenger.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| !text.is_empty())
    }
}

/// Refresh response payload
#[derive(Debug, Deserialize)]
pub struct RefreshData {
    #[serde(default)]
    pub token: Option<String>,
}

/// Login response payload
#[derive(Debug, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Account returned by the identity service on login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub roles: Vec<RoleInfo>,
}
