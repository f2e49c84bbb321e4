//! Identity endpoint: token refresh, login and account self-service

pub mod client;

use crate::{
    error::{AppError, RefreshError},
    models::auth::{ForgotPasswordRequest, LoginData, LoginRequest, ResetPasswordRequest, UserInfo},
    session::SessionReader,
};
use async_trait::async_trait;

pub use client::HttpIdentityClient;

/// Remote identity operations the session guard depends on
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError>;

    /// Authenticate with username and password.
    async fn login(&self, request: &LoginRequest) -> Result<LoginData, AppError>;

    /// Profile of the account holding the session's access token.
    async fn my_info(&self, session: &SessionReader) -> Result<UserInfo, AppError>;

    /// Ask the service to mail a reset link. Returns the server's notice, if any.
    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<Option<String>, AppError>;

    /// Set a new password with a mailed reset token. Returns the server's notice, if any.
    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Option<String>, AppError>;
}
