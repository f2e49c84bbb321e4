//! 身份服务 HTTP 客户端

use super::IdentityApi;
use crate::{
    config::IdentityConfig,
    error::{AppError, RefreshError},
    models::auth::{
        ApiEnvelope, ForgotPasswordRequest, LoginData, LoginRequest, RefreshData,
        RefreshTokenRequest, ResetPasswordRequest, UserInfo,
    },
    session::SessionReader,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, warn};

/// 身份服务客户端
pub struct HttpIdentityClient {
    client: Client,
    config: IdentityConfig,
}

impl HttpIdentityClient {
    /// 创建新的客户端
    pub fn new(config: IdentityConfig) -> Result<Self, AppError> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }
}

/// `messenger`/`message` of a failed response, or `fallback`
async fn failure_message(response: Response, fallback: &str) -> String {
    response
        .json::<ApiEnvelope<Value>>()
        .await
        .ok()
        .and_then(|body| body.error_text().map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

/// Server notice of a successful response; bodies are optional here
async fn notice(response: Response) -> Option<String> {
    response
        .json::<ApiEnvelope<Value>>()
        .await
        .ok()
        .and_then(|body| body.error_text().map(str::to_string))
}

#[async_trait]
impl IdentityApi for HttpIdentityClient {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let url = self.config.refresh_url();
        debug!(url = %url, "Requesting access token refresh");

        let response = self
            .client
            .post(&url)
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Refresh rejected by identity service");
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: ApiEnvelope<RefreshData> = response.json().await?;

        body.data
            .and_then(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RefreshError::Malformed("response has no data.token".to_string()))
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginData, AppError> {
        let url = self.config.login_url();
        debug!(url = %url, username = %request.username, "Sending login request");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = failure_message(response, "Login failed").await;
            warn!(status = status.as_u16(), username = %request.username, "Login rejected");
            return Err(AppError::Authentication(message));
        }

        let body: ApiEnvelope<LoginData> = response
            .json()
            .await
            .map_err(|e| AppError::Authentication(format!("Malformed login response: {}", e)))?;

        body.data
            .ok_or_else(|| AppError::Authentication("Login response has no data".to_string()))
    }

    async fn my_info(&self, session: &SessionReader) -> Result<UserInfo, AppError> {
        if session.access_token().is_none() {
            return Err(AppError::Authentication("No active session".to_string()));
        }

        let url = self.config.my_info_url();
        debug!(url = %url, "Fetching account info");

        let response = session.authorize(self.client.get(&url)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = failure_message(response, "Failed to load account info").await;
            warn!(status = status.as_u16(), "Account info request rejected");
            return Err(AppError::Authentication(message));
        }

        let body: ApiEnvelope<UserInfo> = response
            .json()
            .await
            .map_err(|e| AppError::Authentication(format!("Malformed account info response: {}", e)))?;

        body.data
            .ok_or_else(|| AppError::Authentication("Account info response has no data".to_string()))
    }

    async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<Option<String>, AppError> {
        let url = self.config.forgot_password_url();
        debug!(url = %url, username = %request.username, "Requesting password reset");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = failure_message(response, "Password reset request failed").await;
            warn!(status = status.as_u16(), username = %request.username, "Password reset request rejected");
            return Err(AppError::Authentication(message));
        }

        Ok(notice(response).await)
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<Option<String>, AppError> {
        let url = self.config.reset_password_url();
        debug!(url = %url, "Resetting password");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = failure_message(response, "Password reset failed").await;
            warn!(status = status.as_u16(), "Password reset rejected");
            return Err(AppError::Authentication(message));
        }

        Ok(notice(response).await)
    }
}
