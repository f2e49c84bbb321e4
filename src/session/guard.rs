//! Session guard: validates, refreshes or ends the held session
//!
//! Every protected page calls [`SessionGuard::ensure_session`] (usually via a
//! [`PageGate`](super::gate::PageGate)) before rendering. All failures are
//! absorbed here and turned into [`SessionStatus::Redirecting`]; no error ever
//! reaches the page.

use super::{
    reader::SessionReader,
    store::{SessionStore, SessionTokens, TokenStorage},
};
use crate::{
    auth::parse_claims,
    config::AppConfig,
    error::{AppError, RefreshError},
    identity::{HttpIdentityClient, IdentityApi},
    models::auth::{ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, UserInfo},
    navigation::Navigator,
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use validator::Validate;

/// Gate state observed by a protected page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Resolution in progress; protected content must not render
    Checking,
    Authenticated,
    /// Session ended; the user is being sent to the login entry point
    Redirecting,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Checking => "checking",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Redirecting => "redirecting",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Checking)
    }
}

/// Guard behaviour knobs, usually derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub login_path: String,
    pub logout_path: String,
    pub role_prefix: String,
    /// Upper bound for one refresh request
    pub refresh_timeout: Duration,
    /// Extra attempts for transport failures and timeouts
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            logout_path: "/".to_string(),
            role_prefix: crate::auth::DEFAULT_ROLE_PREFIX.to_string(),
            refresh_timeout: Duration::from_secs(10),
            max_retries: 0,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl GuardSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            login_path: config.session.login_path.clone(),
            logout_path: config.session.logout_path.clone(),
            role_prefix: config.session.role_prefix.clone(),
            refresh_timeout: config.identity.timeout(),
            max_retries: config.identity.max_retries,
            retry_backoff: config.identity.retry_backoff(),
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Sole writer of the session tokens
pub struct SessionGuard {
    store: SessionStore,
    identity: Arc<dyn IdentityApi>,
    navigator: Arc<dyn Navigator>,
    settings: GuardSettings,
    /// Serialises refresh, login and logout so concurrent callers share one refresh
    refresh_lock: Mutex<()>,
    clock: Clock,
}

impl SessionGuard {
    pub fn new(
        storage: Arc<dyn TokenStorage>,
        identity: Arc<dyn IdentityApi>,
        navigator: Arc<dyn Navigator>,
        settings: GuardSettings,
    ) -> Self {
        Self {
            store: SessionStore::new(storage),
            identity,
            navigator,
            settings,
            refresh_lock: Mutex::new(()),
            clock: Arc::new(Utc::now),
        }
    }

    /// Build a guard talking to the configured identity service over HTTP
    pub fn from_config(
        config: &AppConfig,
        storage: Arc<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AppError> {
        let identity = HttpIdentityClient::new(config.identity.clone())?;
        Ok(Self::new(
            storage,
            Arc::new(identity),
            navigator,
            GuardSettings::from_config(config),
        ))
    }

    /// Replace the wall clock used for expiry checks.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn settings(&self) -> &GuardSettings {
        &self.settings
    }

    /// Read-only accessor for pages, menus and outgoing API calls
    pub fn reader(&self) -> SessionReader {
        SessionReader::new(self.store.clone(), &self.settings.role_prefix)
    }

    /// Resolve the session and navigate to login when it cannot be kept.
    pub async fn ensure_session(&self) -> SessionStatus {
        let status = self.check().await;
        self.react(status);
        status
    }

    /// Resolve the session without navigating.
    ///
    /// May replace the stored access token or clear both tokens.
    pub async fn check(&self) -> SessionStatus {
        let status = self.resolve().await;
        metrics::counter!("session_checks_total", "status" => status.as_str()).increment(1);
        status
    }

    pub(crate) fn react(&self, status: SessionStatus) {
        if status == SessionStatus::Redirecting {
            info!(path = %self.settings.login_path, "Redirecting to login");
            self.navigator.redirect(&self.settings.login_path);
        }
    }

    async fn resolve(&self) -> SessionStatus {
        let seen = self.read_tokens();
        if self.holds_valid_access_token(&seen) {
            debug!("Access token valid");
            return SessionStatus::Authenticated;
        }

        let _refresh = self.refresh_lock.lock().await;

        // 等锁期间其他调用方可能已经刷新或清空了会话
        let tokens = self.read_tokens();
        if self.holds_valid_access_token(&tokens) {
            debug!("Access token installed by a concurrent refresh");
            return SessionStatus::Authenticated;
        }

        // 刷新得到的令牌不一定可解码，只要与等锁前不同就视为刚被安装
        if let Some(current) = tokens.access_token.as_ref() {
            let unchanged = seen
                .access_token
                .as_ref()
                .is_some_and(|before| before.expose_secret() == current.expose_secret());
            if !unchanged {
                debug!("Access token replaced while waiting for refresh");
                return SessionStatus::Authenticated;
            }
        }

        let Some(refresh_token) = tokens.refresh_token else {
            info!("No valid access token and no refresh token");
            self.clear_session();
            return SessionStatus::Redirecting;
        };

        match self.refresh_with_retry(refresh_token.expose_secret()).await {
            Ok(access_token) => match self.store.replace_access_token(&access_token) {
                Ok(()) => {
                    info!("Access token refreshed");
                    SessionStatus::Authenticated
                }
                Err(e) => {
                    warn!(error = %e, "Failed to store refreshed access token");
                    self.clear_session();
                    SessionStatus::Redirecting
                }
            },
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.clear_session();
                SessionStatus::Redirecting
            }
        }
    }

    async fn refresh_with_retry(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let mut attempt = 0;
        let mut backoff = self.settings.retry_backoff;

        loop {
            let request = self.identity.refresh(refresh_token);
            let result = match tokio::time::timeout(self.settings.refresh_timeout, request).await {
                Ok(result) => result,
                Err(_) => Err(RefreshError::Timeout),
            };

            match result {
                Ok(token) => {
                    metrics::counter!("session_refresh_total", "outcome" => "success").increment(1);
                    return Ok(token);
                }
                Err(e) if e.is_transient() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        error = %e,
                        ?backoff,
                        "Transient refresh failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => {
                    metrics::counter!("session_refresh_total", "outcome" => e.outcome()).increment(1);
                    return Err(e);
                }
            }
        }
    }

    /// Authenticate and store the returned token pair.
    ///
    /// Unlike the gate, this surfaces errors: the login form shows them.
    pub async fn login(&self, request: LoginRequest) -> Result<Option<UserInfo>, AppError> {
        request.validate()?;

        let data = self.identity.login(&request).await?;
        if data.token.is_empty() || data.refresh_token.is_empty() {
            return Err(AppError::Authentication(
                "Login response is missing tokens".to_string(),
            ));
        }

        let _refresh = self.refresh_lock.lock().await;
        self.store.save(&data.token, &data.refresh_token)?;

        info!(username = %request.username, "Login succeeded");
        Ok(data.user)
    }

    /// Clear both tokens and navigate to the post-logout path.
    pub async fn logout(&self) {
        {
            let _refresh = self.refresh_lock.lock().await;
            self.clear_session();
        }

        info!("Logged out");
        self.navigator.redirect(&self.settings.logout_path);
    }

    /// Server-side profile of the signed-in account.
    ///
    /// Resolves the session first, so an expired session redirects to login
    /// and returns an error instead of calling the service.
    pub async fn my_info(&self) -> Result<UserInfo, AppError> {
        if self.ensure_session().await != SessionStatus::Authenticated {
            return Err(AppError::Authentication("Session expired".to_string()));
        }

        self.identity.my_info(&self.reader()).await
    }

    /// Request a password reset link for `username`.
    pub async fn forgot_password(&self, username: &str) -> Result<Option<String>, AppError> {
        let request = ForgotPasswordRequest {
            username: username.trim().to_string(),
        };
        request.validate()?;

        let notice = self.identity.forgot_password(&request).await?;
        info!(username = %request.username, "Password reset requested");
        Ok(notice)
    }

    /// Set a new password using a mailed reset token. The session is left as is.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<Option<String>, AppError> {
        request.validate()?;

        let notice = self.identity.reset_password(&request).await?;
        info!("Password reset");
        Ok(notice)
    }

    fn read_tokens(&self) -> SessionTokens {
        self.store.tokens().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read session storage, treating as signed out");
            SessionTokens::default()
        })
    }

    fn holds_valid_access_token(&self, tokens: &SessionTokens) -> bool {
        let Some(token) = tokens.access_token.as_ref() else {
            return false;
        };

        match parse_claims(token.expose_secret()) {
            Ok(claims) => !claims.is_expired_at((self.clock)()),
            Err(e) => {
                debug!(error = %e, "Access token undecodable, treating as expired");
                false
            }
        }
    }

    fn clear_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session storage");
        }
    }
}
