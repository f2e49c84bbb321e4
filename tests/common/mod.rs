//! 测试公共模块
//! 令牌签发、可记录的导航器、脚本化的身份服务以及守卫构造

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use console_session::{
    config::IdentityConfig,
    error::{AppError, RefreshError, StorageError},
    identity::{HttpIdentityClient, IdentityApi},
    models::auth::{ForgotPasswordRequest, LoginData, LoginRequest, ResetPasswordRequest, UserInfo},
    session::{
        GuardSettings, MemoryStorage, SessionGuard, SessionReader, TokenStorage, ACCESS_TOKEN_KEY,
        REFRESH_TOKEN_KEY,
    },
    Navigator,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TEST_SECRET: &[u8] = b"test-secret-key-for-testing-only-min-32-chars";

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

/// 签发 HS256 令牌
pub fn token_expiring_at(exp: i64, scope: Option<&str>) -> String {
    let claims = TestClaims {
        sub: "kho1",
        exp,
        scope,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET))
        .expect("Failed to sign test token")
}

/// 一小时后过期的令牌
pub fn valid_token(scope: Option<&str>) -> String {
    token_expiring_at(Utc::now().timestamp() + 3600, scope)
}

/// 一分钟前过期的令牌
pub fn expired_token() -> String {
    token_expiring_at(Utc::now().timestamp() - 60, None)
}

/// 记录所有跳转
#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

/// 按脚本返回刷新结果的身份服务
#[derive(Default)]
pub struct ScriptedIdentity {
    responses: Mutex<VecDeque<Result<String, RefreshError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedIdentity {
    pub fn new(responses: Vec<Result<String, RefreshError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityApi for ScriptedIdentity {
    async fn refresh(&self, _refresh_token: &str) -> Result<String, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(RefreshError::Rejected { status: 401 }))
    }

    async fn login(&self, _request: &LoginRequest) -> Result<LoginData, AppError> {
        Err(AppError::Authentication("not scripted".to_string()))
    }

    async fn my_info(&self, _session: &SessionReader) -> Result<UserInfo, AppError> {
        Err(AppError::Authentication("not scripted".to_string()))
    }

    async fn forgot_password(&self, _request: &ForgotPasswordRequest) -> Result<Option<String>, AppError> {
        Err(AppError::Authentication("not scripted".to_string()))
    }

    async fn reset_password(&self, _request: &ResetPasswordRequest) -> Result<Option<String>, AppError> {
        Err(AppError::Authentication("not scripted".to_string()))
    }
}

/// 可按需让读或写失败的存储
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStorage {
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// 绕过故障开关直接写入
    pub fn seed(&self, access_token: &str, refresh_token: &str) {
        self.inner.set(ACCESS_TOKEN_KEY, access_token).unwrap();
        self.inner.set(REFRESH_TOKEN_KEY, refresh_token).unwrap();
    }

    /// 绕过故障开关直接读取
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner.get(key).unwrap()
    }
}

impl TokenStorage for FlakyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Poisoned);
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Poisoned);
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

/// 测试守卫及其协作者
pub struct TestSession {
    pub guard: Arc<SessionGuard>,
    pub storage: Arc<MemoryStorage>,
    pub navigator: Arc<RecordingNavigator>,
}

impl TestSession {
    pub fn seed(&self, access_token: Option<&str>, refresh_token: Option<&str>) {
        if let Some(token) = access_token {
            self.storage.set(ACCESS_TOKEN_KEY, token).unwrap();
        }
        if let Some(token) = refresh_token {
            self.storage.set(REFRESH_TOKEN_KEY, token).unwrap();
        }
    }

    pub fn stored_access_token(&self) -> Option<String> {
        self.storage.get(ACCESS_TOKEN_KEY).unwrap()
    }

    pub fn stored_refresh_token(&self) -> Option<String> {
        self.storage.get(REFRESH_TOKEN_KEY).unwrap()
    }
}

pub fn test_settings() -> GuardSettings {
    GuardSettings {
        refresh_timeout: Duration::from_secs(2),
        retry_backoff: Duration::from_millis(10),
        ..GuardSettings::default()
    }
}

pub fn identity_config(base_url: &str) -> IdentityConfig {
    IdentityConfig {
        base_url: base_url.to_string(),
        refresh_path: "/auth/refresh-token".to_string(),
        login_path: "/auth/login".to_string(),
        my_info_path: "/account/my-info".to_string(),
        forgot_password_path: "/account/forgot-password".to_string(),
        reset_password_path: "/account/reset-password".to_string(),
        timeout_secs: 5,
        max_retries: 0,
        retry_backoff_ms: 10,
    }
}

pub fn session_with(identity: Arc<dyn IdentityApi>, settings: GuardSettings) -> TestSession {
    let storage = Arc::new(MemoryStorage::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = Arc::new(SessionGuard::new(
        storage.clone(),
        identity,
        navigator.clone(),
        settings,
    ));

    TestSession {
        guard,
        storage,
        navigator,
    }
}

/// 指向 wiremock 服务器的 HTTP 守卫
pub fn http_session(base_url: &str) -> TestSession {
    let client = HttpIdentityClient::new(identity_config(base_url)).expect("Failed to build client");
    session_with(Arc::new(client), test_settings())
}

/// 时钟固定在 `now` 的 HTTP 守卫
pub fn http_session_at(base_url: &str, now: DateTime<Utc>) -> TestSession {
    let client = HttpIdentityClient::new(identity_config(base_url)).expect("Failed to build client");
    let storage = Arc::new(MemoryStorage::new());
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = SessionGuard::new(storage.clone(), Arc::new(client), navigator.clone(), test_settings())
        .with_clock(move || now);

    TestSession {
        guard: Arc::new(guard),
        storage,
        navigator,
    }
}

/// 任意存储上的守卫，返回守卫和导航记录
pub fn guard_over(
    storage: Arc<dyn TokenStorage>,
    identity: Arc<dyn IdentityApi>,
) -> (Arc<SessionGuard>, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = SessionGuard::new(storage, identity, navigator.clone(), test_settings());
    (Arc::new(guard), navigator)
}
