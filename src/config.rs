//! 配置系统
//! 从默认值和环境变量加载所有配置（前缀 CONSOLE_）

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// 身份服务地址，例如 "https://api-lkdt.thanhcom.site"
    pub base_url: String,
    /// 刷新令牌路径
    pub refresh_path: String,
    /// 登录路径
    pub login_path: String,
    /// 当前账号信息路径
    pub my_info_path: String,
    /// 忘记密码路径
    pub forgot_password_path: String,
    /// 重置密码路径
    pub reset_password_path: String,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 瞬时故障的最大重试次数（0 表示不重试）
    pub max_retries: u32,
    /// 重试初始退避（毫秒），每次翻倍
    pub retry_backoff_ms: u64,
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn refresh_url(&self) -> String {
        self.endpoint(&self.refresh_path)
    }

    pub fn login_url(&self) -> String {
        self.endpoint(&self.login_path)
    }

    pub fn my_info_url(&self) -> String {
        self.endpoint(&self.my_info_path)
    }

    pub fn forgot_password_url(&self) -> String {
        self.endpoint(&self.forgot_password_path)
    }

    pub fn reset_password_url(&self) -> String {
        self.endpoint(&self.reset_password_path)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 未认证时的跳转目标
    pub login_path: String,
    /// 退出登录后的跳转目标
    pub logout_path: String,
    /// 文件存储路径（CLI 使用）
    pub storage_path: String,
    /// 角色 scope 前缀
    pub role_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty, compact
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Self::defaults(Config::builder())?.add_source(
            Environment::with_prefix("CONSOLE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("identity.base_url", "https://api-lkdt.thanhcom.site")?
            .set_default("identity.refresh_path", "/auth/refresh-token")?
            .set_default("identity.login_path", "/auth/login")?
            .set_default("identity.my_info_path", "/account/my-info")?
            .set_default("identity.forgot_password_path", "/account/forgot-password")?
            .set_default("identity.reset_password_path", "/account/reset-password")?
            .set_default("identity.timeout_secs", 10)?
            .set_default("identity.max_retries", 0)?
            .set_default("identity.retry_backoff_ms", 200)?
            .set_default("session.login_path", "/login")?
            .set_default("session.logout_path", "/")?
            .set_default("session.storage_path", ".console-session.json")?
            .set_default("session.role_prefix", crate::auth::roles::DEFAULT_ROLE_PREFIX)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证身份服务地址
        let base = url::Url::parse(&self.identity.base_url).map_err(|e| {
            ConfigError::Message(format!("Invalid identity.base_url '{}': {}", self.identity.base_url, e))
        })?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ConfigError::Message(format!(
                "identity.base_url must be http or https, got {}",
                base.scheme()
            )));
        }

        for (name, path) in [
            ("identity.refresh_path", &self.identity.refresh_path),
            ("identity.login_path", &self.identity.login_path),
            ("identity.my_info_path", &self.identity.my_info_path),
            ("identity.forgot_password_path", &self.identity.forgot_password_path),
            ("identity.reset_password_path", &self.identity.reset_password_path),
            ("session.login_path", &self.session.login_path),
            ("session.logout_path", &self.session.logout_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Message(format!("{} must start with '/'", name)));
            }
        }

        if self.identity.timeout_secs < 1 || self.identity.timeout_secs > 120 {
            return Err(ConfigError::Message(
                "identity.timeout_secs must be between 1 and 120".to_string(),
            ));
        }

        if self.identity.max_retries > 5 {
            return Err(ConfigError::Message(
                "identity.max_retries must be at most 5".to_string(),
            ));
        }

        if self.session.role_prefix.is_empty() {
            return Err(ConfigError::Message("session.role_prefix must not be empty".to_string()));
        }

        // 验证日志级别
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        // 验证日志格式
        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty, compact",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}
