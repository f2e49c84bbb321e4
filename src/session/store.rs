//! 令牌存储
//! 键值后端（内存/文件）与会话存储句柄；只有守卫持有写权限

use crate::error::StorageError;
use secrecy::Secret;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// 访问令牌的存储键
pub const ACCESS_TOKEN_KEY: &str = "token";
/// 刷新令牌的存储键
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// 持久化键值存储后端
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// 进程内存储（测试与嵌入场景）
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// JSON 文件存储，跨进程重启保留会话
///
/// 写入经临时文件 rename 完成。
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut entries = self.load()?;
        apply(&mut entries);
        self.persist(&entries)
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// 存储中的令牌对
#[derive(Debug, Default)]
pub struct SessionTokens {
    pub access_token: Option<Secret<String>>,
    pub refresh_token: Option<Secret<String>>,
}

/// 会话存储句柄
///
/// 读操作公开；写操作仅 crate 内可见，由 `SessionGuard` 独占使用。
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn TokenStorage>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn TokenStorage>) -> Self {
        Self { backend }
    }

    /// 读取令牌对；空字符串视为不存在
    pub fn tokens(&self) -> Result<SessionTokens, StorageError> {
        Ok(SessionTokens {
            access_token: self.read(ACCESS_TOKEN_KEY)?,
            refresh_token: self.read(REFRESH_TOKEN_KEY)?,
        })
    }

    pub fn access_token(&self) -> Result<Option<Secret<String>>, StorageError> {
        self.read(ACCESS_TOKEN_KEY)
    }

    fn read(&self, key: &str) -> Result<Option<Secret<String>>, StorageError> {
        Ok(self
            .backend
            .get(key)?
            .filter(|value| !value.is_empty())
            .map(Secret::new))
    }

    pub(crate) fn replace_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.backend.set(ACCESS_TOKEN_KEY, token)
    }

    pub(crate) fn save(&self, access_token: &str, refresh_token: &str) -> Result<(), StorageError> {
        self.backend.set(ACCESS_TOKEN_KEY, access_token)?;
        self.backend.set(REFRESH_TOKEN_KEY, refresh_token)
    }

    /// 清除两个键；两个都会尝试，返回第一个错误
    pub(crate) fn clear(&self) -> Result<(), StorageError> {
        let access = self.backend.remove(ACCESS_TOKEN_KEY);
        let refresh = self.backend.remove(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }
}
