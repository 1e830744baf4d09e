//! 持久化键值存储 - 基础设施层
//!
//! 只提供 get / set / remove 能力，不认识草稿结构。
//! 同一个键的并发写入以最后一次为准，没有任何跨会话的协调。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 持久化键值存储
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
    /// 键不存在时也返回 Ok
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// 基于目录的存储，每个键一个 JSON 文件
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 键中的邮箱等字符不一定能直接做文件名
    fn path_for(&self, key: &str) -> PathBuf {
        static UNSAFE: OnceLock<Regex> = OnceLock::new();
        let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._@-]").expect("valid regex"));
        self.dir.join(format!("{}.json", re.replace_all(key, "_")))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage_read_failed(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::storage_write_failed(key, e))?;

        // 先写临时文件再改名，避免写到一半留下残缺记录
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .await
            .map_err(|e| AppError::storage_write_failed(key, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::storage_write_failed(key, e))?;

        debug!("已写入 {} ({} 字节)", path.display(), value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage_delete_failed(key, e)),
        }
    }
}

/// 内存存储，用于嵌入式场景和测试
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // 中毒只说明别的线程 panic 了，数据本身仍可用
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}
