use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 根地址
    pub api_base_url: String,
    /// 当前教师邮箱（草稿按邮箱隔离）
    pub faculty_email: String,
    /// 草稿存放目录
    pub draft_dir: String,
    /// 无操作自动登出（秒）
    pub inactivity_timeout_secs: u64,
    /// 自动保存间隔（秒）
    pub autosave_interval_secs: u64,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            faculty_email: String::new(),
            draft_dir: "drafts".to_string(),
            inactivity_timeout_secs: 5 * 60,
            autosave_interval_secs: 2 * 60,
            request_timeout_secs: 30,
            verbose_logging: false,
            output_log_file: "submission.log".to_string(),
        }
    }
}

impl Config {
    /// 读取 TOML 配置文件（不存在时使用默认值），再叠加环境变量
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let base = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("无法解析配置文件: {}", path.display()))?
        } else {
            Self::default()
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("QPAPER_API_BASE_URL").unwrap_or(self.api_base_url),
            faculty_email: std::env::var("QPAPER_FACULTY_EMAIL").unwrap_or(self.faculty_email),
            draft_dir: std::env::var("QPAPER_DRAFT_DIR").unwrap_or(self.draft_dir),
            inactivity_timeout_secs: env_parse("QPAPER_INACTIVITY_TIMEOUT_SECS")
                .unwrap_or(self.inactivity_timeout_secs),
            autosave_interval_secs: env_parse("QPAPER_AUTOSAVE_INTERVAL_SECS")
                .unwrap_or(self.autosave_interval_secs),
            request_timeout_secs: env_parse("QPAPER_REQUEST_TIMEOUT_SECS")
                .unwrap_or(self.request_timeout_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 读取并解析环境变量，不存在或解析失败时返回 None
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
