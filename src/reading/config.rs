//! 阅读增强配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ReadingError, ReadingResult};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 标记元素
    pub const BIONIC_MARK_TAG: &str = "b";
    pub const BIONIC_MARK_CLASS: &str = "readlens-bionic";
    pub const HIGHLIGHT_MARK_TAG: &str = "mark";
    pub const HIGHLIGHT_MARK_CLASS: &str = "readlens-highlight";

    // 设置存储键
    pub const KEY_BIONIC_ENABLED: &str = "reading.bionic.enabled";
    pub const KEY_HIGHLIGHT_TARGET: &str = "reading.highlight.target";

    // 文本收集相关
    pub const MIN_CONTENT_LENGTH: usize = 1;
    pub const MAX_TRAVERSAL_DEPTH: usize = 100;

    // 跳过的元素
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "code", "pre", "noscript", "template", "textarea", "input",
        "select", "option", "button", "head", "title", "meta", "link", "base", "svg",
        "math", "canvas", "video", "audio", "embed", "object", "iframe", "frame",
        "img", "map", "area", "source", "track", "br", "hr", "wbr",
    ];

    // 阅读速度基准
    pub const LATIN_WORDS_PER_MINUTE: usize = 200;
    pub const CJK_CHARS_PER_MINUTE: usize = 300;

    // 默认助手服务设置
    pub const DEFAULT_ASSISTANT_URL: &str = "http://localhost:8787/v1/analyze";
    pub const DEFAULT_ASSISTANT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ASSISTANT_RETRY_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_MAX_PAGE_CHARS: usize = 12000;
    pub const DEFAULT_ANALYSIS_CACHE_SIZE: usize = 64;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "readlens.toml",
        ".readlens.toml",
        "~/.config/readlens/config.toml",
        "/etc/readlens/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(path).exists())
}

/// 阅读增强配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReadingConfig {
    // 收集器配置
    pub exclude_hidden: bool,
    pub min_content_length: usize,
    pub max_depth: usize,
    pub extra_skip_elements: Vec<String>,

    // 阅读统计配置
    pub latin_words_per_minute: usize,
    pub cjk_chars_per_minute: usize,

    // 助手服务配置
    pub assistant_api_url: String,
    pub assistant_api_key: Option<String>,
    pub assistant_timeout_secs: u64,
    pub assistant_max_retries: usize,
    pub assistant_retry_delay_ms: u64,
    pub assistant_max_page_chars: usize,
    pub assistant_min_importance: String,
    pub analysis_cache_size: usize,
}

impl ReadingConfig {
    /// 验证配置
    pub fn validate(&self) -> ReadingResult<()> {
        if self.max_depth == 0 {
            return Err(ReadingError::ConfigError("遍历深度不能为0".to_string()));
        }

        if self.latin_words_per_minute == 0 || self.cjk_chars_per_minute == 0 {
            return Err(ReadingError::ConfigError("阅读速度基准必须大于0".to_string()));
        }

        if self.assistant_api_url.is_empty() {
            return Err(ReadingError::ConfigError("助手服务地址不能为空".to_string()));
        }

        if !self.assistant_api_url.starts_with("http://")
            && !self.assistant_api_url.starts_with("https://")
        {
            return Err(ReadingError::ConfigError(format!(
                "助手服务地址必须是 HTTP(S) URL: {}",
                self.assistant_api_url
            )));
        }

        match self.assistant_min_importance.as_str() {
            "low" | "medium" | "high" => {}
            other => {
                return Err(ReadingError::ConfigError(format!(
                    "未知的重要性等级: {} (可选 low/medium/high)",
                    other
                )));
            }
        }

        if self.analysis_cache_size == 0 {
            return Err(ReadingError::ConfigError("分析缓存大小不能为0".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Ok(api_url) = std::env::var("READLENS_ASSISTANT_URL") {
            if !api_url.is_empty() {
                self.assistant_api_url = api_url;
                tracing::info!("环境变量覆盖助手服务地址: {}", self.assistant_api_url);
            }
        }

        if let Ok(api_key) = std::env::var("READLENS_ASSISTANT_KEY") {
            if !api_key.is_empty() {
                self.assistant_api_key = Some(api_key);
            }
        }

        if let Ok(value) = std::env::var("READLENS_MIN_CONTENT_LENGTH") {
            if let Ok(min_length) = value.parse::<usize>() {
                self.min_content_length = min_length;
            }
        }

        if let Ok(value) = std::env::var("READLENS_EXCLUDE_HIDDEN") {
            if let Ok(exclude) = value.parse::<bool>() {
                self.exclude_hidden = exclude;
            }
        }
    }

    /// 转换为Duration类型
    pub fn assistant_timeout(&self) -> Duration {
        Duration::from_secs(self.assistant_timeout_secs)
    }

    pub fn assistant_retry_delay(&self) -> Duration {
        Duration::from_millis(self.assistant_retry_delay_ms)
    }
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            exclude_hidden: true,
            min_content_length: constants::MIN_CONTENT_LENGTH,
            max_depth: constants::MAX_TRAVERSAL_DEPTH,
            extra_skip_elements: Vec::new(),

            latin_words_per_minute: constants::LATIN_WORDS_PER_MINUTE,
            cjk_chars_per_minute: constants::CJK_CHARS_PER_MINUTE,

            assistant_api_url: constants::DEFAULT_ASSISTANT_URL.to_string(),
            assistant_api_key: None,
            assistant_timeout_secs: constants::DEFAULT_ASSISTANT_TIMEOUT.as_secs(),
            assistant_max_retries: 2,
            assistant_retry_delay_ms: constants::DEFAULT_ASSISTANT_RETRY_DELAY.as_millis() as u64,
            assistant_max_page_chars: constants::DEFAULT_MAX_PAGE_CHARS,
            assistant_min_importance: "medium".to_string(),
            analysis_cache_size: constants::DEFAULT_ANALYSIS_CACHE_SIZE,
        }
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: ReadingConfig,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new() -> ReadingResult<Self> {
        let mut config = Self::load_config()?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &ReadingConfig {
        &self.config
    }

    /// 从文件加载配置
    fn load_config() -> ReadingResult<ReadingConfig> {
        // 查找配置文件
        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Ok(ReadingConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> ReadingResult<ReadingConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReadingError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        // 尝试TOML格式
        if path.ends_with(".toml") {
            toml::from_str(&content)
                .map_err(|e| ReadingError::ConfigError(format!("解析TOML配置失败: {}", e)))
        } else {
            // 尝试JSON格式
            serde_json::from_str(&content)
                .map_err(|e| ReadingError::ConfigError(format!("解析JSON配置失败: {}", e)))
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> ReadingResult<()> {
        let config = ReadingConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| ReadingError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReadingError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new().expect("无法创建默认配置管理器")
    }
}
