//! 阅读增强模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

use crate::core::ReadlensError;

/// 阅读增强错误类型
#[derive(Error, Debug, Clone)]
pub enum ReadingError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 文本收集错误
    #[error("文本收集错误: {0}")]
    CollectionError(String),

    /// 文本转换错误
    #[error("文本转换错误: {0}")]
    TransformError(String),

    /// 高亮错误
    #[error("高亮错误: {0}")]
    HighlightError(String),

    /// 观察器错误
    #[error("观察器错误: {0}")]
    ObserverError(String),

    /// 存储错误
    #[error("存储错误: {0}")]
    StorageError(String),

    /// 助手服务错误
    #[error("助手服务错误: {0}")]
    AssistantError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ReadingError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ReadingError::NetworkError(_) => true,
            ReadingError::TimeoutError(_) => true,
            ReadingError::AssistantError(_) => true,
            ReadingError::ConfigError(_) => false,
            ReadingError::CollectionError(_) => false,
            ReadingError::TransformError(_) => false,
            ReadingError::HighlightError(_) => false,
            ReadingError::ObserverError(_) => false,
            ReadingError::StorageError(_) => false,
            ReadingError::ParseError(_) => false,
            ReadingError::InvalidInput(_) => false,
            ReadingError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ReadingError::ConfigError(_) => ErrorSeverity::Critical,
            ReadingError::CollectionError(_) => ErrorSeverity::Error,
            ReadingError::TransformError(_) => ErrorSeverity::Error,
            ReadingError::HighlightError(_) => ErrorSeverity::Error,
            ReadingError::ObserverError(_) => ErrorSeverity::Warning,
            ReadingError::StorageError(_) => ErrorSeverity::Error,
            ReadingError::AssistantError(_) => ErrorSeverity::Error,
            ReadingError::NetworkError(_) => ErrorSeverity::Warning,
            ReadingError::TimeoutError(_) => ErrorSeverity::Warning,
            ReadingError::ParseError(_) => ErrorSeverity::Error,
            ReadingError::InvalidInput(_) => ErrorSeverity::Info,
            ReadingError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReadingError::ConfigError(_) => ErrorCategory::Configuration,
            ReadingError::CollectionError(_) => ErrorCategory::Collection,
            ReadingError::TransformError(_) => ErrorCategory::Transform,
            ReadingError::HighlightError(_) => ErrorCategory::Highlight,
            ReadingError::ObserverError(_) => ErrorCategory::Observer,
            ReadingError::StorageError(_) => ErrorCategory::Storage,
            ReadingError::AssistantError(_) => ErrorCategory::Service,
            ReadingError::NetworkError(_) => ErrorCategory::Network,
            ReadingError::TimeoutError(_) => ErrorCategory::Timeout,
            ReadingError::ParseError(_) => ErrorCategory::Parsing,
            ReadingError::InvalidInput(_) => ErrorCategory::Input,
            ReadingError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let current_msg = self.to_string();
        let new_msg = format!("{} (上下文: {})", current_msg, context);

        match &mut self {
            ReadingError::ConfigError(ref mut msg) => *msg = new_msg,
            ReadingError::CollectionError(ref mut msg) => *msg = new_msg,
            ReadingError::TransformError(ref mut msg) => *msg = new_msg,
            ReadingError::HighlightError(ref mut msg) => *msg = new_msg,
            ReadingError::ObserverError(ref mut msg) => *msg = new_msg,
            ReadingError::StorageError(ref mut msg) => *msg = new_msg,
            ReadingError::AssistantError(ref mut msg) => *msg = new_msg,
            ReadingError::NetworkError(ref mut msg) => *msg = new_msg,
            ReadingError::TimeoutError(ref mut msg) => *msg = new_msg,
            ReadingError::ParseError(ref mut msg) => *msg = new_msg,
            ReadingError::InvalidInput(ref mut msg) => *msg = new_msg,
            ReadingError::InternalError(ref mut msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Collection,
    Transform,
    Highlight,
    Observer,
    Storage,
    Service,
    Network,
    Timeout,
    Parsing,
    Input,
    Internal,
}

/// 从ReadlensError转换
impl From<ReadlensError> for ReadingError {
    fn from(error: ReadlensError) -> Self {
        let msg = error.to_string();

        // 根据错误消息内容判断错误类型
        if msg.contains("timeout") || msg.contains("超时") {
            ReadingError::TimeoutError(msg)
        } else if msg.contains("encoding") || msg.contains("编码") {
            ReadingError::ParseError(msg)
        } else if msg.contains("config") || msg.contains("配置") {
            ReadingError::ConfigError(msg)
        } else {
            ReadingError::InternalError(msg)
        }
    }
}

/// 转换为ReadlensError（供文档处理管线使用）
impl From<ReadingError> for ReadlensError {
    fn from(error: ReadingError) -> Self {
        ReadlensError::new(&error.to_string())
    }
}

/// 标准错误转换
impl From<std::io::Error> for ReadingError {
    fn from(error: std::io::Error) -> Self {
        ReadingError::StorageError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for ReadingError {
    fn from(error: serde_json::Error) -> Self {
        ReadingError::ParseError(format!("JSON解析错误: {}", error))
    }
}

impl From<toml::de::Error> for ReadingError {
    fn from(error: toml::de::Error) -> Self {
        ReadingError::ParseError(format!("TOML解析错误: {}", error))
    }
}

#[cfg(feature = "assistant")]
impl From<reqwest::Error> for ReadingError {
    fn from(error: reqwest::Error) -> Self {
        ReadingError::NetworkError(format!("HTTP请求错误: {}", error))
    }
}

#[cfg(feature = "assistant")]
impl From<tokio::time::error::Elapsed> for ReadingError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        ReadingError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

#[cfg(feature = "assistant")]
impl From<url::ParseError> for ReadingError {
    fn from(error: url::ParseError) -> Self {
        ReadingError::ConfigError(format!("URL解析错误: {}", error))
    }
}

/// 错误结果类型别名
pub type ReadingResult<T> = Result<T, ReadingError>;

/// 错误统计信息
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &ReadingError) {
        self.total_errors += 1;

        let category = error.category();
        *self.by_category.entry(category).or_insert(0) += 1;

        let severity = error.severity();
        *self.by_severity.entry(severity).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if severity == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 记录并返回错误
    pub fn log_error<T>(error: ReadingError) -> ReadingResult<T> {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("阅读增强信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("阅读增强警告: {}", error),
            ErrorSeverity::Error => tracing::error!("阅读增强错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("阅读增强严重错误: {}", error),
        }

        Err(error)
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> ReadingError {
        ReadingError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> ReadingError {
        ReadingError::InvalidInput(msg.to_string())
    }

    /// 创建助手服务错误
    pub fn assistant_error<T: fmt::Display>(msg: T) -> ReadingError {
        ReadingError::AssistantError(msg.to_string())
    }

    /// 创建超时错误
    pub fn timeout_error<T: fmt::Display>(msg: T) -> ReadingError {
        ReadingError::TimeoutError(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> ReadingError {
        ReadingError::InternalError(msg.to_string())
    }
}
