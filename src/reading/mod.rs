//! 阅读增强模块
//!
//! 提供完整的页面阅读增强功能，采用清晰的模块化架构：
//! - **segment**: 文本分段，按书写系统切分文本
//! - **collector**: 可读文本收集（遍历、过滤、统计）
//! - **bionic**: 仿生阅读转换
//! - **highlight**: 选区高亮
//! - **observer**: DOM 变更观察
//! - **controller**: 阅读控制器，装配以上组件
//! - **stats**: 页面阅读统计
//! - **storage**: 设置存储
//! - **assistant**: AI 阅读助手（需启用 `assistant` 特性）
//! - **config**: 配置管理
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use readlens::reading::{ObservedDocument, ReadingConfig, ReadingController};
//!
//! # fn main() -> readlens::reading::ReadingResult<()> {
//! // 解析页面并创建控制器
//! let html = b"<html><body><p>Example paragraph</p></body></html>";
//! let doc = ObservedDocument::from_html(html, "utf-8");
//! let mut controller = ReadingController::new(doc, ReadingConfig::default());
//!
//! // 激活并开启仿生阅读
//! controller.activate()?;
//! controller.enable_bionic()?;
//! controller.highlight_selection("Example")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// 子模块声明
// ============================================================================

/// AI 阅读助手模块 - 页面摘要与建议高亮
///
/// 调用分析服务生成页面摘要、要点和建议高亮条目
#[cfg(feature = "assistant")]
pub mod assistant;

/// 仿生阅读模块 - 词首加粗转换
///
/// 对可读文本做词首加粗，支持拉丁文与 CJK 两种策略
pub mod bionic;

/// 文本收集模块 - 遍历、过滤与收集可读文本节点
///
/// 提供惰性迭代器与一次性收集器两种形式
pub mod collector;

/// 配置管理模块 - 处理阅读增强相关的所有配置
///
/// 提供配置文件加载、环境变量覆盖、校验等功能
pub mod config;

/// 阅读控制器模块 - 装配各组件的总入口
///
/// 管理启停、仿生模式、选区高亮与增量处理
pub mod controller;

/// 错误处理模块 - 统一的错误类型和处理机制
///
/// 定义了阅读增强过程中可能出现的各种错误类型
pub mod error;

/// 选区高亮模块 - 跨节点查找并包裹目标词
///
/// 基于虚拟缓冲区定位目标词的全部出现
pub mod highlight;

/// DOM 观察模块 - 记录文档变更供增量处理
///
/// 提供观察器、可观察文档与通知抑制守卫
pub mod observer;

/// 文本分段模块 - 按书写系统切分文本
///
/// 把文本切分为拉丁、CJK 与其他三类连续区段
pub mod segment;

/// 页面统计模块 - 词数、字符数与阅读时长
pub mod stats;

/// 设置存储模块 - 键值存储与变更监听
pub mod storage;

// ============================================================================
// 核心API导出 - 主要的公共接口
// ============================================================================

/// 阅读控制器的主要组件
///
/// - `ReadingController`: 主控制器，提供完整的阅读增强功能
/// - `ControllerState`: 控制器当前状态快照
pub use controller::{ControllerState, ReadingController};

/// 配置管理相关组件
///
/// - `ReadingConfig`: 阅读增强配置结构体
/// - `ConfigManager`: 配置管理器，处理配置文件读写
/// - `constants`: 配置常量模块
pub use config::{constants, ConfigManager, ReadingConfig};

/// 错误处理相关类型
///
/// - `ReadingError`: 阅读增强错误的统一类型
/// - `ReadingResult<T>`: 阅读增强操作的结果类型
/// - `ErrorCategory`: 错误分类枚举
/// - `ErrorSeverity`: 错误严重程度枚举
pub use error::{ErrorCategory, ErrorSeverity, ReadingError, ReadingResult};

/// 文档观察相关组件
///
/// - `ObservedDocument`: 带变更通知的文档句柄
/// - `MutationObserver`: 变更观察器
/// - `MutationRecord`: 单条变更记录
/// - `SuppressGuard`: 通知抑制守卫
pub use observer::{MutationObserver, MutationRecord, ObservedDocument, SuppressGuard};

// ============================================================================
// 高级API导出 - 供高级用户和扩展开发使用
// ============================================================================

/// 文本处理组件
///
/// 这些组件提供细粒度的文本处理控制：
/// - `segment_text` / `classify_char`: 文本分段原语
/// - `ScriptClass` / `Run`: 分段结果类型
/// - `TextNodeIter`: 惰性文本节点迭代器
/// - `TextNodeCollector`: 带统计的一次性收集器
/// - `CollectorOptions` / `TraversalVerdict`: 遍历过滤配置与判定
pub use collector::{
    collect_text_nodes, CollectionStats, CollectorOptions, TextNodeCollector, TextNodeIter,
    TraversalVerdict,
};
pub use segment::{classify_char, segment_text, Run, ScriptClass};

/// 阅读转换组件
///
/// - `BionicTransformer`: 仿生阅读转换器
/// - `Highlighter`: 选区高亮器
/// - `normalize_target`: 选区文本归一化
pub use bionic::{apply_bionic, revert_bionic, BionicConfig, BionicStats, BionicTransformer};
pub use highlight::{
    clear_highlights, highlight_term, normalize_target, HighlightConfig, HighlightStats,
    Highlighter, TargetAction,
};

/// 统计与存储组件
///
/// - `PageStatistics`: 页面统计结果
/// - `StatsCollector`: 统计收集器
/// - `SettingsStore`: 设置存储
pub use stats::{collect_page_statistics, DominantScript, PageStatistics, StatsCollector};
pub use storage::{SettingsStore, StorageStats, WatchCallback};

/// 助手服务组件（需启用 `assistant` 特性）
///
/// - `AssistantClient`: 分析服务客户端
/// - `PageAnalysis` / `SuggestedHighlight`: 分析结果类型
#[cfg(feature = "assistant")]
pub use assistant::{
    select_highlight_targets, AnalysisRequest, AssistantClient, AssistantConfig, Complexity,
    Importance, PageAnalysis, SuggestedHighlight,
};

// ============================================================================
// 便利函数导出 - 简化常见操作的高级函数
// ============================================================================

/// 统计一段 HTML 的页面数据（便利函数）
///
/// 解析 HTML 后用默认选项统计可读文本。
///
/// # Examples
///
/// ```rust
/// use readlens::reading::page_statistics_from_html;
///
/// let stats = page_statistics_from_html(b"<html><body><p>two words</p></body></html>");
/// assert_eq!(stats.latin_words, 2);
/// ```
pub fn page_statistics_from_html(html: &[u8]) -> PageStatistics {
    let doc = ObservedDocument::from_html(html, "utf-8");
    collect_page_statistics(&doc.document())
}

/// 检查阅读配置文件是否存在
///
/// 在标准路径中查找配置文件，找到任意一个即返回 `true`。
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}

/// 生成示例配置文件
///
/// 在当前目录中创建 `readlens.toml`，包含所有可用的配置项。
pub fn generate_example_config() -> ReadingResult<()> {
    ConfigManager::generate_example_config("readlens.toml")?;
    println!("已生成示例配置文件: readlens.toml");
    Ok(())
}

// ============================================================================
// 模块信息和元数据
// ============================================================================

/// 模块版本信息
pub const VERSION: &str = "0.4.1";
pub const MODULE_NAME: &str = "reading";

/// 模块信息
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    pub features: Vec<String>,
}

/// 获取模块信息
pub fn get_module_info() -> ModuleInfo {
    ModuleInfo {
        name: MODULE_NAME.to_string(),
        version: VERSION.to_string(),
        features: get_enabled_features(),
    }
}

/// 获取启用的功能
fn get_enabled_features() -> Vec<String> {
    let mut features = vec![
        "text_segmentation".to_string(),
        "bionic_reading".to_string(),
        "selection_highlight".to_string(),
        "mutation_observer".to_string(),
        "page_statistics".to_string(),
        "settings_storage".to_string(),
    ];

    #[cfg(feature = "assistant")]
    features.push("ai_assistant".to_string());

    #[cfg(feature = "cli")]
    features.push("cli".to_string());

    features
}

/// 运行阅读增强模块自检
pub fn self_check() -> ReadingResult<()> {
    tracing::info!("开始阅读增强模块自检...");

    // 检查配置管理器
    let _config_manager = ConfigManager::new()?;
    tracing::debug!("✓ 配置管理器正常");

    // 检查文本分段
    let runs = segment_text("Hello 世界");
    if runs.len() != 3 {
        return Err(ReadingError::InternalError("文本分段结果异常".to_string()));
    }
    tracing::debug!("✓ 文本分段正常");

    // 检查设置存储
    let store = SettingsStore::new();
    store.set("self_check.probe", "ok");
    if store.get("self_check.probe").as_deref() != Some("ok") {
        return Err(ReadingError::InternalError("设置存储读写异常".to_string()));
    }
    tracing::debug!("✓ 设置存储正常");

    // 检查文本收集
    let doc = ObservedDocument::from_html(b"<html><body><p>probe text</p></body></html>", "utf-8");
    let nodes = collect_text_nodes(&doc.document());
    if nodes.len() != 1 {
        return Err(ReadingError::InternalError("文本收集结果异常".to_string()));
    }
    tracing::debug!("✓ 文本收集正常");

    tracing::info!("阅读增强模块自检完成，所有组件正常");
    Ok(())
}

/// 模块初始化
pub fn init() {
    tracing::info!("阅读增强模块 v{} 已加载", VERSION);
    tracing::info!("启用的功能: {:?}", get_enabled_features());
}
