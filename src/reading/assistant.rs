//! AI 阅读助手模块
//!
//! 将页面可读文本发送到分析服务，取回摘要、要点和建议高亮。
//! 支持超时控制、指数退避重试以及基于内容哈希的结果缓存。

use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::time::Duration;

use lru::LruCache;
use markup5ever_rcdom::Handle;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::parsers::html::dom::get_node_text;
use crate::utils::text::{collapse_whitespace, truncate_chars};

use super::collector::{CollectorOptions, TextNodeIter};
use super::config::ReadingConfig;
use super::error::{helpers, ErrorStats, ReadingResult};
use super::stats::{DominantScript, StatsCollector};

// ====== 协议类型 ======

/// 发往分析服务的请求体
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// 分析服务返回的页面解读
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub suggested_highlights: Vec<SuggestedHighlight>,
    #[serde(default)]
    pub reading_time: Option<u32>,
    #[serde(default)]
    pub complexity: Complexity,
}

/// 服务建议的高亮条目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestedHighlight {
    pub text: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub importance: Importance,
}

/// 高亮重要程度，从低到高排序
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

impl Importance {
    /// 从配置标签解析
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(Importance::Low),
            "medium" => Some(Importance::Medium),
            "high" => Some(Importance::High),
            _ => None,
        }
    }
}

/// 文本复杂程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

// ====== 配置 ======

/// 助手客户端配置
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub max_page_chars: usize,
    pub min_importance: Importance,
}

impl AssistantConfig {
    /// 从阅读配置构建
    pub fn from_config(config: &ReadingConfig) -> Self {
        Self {
            api_url: config.assistant_api_url.clone(),
            api_key: config.assistant_api_key.clone(),
            timeout: config.assistant_timeout(),
            max_retries: config.assistant_max_retries,
            retry_delay: config.assistant_retry_delay(),
            max_page_chars: config.assistant_max_page_chars,
            min_importance: Importance::from_label(&config.assistant_min_importance)
                .unwrap_or_default(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self::from_config(&ReadingConfig::default())
    }
}

// ====== 文本提取 ======

/// 提取页面可读文本用于分析
///
/// 逐节点收集、压缩空白后按行拼接，超出预算的部分截断。
pub fn extract_page_text(root: &Handle, options: &CollectorOptions, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for node in TextNodeIter::new(root.clone(), options.clone()) {
        if let Some(text) = get_node_text(&node) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(collapse_whitespace(trimmed));
            }
        }
    }

    let joined = parts.join("\n");
    truncate_chars(&joined, max_chars).to_string()
}

/// 页面内容哈希，作为缓存键
pub fn content_key(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

// ====== 响应解析 ======

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("代码块正则表达式编译失败")
    })
}

/// 剥离模型输出外层的 Markdown 代码块
pub fn clean_model_output(raw: &str) -> &str {
    if let Some(captures) = fence_regex().captures(raw) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str();
        }
    }
    raw.trim()
}

/// 解析分析服务的响应体
pub fn parse_analysis_response(raw: &str) -> ReadingResult<PageAnalysis> {
    let cleaned = clean_model_output(raw);
    let analysis: PageAnalysis = serde_json::from_str(cleaned)?;
    Ok(analysis)
}

/// 按最低重要程度筛选建议高亮
pub fn select_highlight_targets(analysis: &PageAnalysis, min_importance: Importance) -> Vec<&str> {
    analysis
        .suggested_highlights
        .iter()
        .filter(|suggestion| suggestion.importance >= min_importance)
        .map(|suggestion| suggestion.text.trim())
        .filter(|text| !text.is_empty())
        .collect()
}

// ====== 结果缓存 ======

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct AnalysisCacheStats {
    pub hits: usize,
    pub misses: usize,
    pub insertions: usize,
}

impl AnalysisCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 按内容哈希缓存的分析结果
pub struct AnalysisCache {
    entries: LruCache<String, PageAnalysis>,
    stats: AnalysisCacheStats,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: AnalysisCacheStats::default(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<PageAnalysis> {
        match self.entries.get(key) {
            Some(analysis) => {
                self.stats.hits += 1;
                Some(analysis.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: String, analysis: PageAnalysis) {
        self.stats.insertions += 1;
        self.entries.put(key, analysis);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> &AnalysisCacheStats {
        &self.stats
    }
}

// ====== 客户端 ======

/// 客户端运行统计
#[derive(Debug, Clone, Default)]
pub struct AssistantStats {
    pub requests_sent: usize,
    pub retries: usize,
    pub cache_hits: usize,
    pub analyses_completed: usize,
}

/// 分析服务客户端
pub struct AssistantClient {
    http: reqwest::Client,
    config: AssistantConfig,
    collector: CollectorOptions,
    cache: AnalysisCache,
    stats: AssistantStats,
    errors: ErrorStats,
}

impl AssistantClient {
    pub fn new(config: AssistantConfig, cache_size: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            collector: CollectorOptions::default(),
            cache: AnalysisCache::new(cache_size),
            stats: AssistantStats::default(),
            errors: ErrorStats::default(),
        }
    }

    /// 从阅读配置构建客户端
    pub fn from_reading_config(config: &ReadingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: AssistantConfig::from_config(config),
            collector: CollectorOptions::from_config(config),
            cache: AnalysisCache::new(config.analysis_cache_size),
            stats: AssistantStats::default(),
            errors: ErrorStats::default(),
        }
    }

    /// 分析页面内容
    ///
    /// 先提取可读文本并查询缓存，未命中时才请求服务。
    pub async fn analyze_page(&mut self, root: &Handle) -> ReadingResult<PageAnalysis> {
        let text = extract_page_text(root, &self.collector, self.config.max_page_chars);
        if text.trim().is_empty() {
            return Err(helpers::validation_error("页面没有可供分析的文本"));
        }

        let language = self.detect_language(root);
        self.analyze_text(&text, language).await
    }

    /// 分析一段已提取的文本
    pub async fn analyze_text(
        &mut self,
        text: &str,
        language: Option<String>,
    ) -> ReadingResult<PageAnalysis> {
        let key = content_key(text);
        if let Some(hit) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            debug!("分析结果缓存命中: {}", truncate_chars(&key, 12));
            return Ok(hit);
        }

        let request = AnalysisRequest {
            text: text.to_string(),
            language,
        };
        let analysis = self.request_with_retry(&request).await?;

        self.cache.put(key, analysis.clone());
        self.stats.analyses_completed += 1;
        info!(
            "页面分析完成: {} 个要点, {} 条建议高亮",
            analysis.key_points.len(),
            analysis.suggested_highlights.len()
        );
        Ok(analysis)
    }

    /// 带指数退避的请求循环
    async fn request_with_retry(&mut self, request: &AnalysisRequest) -> ReadingResult<PageAnalysis> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.send_once(request).await {
                Ok(analysis) => return Ok(analysis),
                Err(error) => {
                    self.errors.record_error(&error);
                    if attempt < self.config.max_retries && error.is_retryable() {
                        let delay = self.config.retry_delay * 2_u32.pow(attempt as u32);
                        warn!(
                            "分析请求失败 (第 {} 次尝试), {:?} 后重试: {}",
                            attempt + 1,
                            delay,
                            error
                        );
                        tokio::time::sleep(delay).await;
                        self.stats.retries += 1;
                        last_error = Some(error);
                    } else {
                        return Err(error);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| helpers::internal_error("重试循环未产生结果")))
    }

    async fn send_once(&mut self, request: &AnalysisRequest) -> ReadingResult<PageAnalysis> {
        self.stats.requests_sent += 1;

        let mut builder = self.http.post(&self.config.api_url).json(request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let (status, body) = tokio::time::timeout(self.config.timeout, async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .await??;

        if !status.is_success() {
            return Err(helpers::assistant_error(format!(
                "服务端返回 {}: {}",
                status,
                truncate_chars(&body, 200)
            )));
        }

        parse_analysis_response(&body)
    }

    /// 根据主导书写系统推断语言提示
    fn detect_language(&self, root: &Handle) -> Option<String> {
        let stats = StatsCollector::new(self.collector.clone()).collect(root);
        match stats.dominant_script {
            DominantScript::Latin => Some("en".to_string()),
            DominantScript::Cjk => Some("zh".to_string()),
            DominantScript::Mixed | DominantScript::None => None,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn stats(&self) -> &AssistantStats {
        &self.stats
    }

    pub fn cache_stats(&self) -> &AnalysisCacheStats {
        self.cache.stats()
    }

    pub fn error_stats(&self) -> &ErrorStats {
        &self.errors
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;
    use crate::reading::error::ReadingError;

    #[test]
    fn test_importance_order_and_labels() {
        assert!(Importance::Low < Importance::Medium);
        assert!(Importance::Medium < Importance::High);
        assert_eq!(Importance::from_label("HIGH"), Some(Importance::High));
        assert_eq!(Importance::from_label(" medium "), Some(Importance::Medium));
        assert_eq!(Importance::from_label("urgent"), None);
    }

    #[test]
    fn test_parse_plain_json_response() {
        let raw = r#"{"summary":"一篇关于猫的文章","key_points":["猫会睡觉"],"complexity":"simple"}"#;
        let analysis = parse_analysis_response(raw).expect("plain json must parse");

        assert_eq!(analysis.summary, "一篇关于猫的文章");
        assert_eq!(analysis.key_points.len(), 1);
        assert_eq!(analysis.complexity, Complexity::Simple);
        assert!(analysis.suggested_highlights.is_empty());
    }

    #[test]
    fn test_parse_fenced_response() {
        let raw = "```json\n{\"summary\":\"fenced\"}\n```";
        let analysis = parse_analysis_response(raw).expect("fenced json must parse");
        assert_eq!(analysis.summary, "fenced");
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let raw = "  ```\n{\"summary\":\"bare fence\"}\n```  ";
        let analysis = parse_analysis_response(raw).expect("bare fence must parse");
        assert_eq!(analysis.summary, "bare fence");
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let result = parse_analysis_response("抱歉，我无法分析这个页面。");
        assert!(matches!(result, Err(ReadingError::ParseError(_))));
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let analysis = parse_analysis_response(r#"{"summary":"bare"}"#).expect("must parse");

        assert!(analysis.key_points.is_empty());
        assert_eq!(analysis.reading_time, None);
        assert_eq!(analysis.complexity, Complexity::Moderate);
    }

    #[test]
    fn test_select_targets_filters_by_importance() {
        let analysis = PageAnalysis {
            summary: "s".to_string(),
            suggested_highlights: vec![
                SuggestedHighlight {
                    text: "minor point".to_string(),
                    importance: Importance::Low,
                    ..Default::default()
                },
                SuggestedHighlight {
                    text: " key finding ".to_string(),
                    importance: Importance::High,
                    ..Default::default()
                },
                SuggestedHighlight {
                    text: "   ".to_string(),
                    importance: Importance::High,
                    ..Default::default()
                },
                SuggestedHighlight {
                    text: "core idea".to_string(),
                    importance: Importance::Medium,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let targets = select_highlight_targets(&analysis, Importance::Medium);
        assert_eq!(targets, vec!["key finding", "core idea"]);

        let all = select_highlight_targets(&analysis, Importance::Low);
        assert_eq!(all.len(), 3, "blank suggestions are always dropped");
    }

    #[test]
    fn test_content_key_is_stable() {
        let a = content_key("same text");
        let b = content_key("same text");
        let c = content_key("other text");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let mut cache = AnalysisCache::new(2);
        let analysis = PageAnalysis::default();

        cache.put("a".to_string(), analysis.clone());
        cache.put("b".to_string(), analysis.clone());
        assert!(cache.get("a").is_some());

        // 容量为 2，插入第三项后最久未用的 b 被淘汰
        cache.put("c".to_string(), analysis);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());

        let stats = cache.stats();
        assert_eq!(stats.insertions, 3);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_extract_page_text_joins_and_truncates() {
        let dom = html_to_dom(
            "<html><body><p>first   part</p><script>skip()</script><p>second</p></body></html>"
                .as_bytes(),
            "utf-8".to_string(),
        );

        let options = CollectorOptions::default();
        let full = extract_page_text(&dom.document, &options, 1000);
        assert_eq!(full, "first part\nsecond");

        let cut = extract_page_text(&dom.document, &options, 5);
        assert_eq!(cut, "first");
    }

    #[test]
    fn test_request_serializes_without_empty_language() {
        let request = AnalysisRequest {
            text: "body".to_string(),
            language: None,
        };
        let json = serde_json::to_string(&request).expect("request must serialize");
        assert!(!json.contains("language"));

        let tagged = AnalysisRequest {
            text: "body".to_string(),
            language: Some("zh".to_string()),
        };
        let json = serde_json::to_string(&tagged).expect("request must serialize");
        assert!(json.contains("\"language\":\"zh\""));
    }

    #[tokio::test]
    async fn test_client_retries_then_surfaces_network_error() {
        // 回环地址的 discard 端口没有服务监听，连接立即被拒绝
        let config = AssistantConfig {
            api_url: "http://127.0.0.1:9/v1/analyze".to_string(),
            api_key: None,
            timeout: Duration::from_secs(2),
            max_retries: 1,
            retry_delay: Duration::from_millis(10),
            max_page_chars: 1000,
            min_importance: Importance::Medium,
        };

        let mut client = AssistantClient::new(config, 4);
        let error = client
            .analyze_text("some page text", None)
            .await
            .expect_err("no service is listening on the endpoint");

        assert!(error.is_retryable(), "connection failures are retryable");
        assert_eq!(client.stats().requests_sent, 2, "initial attempt plus one retry");
        assert_eq!(client.stats().retries, 1);
        assert_eq!(client.stats().analyses_completed, 0);
        assert!(client.cache_stats().insertions == 0, "failures are never cached");
    }
}
