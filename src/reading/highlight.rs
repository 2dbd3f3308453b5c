//! 选区高亮模块
//!
//! 把收集到的文本节点拼成虚拟缓冲区，在其中查找目标词的所有出现，
//! 再把命中范围映射回各文本节点做原位包裹。跨节点的匹配会把涉及的
//! 每个节点分别切开，同一节点的多处命中一次性完成替换。
//!
//! 匹配对 ASCII 字母大小写不敏感，其余字符逐字节精确比较。

use markup5ever_rcdom::Handle;
use tracing::debug;

use crate::parsers::html::dom::{create_element_with_text, create_text_node, get_node_text};

use super::collector::{CollectorOptions, TextNodeIter};
use super::config::{constants, ReadingConfig};
use super::error::{helpers, ReadingResult};
use super::observer::ObservedDocument;

/// 文本节点在虚拟缓冲区中占据的区间
///
/// `start`/`end` 是缓冲区内的字节偏移，左闭右开。
#[derive(Clone)]
pub struct TextSpan {
    pub node: Handle,
    pub start: usize,
    pub end: usize,
}

/// 缓冲区内的一处命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRange {
    pub start: usize,
    pub end: usize,
}

/// 选区文本的规整结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAction {
    /// 空选区，等价于清除现有高亮
    Clear,
    /// 单个字母数字字符，噪声太大，直接忽略
    Ignore,
    /// 用整理后的文本执行高亮
    Apply(String),
}

/// 规整用户选区文本
pub fn normalize_target(raw: &str) -> TargetAction {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return TargetAction::Clear;
    }

    let mut chars = trimmed.chars();
    if let (Some(only_char), None) = (chars.next(), chars.next()) {
        if only_char.is_alphanumeric() {
            return TargetAction::Ignore;
        }
    }

    TargetAction::Apply(trimmed.to_string())
}

/// 构建虚拟缓冲区
///
/// 按文档顺序拼接收集到的文本节点内容，并记录每个节点占据的区间。
/// 区间首尾相接，偏移都落在字符边界上。
pub fn build_virtual_buffer(
    root: &Handle,
    options: &CollectorOptions,
) -> (String, Vec<TextSpan>) {
    let mut buffer = String::new();
    let mut spans: Vec<TextSpan> = Vec::new();

    for node in TextNodeIter::new(root.clone(), options.clone()) {
        let text = match get_node_text(&node) {
            Some(text) => text,
            None => continue,
        };

        let start = buffer.len();
        buffer.push_str(&text);
        spans.push(TextSpan {
            node,
            start,
            end: buffer.len(),
        });
    }

    (buffer, spans)
}

/// 在缓冲区中查找目标的全部出现
///
/// ASCII 字母按小写折叠后比较，折叠不改变字节长度，
/// 返回的偏移可直接用于原缓冲区。命中之间不重叠。
pub fn find_match_ranges(buffer: &str, target: &str) -> Vec<MatchRange> {
    let mut ranges: Vec<MatchRange> = Vec::new();
    if target.is_empty() || buffer.len() < target.len() {
        return ranges;
    }

    let haystack = buffer.to_ascii_lowercase();
    let needle = target.to_ascii_lowercase();

    let mut position = 0;
    while let Some(found) = haystack[position..].find(&needle) {
        let start = position + found;
        let end = start + needle.len();
        ranges.push(MatchRange { start, end });
        position = end;
    }

    ranges
}

/// 把缓冲区命中映射为每个节点的本地切分区间
///
/// 返回与 `spans` 等长的列表，第 i 项是第 i 个节点内部需要包裹的
/// 区间（相对节点文本的字节偏移，升序且互不重叠）。
pub fn plan_node_splits(spans: &[TextSpan], matches: &[MatchRange]) -> Vec<Vec<MatchRange>> {
    let mut plans: Vec<Vec<MatchRange>> = vec![Vec::new(); spans.len()];

    let mut span_index = 0;
    for m in matches {
        while span_index < spans.len() && spans[span_index].end <= m.start {
            span_index += 1;
        }

        let mut i = span_index;
        while i < spans.len() && spans[i].start < m.end {
            let span = &spans[i];
            let local_start = m.start.max(span.start) - span.start;
            let local_end = m.end.min(span.end) - span.start;
            if local_start < local_end {
                plans[i].push(MatchRange {
                    start: local_start,
                    end: local_end,
                });
            }
            i += 1;
        }
    }

    plans
}

/// 高亮配置
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    pub collector: CollectorOptions,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            collector: buffer_collector_options(CollectorOptions::default()),
        }
    }
}

impl HighlightConfig {
    /// 从阅读配置构建
    pub fn from_config(config: &ReadingConfig) -> Self {
        Self {
            collector: buffer_collector_options(CollectorOptions::from_config(config)),
        }
    }
}

/// 调整收集器选项以保证缓冲区完整
///
/// 长度过滤会让缓冲区丢字产生假匹配，所以高亮收集不过滤短文本；
/// 自己产出的标记子树跳过，重复高亮不会嵌套。
fn buffer_collector_options(mut options: CollectorOptions) -> CollectorOptions {
    options.min_content_length = 0;
    options.skip_classes.push(constants::HIGHLIGHT_MARK_CLASS.to_string());
    options
}

/// 高亮统计
#[derive(Debug, Clone, Default)]
pub struct HighlightStats {
    pub targets_applied: usize,
    pub matches_found: usize,
    pub nodes_split: usize,
    pub segments_wrapped: usize,
    pub stale_nodes: usize,
    pub stale_segments: usize,
    pub marks_cleared: usize,
}

impl HighlightStats {
    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// 选区高亮器
pub struct Highlighter {
    config: HighlightConfig,
    stats: HighlightStats,
}

impl Highlighter {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            config,
            stats: HighlightStats::default(),
        }
    }

    /// 高亮子树内目标词的所有出现
    ///
    /// 返回实际包裹的片段数。目标不存在时不改动 DOM 并返回 0。
    pub fn highlight(
        &mut self,
        doc: &ObservedDocument,
        scope: &Handle,
        target: &str,
    ) -> ReadingResult<usize> {
        let trimmed = target.trim();
        if trimmed.is_empty() {
            return Err(helpers::validation_error("高亮目标不能为空"));
        }

        let (buffer, spans) = build_virtual_buffer(scope, &self.config.collector);
        let matches = find_match_ranges(&buffer, trimmed);
        if matches.is_empty() {
            debug!("未找到高亮目标: {:?}", trimmed);
            return Ok(0);
        }
        self.stats.matches_found += matches.len();

        let plans = plan_node_splits(&spans, &matches);
        let mut wrapped = 0;
        for (span, ranges) in spans.iter().zip(plans.iter()) {
            if ranges.is_empty() {
                continue;
            }
            wrapped += self.apply_ranges(doc, span, ranges);
        }

        self.stats.targets_applied += 1;
        debug!(
            "高亮完成: {:?} 命中 {} 处, 包裹 {} 个片段",
            trimmed,
            matches.len(),
            wrapped
        );
        Ok(wrapped)
    }

    /// 清除子树内的全部高亮标记
    ///
    /// 返回展开的标记元素数。
    pub fn clear(&mut self, doc: &ObservedDocument, scope: &Handle) -> ReadingResult<usize> {
        let cleared = doc.unwrap_all_with_class(scope, constants::HIGHLIGHT_MARK_CLASS);
        self.stats.marks_cleared += cleared;
        Ok(cleared)
    }

    /// 获取统计信息
    pub fn stats(&self) -> &HighlightStats {
        &self.stats
    }

    /// 重置统计
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// 按计划切分单个节点，返回包裹的片段数
    ///
    /// 节点文本与记录的区间长度不一致说明期间被改写过，整个节点跳过。
    fn apply_ranges(&mut self, doc: &ObservedDocument, span: &TextSpan, ranges: &[MatchRange]) -> usize {
        let text = match get_node_text(&span.node) {
            Some(text) => text,
            None => return 0,
        };

        if text.len() != span.end - span.start {
            self.stats.stale_nodes += 1;
            debug!("文本节点内容已变化，跳过高亮切分");
            return 0;
        }

        let mut parts: Vec<Handle> = Vec::new();
        let mut cursor = 0;
        let mut wrapped = 0;

        for range in ranges {
            let valid = range.start >= cursor
                && range.start < range.end
                && range.end <= text.len()
                && text.is_char_boundary(range.start)
                && text.is_char_boundary(range.end);
            if !valid {
                self.stats.stale_segments += 1;
                debug!("命中区间越界或落在字符中间，跳过该片段");
                continue;
            }

            if range.start > cursor {
                parts.push(create_text_node(&text[cursor..range.start]));
            }
            parts.push(create_element_with_text(
                doc.dom(),
                constants::HIGHLIGHT_MARK_TAG,
                &[("class", constants::HIGHLIGHT_MARK_CLASS)],
                &text[range.start..range.end],
            ));
            wrapped += 1;
            cursor = range.end;
        }

        if wrapped == 0 {
            return 0;
        }
        if cursor < text.len() {
            parts.push(create_text_node(&text[cursor..]));
        }

        if doc.replace_with(&span.node, &parts) {
            self.stats.nodes_split += 1;
            self.stats.segments_wrapped += wrapped;
            wrapped
        } else {
            self.stats.stale_nodes += 1;
            0
        }
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(HighlightConfig::default())
    }
}

/// 便利函数：使用默认配置高亮目标词
pub fn highlight_term(doc: &ObservedDocument, scope: &Handle, term: &str) -> ReadingResult<usize> {
    Highlighter::default().highlight(doc, scope, term)
}

/// 便利函数：清除全部高亮标记
pub fn clear_highlights(doc: &ObservedDocument, scope: &Handle) -> ReadingResult<usize> {
    Highlighter::default().clear(doc, scope)
}
