//! 文本节点收集模块
//!
//! 以懒迭代方式遍历 DOM，产出适合阅读增强处理的文本节点。
//! 跳过规则由纯判定函数给出，遍历本身不修改任何节点，
//! 因此同一棵树可以反复收集。

use std::sync::OnceLock;

use markup5ever_rcdom::{Handle, NodeData};
use regex::Regex;
use tracing::debug;

use crate::parsers::html::dom::{get_node_attr, has_class};

use super::config::{constants, ReadingConfig};

/// 隐藏元素的内联样式特征
fn hidden_style_regex() -> &'static Regex {
    static HIDDEN_STYLE_RE: OnceLock<Regex> = OnceLock::new();
    HIDDEN_STYLE_RE.get_or_init(|| {
        Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden")
            .expect("hidden style regex must compile")
    })
}

/// 遍历判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalVerdict {
    /// 保留该节点（元素则继续下探）
    Keep,
    /// 跳过该节点本身
    SkipNode,
    /// 跳过整棵子树
    SkipSubtree,
}

/// 收集器选项
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub exclude_hidden: bool,
    pub min_content_length: usize,
    pub max_depth: usize,
    pub skip_elements: Vec<String>,
    pub skip_classes: Vec<String>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            exclude_hidden: true,
            min_content_length: constants::MIN_CONTENT_LENGTH,
            max_depth: constants::MAX_TRAVERSAL_DEPTH,
            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            skip_classes: Vec::new(),
        }
    }
}

impl CollectorOptions {
    /// 从阅读配置构建收集器选项
    pub fn from_config(config: &ReadingConfig) -> Self {
        let mut options = Self {
            exclude_hidden: config.exclude_hidden,
            min_content_length: config.min_content_length,
            max_depth: config.max_depth,
            ..Self::default()
        };

        for extra in &config.extra_skip_elements {
            let name = extra.to_lowercase();
            if !options.skip_elements.contains(&name) {
                options.skip_elements.push(name);
            }
        }

        options
    }

    /// 追加一个需要整体跳过的 class
    pub fn with_skip_class(mut self, class_name: &str) -> Self {
        self.skip_classes.push(class_name.to_string());
        self
    }
}

/// 判定元素节点的遍历方式
///
/// 纯函数：相同输入永远得到相同结果，不会修改节点。
pub fn evaluate_element(node: &Handle, options: &CollectorOptions) -> TraversalVerdict {
    let tag_name = match node.data {
        NodeData::Element { ref name, .. } => name.local.as_ref(),
        _ => return TraversalVerdict::Keep,
    };

    if options
        .skip_elements
        .iter()
        .any(|skip| skip == tag_name)
    {
        return TraversalVerdict::SkipSubtree;
    }

    if options
        .skip_classes
        .iter()
        .any(|class| has_class(node, class))
    {
        return TraversalVerdict::SkipSubtree;
    }

    if options.exclude_hidden && is_hidden_element(node) {
        return TraversalVerdict::SkipSubtree;
    }

    TraversalVerdict::Keep
}

/// 判定文本节点是否参与收集
///
/// 去除首尾空白后按字符数与阈值比较，阈值为 0 时全部保留。
pub fn evaluate_text(text: &str, options: &CollectorOptions) -> TraversalVerdict {
    if options.min_content_length == 0 {
        return TraversalVerdict::Keep;
    }

    if text.trim().chars().count() < options.min_content_length {
        return TraversalVerdict::SkipNode;
    }

    TraversalVerdict::Keep
}

/// 检查元素是否被隐藏
///
/// 只识别 `hidden` 属性和内联样式里的 display:none / visibility:hidden，
/// 不解析样式表。
fn is_hidden_element(node: &Handle) -> bool {
    if get_node_attr(node, "hidden").is_some() {
        return true;
    }

    match get_node_attr(node, "style") {
        Some(style) => hidden_style_regex().is_match(&style),
        None => false,
    }
}

/// 收集统计信息
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub nodes_visited: usize,
    pub text_nodes_seen: usize,
    pub text_nodes_collected: usize,
    pub text_nodes_filtered: usize,
    pub subtrees_skipped: usize,
    pub depth_limited: usize,
}

impl CollectionStats {
    /// 文本节点收集率
    pub fn collection_rate(&self) -> f64 {
        if self.text_nodes_seen == 0 {
            0.0
        } else {
            self.text_nodes_collected as f64 / self.text_nodes_seen as f64
        }
    }

    /// 合并另一份统计
    pub fn merge(&mut self, other: &CollectionStats) {
        self.nodes_visited += other.nodes_visited;
        self.text_nodes_seen += other.text_nodes_seen;
        self.text_nodes_collected += other.text_nodes_collected;
        self.text_nodes_filtered += other.text_nodes_filtered;
        self.subtrees_skipped += other.subtrees_skipped;
        self.depth_limited += other.depth_limited;
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

/// 文本节点懒迭代器
///
/// 用显式栈按文档顺序遍历，调用方随时可以停止，
/// 未访问的子树不产生任何开销。
pub struct TextNodeIter {
    options: CollectorOptions,
    stack: Vec<(Handle, usize)>,
    stats: CollectionStats,
}

impl TextNodeIter {
    pub fn new(root: Handle, options: CollectorOptions) -> Self {
        Self {
            options,
            stack: vec![(root, 0)],
            stats: CollectionStats::default(),
        }
    }

    /// 迭代过程中累计的统计
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    fn push_children(&mut self, node: &Handle, child_depth: usize) {
        let children = node.children.borrow();
        for child in children.iter().rev() {
            self.stack.push((child.clone(), child_depth));
        }
    }
}

impl Iterator for TextNodeIter {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        while let Some((node, depth)) = self.stack.pop() {
            self.stats.nodes_visited += 1;

            if matches!(node.data, NodeData::Text { .. }) {
                self.stats.text_nodes_seen += 1;
                let verdict = match node.data {
                    NodeData::Text { ref contents } => {
                        evaluate_text(&contents.borrow(), &self.options)
                    }
                    _ => TraversalVerdict::SkipNode,
                };

                if verdict == TraversalVerdict::Keep {
                    self.stats.text_nodes_collected += 1;
                    return Some(node);
                }
                self.stats.text_nodes_filtered += 1;
                continue;
            }

            match node.data {
                NodeData::Element { .. } => {
                    if evaluate_element(&node, &self.options) == TraversalVerdict::SkipSubtree {
                        self.stats.subtrees_skipped += 1;
                        continue;
                    }
                    if depth >= self.options.max_depth {
                        self.stats.depth_limited += 1;
                        continue;
                    }
                    self.push_children(&node, depth + 1);
                }
                NodeData::Document => {
                    self.push_children(&node, depth + 1);
                }
                _ => {}
            }
        }

        None
    }
}

/// 文本节点收集器
///
/// 在懒迭代器之上提供一次性收集接口，并累计统计信息。
pub struct TextNodeCollector {
    options: CollectorOptions,
    stats: CollectionStats,
}

impl TextNodeCollector {
    pub fn new(options: CollectorOptions) -> Self {
        Self {
            options,
            stats: CollectionStats::default(),
        }
    }

    /// 按文档顺序收集全部符合条件的文本节点
    pub fn collect(&mut self, root: &Handle) -> Vec<Handle> {
        let mut iter = TextNodeIter::new(root.clone(), self.options.clone());
        let mut collected = Vec::new();
        for node in iter.by_ref() {
            collected.push(node);
        }

        self.stats.merge(iter.stats());
        debug!(
            "文本收集完成: 访问 {} 个节点, 收集 {} 个文本节点, 跳过 {} 棵子树",
            iter.stats().nodes_visited,
            iter.stats().text_nodes_collected,
            iter.stats().subtrees_skipped,
        );

        collected
    }

    /// 获取收集器选项
    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    /// 获取累计统计
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// 重置统计
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}

impl Default for TextNodeCollector {
    fn default() -> Self {
        Self::new(CollectorOptions::default())
    }
}

/// 便利函数：使用默认选项收集文本节点
pub fn collect_text_nodes(root: &Handle) -> Vec<Handle> {
    TextNodeCollector::default().collect(root)
}

/// 便利函数：使用指定选项收集文本节点
pub fn collect_text_nodes_with(root: &Handle, options: CollectorOptions) -> Vec<Handle> {
    TextNodeCollector::new(options).collect(root)
}
