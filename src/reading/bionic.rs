//! 仿生阅读转换模块
//!
//! 把文本节点按区段切分后给每个词的前缀加粗，帮助视线锚定。
//! 词的剩余部分保持为普通文本，整个替换在父节点上原位完成，
//! 摘除时展开标记元素并合并文本即可还原原文。

use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tracing::debug;

use crate::parsers::html::dom::{
    create_element_with_text, create_text_node, get_node_text, get_parent_node, has_class,
};
use crate::utils::text::char_to_byte_index;

use super::collector::{CollectorOptions, TextNodeIter};
use super::config::{constants, ReadingConfig};
use super::error::ReadingResult;
use super::observer::ObservedDocument;
use super::segment::{segment_text, ScriptClass};

/// 计算区段的加粗前缀字符数
///
/// 拉丁区段取字符数的三分之一（向下取整），不足三个字符的短词不加粗；
/// CJK 区段一到三个字取一个字，四个字以上取两个字；其他区段不加粗。
pub fn emphasis_prefix_chars(class: ScriptClass, char_len: usize) -> usize {
    match class {
        ScriptClass::Latin => char_len / 3,
        ScriptClass::Cjk => match char_len {
            0 => 0,
            1..=3 => 1,
            _ => 2,
        },
        ScriptClass::Other => 0,
    }
}

/// 仿生转换配置
#[derive(Debug, Clone)]
pub struct BionicConfig {
    pub collector: CollectorOptions,
}

impl Default for BionicConfig {
    fn default() -> Self {
        Self {
            // 跳过自己产出的标记，重复应用不会嵌套加粗
            collector: CollectorOptions::default().with_skip_class(constants::BIONIC_MARK_CLASS),
        }
    }
}

impl BionicConfig {
    /// 从阅读配置构建
    pub fn from_config(config: &ReadingConfig) -> Self {
        Self {
            collector: CollectorOptions::from_config(config)
                .with_skip_class(constants::BIONIC_MARK_CLASS),
        }
    }
}

/// 仿生转换统计
#[derive(Debug, Clone, Default)]
pub struct BionicStats {
    pub nodes_examined: usize,
    pub nodes_transformed: usize,
    pub nodes_unchanged: usize,
    pub nodes_already_styled: usize,
    pub nodes_detached: usize,
    pub runs_emphasized: usize,
    pub marks_reverted: usize,
}

impl BionicStats {
    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }
}

enum NodeOutcome {
    Transformed { runs: usize },
    Unchanged,
    AlreadyStyled,
    Detached,
}

/// 仿生阅读转换器
pub struct BionicTransformer {
    config: BionicConfig,
    stats: BionicStats,
}

impl BionicTransformer {
    pub fn new(config: BionicConfig) -> Self {
        Self {
            config,
            stats: BionicStats::default(),
        }
    }

    /// 对子树内所有符合条件的文本节点应用仿生加粗
    ///
    /// 返回实际改写的文本节点数。没有可加粗内容的节点保持原样。
    pub fn apply(&mut self, doc: &ObservedDocument, scope: &Handle) -> ReadingResult<usize> {
        let nodes: Vec<Handle> =
            TextNodeIter::new(scope.clone(), self.config.collector.clone()).collect();

        // 本轮已改写的父节点，区别于之前轮次留下的标记区域
        let mut styled_parents: Vec<Handle> = Vec::new();
        let mut transformed = 0;
        for node in &nodes {
            self.stats.nodes_examined += 1;
            match self.transform_text_node(doc, node, &mut styled_parents) {
                NodeOutcome::Transformed { runs } => {
                    self.stats.nodes_transformed += 1;
                    self.stats.runs_emphasized += runs;
                    transformed += 1;
                }
                NodeOutcome::Unchanged => {
                    self.stats.nodes_unchanged += 1;
                }
                NodeOutcome::AlreadyStyled => {
                    self.stats.nodes_already_styled += 1;
                }
                NodeOutcome::Detached => {
                    self.stats.nodes_detached += 1;
                    debug!("文本节点已脱离文档树，跳过仿生转换");
                }
            }
        }

        debug!(
            "仿生转换完成: 改写 {} / {} 个文本节点",
            transformed,
            nodes.len()
        );
        Ok(transformed)
    }

    /// 摘除子树内的仿生标记并还原文本
    ///
    /// 返回展开的标记元素数。
    pub fn revert(&mut self, doc: &ObservedDocument, scope: &Handle) -> ReadingResult<usize> {
        let reverted = doc.unwrap_all_with_class(scope, constants::BIONIC_MARK_CLASS);
        self.stats.marks_reverted += reverted;
        Ok(reverted)
    }

    /// 获取统计信息
    pub fn stats(&self) -> &BionicStats {
        &self.stats
    }

    /// 重置统计
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    fn transform_text_node(
        &self,
        doc: &ObservedDocument,
        node: &Handle,
        styled_parents: &mut Vec<Handle>,
    ) -> NodeOutcome {
        let text = match get_node_text(node) {
            Some(text) => text,
            None => return NodeOutcome::Unchanged,
        };

        let parent = match get_parent_node(node) {
            Some(parent) => parent,
            None => return NodeOutcome::Detached,
        };

        // 同级已有仿生标记说明该区域早先处理过，残余文本不再加粗
        let sibling_marked = parent
            .children
            .borrow()
            .iter()
            .any(|sibling| has_class(sibling, constants::BIONIC_MARK_CLASS));
        let styled_this_pass = styled_parents
            .iter()
            .any(|styled| Rc::ptr_eq(styled, &parent));
        if sibling_marked && !styled_this_pass {
            return NodeOutcome::AlreadyStyled;
        }

        let mut parts: Vec<Handle> = Vec::new();
        let mut plain = String::new();
        let mut emphasized = 0;

        for run in segment_text(&text) {
            let run_text = run.slice(&text);

            // 纯撇号或连字符的区段没有可强调的内容
            let has_word_char = match run.class {
                ScriptClass::Cjk => true,
                _ => run_text.chars().any(|c| c.is_ascii_alphanumeric()),
            };
            let bold_chars = if has_word_char {
                emphasis_prefix_chars(run.class, run_text.chars().count())
            } else {
                0
            };
            if bold_chars == 0 {
                plain.push_str(run_text);
                continue;
            }

            let split = char_to_byte_index(run_text, bold_chars);
            let (head, tail) = run_text.split_at(split);

            if !plain.is_empty() {
                parts.push(create_text_node(&plain));
                plain.clear();
            }
            parts.push(create_element_with_text(
                doc.dom(),
                constants::BIONIC_MARK_TAG,
                &[("class", constants::BIONIC_MARK_CLASS)],
                head,
            ));
            emphasized += 1;
            plain.push_str(tail);
        }

        if emphasized == 0 {
            return NodeOutcome::Unchanged;
        }
        if !plain.is_empty() {
            parts.push(create_text_node(&plain));
        }

        if doc.replace_with(node, &parts) {
            if !styled_this_pass {
                styled_parents.push(parent);
            }
            NodeOutcome::Transformed { runs: emphasized }
        } else {
            NodeOutcome::Detached
        }
    }
}

impl Default for BionicTransformer {
    fn default() -> Self {
        Self::new(BionicConfig::default())
    }
}

/// 便利函数：使用默认配置应用仿生加粗
pub fn apply_bionic(doc: &ObservedDocument, scope: &Handle) -> ReadingResult<usize> {
    BionicTransformer::default().apply(doc, scope)
}

/// 便利函数：摘除仿生标记
pub fn revert_bionic(doc: &ObservedDocument, scope: &Handle) -> ReadingResult<usize> {
    BionicTransformer::default().revert(doc, scope)
}
