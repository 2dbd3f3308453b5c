//! 文本切分模块
//!
//! 把文本节点内容切分为连续的同类字符区段，供仿生加粗和统计使用。
//! 区段边界全部使用字节偏移，并保证落在字符边界上。

use serde::{Deserialize, Serialize};

/// CJK 统一表意文字基本区
const CJK_UNIFIED_START: char = '\u{4e00}';
const CJK_UNIFIED_END: char = '\u{9fff}';

/// 字符书写系统分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptClass {
    /// 拉丁词字符（ASCII 字母数字、撇号、连字符）
    Latin,
    /// CJK 统一表意文字
    Cjk,
    /// 其他字符（空白、标点、其余书写系统）
    Other,
}

/// 单个连续区段
///
/// `start`/`end` 是针对原文本的字节偏移，左闭右开。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub class: ScriptClass,
    pub start: usize,
    pub end: usize,
}

impl Run {
    /// 取出区段对应的文本切片
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// 区段的字符数
    pub fn char_count(&self, text: &str) -> usize {
        self.slice(text).chars().count()
    }
}

/// 对单个字符分类
///
/// 拉丁词字符按 ASCII 词汇约定处理，撇号和连字符算作词内字符，
/// 这样 "don't" 和 "well-known" 各自保持为一个区段。
pub fn classify_char(c: char) -> ScriptClass {
    if c.is_ascii_alphanumeric() || c == '\'' || c == '-' {
        ScriptClass::Latin
    } else if (CJK_UNIFIED_START..=CJK_UNIFIED_END).contains(&c) {
        ScriptClass::Cjk
    } else {
        ScriptClass::Other
    }
}

/// 把文本切分为连续同类区段
///
/// 相邻同类字符合并为一个区段，区段按出现顺序返回，
/// 首尾相接正好覆盖整个输入。空输入返回空列表。
pub fn segment_text(text: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();

    for (index, c) in text.char_indices() {
        let class = classify_char(c);
        match runs.last_mut() {
            Some(run) if run.class == class => {
                run.end = index + c.len_utf8();
            }
            _ => {
                runs.push(Run {
                    class,
                    start: index,
                    end: index + c.len_utf8(),
                });
            }
        }
    }

    runs
}
