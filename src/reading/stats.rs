//! 页面阅读统计模块
//!
//! 在收集到的可读文本上统计词数、字符数并估算阅读时长。
//! 拉丁文按词计速，CJK 按字计速，两部分时长相加后向上取整。

use markup5ever_rcdom::{Handle, NodeData};
use serde::{Deserialize, Serialize};

use crate::parsers::html::dom::get_node_text;

use super::collector::{CollectorOptions, TextNodeIter};
use super::config::{constants, ReadingConfig};
use super::segment::{segment_text, ScriptClass};

/// 参与段落估算的块级元素
const PARAGRAPH_ELEMENTS: &[&str] = &[
    "p", "li", "blockquote", "dd", "figcaption", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// 页面主导书写系统
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DominantScript {
    Latin,
    Cjk,
    Mixed,
    #[default]
    None,
}

/// 页面阅读统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageStatistics {
    pub latin_words: usize,
    pub latin_chars: usize,
    pub cjk_chars: usize,
    pub other_chars: usize,
    pub total_chars: usize,
    pub text_nodes: usize,
    pub paragraphs: usize,
    pub reading_time_minutes: u32,
    pub dominant_script: DominantScript,
}

/// 页面统计收集器
pub struct StatsCollector {
    options: CollectorOptions,
    latin_words_per_minute: usize,
    cjk_chars_per_minute: usize,
}

impl StatsCollector {
    pub fn new(options: CollectorOptions) -> Self {
        Self {
            options,
            latin_words_per_minute: constants::LATIN_WORDS_PER_MINUTE,
            cjk_chars_per_minute: constants::CJK_CHARS_PER_MINUTE,
        }
    }

    /// 从阅读配置构建
    pub fn from_config(config: &ReadingConfig) -> Self {
        Self {
            options: CollectorOptions::from_config(config),
            latin_words_per_minute: config.latin_words_per_minute,
            cjk_chars_per_minute: config.cjk_chars_per_minute,
        }
    }

    /// 统计子树内的可读文本
    pub fn collect(&self, root: &Handle) -> PageStatistics {
        let mut stats = PageStatistics::default();

        for node in TextNodeIter::new(root.clone(), self.options.clone()) {
            let text = match get_node_text(&node) {
                Some(text) => text,
                None => continue,
            };

            stats.text_nodes += 1;
            stats.total_chars += text.chars().count();

            for run in segment_text(&text) {
                let run_text = run.slice(&text);
                let chars = run_text.chars().count();
                match run.class {
                    ScriptClass::Latin => {
                        stats.latin_chars += chars;
                        // 纯撇号或连字符的区段不算词
                        if run_text.chars().any(|c| c.is_ascii_alphanumeric()) {
                            stats.latin_words += 1;
                        }
                    }
                    ScriptClass::Cjk => stats.cjk_chars += chars,
                    ScriptClass::Other => stats.other_chars += chars,
                }
            }
        }

        stats.paragraphs = count_paragraph_elements(root);
        stats.reading_time_minutes = self.estimate_minutes(&stats);
        stats.dominant_script = dominant_script(stats.latin_chars, stats.cjk_chars);

        stats
    }

    fn estimate_minutes(&self, stats: &PageStatistics) -> u32 {
        if stats.latin_words == 0 && stats.cjk_chars == 0 {
            return 0;
        }

        let latin_minutes = stats.latin_words as f64 / self.latin_words_per_minute as f64;
        let cjk_minutes = stats.cjk_chars as f64 / self.cjk_chars_per_minute as f64;
        ((latin_minutes + cjk_minutes).ceil() as u32).max(1)
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new(CollectorOptions::default())
    }
}

/// 判定主导书写系统
///
/// 一方占比达到七成即为主导，双方都缺席时为 None。
fn dominant_script(latin_chars: usize, cjk_chars: usize) -> DominantScript {
    let total = latin_chars + cjk_chars;
    if total == 0 {
        return DominantScript::None;
    }

    let latin_ratio = latin_chars as f64 / total as f64;
    if latin_ratio >= 0.7 {
        DominantScript::Latin
    } else if latin_ratio <= 0.3 {
        DominantScript::Cjk
    } else {
        DominantScript::Mixed
    }
}

/// 递归统计块级文本元素数量
fn count_paragraph_elements(node: &Handle) -> usize {
    let mut count = 0;

    if let NodeData::Element { ref name, .. } = node.data {
        if PARAGRAPH_ELEMENTS.contains(&name.local.as_ref()) {
            count += 1;
        }
    }

    for child in node.children.borrow().iter() {
        count += count_paragraph_elements(child);
    }

    count
}

/// 便利函数：使用默认选项统计页面
pub fn collect_page_statistics(root: &Handle) -> PageStatistics {
    StatsCollector::default().collect(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;
    use markup5ever_rcdom::RcDom;

    fn create_test_dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8".to_string())
    }

    #[test]
    fn test_counts_latin_words() {
        let dom = create_test_dom("<html><body><p>the cat saw the dog</p></body></html>");
        let stats = collect_page_statistics(&dom.document);

        assert_eq!(stats.latin_words, 5);
        assert_eq!(stats.cjk_chars, 0);
        assert_eq!(stats.text_nodes, 1);
        assert_eq!(stats.paragraphs, 1);
        assert_eq!(stats.reading_time_minutes, 1);
        assert_eq!(stats.dominant_script, DominantScript::Latin);
    }

    #[test]
    fn test_counts_cjk_chars() {
        let dom = create_test_dom("<html><body><p>今天天气很好</p></body></html>");
        let stats = collect_page_statistics(&dom.document);

        assert_eq!(stats.latin_words, 0);
        assert_eq!(stats.cjk_chars, 6);
        assert_eq!(stats.dominant_script, DominantScript::Cjk);
        assert_eq!(stats.reading_time_minutes, 1);
    }

    #[test]
    fn test_mixed_page_reports_mixed_script() {
        let dom = create_test_dom("<html><body><p>hello 世界你好吗</p></body></html>");
        let stats = collect_page_statistics(&dom.document);

        assert_eq!(stats.latin_words, 1);
        assert_eq!(stats.latin_chars, 5);
        assert_eq!(stats.cjk_chars, 5);
        assert_eq!(stats.dominant_script, DominantScript::Mixed);
    }

    #[test]
    fn test_hyphenated_word_counts_once() {
        let dom = create_test_dom("<html><body><p>well-known fact</p></body></html>");
        let stats = collect_page_statistics(&dom.document);
        assert_eq!(stats.latin_words, 2);
    }

    #[test]
    fn test_skips_code_and_script_text() {
        let dom = create_test_dom(
            "<html><body><p>two words</p><code>ignored tokens everywhere</code><script>var a;</script></body></html>",
        );
        let stats = collect_page_statistics(&dom.document);
        assert_eq!(stats.latin_words, 2);
    }

    #[test]
    fn test_counts_block_elements_as_paragraphs() {
        let dom = create_test_dom(
            "<html><body><h1>Title</h1><p>one</p><ul><li>a</li><li>b</li></ul><blockquote>q</blockquote></body></html>",
        );
        let stats = collect_page_statistics(&dom.document);
        assert_eq!(stats.paragraphs, 5);
    }

    #[test]
    fn test_empty_page_reports_zeroes() {
        let dom = create_test_dom("<html><body></body></html>");
        let stats = collect_page_statistics(&dom.document);

        assert_eq!(stats.latin_words, 0);
        assert_eq!(stats.total_chars, 0);
        assert_eq!(stats.reading_time_minutes, 0);
        assert_eq!(stats.dominant_script, DominantScript::None);
    }

    #[test]
    fn test_statistics_serialize_to_json() {
        let dom = create_test_dom("<html><body><p>hola</p></body></html>");
        let stats = collect_page_statistics(&dom.document);

        let value = serde_json::to_value(&stats).expect("stats must serialize");
        assert_eq!(value["latin_words"], 1);
        assert_eq!(value["dominant_script"], "latin");
    }

    #[test]
    fn test_long_text_rounds_reading_time_up() {
        let mut body = String::from("<html><body><p>");
        for _ in 0..450 {
            body.push_str("word ");
        }
        body.push_str("</p></body></html>");

        let dom = create_test_dom(&body);
        let stats = collect_page_statistics(&dom.document);

        assert_eq!(stats.latin_words, 450);
        // 450 词按每分钟 200 词是 2.25 分钟，取整为 3
        assert_eq!(stats.reading_time_minutes, 3);
    }
}
