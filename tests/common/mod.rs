// 集成测试公共模块
//
// 提供测试页面、DOM 检查工具和共享断言

use std::io::Cursor;
use std::time::Duration;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use readlens::reading::ObservedDocument;

/// HTML测试工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    /// 创建测试用的DOM结构
    pub fn create_test_dom(html: &str) -> RcDom {
        let mut input = Cursor::new(html);
        parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut input)
            .unwrap()
    }

    /// 创建带变更通知的测试文档
    pub fn create_observed_document(html: &str) -> ObservedDocument {
        ObservedDocument::from_html(html.as_bytes(), "utf-8")
    }

    /// 创建简单的英文HTML页面
    ///
    /// 正文共 25 个拉丁词、4 个段落级元素，统计断言依赖这两个数字。
    pub fn create_simple_english_page() -> String {
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Reading Practice</title>
    <meta charset="UTF-8">
</head>
<body>
    <h1>Focused Reading</h1>
    <p>Bionic emphasis guides the eye through longer passages of text.</p>
    <div>
        <p>Another paragraph keeps the reader moving forward.</p>
    </div>
    <blockquote>Good typography disappears while reading happens.</blockquote>
</body>
</html>"#
            .to_string()
    }

    /// 创建包含中文的混合HTML页面
    ///
    /// 拉丁与CJK字符数大致相当，主导文字判定落在混合区间。
    pub fn create_mixed_language_page() -> String {
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <title>阅读测试 - Reading Test</title>
    <meta charset="UTF-8">
</head>
<body>
    <h1>双语阅读页面</h1>
    <p>This is an English paragraph for the reader.</p>
    <p>这是一个中文段落，用来测试混合语言统计。</p>
    <p>Reading aids should handle both scripts well.</p>
    <p>阅读辅助工具需要同时照顾两种文字。</p>
    <p>统计数字按照各自的语言分别累计。</p>
</body>
</html>"#
            .to_string()
    }

    /// 创建较长的文章页面
    ///
    /// 12 个正文段落每段恰好 20 个词，"reading" 在每段出现一次；
    /// 加上标题、列表和引文，页面共 265 个词、19 个段落级元素。
    pub fn create_article_page() -> String {
        let mut html = String::from(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Signal Weekly</title>
    <meta charset="UTF-8">
</head>
<body>
    <h1>Signal Processing Weekly</h1>
    <article>
        <h2>Main Story</h2>"#,
        );

        // 添加正文段落
        for i in 1..=12 {
            html.push_str(&format!(
                r#"<p>This is paragraph number {} of the featured article. It explains how steady practice builds fluent reading habits over time.</p>"#,
                i
            ));
        }

        html.push_str(
            r#"
        <ul>"#,
        );

        // 添加章节列表
        for i in 1..=4 {
            html.push_str(&format!(r#"<li>Chapter {} summary</li>"#, i));
        }

        html.push_str(
            r#"
        </ul>
        <blockquote>Deep focus turns scattered minutes into real progress.</blockquote>
    </article>
</body>
</html>"#,
        );

        html
    }
}

/// DOM检查工具
pub struct DomInspector;

impl DomInspector {
    /// 递归统计携带指定class的元素数量
    pub fn count_marks(node: &Handle, class_name: &str) -> usize {
        let mut count = 0;
        if let NodeData::Element { ref attrs, .. } = node.data {
            let marked = attrs.borrow().iter().any(|attr| {
                &attr.name.local == "class"
                    && attr
                        .value
                        .split_whitespace()
                        .any(|class| class == class_name)
            });
            if marked {
                count += 1;
            }
        }

        for child in node.children.borrow().iter() {
            count += Self::count_marks(child, class_name);
        }
        count
    }

    /// 收集子树内指定标签的全部元素
    pub fn collect_elements(node: &Handle, tag: &str, out: &mut Vec<Handle>) {
        if let NodeData::Element { ref name, .. } = node.data {
            if &name.local == tag {
                out.push(node.clone());
            }
        }
        for child in node.children.borrow().iter() {
            Self::collect_elements(child, tag, out);
        }
    }

    /// 拼接body下的全部可见文本
    ///
    /// 标记元素只是包裹文本，增强前后这个串必须保持一致。
    pub fn visible_text(document: &Handle) -> String {
        let mut text = String::new();
        if let Some(body) = Self::find_body(document) {
            Self::append_text(&body, &mut text);
        }
        text
    }

    fn find_body(node: &Handle) -> Option<Handle> {
        if let NodeData::Element { ref name, .. } = node.data {
            if &name.local == "body" {
                return Some(node.clone());
            }
        }
        for child in node.children.borrow().iter() {
            if let Some(found) = Self::find_body(child) {
                return Some(found);
            }
        }
        None
    }

    fn append_text(node: &Handle, out: &mut String) {
        match node.data {
            NodeData::Text { ref contents } => out.push_str(&contents.borrow()),
            NodeData::Element { ref name, .. } => {
                if matches!(&*name.local, "script" | "style" | "noscript") {
                    return;
                }
                for child in node.children.borrow().iter() {
                    Self::append_text(child, out);
                }
            }
            _ => {
                for child in node.children.borrow().iter() {
                    Self::append_text(child, out);
                }
            }
        }
    }
}

/// 性能测试辅助工具
pub struct PerformanceHelper;

impl PerformanceHelper {
    /// 测量执行时间
    pub fn measure_time<F, R>(f: F) -> (R, Duration)
    where
        F: FnOnce() -> R,
    {
        let start = std::time::Instant::now();
        let result = f();
        let duration = start.elapsed();
        (result, duration)
    }
}

/// 断言辅助工具
pub struct AssertionHelper;

impl AssertionHelper {
    /// 断言数量在预期范围内
    pub fn assert_count_in_range(count: usize, min: usize, max: usize, description: &str) {
        assert!(
            count >= min && count <= max,
            "{}: count {} is not in range [{}, {}]",
            description,
            count,
            min,
            max
        );
    }
}
