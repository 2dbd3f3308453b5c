//! HTML 文档元数据处理模块
//!
//! 此模块提供对 HTML 文档元数据的处理功能，包括：
//! - 处理字符编码声明
//! - 提取文档标题
//! - 生成处理元数据标签
//!
//! 这些功能主要用于 readlens 在增强 HTML 文档时保持正确的元数据信息，
//! 确保输出的 HTML 声明与实际编码一致，并能标注处理来源。

use chrono::{SecondsFormat, Utc};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::core::parse_content_type;

use super::dom::{create_dom_element, find_nodes, get_node_attr, set_node_attr};

/// 获取文档字符编码
///
/// 从 HTML 文档的 meta 标签中提取字符编码信息。支持两种格式：
/// HTML5 的 `<meta charset="...">` 和 HTML4 的
/// `<meta http-equiv="content-type" content="text/html; charset=...">`。
///
/// # 参数
///
/// * `node` - HTML 文档的根节点句柄
///
/// # 返回值
///
/// * `Some(String)` - 找到编码声明时返回其值
/// * `None` - 文档没有声明字符编码
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, vec!["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            // 处理 <meta charset="..." /> 格式
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(meta_content_type_node_attr_value) = get_node_attr(meta_node, "content") {
                // 处理 <meta http-equiv="content-type" content="text/html; charset=..." /> 格式
                let (_media_type, charset) = parse_content_type(&meta_content_type_node_attr_value);
                return Some(charset);
            }
        }
    }

    None
}

/// 获取文档标题
///
/// 提取 `<head>` 中 `<title>` 标签的第一个文本子节点。
pub fn get_title(node: &Handle) -> Option<String> {
    for title_node in find_nodes(node, vec!["html", "head", "title"]).iter() {
        for child_node in title_node.children.borrow().iter() {
            if let NodeData::Text { ref contents } = child_node.data {
                return Some(contents.borrow().to_string());
            }
        }
    }

    None
}

/// 设置文档字符编码声明
///
/// 优先更新已有的 charset meta 标签；如果文档声明使用的是 HTML4 的
/// content-type 格式，则改写其 content 属性。两者都不存在时在 `<head>`
/// 中新建一个 HTML5 格式的 charset meta 节点。
///
/// # 参数
///
/// * `dom` - 待修改的文档
/// * `charset` - 新的编码名称，例如 `"utf-8"` 或 `"gb2312"`
pub fn set_charset(dom: &RcDom, charset: String) {
    for meta_node in find_nodes(&dom.document, vec!["html", "head", "meta"]).iter() {
        // 检查是否有 HTML5 格式的 charset 属性
        if get_node_attr(meta_node, "charset").is_some() {
            set_node_attr(meta_node, "charset", Some(charset));
            return;
        }

        // 检查是否有 HTML4 格式的 http-equiv content-type 标签
        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
            && get_node_attr(meta_node, "content").is_some()
        {
            set_node_attr(
                meta_node,
                "content",
                Some(format!("text/html;charset={charset}")),
            );
            return;
        }
    }

    // 手动在 HEAD 中添加 charset META 节点
    let meta_charset_node = create_dom_element(dom, "meta", &[("charset", charset.as_str())]);
    if let Some(head_node) = find_nodes(&dom.document, vec!["html", "head"]).first() {
        head_node
            .children
            .borrow_mut()
            .push(meta_charset_node.clone());
    }
}

/// 生成处理元数据注释
///
/// 生成标注处理时间和工具版本的 HTML 注释，插入到输出文档最前面，
/// 便于追溯文档经过了哪个版本的增强处理。
pub fn create_metadata_tag() -> String {
    let datetime: &str = &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    format!(
        "<!-- Enhanced for reading at {} using {} v{} -->",
        datetime,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    )
}
