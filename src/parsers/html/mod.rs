//! HTML解析和处理模块
//!
//! 这个模块按职责拆分为多个子模块：
//!
//! - `dom`: 基础DOM操作与结构编辑原语
//! - `metadata`: 文档元数据处理
//! - `serializer`: 序列化功能

pub mod dom;
pub mod metadata;
pub mod serializer;

// 重新导出主要的公共 API
pub use dom::{
    append_child, create_dom_element, create_element_with_text, create_text_node, find_nodes,
    get_child_node_by_name, get_node_attr, get_node_name, get_node_text, get_parent_node,
    get_template_contents, has_class, html_to_dom, normalize_text_children, replace_node_with,
    set_node_attr, set_node_text, unwrap_element,
};
pub use metadata::{create_metadata_tag, get_charset, get_title, set_charset};
pub use serializer::serialize_document;
