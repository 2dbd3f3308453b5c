//! # 解析器模块
//!
//! 这个模块包含用于解析和处理 HTML 文档的功能：
//!
//! - HTML解析和DOM操作
//! - 文档元数据处理
//! - 序列化输出
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM操作、元数据处理、序列化

pub mod html;

// Re-export commonly used items for convenience
pub use html::{
    create_metadata_tag, get_charset, get_title, html_to_dom, serialize_document, set_charset,
};
