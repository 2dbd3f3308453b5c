//! # 工具模块
//!
//! 这个模块包含各种工具函数和实用程序：
//!
//! - 字符边界安全的文本截断
//! - 空白字符规整
//!
//! # 模块组织
//!
//! - `text` - 文本处理工具函数

pub mod text;

// Re-export commonly used items for convenience
pub use text::{char_to_byte_index, collapse_whitespace, truncate_chars};
