//! # Readlens Library
//!
//! 一个页面阅读增强工具库，把 HTML 文档转换为更易读的版本，
//! 支持仿生阅读、选区高亮、页面统计与 AI 阅读助手。
//!
//! ## 模块组织
//!
//! - `core` - 核心功能和文档增强入口
//! - `parsers` - HTML 解析与序列化
//! - `reading` - 阅读增强引擎（分段、仿生、高亮、观察、控制器）
//! - `utils` - 工具函数和实用程序

pub mod core;
pub mod parsers;
pub mod reading;
pub mod utils;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use crate::parsers::*;
pub use crate::utils::*;
