//! 文本处理工具函数
//!
//! 所有偏移计算都以字符为单位对外、以字节为单位对内，
//! 保证在多字节 UTF-8 文本上切分时不会落在字符中间。

/// 把字符偏移转换为字节偏移
///
/// 字符数超出文本长度时返回文本的总字节长度。
pub fn char_to_byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(byte_index, _)| byte_index)
        .unwrap_or(text.len())
}

/// 按字符数截断文本
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    &text[..char_to_byte_index(text, max_chars)]
}

/// 把连续空白压缩为单个空格并去掉首尾空白
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }
    result
}
