use chrono::{SecondsFormat, Utc};
use encoding_rs::Encoding;
use std::error::Error;
use std::fmt;

use crate::parsers::html::{
    create_metadata_tag, get_charset, get_title, html_to_dom, serialize_document, set_charset,
};
use crate::reading::stats::{collect_page_statistics, PageStatistics};
use crate::reading::{ObservedDocument, ReadingConfig, ReadingController};

// 文档增强入口（各处理阶段内联整合到core.rs中）

/// Represents errors that can occur during document enhancement
///
/// This error type encapsulates all possible errors that can occur
/// when processing a document with the readlens library.
#[derive(Debug)]
pub struct ReadlensError {
    details: String,
}

impl ReadlensError {
    /// Creates a new ReadlensError with the given message
    ///
    /// # Arguments
    ///
    /// * `msg` - The error message describing what went wrong
    ///
    /// # Returns
    ///
    /// A new ReadlensError instance
    pub fn new(msg: &str) -> ReadlensError {
        ReadlensError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for ReadlensError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for ReadlensError {
    fn description(&self) -> &str {
        &self.details
    }
}

/// Configuration options for document enhancement
///
/// This struct contains all the configuration options that control
/// which reading features are applied to a document and how the
/// result is encoded and annotated.
#[derive(Clone)]
pub struct ReadlensOptions {
    pub bionic: bool,
    pub highlight: Option<String>,
    pub encoding: Option<String>,
    pub no_metadata: bool,
    pub exclude_hidden: bool,
    pub min_content_length: usize,
}

impl Default for ReadlensOptions {
    fn default() -> Self {
        Self {
            bionic: false,
            highlight: None,
            encoding: None,
            no_metadata: false,
            exclude_hidden: true,
            min_content_length: crate::reading::constants::MIN_CONTENT_LENGTH,
        }
    }
}

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// Enhances an HTML document with reading features
///
/// 解析输入数据，按选项应用仿生阅读和选区高亮，再序列化回字节流。
///
/// # Arguments
///
/// * `input_data` - Raw HTML data as bytes
/// * `input_encoding` - Optional character encoding (defaults to UTF-8)
/// * `options` - Enhancement options
///
/// # Returns
///
/// Returns a tuple containing the enhanced document bytes and optional title,
/// or an error if processing fails.
///
/// # Examples
///
/// ```
/// use readlens::core::{augment_html_document, ReadlensOptions};
///
/// let mut options = ReadlensOptions::default();
/// options.bionic = true;
///
/// let html = b"<html><body><p>Hello World</p></body></html>";
/// let (output, _title) = augment_html_document(html.to_vec(), None, &options).unwrap();
/// assert!(String::from_utf8_lossy(&output).contains("readlens-bionic"));
/// ```
pub fn augment_html_document(
    input_data: Vec<u8>,
    input_encoding: Option<String>,
    options: &ReadlensOptions,
) -> Result<(Vec<u8>, Option<String>), ReadlensError> {
    let augmenter = DocumentAugmenter::new(options.clone());
    augmenter.augment(input_data, input_encoding)
}

/// Computes page statistics for raw HTML data
///
/// 解析输入并统计可读文本，不修改文档内容。
pub fn page_statistics_from_data(
    input_data: &[u8],
    input_encoding: Option<String>,
) -> Result<PageStatistics, ReadlensError> {
    let encoding_processor = EncodingProcessor::new();
    let (dom, _) = encoding_processor.process_encoding(input_data, input_encoding)?;
    Ok(collect_page_statistics(&dom.document))
}

/// Parses Content-Type header value into media type and charset
pub fn parse_content_type(content_type: &str) -> (String, String) {
    let mut media_type = String::new();
    let mut charset = String::new();

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        }
    }

    (media_type, charset)
}

/// Formats output path with title substitution and sanitization
pub fn format_output_path(path: &str, document_title: Option<&str>) -> String {
    let datetime: &str = &Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let title = document_title.unwrap_or("");

    path.replace("%timestamp%", &datetime.replace(':', "_"))
        .replace(
            "%title%",
            &title
                .to_string()
                .replace(['/', '\\'], "_")
                .replace('<', "[")
                .replace('>', "]")
                .replace(':', " - ")
                .replace('\"', "")
                .replace('|', "-")
                .replace('?', "")
                .trim_start_matches('.'),
        )
}

/// Prints an error message to stderr
pub fn print_error_message(msg: &str) {
    eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
}

/// 文档增强器，负责协调整个处理流程
pub struct DocumentAugmenter {
    options: ReadlensOptions,
}

impl DocumentAugmenter {
    pub fn new(options: ReadlensOptions) -> Self {
        Self { options }
    }

    /// 处理文档数据并返回最终结果
    pub fn augment(
        &self,
        input_data: Vec<u8>,
        input_encoding: Option<String>,
    ) -> Result<(Vec<u8>, Option<String>), ReadlensError> {
        // 1. 验证配置
        let encoding_validator = EncodingValidator::new();
        encoding_validator.validate_options(&self.options)?;

        // 2. 解析并确定文档编码
        let encoding_processor = EncodingProcessor::new();
        let (dom, document_encoding) =
            encoding_processor.process_encoding(&input_data, input_encoding)?;

        // 3. 提取标题
        let document_title = get_title(&dom.document);

        // 4. 应用阅读增强
        let doc = ObservedDocument::new(dom);
        self.apply_reading_features(&doc)?;

        // 5. 处理自定义编码
        let final_encoding = self.process_custom_encoding(&doc, document_encoding);

        // 6. 序列化并格式化输出
        let output_formatter = OutputFormatter::new(&self.options);
        let result = output_formatter.format_output(&doc, final_encoding)?;

        Ok((result, document_title))
    }

    /// 按选项开启阅读功能
    ///
    /// 控制器离开作用域后页面改动保留在 DOM 里。
    fn apply_reading_features(&self, doc: &ObservedDocument) -> Result<(), ReadlensError> {
        if !self.options.bionic && self.options.highlight.is_none() {
            return Ok(());
        }

        let mut controller = ReadingController::new(doc.clone(), self.reading_config());
        controller.activate()?;

        if self.options.bionic {
            controller.enable_bionic()?;
        }
        if let Some(ref target) = self.options.highlight {
            controller.highlight_selection(target)?;
        }

        Ok(())
    }

    fn reading_config(&self) -> ReadingConfig {
        let mut config = ReadingConfig::default();
        config.exclude_hidden = self.options.exclude_hidden;
        config.min_content_length = self.options.min_content_length;
        config
    }

    fn process_custom_encoding(&self, doc: &ObservedDocument, document_encoding: String) -> String {
        if let Some(custom_encoding) = self.options.encoding.clone() {
            set_charset(doc.dom(), custom_encoding.clone());
            custom_encoding
        } else {
            document_encoding
        }
    }
}

/// 编码验证器
pub struct EncodingValidator;

impl EncodingValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_options(&self, options: &ReadlensOptions) -> Result<(), ReadlensError> {
        if let Some(custom_output_encoding) = &options.encoding {
            if Encoding::for_label_no_replacement(custom_output_encoding.as_bytes()).is_none() {
                return Err(ReadlensError::new(&format!(
                    "unknown encoding \"{}\"",
                    custom_output_encoding
                )));
            }
        }
        Ok(())
    }
}

impl Default for EncodingValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// 编码处理器
pub struct EncodingProcessor;

impl EncodingProcessor {
    pub fn new() -> Self {
        Self
    }

    /// 解析文档并确定其实际编码
    ///
    /// 先按给定编码解析一遍，如果文档内部声明了另一个有效字符集，
    /// 就按声明的字符集重新解析。
    pub fn process_encoding(
        &self,
        input_data: &[u8],
        input_encoding: Option<String>,
    ) -> Result<(markup5ever_rcdom::RcDom, String), ReadlensError> {
        let mut document_encoding = input_encoding.unwrap_or_else(|| "utf-8".to_string());
        let mut dom = html_to_dom(input_data, document_encoding.clone());

        if let Some(html_charset) = get_charset(&dom.document) {
            if !html_charset.is_empty() {
                if let Some(document_charset) =
                    Encoding::for_label_no_replacement(html_charset.as_bytes())
                {
                    document_encoding = html_charset;
                    dom = html_to_dom(input_data, document_charset.name().to_string());
                }
            }
        }

        Ok((dom, document_encoding))
    }
}

impl Default for EncodingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// 输出格式化器
pub struct OutputFormatter<'a> {
    options: &'a ReadlensOptions,
}

impl<'a> OutputFormatter<'a> {
    pub fn new(options: &'a ReadlensOptions) -> Self {
        Self { options }
    }

    pub fn format_output(
        &self,
        doc: &ObservedDocument,
        document_encoding: String,
    ) -> Result<Vec<u8>, ReadlensError> {
        let mut result = serialize_document(doc.dom(), document_encoding);

        self.prepend_metadata_if_needed(&mut result);
        self.ensure_trailing_newline(&mut result);

        Ok(result)
    }

    fn prepend_metadata_if_needed(&self, result: &mut Vec<u8>) {
        if !self.options.no_metadata {
            let mut metadata_comment = create_metadata_tag();
            metadata_comment.push('\n');
            result.splice(0..0, metadata_comment.into_bytes());
        }
    }

    fn ensure_trailing_newline(&self, result: &mut Vec<u8>) {
        if result.last() != Some(&b'\n') {
            result.extend_from_slice(b"\n");
        }
    }
}
