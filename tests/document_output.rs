//! 文档输出集成测试
//!
//! 测试从原始字节到最终输出文档的完整增强流程

use readlens::core::{augment_html_document, page_statistics_from_data, ReadlensOptions};

fn sample_page() -> Vec<u8> {
    br#"<html><head><title>Sample Story</title></head><body><p>Understanding compounds with practice.</p></body></html>"#
        .to_vec()
}

fn quiet_options() -> ReadlensOptions {
    let mut options = ReadlensOptions::default();
    options.no_metadata = true;
    options
}

/// 测试仿生加粗在输出文档中的形态
#[test]
fn test_bionic_marks_appear_in_output() {
    let mut options = quiet_options();
    options.bionic = true;

    let (output, title) =
        augment_html_document(sample_page(), None, &options).expect("augmentation should succeed");
    let output = String::from_utf8(output).expect("utf-8 output");

    assert_eq!(title, Some("Sample Story".to_string()));
    assert!(
        output.contains(r#"<b class="readlens-bionic">Unde</b>rstanding"#),
        "bold prefix covers a third of the word: {}",
        output
    );
    assert!(output.contains(r#"<b class="readlens-bionic">pr</b>actice"#));

    println!("✅ Bionic output test passed - emphasis marks serialized in place");
}

/// 测试高亮选项包裹目标词
#[test]
fn test_highlight_wraps_requested_term() {
    let mut options = quiet_options();
    options.highlight = Some("practice".to_string());

    let (output, _) =
        augment_html_document(sample_page(), None, &options).expect("augmentation should succeed");
    let output = String::from_utf8(output).expect("utf-8 output");

    assert!(output.contains(r#"<mark class="readlens-highlight">practice</mark>"#));
    assert!(!output.contains("readlens-bionic"), "bionic was not requested");

    println!("✅ Highlight output test passed - target wrapped exactly once");
}

/// 测试元数据注释与末尾换行
#[test]
fn test_metadata_comment_and_trailing_newline() {
    let options = ReadlensOptions::default();

    let (output, _) =
        augment_html_document(sample_page(), None, &options).expect("augmentation should succeed");
    let output = String::from_utf8(output).expect("utf-8 output");

    assert!(
        output.starts_with("<!-- Enhanced for reading at "),
        "metadata comment leads the document: {}",
        &output[..output.len().min(80)]
    );
    assert!(output.ends_with('\n'), "output ends with a newline");

    println!("✅ Metadata output test passed");
}

/// 测试跳过元数据注释
#[test]
fn test_no_metadata_flag_skips_comment() {
    let (output, _) = augment_html_document(sample_page(), None, &quiet_options())
        .expect("augmentation should succeed");
    let output = String::from_utf8(output).expect("utf-8 output");

    assert!(!output.contains("Enhanced for reading"));
    assert!(output.ends_with('\n'));

    println!("✅ No-metadata output test passed");
}

/// 测试重复增强的稳定性
#[test]
fn test_repeated_augmentation_is_stable() {
    // 仿生加粗连跑两遍，已处理的区域不再加粗
    let mut options = quiet_options();
    options.bionic = true;

    let (first, _) =
        augment_html_document(sample_page(), None, &options).expect("first pass should succeed");
    let (second, _) =
        augment_html_document(first.clone(), None, &options).expect("second pass should succeed");

    let first = String::from_utf8(first).unwrap();
    let second = String::from_utf8(second).unwrap();
    assert_eq!(
        first.matches("readlens-bionic").count(),
        second.matches("readlens-bionic").count(),
        "second bionic pass must not add marks"
    );

    // 高亮连跑两遍，已包裹的目标不再命中
    let mut options = quiet_options();
    options.highlight = Some("compounds".to_string());

    let (first, _) =
        augment_html_document(sample_page(), None, &options).expect("first pass should succeed");
    let (second, _) =
        augment_html_document(first.clone(), None, &options).expect("second pass should succeed");

    let first = String::from_utf8(first).unwrap();
    let second = String::from_utf8(second).unwrap();
    assert_eq!(
        first.matches("readlens-highlight").count(),
        second.matches("readlens-highlight").count(),
        "second highlight pass must not add marks"
    );

    println!("✅ Repeated augmentation test passed - marks are not nested or duplicated");
}

/// 测试自定义输出编码
#[test]
fn test_custom_output_encoding_is_applied() {
    let page = r#"<html><head><title>编码样例</title></head><body><p>阅读增强输出测试。</p></body></html>"#;
    let mut options = quiet_options();
    options.encoding = Some("GB2312".to_string());

    let (output, title) = augment_html_document(page.as_bytes().to_vec(), None, &options)
        .expect("augmentation should succeed");

    assert_eq!(title, Some("编码样例".to_string()));
    // 输出字节按请求的字符集编码，并写回 meta 声明
    let (decoded, _, had_errors) = encoding_rs::GBK.decode(&output);
    assert!(!had_errors, "output must be valid GBK");
    assert!(decoded.contains("阅读增强输出测试"));
    assert!(decoded.contains("GB2312"));

    println!("✅ Custom encoding test passed - output re-encoded with declared charset");
}

/// 测试未知编码被拒绝
#[test]
fn test_unknown_output_encoding_is_rejected() {
    let mut options = quiet_options();
    options.encoding = Some("martian".to_string());

    let result = augment_html_document(sample_page(), None, &options);
    let error = result.expect_err("unknown encoding must fail");
    assert!(error.to_string().contains("martian"));

    println!("✅ Unknown encoding test passed - error names the bad label");
}

/// 测试从 meta 声明嗅探输入编码
#[test]
fn test_input_charset_is_sniffed_from_meta() {
    let page = r#"<html><head><meta charset="gb2312"><title>阅读页</title></head><body><p>混合 reading 内容</p></body></html>"#;
    let (encoded, _, _) = encoding_rs::GBK.encode(page);

    let mut options = quiet_options();
    options.bionic = true;

    let (output, title) = augment_html_document(encoded.into_owned(), None, &options)
        .expect("augmentation should succeed");

    assert_eq!(title, Some("阅读页".to_string()), "title decodes with the sniffed charset");

    // 正文的汉字被仿生前缀拆开，标题留在 head 里原样保留
    let (decoded, _, _) = encoding_rs::GBK.decode(&output);
    assert!(decoded.contains("阅读页"));
    assert!(decoded.contains("readlens-bionic"), "latin word still gets emphasis");

    println!("✅ Charset sniffing test passed - document re-parsed with declared encoding");
}

/// 测试从字节流直接产出页面统计
#[test]
fn test_statistics_from_document_bytes() {
    let page = b"<html><head><title>T</title></head><body><p>five simple words right here</p></body></html>";

    let stats = page_statistics_from_data(page, None).expect("statistics should succeed");
    assert_eq!(stats.latin_words, 5);
    assert_eq!(stats.paragraphs, 1);
    assert_eq!(stats.reading_time_minutes, 1);

    let value = serde_json::to_value(&stats).expect("statistics serialize to JSON");
    assert_eq!(value["dominant_script"], "latin");
    assert_eq!(value["latin_words"], 5);

    println!("✅ Byte statistics test passed - JSON carries the word counts");
}
