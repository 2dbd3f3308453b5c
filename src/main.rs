//! readlens 命令行入口
//!
//! 从文件或标准输入读取 HTML，应用阅读增强后输出结果文档，
//! 也可以只输出页面统计或 AI 分析报告。

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use readlens::core::{
    augment_html_document, format_output_path, page_statistics_from_data, print_error_message,
    ReadlensOptions,
};
use readlens::reading::constants;

/// Augments HTML documents with reading aids
#[derive(Parser)]
#[command(name = "readlens")]
#[command(about = "Augments HTML documents with reading aids")]
#[command(version)]
struct Cli {
    /// Input HTML file (use "-" for standard input)
    input: Option<PathBuf>,

    /// Write output to file instead of standard output
    /// (supports %title% and %timestamp% placeholders)
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Apply bionic reading emphasis to readable text
    #[arg(short, long)]
    bionic: bool,

    /// Highlight every occurrence of the given text
    #[arg(long, value_name = "TEXT")]
    highlight: Option<String>,

    /// Print page statistics as JSON instead of the document
    #[arg(short, long)]
    stats: bool,

    /// Request an AI page analysis and print the report
    #[cfg(feature = "assistant")]
    #[arg(long)]
    analyze: bool,

    /// Skip prepending the metadata comment
    #[arg(long)]
    no_metadata: bool,

    /// Character encoding of the output document
    #[arg(short, long, value_name = "ENCODING")]
    encoding: Option<String>,

    /// Collect text inside hidden elements as well
    #[arg(long)]
    include_hidden: bool,

    /// Write an example configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.generate_config {
        if let Err(e) = readlens::reading::generate_example_config() {
            print_error_message(&format!("生成配置文件失败: {}", e));
            process::exit(1);
        }
        return;
    }

    if let Err(e) = run(cli) {
        print_error_message(&e.to_string());
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input_data = read_input(cli.input.as_deref())?;

    if cli.stats {
        let stats = page_statistics_from_data(&input_data, None)?;
        let report = serde_json::to_string_pretty(&stats)?;
        return write_output(format!("{report}\n").as_bytes(), cli.output.as_deref(), None);
    }

    let options = ReadlensOptions {
        bionic: cli.bionic,
        highlight: cli.highlight.clone(),
        encoding: cli.encoding.clone(),
        no_metadata: cli.no_metadata,
        exclude_hidden: !cli.include_hidden,
        min_content_length: constants::MIN_CONTENT_LENGTH,
    };

    #[cfg(feature = "assistant")]
    if cli.analyze {
        return run_analysis(&cli, input_data, &options);
    }

    let (output, title) = augment_html_document(input_data, None, &options)?;
    write_output(&output, cli.output.as_deref(), title.as_deref())
}

/// 请求页面分析并打印报告
///
/// 指定了输出文件时，建议高亮会连同其余选项一起应用到文档并写出。
#[cfg(feature = "assistant")]
fn run_analysis(
    cli: &Cli,
    input_data: Vec<u8>,
    options: &ReadlensOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    use readlens::core::{EncodingProcessor, OutputFormatter};
    use readlens::parsers::get_title;
    use readlens::reading::{
        AssistantClient, ConfigManager, ObservedDocument, ReadingController,
    };

    let config = ConfigManager::new()?.get_config().clone();
    let mut client = AssistantClient::from_reading_config(&config);

    let (dom, document_encoding) =
        EncodingProcessor::new().process_encoding(&input_data, None)?;
    let doc = ObservedDocument::new(dom);

    let runtime = tokio::runtime::Runtime::new()?;
    let analysis = runtime.block_on(client.analyze_page(&doc.document()))?;

    println!("摘要: {}", analysis.summary);
    println!("复杂程度: {:?}", analysis.complexity);
    if let Some(minutes) = analysis.reading_time {
        println!("预计阅读时长: {} 分钟", minutes);
    }
    if !analysis.key_points.is_empty() {
        println!("要点:");
        for point in &analysis.key_points {
            println!("  - {}", point);
        }
    }
    if !analysis.suggested_highlights.is_empty() {
        println!("建议高亮:");
        for suggestion in &analysis.suggested_highlights {
            println!("  - {} ({:?})", suggestion.text, suggestion.importance);
        }
    }

    if let Some(ref output_path) = cli.output {
        let mut controller = ReadingController::new(doc.clone(), config);
        controller.activate()?;
        if options.bionic {
            controller.enable_bionic()?;
        }
        if let Some(ref target) = options.highlight {
            controller.highlight_selection(target)?;
        }
        controller.apply_analysis(&analysis)?;

        let title = get_title(&doc.document());
        let output = OutputFormatter::new(options).format_output(&doc, document_encoding)?;
        let target_path = format_output_path(output_path, title.as_deref());
        fs::write(&target_path, output)?;
        eprintln!("已写出增强文档: {}", target_path);
    }

    Ok(())
}

fn read_input(input: Option<&Path>) -> io::Result<Vec<u8>> {
    match input {
        Some(path) if path.as_os_str() != "-" => fs::read(path),
        _ => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn write_output(
    data: &[u8],
    output: Option<&str>,
    document_title: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) if path != "-" => {
            let target_path = format_output_path(path, document_title);
            fs::write(target_path, data)?;
        }
        _ => {
            io::stdout().write_all(data)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    // 文档走标准输出，日志一律走标准错误
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
