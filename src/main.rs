use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bookweb::web::{DEFAULT_CONFIG_PATH, SpineAnomalyPolicy};
use bookweb::{BatchReport, Converter, ConverterConfig, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 📚 BookWeb - EPUB转静态网页工具
#[derive(Parser)]
#[command(name = "bookweb")]
#[command(about = "将目录中的EPUB文件转换为可离线阅读的静态网页")]
#[command(version)]
struct Args {
    /// EPUB文件目录
    #[arg(long, alias = "epubDir", help = "存放EPUB文件的目录（默认: books）")]
    epub_dir: Option<PathBuf>,

    /// 输出目录
    #[arg(long, alias = "outputDir", help = "生成文件的输出目录（默认: out）")]
    output_dir: Option<PathBuf>,

    /// 托管域名
    #[arg(long, help = "文件托管的域名，用于生成清单的self链接")]
    domain: Option<String>,

    /// 配置文件路径
    #[arg(short, long, help = "YAML配置文件路径（默认: bookweb.yaml，不存在时使用默认配置）")]
    config: Option<PathBuf>,

    /// 入口页面模板
    #[arg(long, help = "index.html模板路径，未指定时使用内置模板")]
    template: Option<PathBuf>,

    /// 共享静态文件目录
    #[arg(long, help = "viewer.js、sw.js与polyfill/fetch.js所在目录（默认: public）")]
    assets_dir: Option<PathBuf>,

    /// 脊柱异常处理策略
    #[arg(long, value_enum, help = "脊柱引用异常的处理方式")]
    spine_policy: Option<SpineAnomalyPolicy>,

    /// 并行转换
    #[arg(long, help = "并行转换多本书")]
    parallel: bool,

    /// 不读取图片尺寸
    #[arg(long, help = "不在清单中写入图片的宽高")]
    no_image_sizes: bool,

    /// 生成默认配置文件
    #[arg(long, help = "生成默认配置文件后退出")]
    init_config: bool,

    /// 详细输出模式
    #[arg(short, long, help = "显示调试日志")]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "bookweb=debug" } else { "bookweb=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.init_config {
        let path = args.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        return match ConverterConfig::generate_default_config(&path) {
            Ok(()) => {
                println!("✅ 已生成配置文件: {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ 错误: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("📚 BookWeb - EPUB转静态网页工具");
    println!("正在转换目录: {}", config.input_dir.display());

    match Converter::new(config).run() {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ 无法读取EPUB目录: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// 配置优先级：命令行 > 配置文件 > 默认值
fn load_config(args: &Args) -> Result<ConverterConfig> {
    let mut config = match &args.config {
        Some(path) => ConverterConfig::from_file(path)?,
        None => ConverterConfig::load_or_default(Path::new(DEFAULT_CONFIG_PATH))?,
    };

    if let Some(dir) = &args.epub_dir {
        config.input_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(domain) = &args.domain {
        config.domain = domain.clone();
    }
    if let Some(template) = &args.template {
        config.template = Some(template.clone());
    }
    if let Some(dir) = &args.assets_dir {
        config.assets_dir = dir.clone();
    }
    if let Some(policy) = args.spine_policy {
        config.spine_anomalies = policy;
    }
    if args.parallel {
        config.parallel = true;
    }
    if args.no_image_sizes {
        config.probe_image_sizes = false;
    }

    Ok(config)
}

fn print_summary(report: &BatchReport) {
    println!("\n📊 转换结果:");
    for book in &report.books {
        if book.is_success() {
            match &book.manifest {
                Some(summary) => println!(
                    "  ✅ {} (章节 {} 个, 资源 {} 个)",
                    book.name, summary.spine, summary.resources
                ),
                None => println!("  ✅ {}", book.name),
            }
        } else {
            println!("  ❌ {}", book.name);
            for failure in &book.failures {
                println!("     [{}] {}", failure.stage, failure.error);
            }
        }
    }

    for failure in &report.shared_asset_failures {
        println!("  ⚠️  共享文件 {}: {}", failure.asset, failure.error);
    }

    println!(
        "\n🎉 完成: 成功 {} 本, 失败 {} 本",
        report.converted(),
        report.failed()
    );
}
