pub mod epub;
pub mod web;

// === 核心API重新导出 ===

/// EPUB文件读取器
pub use epub::Epub;

/// 错误处理
pub use epub::{EpubError, Result};

/// 批量转换器与配置
pub use web::{BatchReport, BookReport, Converter, ConverterConfig, Stage};

// === 数据结构 ===

/// 包文件解析结果
pub use epub::{Container, ManifestItem, Package, PackageMetadata, SpineItem};

/// 网页阅读器清单
pub use web::{BookManifest, BookMetadata, LinkRel, ResourceLink, WebAppDescriptor};

/// 清单对账
pub use web::{Reconciler, Reconciliation, SpineAnomaly, SpineAnomalyPolicy};

// === 库信息 ===

/// 库的版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库的描述
pub const DESCRIPTION: &str = "将EPUB电子书转换为可离线阅读的静态网页";

// === 便捷函数 ===

/// 打开EPUB文件并解析其包文件
///
/// # 示例
///
/// ```no_run
/// let package = bookweb::read_package("books/alice.epub")?;
/// println!("书名: {}", package.metadata.title());
/// # Ok::<(), bookweb::EpubError>(())
/// ```
pub fn read_package<P: AsRef<std::path::Path>>(path: P) -> Result<Package> {
    Epub::open(path)?.parse_package()
}
